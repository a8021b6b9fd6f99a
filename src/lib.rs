//! Running performance tracker.
//!
//! Race results with optional elementary splits, split-derived
//! sub-segments, personal bests over every record and IAAF scoring.

pub mod helpers;
pub mod services;
pub mod store;

pub use services::collection::{PerfCollection, PersonalBest, TableFilter, TableRow};
pub use services::performance::{MainPerf, NewPerformance, PerfError, Performance, RaceInfo, SubPerf};
pub use services::scoring::{Gender, ScoringTable};
pub use services::time::{Pace, RaceTime};

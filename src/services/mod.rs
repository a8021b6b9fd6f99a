pub mod collection;
pub mod performance;
pub mod scoring;
pub mod time;

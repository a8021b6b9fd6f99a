//! IAAF scoring lookup.
//!
//! The coefficient table maps `gender -> event -> [a, b, c]`. A performance
//! of `x` seconds scores `round(a*x^2 + b*x + c)`, clamped to `[0, 1400]`.
//!
//! Road races are matched to an event class from their distance
//! (see [`EventClass::from_distance`]).

use std::collections::HashMap;
use std::fmt;
use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::time::RaceTime;

/// Highest score the table can award.
pub const MAX_SCORE: u32 = 1400;

/// Distances are compared within this tolerance when picking an event class.
/// It absorbs binary rounding (21.099999999) but not user rounding (21.0975).
pub const EVENT_DISTANCE_TOLERANCE_KM: f64 = 1e-6;

/// Errors produced while loading or querying the scoring table.
#[derive(Debug, Error)]
pub enum ScoringError {
    #[error("No scoring coefficients for {gender}/{event}")]
    NotFound { gender: Gender, event: String },
    #[error("Invalid scoring table: {0}")]
    InvalidTable(String),
    #[error("IO error reading scoring table: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error in scoring table: {0}")]
    Json(#[from] serde_json::Error),
}

/// Gender selecting one half of the scoring table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Gender {
    Male,
    Female,
}

impl Gender {
    pub fn as_str(&self) -> &'static str {
        match self {
            Gender::Male => "male",
            Gender::Female => "female",
        }
    }
}

impl fmt::Display for Gender {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Gender {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "male" => Ok(Gender::Male),
            "female" => Ok(Gender::Female),
            other => Err(format!(
                "unknown gender '{}', expected 'male' or 'female'",
                other
            )),
        }
    }
}

/// Standard road-race categories a distance can be scored under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventClass {
    FiveKm,
    TenKm,
    FifteenKm,
    TenMiles,
    TwentyKm,
    HalfMarathon,
    TwentyFiveKm,
    ThirtyKm,
    Marathon,
    HundredKm,
}

impl EventClass {
    pub const ALL: [EventClass; 10] = [
        EventClass::FiveKm,
        EventClass::TenKm,
        EventClass::FifteenKm,
        EventClass::TenMiles,
        EventClass::TwentyKm,
        EventClass::HalfMarathon,
        EventClass::TwentyFiveKm,
        EventClass::ThirtyKm,
        EventClass::Marathon,
        EventClass::HundredKm,
    ];

    /// Label used as the event key in the scoring table.
    pub fn label(&self) -> &'static str {
        match self {
            EventClass::FiveKm => "5km",
            EventClass::TenKm => "10km",
            EventClass::FifteenKm => "15km",
            EventClass::TenMiles => "10 Miles",
            EventClass::TwentyKm => "20km",
            EventClass::HalfMarathon => "HM",
            EventClass::TwentyFiveKm => "25km",
            EventClass::ThirtyKm => "30km",
            EventClass::Marathon => "Marathon",
            EventClass::HundredKm => "100km",
        }
    }

    /// Canonical distance of the event in km.
    pub fn distance_km(&self) -> f64 {
        match self {
            EventClass::FiveKm => 5.0,
            EventClass::TenKm => 10.0,
            EventClass::FifteenKm => 15.0,
            EventClass::TenMiles => 16.09,
            EventClass::TwentyKm => 20.0,
            EventClass::HalfMarathon => 21.1,
            EventClass::TwentyFiveKm => 25.0,
            EventClass::ThirtyKm => 30.0,
            EventClass::Marathon => 42.2,
            EventClass::HundredKm => 100.0,
        }
    }

    /// Event class whose canonical distance matches `distance_km`.
    pub fn from_distance(distance_km: f64) -> Option<EventClass> {
        EventClass::ALL
            .into_iter()
            .find(|class| (class.distance_km() - distance_km).abs() <= EVENT_DISTANCE_TOLERANCE_KM)
    }
}

impl fmt::Display for EventClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Quadratic scoring coefficients for one (gender, event) pair.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(from = "[f64; 3]")]
pub struct Coefficients {
    pub a: f64,
    pub b: f64,
    pub c: f64,
}

impl From<[f64; 3]> for Coefficients {
    fn from([a, b, c]: [f64; 3]) -> Self {
        Self { a, b, c }
    }
}

impl Coefficients {
    /// Points for a performance of `time`, clamped to `[0, MAX_SCORE]`.
    pub fn points(&self, time: &RaceTime) -> u32 {
        let x = time.total_seconds();
        let raw = (self.a * x * x + self.b * x + self.c).round();
        if raw.is_nan() || raw <= 0.0 {
            0
        } else if raw >= f64::from(MAX_SCORE) {
            MAX_SCORE
        } else {
            raw as u32
        }
    }
}

/// Loaded coefficient table, read-only after construction.
#[derive(Debug, Clone, Default)]
pub struct ScoringTable {
    formulas: HashMap<Gender, HashMap<String, Coefficients>>,
}

impl ScoringTable {
    /// Parse a `gender -> event -> [a, b, c]` JSON document.
    pub fn from_json_str(json: &str) -> Result<Self, ScoringError> {
        let raw: HashMap<String, HashMap<String, Coefficients>> = serde_json::from_str(json)?;
        let mut formulas = HashMap::with_capacity(raw.len());
        for (gender, events) in raw {
            let gender: Gender = gender.parse().map_err(ScoringError::InvalidTable)?;
            formulas.insert(gender, events);
        }
        Ok(Self { formulas })
    }

    /// Load the table from a JSON file.
    pub fn from_path(path: &Path) -> Result<Self, ScoringError> {
        let json = std::fs::read_to_string(path)?;
        let table = Self::from_json_str(&json)?;
        tracing::info!(
            "Loaded {} scoring formulas from {}",
            table.len(),
            path.display()
        );
        Ok(table)
    }

    /// Number of (gender, event) formulas in the table.
    pub fn len(&self) -> usize {
        self.formulas.values().map(HashMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn coefficients(&self, gender: Gender, event: &str) -> Result<&Coefficients, ScoringError> {
        self.formulas
            .get(&gender)
            .and_then(|events| events.get(event))
            .ok_or_else(|| ScoringError::NotFound {
                gender,
                event: event.to_string(),
            })
    }

    /// Score `time` for `gender` in `event` (an event label such as "HM" or "100m").
    pub fn score(&self, gender: Gender, event: &str, time: &RaceTime) -> Result<u32, ScoringError> {
        Ok(self.coefficients(gender, event)?.points(time))
    }
}

//! Elapsed-time and pace value types.
//!
//! `RaceTime` is the duration of a performance, kept as a whole number of
//! centiseconds. Equality, ordering and arithmetic all work on that count.
//!
//! Canonical string form: `<h>h<m>min<s>s`, e.g. `1h25min22s`, `39min30s`,
//! `9.58s`. The hour segment is omitted when zero, the minute segment when
//! both hours and minutes are zero. Seconds carry at most two decimals;
//! finer values are rejected.

use std::cmp::Ordering;
use std::fmt;
use std::iter::Sum;
use std::ops::Add;
use std::str::FromStr;

use thiserror::Error;

const SECONDS_PER_MINUTE: f64 = 60.0;

const CENTIS_PER_SECOND: f64 = 100.0;
const CENTIS_PER_MINUTE: u64 = 6_000;
const CENTIS_PER_HOUR: u64 = 360_000;

/// How far `seconds * 100` may sit from a whole number and still count as
/// centisecond-precise. Covers binary noise such as `0.13 * 100`.
const CENTI_TOLERANCE: f64 = 1e-6;

/// Slack added before truncating pace seconds, so 4.05 min/km computed as
/// 4.0499999 still yields 3 seconds.
const PACE_SECONDS_EPSILON: f64 = 1e-9;

/// Errors produced by time parsing, construction and arithmetic.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum TimeError {
    #[error("Cannot parse time '{input}': {message}")]
    Parse { input: String, message: String },
    #[error("Invalid time operation: {0}")]
    InvalidOperation(String),
    #[error("Invalid time value: {0}")]
    Validation(String),
}

/// Convert a number of seconds to centiseconds, rejecting values that are
/// negative, non-finite or finer than a centisecond.
fn seconds_to_centis(seconds: f64) -> Result<u64, TimeError> {
    if !seconds.is_finite() || seconds < 0.0 {
        return Err(TimeError::Validation(format!(
            "seconds must be a finite non-negative number, got {}",
            seconds
        )));
    }
    let centis = seconds * CENTIS_PER_SECOND;
    let whole = centis.round();
    if (centis - whole).abs() > CENTI_TOLERANCE {
        return Err(TimeError::Validation(format!(
            "{} has more than two decimals, times are kept to the centisecond",
            seconds
        )));
    }
    Ok(whole as u64)
}

/// Elapsed time of a performance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RaceTime {
    centis: u64,
}

impl RaceTime {
    /// Neutral element for sums. Records never carry a zero time.
    pub const ZERO: RaceTime = RaceTime { centis: 0 };

    /// Build a time from its fields. Minutes must be below 60 and seconds in
    /// `[0, 60)` with at most two decimals.
    pub fn new(hours: u32, minutes: u32, seconds: f64) -> Result<Self, TimeError> {
        if minutes >= 60 {
            return Err(TimeError::Validation(format!(
                "minutes must be below 60, got {}",
                minutes
            )));
        }
        let second_centis = seconds_to_centis(seconds)?;
        if second_centis >= CENTIS_PER_MINUTE {
            return Err(TimeError::Validation(format!(
                "seconds must be below 60, got {}",
                seconds
            )));
        }
        Ok(Self::from_parts(hours, minutes, second_centis))
    }

    /// Build a time from a total number of seconds (at most two decimals).
    ///
    /// hours = floor(total / 3600), minutes = floor(remainder / 60),
    /// seconds = what is left.
    pub fn from_total_seconds(total_seconds: f64) -> Result<Self, TimeError> {
        Ok(Self {
            centis: seconds_to_centis(total_seconds)?,
        })
    }

    fn from_parts(hours: u32, minutes: u32, second_centis: u64) -> Self {
        Self {
            centis: u64::from(hours) * CENTIS_PER_HOUR
                + u64::from(minutes) * CENTIS_PER_MINUTE
                + second_centis,
        }
    }

    pub fn hours(&self) -> u32 {
        (self.centis / CENTIS_PER_HOUR) as u32
    }

    pub fn minutes(&self) -> u32 {
        ((self.centis / CENTIS_PER_MINUTE) % 60) as u32
    }

    pub fn seconds(&self) -> f64 {
        (self.centis % CENTIS_PER_MINUTE) as f64 / CENTIS_PER_SECOND
    }

    /// Whole centiseconds.
    pub fn centis(&self) -> u64 {
        self.centis
    }

    pub fn total_seconds(&self) -> f64 {
        self.centis as f64 / CENTIS_PER_SECOND
    }

    pub fn total_minutes(&self) -> f64 {
        self.total_seconds() / SECONDS_PER_MINUTE
    }

    pub fn is_zero(&self) -> bool {
        self.centis == 0
    }

    /// Total order on elapsed time.
    pub fn cmp_total(&self, other: &Self) -> Ordering {
        self.centis.cmp(&other.centis)
    }

    /// Subtract `other`, failing when the result would be negative.
    pub fn checked_sub(&self, other: &Self) -> Result<Self, TimeError> {
        self.centis
            .checked_sub(other.centis)
            .map(|centis| Self { centis })
            .ok_or_else(|| {
                TimeError::InvalidOperation(format!(
                    "cannot subtract {} from the smaller time {}",
                    other, self
                ))
            })
    }
}

impl Add for RaceTime {
    type Output = RaceTime;

    fn add(self, other: RaceTime) -> RaceTime {
        RaceTime {
            centis: self.centis + other.centis,
        }
    }
}

impl Sum for RaceTime {
    fn sum<I: Iterator<Item = RaceTime>>(iter: I) -> Self {
        iter.fold(RaceTime::ZERO, |acc, t| acc + t)
    }
}

impl<'a> Sum<&'a RaceTime> for RaceTime {
    fn sum<I: Iterator<Item = &'a RaceTime>>(iter: I) -> Self {
        iter.copied().sum()
    }
}

impl fmt::Display for RaceTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let hours = self.centis / CENTIS_PER_HOUR;
        let minutes = (self.centis / CENTIS_PER_MINUTE) % 60;
        let second_centis = self.centis % CENTIS_PER_MINUTE;

        if hours > 0 {
            write!(f, "{}h", hours)?;
        }
        if hours > 0 || minutes > 0 {
            write!(f, "{}min", minutes)?;
        }
        if second_centis % 100 == 0 {
            write!(f, "{}s", second_centis / 100)
        } else {
            let fraction = format!("{:02}", second_centis % 100);
            write!(
                f,
                "{}.{}s",
                second_centis / 100,
                fraction.trim_end_matches('0')
            )
        }
    }
}

impl FromStr for RaceTime {
    type Err = TimeError;

    /// Parse `<h>h<m>min<s>s` with every segment optional. Minutes or
    /// seconds above 59 are carried into the next unit.
    fn from_str(input: &str) -> Result<Self, Self::Err> {
        let parse_error = |message: String| TimeError::Parse {
            input: input.to_string(),
            message,
        };

        let mut rest = input.trim();
        let mut found_segment = false;
        let mut hours = 0u32;
        let mut minutes = 0u32;
        let mut second_centis = 0u64;

        if let Some((h, tail)) = rest.split_once('h') {
            hours = h
                .trim()
                .parse()
                .map_err(|_| parse_error(format!("hours '{}' is not a whole number", h)))?;
            rest = tail;
            found_segment = true;
        }
        if let Some((m, tail)) = rest.split_once("min") {
            minutes = m
                .trim()
                .parse()
                .map_err(|_| parse_error(format!("minutes '{}' is not a whole number", m)))?;
            rest = tail;
            found_segment = true;
        }
        if let Some(s) = rest.trim().strip_suffix('s') {
            let seconds: f64 = s
                .trim()
                .parse()
                .map_err(|_| parse_error(format!("seconds '{}' is not a number", s)))?;
            if !seconds.is_finite() || seconds < 0.0 {
                return Err(parse_error(format!(
                    "seconds '{}' must be finite and non-negative",
                    s
                )));
            }
            second_centis = seconds_to_centis(seconds)?;
            rest = "";
            found_segment = true;
        }

        if !rest.trim().is_empty() {
            return Err(parse_error(format!("unrecognized segment '{}'", rest)));
        }
        if !found_segment {
            return Err(parse_error(
                "expected at least one of '<h>h', '<m>min', '<s>s'".to_string(),
            ));
        }

        Ok(RaceTime::from_parts(hours, minutes, second_centis))
    }
}

/// Running pace in minutes and whole seconds per kilometre.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pace {
    minutes: u32,
    seconds: u32,
}

impl Pace {
    /// pace = time in minutes / distance in km. Seconds are truncated.
    pub fn from_time_distance(time: &RaceTime, distance_km: f64) -> Result<Self, TimeError> {
        if !distance_km.is_finite() || distance_km <= 0.0 {
            return Err(TimeError::Validation(format!(
                "pace needs a positive distance, got {} km",
                distance_km
            )));
        }
        let pace = time.total_minutes() / distance_km;
        let minutes = pace.floor();
        let seconds = ((pace - minutes) * SECONDS_PER_MINUTE + PACE_SECONDS_EPSILON).floor();
        Ok(Self {
            minutes: minutes as u32,
            seconds: (seconds as u32).min(59),
        })
    }

    pub fn minutes(&self) -> u32 {
        self.minutes
    }

    pub fn seconds(&self) -> u32 {
        self.seconds
    }

    pub fn minutes_per_km(&self) -> f64 {
        f64::from(self.minutes) + f64::from(self.seconds) / SECONDS_PER_MINUTE
    }

    /// Speed in km/h, 60 / pace in minutes.
    pub fn kmh(&self) -> f64 {
        60.0 / self.minutes_per_km()
    }
}

impl fmt::Display for Pace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:02}'{:02} min/km (={:.2} km/h)",
            self.minutes,
            self.seconds,
            self.kmh()
        )
    }
}

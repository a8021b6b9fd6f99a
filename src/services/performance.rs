//! Performance records: whole races and the sub-segments derived from their splits.
//!
//! A [`MainPerf`] is one race result. Splitting it with
//! [`MainPerf::add_splits`] derives a [`SubPerf`] for every contiguous run of
//! elementary splits, keyed by its `(begin, end)` range in km. Sub-segments
//! are owned by their parent's map and only reachable through it; the
//! [`Performance`] view pairs a sub-segment with a borrow of its parent.

use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt;

use chrono::NaiveDateTime;
use thiserror::Error;

use super::scoring::EventClass;
use super::time::{Pace, RaceTime, TimeError};
use crate::helpers::{format_race_date, snap_km};

/// Errors raised while building records, splitting them or loading them.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum PerfError {
    #[error("Validation error: {0}")]
    Validation(String),
    #[error("Invariant violation: {0}")]
    InvariantViolation(String),
    #[error("Collection already holds {0} records")]
    AlreadyPopulated(usize),
    #[error(transparent)]
    Time(#[from] TimeError),
}

/// Descriptive fields shared by a race and every segment derived from it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RaceInfo {
    pub name_event: Option<String>,
    pub location: Option<String>,
    pub url_results: Option<String>,
    pub url_strava: Option<String>,
}

/// Input for a new race result.
#[derive(Debug, Clone)]
pub struct NewPerformance {
    pub time: RaceTime,
    pub distance: f64,
    pub date: NaiveDateTime,
    pub info: RaceInfo,
    pub rank: Option<u32>,
    pub num_participants: Option<u32>,
}

/// `(begin, end)` range of a sub-segment within its race, in km.
#[derive(Debug, Clone, Copy)]
pub struct SplitKey {
    begin: f64,
    end: f64,
}

impl SplitKey {
    pub fn new(begin: f64, end: f64) -> Self {
        Self {
            begin: snap_km(begin),
            end: snap_km(end),
        }
    }

    pub fn begin(&self) -> f64 {
        self.begin
    }

    pub fn end(&self) -> f64 {
        self.end
    }

    pub fn length(&self) -> f64 {
        snap_km(self.end - self.begin)
    }
}

impl PartialEq for SplitKey {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for SplitKey {}

impl PartialOrd for SplitKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for SplitKey {
    fn cmp(&self, other: &Self) -> Ordering {
        self.begin
            .total_cmp(&other.begin)
            .then(self.end.total_cmp(&other.end))
    }
}

impl fmt::Display for SplitKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}km", self.begin, self.end)
    }
}

/// A whole race result, optionally decomposed into sub-segments.
#[derive(Debug, Clone, PartialEq)]
pub struct MainPerf {
    time: RaceTime,
    distance: f64,
    date: NaiveDateTime,
    info: RaceInfo,
    score: Option<u32>,
    rank: Option<u32>,
    num_participants: Option<u32>,
    sub_perfs: BTreeMap<SplitKey, SubPerf>,
}

impl MainPerf {
    /// Validate and build a race result.
    pub fn new(params: NewPerformance) -> Result<Self, PerfError> {
        if params.time.is_zero() {
            return Err(PerfError::Validation(
                "race time must be greater than zero".to_string(),
            ));
        }
        if !params.distance.is_finite() || params.distance <= 0.0 {
            return Err(PerfError::Validation(format!(
                "distance must be a positive number of km, got {}",
                params.distance
            )));
        }
        if params.rank == Some(0) {
            return Err(PerfError::Validation("rank starts at 1".to_string()));
        }
        if params.num_participants == Some(0) {
            return Err(PerfError::Validation(
                "number of participants must be at least 1".to_string(),
            ));
        }
        if let (Some(rank), Some(field)) = (params.rank, params.num_participants) {
            if rank > field {
                return Err(PerfError::Validation(format!(
                    "rank {} is beyond the field of {} participants",
                    rank, field
                )));
            }
        }

        Ok(Self {
            time: params.time,
            distance: snap_km(params.distance),
            date: params.date,
            info: params.info,
            score: None,
            rank: params.rank,
            num_participants: params.num_participants,
            sub_perfs: BTreeMap::new(),
        })
    }

    /// A bare result with no descriptive fields.
    pub fn from_result(
        time: RaceTime,
        distance: f64,
        date: NaiveDateTime,
    ) -> Result<Self, PerfError> {
        Self::new(NewPerformance {
            time,
            distance,
            date,
            info: RaceInfo::default(),
            rank: None,
            num_participants: None,
        })
    }

    pub fn time(&self) -> RaceTime {
        self.time
    }

    pub fn distance(&self) -> f64 {
        self.distance
    }

    pub fn date(&self) -> NaiveDateTime {
        self.date
    }

    pub fn info(&self) -> &RaceInfo {
        &self.info
    }

    pub fn score(&self) -> Option<u32> {
        self.score
    }

    pub fn rank(&self) -> Option<u32> {
        self.rank
    }

    pub fn num_participants(&self) -> Option<u32> {
        self.num_participants
    }

    /// rank / field size, when both are known.
    pub fn rank_ratio(&self) -> Option<f64> {
        match (self.rank, self.num_participants) {
            (Some(rank), Some(field)) => Some(f64::from(rank) / f64::from(field)),
            _ => None,
        }
    }

    pub fn pace(&self) -> Result<Pace, TimeError> {
        Pace::from_time_distance(&self.time, self.distance)
    }

    pub fn event_class(&self) -> Option<EventClass> {
        EventClass::from_distance(self.distance)
    }

    /// Sub-segments in `(begin, end)` order.
    pub fn sub_perfs(&self) -> impl Iterator<Item = &SubPerf> + '_ {
        self.sub_perfs.values()
    }

    pub fn sub_perf(&self, key: &SplitKey) -> Option<&SubPerf> {
        self.sub_perfs.get(key)
    }

    pub fn sub_perf_count(&self) -> usize {
        self.sub_perfs.len()
    }

    /// Sub-segments as performance views bound to this record.
    pub fn split_performances(&self) -> impl Iterator<Item = Performance<'_>> + '_ {
        self.sub_perfs
            .values()
            .map(move |sub| Performance::Sub { parent: self, sub })
    }

    pub(crate) fn set_score(&mut self, score: Option<u32>) {
        self.score = score;
    }

    pub(crate) fn sub_perf_mut(&mut self, key: &SplitKey) -> Option<&mut SubPerf> {
        self.sub_perfs.get_mut(key)
    }

    /// Derive sub-segments from `splits`, contiguous elementary splits of
    /// `segment_distance` km each.
    ///
    /// For every multiple `k * segment_distance` still shorter than the race,
    /// each window of `k` consecutive splits becomes one sub-segment. Four
    /// 5 km splits of a half marathon yield 4 + 3 + 2 + 1 windows.
    ///
    /// The call is atomic: on any error no sub-segment is added. Returns the
    /// number of sub-segments created.
    pub fn add_splits(
        &mut self,
        splits: &[RaceTime],
        segment_distance: f64,
    ) -> Result<usize, PerfError> {
        if !segment_distance.is_finite() || segment_distance <= 0.0 {
            return Err(PerfError::Validation(format!(
                "split distance must be a positive number of km, got {}",
                segment_distance
            )));
        }
        if let Some(index) = splits.iter().position(RaceTime::is_zero) {
            return Err(PerfError::Validation(format!(
                "split {} has a zero time",
                index + 1
            )));
        }

        let total: RaceTime = splits.iter().sum();
        if total > self.time {
            return Err(PerfError::InvariantViolation(format!(
                "sub splits exceed total time: {} > {}",
                total, self.time
            )));
        }
        if segment_distance > self.distance {
            return Err(PerfError::InvariantViolation(format!(
                "sub distance exceeds total distance: {}km > {}km",
                segment_distance, self.distance
            )));
        }

        let n = splits.len();
        let mut windows = Vec::new();
        let mut k = 1;
        while k <= n && snap_km(k as f64 * segment_distance) < self.distance {
            for i in 0..=(n - k) {
                let begin = i as f64 * segment_distance;
                let key = SplitKey::new(begin, begin + k as f64 * segment_distance);
                if self.sub_perfs.contains_key(&key) {
                    return Err(PerfError::InvariantViolation(format!(
                        "sub-segment {} already exists",
                        key
                    )));
                }
                let time: RaceTime = splits[i..i + k].iter().sum();
                windows.push(SubPerf::derive(self, key, time)?);
            }
            k += 1;
        }

        tracing::debug!(
            "Derived {} sub-segments from {} splits of {}km for {}",
            windows.len(),
            n,
            segment_distance,
            self
        );

        let created = windows.len();
        for sub in windows {
            self.sub_perfs.insert(sub.key, sub);
        }
        Ok(created)
    }

    /// Attach a previously persisted sub-segment, re-checking the invariants.
    pub(crate) fn restore_sub_perf(
        &mut self,
        key: SplitKey,
        time: RaceTime,
        score: Option<u32>,
    ) -> Result<(), PerfError> {
        if self.sub_perfs.contains_key(&key) {
            return Err(PerfError::InvariantViolation(format!(
                "sub-segment {} already exists",
                key
            )));
        }
        let mut sub = SubPerf::derive(self, key, time)?;
        sub.score = score;
        self.sub_perfs.insert(key, sub);
        Ok(())
    }
}

impl fmt::Display for MainPerf {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} for {}km on {}",
            self.time,
            self.distance,
            format_race_date(&self.date)
        )
    }
}

/// A segment of a race, built from one window of elementary splits.
#[derive(Debug, Clone, PartialEq)]
pub struct SubPerf {
    key: SplitKey,
    time: RaceTime,
    distance: f64,
    date: NaiveDateTime,
    info: RaceInfo,
    score: Option<u32>,
}

impl SubPerf {
    /// Build a sub-segment of `parent`, copying its descriptive fields.
    fn derive(parent: &MainPerf, key: SplitKey, time: RaceTime) -> Result<Self, PerfError> {
        if time.is_zero() {
            return Err(PerfError::Validation(format!(
                "sub-segment {} has a zero time",
                key
            )));
        }
        if key.begin < 0.0 || key.begin >= key.end {
            return Err(PerfError::InvariantViolation(format!(
                "sub-segment {} must satisfy 0 <= begin < end",
                key
            )));
        }
        if key.end > parent.distance {
            return Err(PerfError::InvariantViolation(format!(
                "sub-segment {} ends beyond the race distance of {}km",
                key, parent.distance
            )));
        }
        let distance = key.length();
        if distance > parent.distance {
            return Err(PerfError::InvariantViolation(format!(
                "sub-segment distance {}km exceeds race distance {}km",
                distance, parent.distance
            )));
        }
        if time > parent.time {
            return Err(PerfError::InvariantViolation(format!(
                "sub-segment time {} exceeds race time {}",
                time, parent.time
            )));
        }

        Ok(Self {
            key,
            time,
            distance,
            date: parent.date,
            info: parent.info.clone(),
            score: None,
        })
    }

    pub fn key(&self) -> SplitKey {
        self.key
    }

    pub fn begin_distance(&self) -> f64 {
        self.key.begin
    }

    pub fn end_distance(&self) -> f64 {
        self.key.end
    }

    pub fn time(&self) -> RaceTime {
        self.time
    }

    pub fn distance(&self) -> f64 {
        self.distance
    }

    pub fn date(&self) -> NaiveDateTime {
        self.date
    }

    pub fn info(&self) -> &RaceInfo {
        &self.info
    }

    pub fn score(&self) -> Option<u32> {
        self.score
    }

    pub(crate) fn set_score(&mut self, score: Option<u32>) {
        self.score = score;
    }
}

/// Which variant a [`Performance`] view refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PerfKind {
    Main,
    Sub,
}

/// A borrowed view over either kind of record.
///
/// Sub-segments carry a borrow of their parent, so the back-reference never
/// outlives the race that owns the segment.
#[derive(Debug, Clone, Copy)]
pub enum Performance<'a> {
    Main(&'a MainPerf),
    Sub {
        parent: &'a MainPerf,
        sub: &'a SubPerf,
    },
}

impl<'a> Performance<'a> {
    pub fn kind(&self) -> PerfKind {
        match *self {
            Performance::Main(_) => PerfKind::Main,
            Performance::Sub { .. } => PerfKind::Sub,
        }
    }

    pub fn time(&self) -> RaceTime {
        match *self {
            Performance::Main(main) => main.time,
            Performance::Sub { sub, .. } => sub.time,
        }
    }

    pub fn distance(&self) -> f64 {
        match *self {
            Performance::Main(main) => main.distance,
            Performance::Sub { sub, .. } => sub.distance,
        }
    }

    pub fn date(&self) -> NaiveDateTime {
        match *self {
            Performance::Main(main) => main.date,
            Performance::Sub { sub, .. } => sub.date,
        }
    }

    pub fn info(&self) -> &'a RaceInfo {
        match *self {
            Performance::Main(main) => &main.info,
            Performance::Sub { sub, .. } => &sub.info,
        }
    }

    pub fn score(&self) -> Option<u32> {
        match *self {
            Performance::Main(main) => main.score,
            Performance::Sub { sub, .. } => sub.score,
        }
    }

    /// The race a sub-segment was cut from; `None` for whole races.
    pub fn parent(&self) -> Option<&'a MainPerf> {
        match *self {
            Performance::Main(_) => None,
            Performance::Sub { parent, .. } => Some(parent),
        }
    }

    pub fn as_main(&self) -> Option<&'a MainPerf> {
        match *self {
            Performance::Main(main) => Some(main),
            Performance::Sub { .. } => None,
        }
    }

    pub fn as_sub(&self) -> Option<&'a SubPerf> {
        match *self {
            Performance::Main(_) => None,
            Performance::Sub { sub, .. } => Some(sub),
        }
    }

    pub fn pace(&self) -> Result<Pace, TimeError> {
        Pace::from_time_distance(&self.time(), self.distance())
    }

    /// Average speed in km/h.
    pub fn speed_kmh(&self) -> f64 {
        self.distance() / (self.time().total_seconds() / 3600.0)
    }

    pub fn event_class(&self) -> Option<EventClass> {
        EventClass::from_distance(self.distance())
    }
}

impl fmt::Display for Performance<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Performance::Main(main) => fmt::Display::fmt(main, f),
            Performance::Sub { sub, .. } => write!(
                f,
                "{} for {}km ({} split) on {}",
                sub.time,
                sub.distance,
                sub.key,
                format_race_date(&sub.date)
            ),
        }
    }
}

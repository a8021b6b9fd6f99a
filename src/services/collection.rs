//! The performance collection.
//!
//! Owns every race result and keeps a flattened, order-preserving view of
//! all records: each race followed by the sub-segments it carried when it
//! was added. Personal bests and scoring run over that flattened view, so a
//! fast 10 km inside a half marathon competes with whole 10 km races.

use chrono::NaiveDateTime;

use super::performance::{MainPerf, NewPerformance, Performance, PerfError, SplitKey};
use super::scoring::{EventClass, Gender, ScoringTable};
use super::time::RaceTime;
use crate::helpers::snap_km;
use crate::store::models::PerfRecord;

/// Handle to a race stored in a [`PerfCollection`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PerfId(usize);

impl PerfId {
    pub fn index(&self) -> usize {
        self.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Entry {
    Main(usize),
    Sub(usize, SplitKey),
}

/// Fastest record found for one distance.
#[derive(Debug, Clone, Copy)]
pub struct PersonalBest<'a> {
    pub distance: f64,
    pub performance: Performance<'a>,
}

/// Why the scorer left a record untouched.
#[derive(Debug, Clone, PartialEq)]
pub enum SkipReason {
    /// The distance is not a standard event.
    NoEventClass,
    /// The table has no formula for this gender and event.
    MissingCoefficients(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct SkippedScore {
    /// Position in the flattened record sequence.
    pub position: usize,
    pub distance: f64,
    pub reason: SkipReason,
}

/// Outcome of a scoring pass.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ScoringReport {
    pub scored: usize,
    pub skipped: Vec<SkippedScore>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SkippedRecord {
    /// Position in the imported array.
    pub index: usize,
    pub reason: String,
}

/// Outcome of a bulk import.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ImportReport {
    pub loaded: usize,
    pub skipped: Vec<SkippedRecord>,
}

/// One row of the tabular view (whole races only).
#[derive(Debug, Clone, PartialEq)]
pub struct TableRow {
    pub name: Option<String>,
    pub date: NaiveDateTime,
    pub distance: f64,
    pub time: RaceTime,
    pub location: Option<String>,
    pub score: Option<u32>,
}

/// Row filter mirroring the location / distance selectors of the UI.
#[derive(Debug, Clone, Default)]
pub struct TableFilter {
    pub location: Option<String>,
    pub distance: Option<f64>,
}

impl TableFilter {
    pub fn matches(&self, row: &TableRow) -> bool {
        let location_ok = match &self.location {
            Some(location) => row.location.as_deref() == Some(location.as_str()),
            None => true,
        };
        let distance_ok = match self.distance {
            Some(distance) => row.distance == snap_km(distance),
            None => true,
        };
        location_ok && distance_ok
    }
}

/// Distinct values available to the table filters.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FilterOptions {
    pub locations: Vec<String>,
    pub distances: Vec<f64>,
}

/// All of an athlete's records.
#[derive(Debug, Clone, Default)]
pub struct PerfCollection {
    mains: Vec<MainPerf>,
    entries: Vec<Entry>,
    gender: Option<Gender>,
}

impl PerfCollection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_gender(gender: Gender) -> Self {
        Self {
            gender: Some(gender),
            ..Self::default()
        }
    }

    pub fn gender(&self) -> Option<Gender> {
        self.gender
    }

    pub fn set_gender(&mut self, gender: Option<Gender>) {
        self.gender = gender;
    }

    /// Number of records in the flattened view (races and sub-segments).
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of whole races.
    pub fn main_count(&self) -> usize {
        self.mains.len()
    }

    /// Add a race and the sub-segments it currently carries.
    ///
    /// Splits must be added before the race joins the collection.
    pub fn add(&mut self, perf: MainPerf) -> PerfId {
        let index = self.mains.len();
        self.entries.push(Entry::Main(index));
        self.entries
            .extend(perf.sub_perfs().map(|sub| Entry::Sub(index, sub.key())));
        tracing::debug!(
            "Added {} with {} sub-segments",
            perf,
            perf.sub_perf_count()
        );
        self.mains.push(perf);
        PerfId(index)
    }

    /// Validate and add a new race result.
    pub fn add_main_record(&mut self, params: NewPerformance) -> Result<PerfId, PerfError> {
        let perf = MainPerf::new(params)?;
        Ok(self.add(perf))
    }

    pub fn get(&self, id: PerfId) -> Option<&MainPerf> {
        self.mains.get(id.0)
    }

    /// Whole races in insertion order.
    pub fn mains(&self) -> impl Iterator<Item = &MainPerf> + '_ {
        self.mains.iter()
    }

    /// Every record in the flattened view, in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = Performance<'_>> + '_ {
        self.entries.iter().filter_map(|entry| self.view(entry))
    }

    fn view(&self, entry: &Entry) -> Option<Performance<'_>> {
        match entry {
            Entry::Main(index) => self.mains.get(*index).map(Performance::Main),
            Entry::Sub(index, key) => {
                let parent = self.mains.get(*index)?;
                let sub = parent.sub_perf(key)?;
                Some(Performance::Sub { parent, sub })
            }
        }
    }

    /// Fastest record over exactly `distance` km; the first one wins ties.
    pub fn personal_best(&self, distance: f64) -> Option<Performance<'_>> {
        let distance = snap_km(distance);
        self.iter()
            .filter(|perf| perf.distance() == distance)
            .min_by(|a, b| a.time().cmp_total(&b.time()))
    }

    /// Personal best for every distance present, by ascending distance.
    pub fn all_personal_bests(&self) -> Vec<PersonalBest<'_>> {
        let mut distances: Vec<f64> = self.iter().map(|perf| perf.distance()).collect();
        distances.sort_by(f64::total_cmp);
        distances.dedup();

        distances
            .into_iter()
            .filter_map(|distance| {
                self.personal_best(distance)
                    .map(|performance| PersonalBest {
                        distance,
                        performance,
                    })
            })
            .collect()
    }

    /// Score every record for the collection's gender.
    ///
    /// Returns `None` without touching any record when the gender is unset.
    /// Records whose distance is not a standard event, or whose event is
    /// missing from `table`, are skipped and listed in the report.
    pub fn compute_scores(&mut self, table: &ScoringTable) -> Option<ScoringReport> {
        let Some(gender) = self.gender else {
            tracing::warn!("Cannot compute scores: athlete gender is not set");
            return None;
        };

        let mut report = ScoringReport::default();
        for position in 0..self.entries.len() {
            let entry = self.entries[position];
            let Some((distance, time)) = self
                .view(&entry)
                .map(|perf| (perf.distance(), perf.time()))
            else {
                continue;
            };

            let Some(class) = EventClass::from_distance(distance) else {
                tracing::debug!("No event class for {}km, record {} not scored", distance, position);
                report.skipped.push(SkippedScore {
                    position,
                    distance,
                    reason: SkipReason::NoEventClass,
                });
                continue;
            };

            match table.score(gender, class.label(), &time) {
                Ok(score) => {
                    self.set_entry_score(entry, Some(score));
                    report.scored += 1;
                }
                Err(e) => {
                    tracing::warn!("Record {} not scored: {}", position, e);
                    report.skipped.push(SkippedScore {
                        position,
                        distance,
                        reason: SkipReason::MissingCoefficients(e.to_string()),
                    });
                }
            }
        }

        tracing::info!(
            "Computed {} {} scores ({} records skipped)",
            report.scored,
            gender,
            report.skipped.len()
        );
        Some(report)
    }

    fn set_entry_score(&mut self, entry: Entry, score: Option<u32>) {
        match entry {
            Entry::Main(index) => {
                if let Some(main) = self.mains.get_mut(index) {
                    main.set_score(score);
                }
            }
            Entry::Sub(index, key) => {
                if let Some(sub) = self
                    .mains
                    .get_mut(index)
                    .and_then(|main| main.sub_perf_mut(&key))
                {
                    sub.set_score(score);
                }
            }
        }
    }

    /// Export whole races with their nested sub-segments.
    pub fn serialize(&self) -> Vec<PerfRecord> {
        self.mains.iter().map(PerfRecord::from).collect()
    }

    /// Load exported records into an empty collection.
    ///
    /// Records that fail validation are skipped and listed in the report.
    pub fn deserialize(&mut self, records: Vec<PerfRecord>) -> Result<ImportReport, PerfError> {
        if !self.is_empty() {
            return Err(PerfError::AlreadyPopulated(self.len()));
        }

        let mut report = ImportReport::default();
        for (index, record) in records.into_iter().enumerate() {
            match record.into_main_perf() {
                Ok(perf) => {
                    self.add(perf);
                    report.loaded += 1;
                }
                Err(e) => {
                    tracing::warn!("Skipping persisted record {}: {}", index, e);
                    report.skipped.push(SkippedRecord {
                        index,
                        reason: e.to_string(),
                    });
                }
            }
        }

        tracing::info!(
            "Loaded {} races ({} records, {} skipped)",
            report.loaded,
            self.len(),
            report.skipped.len()
        );
        Ok(report)
    }

    /// Whole races as table rows, oldest first.
    pub fn table(&self) -> Vec<TableRow> {
        let mut rows: Vec<TableRow> = self
            .mains
            .iter()
            .map(|perf| TableRow {
                name: perf.info().name_event.clone(),
                date: perf.date(),
                distance: perf.distance(),
                time: perf.time(),
                location: perf.info().location.clone(),
                score: perf.score(),
            })
            .collect();
        rows.sort_by_key(|row| row.date);
        rows
    }

    pub fn filtered_table(&self, filter: &TableFilter) -> Vec<TableRow> {
        self.table()
            .into_iter()
            .filter(|row| filter.matches(row))
            .collect()
    }

    /// Sorted distinct locations and distances of the whole races.
    pub fn filter_options(&self) -> FilterOptions {
        let mut locations: Vec<String> = self
            .mains
            .iter()
            .filter_map(|perf| perf.info().location.clone())
            .collect();
        locations.sort();
        locations.dedup();

        let mut distances: Vec<f64> = self.mains.iter().map(MainPerf::distance).collect();
        distances.sort_by(f64::total_cmp);
        distances.dedup();

        FilterOptions {
            locations,
            distances,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::helpers::parse_race_date;
    use crate::services::performance::{PerfKind, RaceInfo};

    const FIXTURE: &str = include_str!("../../data/fixtures/scoring_coefficients.json");

    fn t(h: u32, m: u32, s: f64) -> RaceTime {
        RaceTime::new(h, m, s).unwrap()
    }

    fn date(s: &str) -> NaiveDateTime {
        parse_race_date(s).unwrap()
    }

    fn race(time: RaceTime, distance: f64, day: &str, name: &str) -> MainPerf {
        MainPerf::new(NewPerformance {
            time,
            distance,
            date: date(day),
            info: RaceInfo {
                name_event: Some(name.to_string()),
                ..RaceInfo::default()
            },
            rank: None,
            num_participants: None,
        })
        .unwrap()
    }

    fn splits_21k() -> Vec<RaceTime> {
        vec![t(0, 22, 0.0), t(0, 20, 30.0), t(0, 19, 30.0), t(0, 18, 0.0)]
    }

    fn split_half_marathon() -> MainPerf {
        let mut perf = race(t(1, 25, 0.0), 21.1, "2023-01-28", "HM with splits");
        perf.add_splits(&splits_21k(), 5.0).unwrap();
        perf
    }

    /// 6 km, 10 km, half marathon and a faster 10 km.
    fn collection() -> PerfCollection {
        let mut perfs = PerfCollection::new();
        perfs.add(race(t(0, 47, 28.0), 6.0, "2024-12-25", "backyard lap"));
        perfs.add(race(t(1, 45, 0.0), 10.0, "2021-10-10", "10km in Paris"));
        perfs.add(race(t(1, 25, 0.0), 21.1, "2023-01-28", "HM in NY"));
        perfs.add(race(t(0, 40, 0.0), 10.0, "2022-05-01", "10km pb"));
        perfs
    }

    fn table() -> ScoringTable {
        ScoringTable::from_json_str(FIXTURE).unwrap()
    }

    #[test]
    fn test_len_and_add() {
        let mut perfs = collection();
        assert_eq!(perfs.len(), 4);
        let id = perfs.add(race(t(0, 30, 0.0), 5.0, "2024-06-01", "5km in the park"));
        assert_eq!(perfs.len(), 5);
        assert_eq!(id.index(), 4);
        assert_eq!(perfs.get(id).unwrap().distance(), 5.0);
        assert_eq!(perfs.iter().last().unwrap().distance(), 5.0);
    }

    #[test]
    fn test_add_flattens_sub_perfs() {
        let mut perfs = collection();
        perfs.add(split_half_marathon());
        assert_eq!(perfs.main_count(), 5);
        assert_eq!(perfs.len(), 4 + 1 + 10);
        let kinds: Vec<PerfKind> = perfs.iter().skip(4).map(|p| p.kind()).collect();
        assert_eq!(kinds[0], PerfKind::Main);
        assert!(kinds[1..].iter().all(|k| *k == PerfKind::Sub));
    }

    #[test]
    fn test_add_main_record_validates() {
        let mut perfs = PerfCollection::new();
        let result = perfs.add_main_record(NewPerformance {
            time: RaceTime::ZERO,
            distance: 10.0,
            date: date("2024-01-01"),
            info: RaceInfo::default(),
            rank: None,
            num_participants: None,
        });
        assert!(matches!(result, Err(PerfError::Validation(_))));
        assert!(perfs.is_empty());
    }

    #[test]
    fn test_personal_best_single_race() {
        let perfs = collection();
        let best = perfs.personal_best(21.1).unwrap();
        assert_eq!(best.time(), t(1, 25, 0.0));
    }

    #[test]
    fn test_personal_best_multiple_races() {
        let perfs = collection();
        let best = perfs.personal_best(10.0).unwrap();
        assert_eq!(best.time(), t(0, 40, 0.0));
        assert_eq!(best.info().name_event.as_deref(), Some("10km pb"));
    }

    #[test]
    fn test_personal_best_missing_distance() {
        assert!(collection().personal_best(5.0).is_none());
    }

    #[test]
    fn test_personal_best_tie_keeps_first() {
        let mut perfs = PerfCollection::new();
        perfs.add(race(t(0, 20, 0.0), 5.0, "2024-01-01", "first"));
        perfs.add(race(t(0, 20, 0.0), 5.0, "2024-02-01", "second"));
        let best = perfs.personal_best(5.0).unwrap();
        assert_eq!(best.info().name_event.as_deref(), Some("first"));
    }

    #[test]
    fn test_all_personal_bests() {
        let perfs = collection();
        let bests = perfs.all_personal_bests();
        let summary: Vec<(f64, RaceTime)> = bests
            .iter()
            .map(|pb| (pb.distance, pb.performance.time()))
            .collect();
        assert_eq!(
            summary,
            vec![
                (6.0, t(0, 47, 28.0)),
                (10.0, t(0, 40, 0.0)),
                (21.1, t(1, 25, 0.0)),
            ]
        );
    }

    #[test]
    fn test_personal_best_found_inside_split_race() {
        let mut perfs = collection();
        let mut ten = race(t(1, 45, 0.0), 10.0, "2021-10-10", "10km with splits");
        ten.add_splits(&[t(0, 21, 0.0), t(0, 19, 0.0)], 5.0).unwrap();
        perfs.add(ten);
        perfs.add(split_half_marathon());

        let best_5 = perfs.personal_best(5.0).unwrap();
        assert_eq!(best_5.kind(), PerfKind::Sub);
        assert_eq!(best_5.parent().unwrap().distance(), 21.1);
        let sub = best_5.as_sub().unwrap();
        assert_eq!((sub.begin_distance(), sub.end_distance()), (15.0, 20.0));

        let best_10 = perfs.personal_best(10.0).unwrap();
        assert_eq!(best_10.kind(), PerfKind::Sub);
        let sub = best_10.as_sub().unwrap();
        assert_eq!((sub.begin_distance(), sub.end_distance()), (10.0, 20.0));
        assert_eq!(best_10.time(), t(0, 37, 30.0));
    }

    #[test]
    fn test_split_beats_slow_whole_race() {
        let mut perfs = PerfCollection::new();
        perfs.add(race(t(1, 45, 0.0), 10.0, "2021-10-10", "slow 10k"));
        let mut hm = race(t(1, 22, 0.0), 21.1, "2023-03-05", "even HM");
        hm.add_splits(
            &[t(0, 20, 0.0), t(0, 19, 45.0), t(0, 19, 45.0), t(0, 20, 0.0)],
            5.0,
        )
        .unwrap();
        perfs.add(hm);

        let best = perfs.personal_best(10.0).unwrap();
        assert_eq!(best.time(), t(0, 39, 30.0));
        assert_eq!(best.kind(), PerfKind::Sub);
    }

    #[test]
    fn test_compute_scores_requires_gender() {
        let mut perfs = collection();
        assert!(perfs.compute_scores(&table()).is_none());
        assert!(perfs.iter().all(|p| p.score().is_none()));
    }

    #[test]
    fn test_compute_scores_female() {
        let mut perfs = collection();
        perfs.set_gender(Some(Gender::Female));
        let report = perfs.compute_scores(&table()).unwrap();
        assert_eq!(report.scored, 3);
        assert_eq!(
            report.skipped,
            vec![SkippedScore {
                position: 0,
                distance: 6.0,
                reason: SkipReason::NoEventClass,
            }]
        );

        assert_eq!(perfs.personal_best(10.0).unwrap().score(), Some(755));
        assert_eq!(perfs.personal_best(21.1).unwrap().score(), Some(843));
        assert_eq!(perfs.personal_best(6.0).unwrap().score(), None);
    }

    #[test]
    fn test_compute_scores_on_split_race() {
        let mut perfs = collection();
        perfs.add(split_half_marathon());
        perfs.set_gender(Some(Gender::Male));
        let report = perfs.compute_scores(&table()).unwrap();

        // 15 km and 20 km windows have no male formula in the fixture.
        assert_eq!(report.scored, 11);
        assert_eq!(report.skipped.len(), 4);
        assert_eq!(
            report
                .skipped
                .iter()
                .filter(|s| matches!(s.reason, SkipReason::MissingCoefficients(_)))
                .count(),
            3
        );

        let pb_10k = perfs.personal_best(10.0).unwrap();
        assert_eq!(pb_10k.kind(), PerfKind::Sub);
        assert_eq!(pb_10k.score(), Some(895));
    }

    #[test]
    fn test_serialize_exports_main_records_only() {
        let mut perfs = collection();
        perfs.add(split_half_marathon());
        let records = perfs.serialize();
        assert_eq!(records.len(), 5);
        assert_eq!(records[4].sub_perfs.len(), 10);
        assert!(records[..4].iter().all(|r| r.sub_perfs.is_empty()));
    }

    #[test]
    fn test_serialize_deserialize_roundtrip() {
        let mut perfs = collection();
        perfs.add(split_half_marathon());
        perfs.set_gender(Some(Gender::Male));
        perfs.compute_scores(&table()).unwrap();

        let mut restored = PerfCollection::new();
        let report = restored.deserialize(perfs.serialize()).unwrap();
        assert_eq!(report.loaded, 5);
        assert!(report.skipped.is_empty());
        assert_eq!(restored.len(), perfs.len());

        for (original, copy) in perfs.mains().zip(restored.mains()) {
            assert_eq!(copy, original);
        }
        let best = restored.personal_best(10.0).unwrap();
        assert_eq!(best.score(), Some(895));
        assert_eq!(best.parent().unwrap().distance(), 21.1);
    }

    #[test]
    fn test_deserialize_into_populated_collection_fails() {
        let mut perfs = collection();
        let records = perfs.serialize();
        let result = perfs.deserialize(records);
        assert_eq!(result, Err(PerfError::AlreadyPopulated(4)));
        assert_eq!(perfs.len(), 4);
    }

    #[test]
    fn test_deserialize_skips_bad_records() {
        let mut records = collection().serialize();
        records[1].time = "fast".to_string();
        records[2].date = "yesterday".to_string();

        let mut perfs = PerfCollection::new();
        let report = perfs.deserialize(records).unwrap();
        assert_eq!(report.loaded, 2);
        let indices: Vec<usize> = report.skipped.iter().map(|s| s.index).collect();
        assert_eq!(indices, vec![1, 2]);
        assert_eq!(perfs.len(), 2);
    }

    #[test]
    fn test_table_sorted_by_date_main_only() {
        let mut perfs = collection();
        perfs.add(split_half_marathon());
        let rows = perfs.table();
        assert_eq!(rows.len(), 5);
        let dates: Vec<String> = rows
            .iter()
            .map(|r| r.date.format("%Y-%m-%d").to_string())
            .collect();
        assert_eq!(
            dates,
            vec!["2021-10-10", "2022-05-01", "2023-01-28", "2023-01-28", "2024-12-25"]
        );
        assert_eq!(rows[0].name.as_deref(), Some("10km in Paris"));
    }

    #[test]
    fn test_filtered_table_and_options() {
        let mut perfs = PerfCollection::new();
        for (distance, location, day) in [
            (10.0, "Paris", "2021-10-10"),
            (21.1, "Paris", "2022-04-03"),
            (10.0, "Lyon", "2023-02-12"),
            (5.0, "Montpellier", "2023-06-18"),
        ] {
            perfs
                .add_main_record(NewPerformance {
                    time: t(0, 45, 0.0),
                    distance,
                    date: date(day),
                    info: RaceInfo {
                        location: Some(location.to_string()),
                        ..RaceInfo::default()
                    },
                    rank: None,
                    num_participants: None,
                })
                .unwrap();
        }

        let options = perfs.filter_options();
        assert_eq!(options.locations, vec!["Lyon", "Montpellier", "Paris"]);
        assert_eq!(options.distances, vec![5.0, 10.0, 21.1]);

        let paris = perfs.filtered_table(&TableFilter {
            location: Some("Paris".to_string()),
            distance: None,
        });
        assert_eq!(paris.len(), 2);

        let paris_10k = perfs.filtered_table(&TableFilter {
            location: Some("Paris".to_string()),
            distance: Some(10.0),
        });
        assert_eq!(paris_10k.len(), 1);
        assert_eq!(paris_10k[0].distance, 10.0);

        assert_eq!(perfs.filtered_table(&TableFilter::default()).len(), 4);
    }
}

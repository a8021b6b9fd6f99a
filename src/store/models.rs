//! Persisted record shapes.
//!
//! One JSON object per race. Scores, ranks and field sizes are stored as
//! strings; empty optionals are omitted.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::helpers::{format_race_date, parse_race_date, snap_km};
use crate::services::performance::{
    MainPerf, NewPerformance, PerfError, RaceInfo, SplitKey, SubPerf,
};
use crate::services::time::RaceTime;

/// A race result as exported and persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct PerfRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name_event: Option<String>,
    /// Race date, "YYYY-MM-DDTHH:MM:SS" (a bare date is accepted on input)
    pub date: String,
    /// Distance in kilometres
    pub distance: f64,
    /// Finishing time, e.g. "1h25min0s"
    pub time: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url_results: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url_strava: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iaaf_score: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rank: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub num_participants: Option<String>,
    /// Segments derived from elementary splits
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub sub_perfs: Vec<SubPerfRecord>,
}

/// A sub-segment nested in its race record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct SubPerfRecord {
    pub time: String,
    pub distance: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iaaf_score: Option<String>,
    pub begin_distance: f64,
    pub end_distance: f64,
}

impl From<&SubPerf> for SubPerfRecord {
    fn from(sub: &SubPerf) -> Self {
        Self {
            time: sub.time().to_string(),
            distance: sub.distance(),
            iaaf_score: sub.score().map(|s| s.to_string()),
            begin_distance: sub.begin_distance(),
            end_distance: sub.end_distance(),
        }
    }
}

impl From<&MainPerf> for PerfRecord {
    fn from(perf: &MainPerf) -> Self {
        let info = perf.info();
        Self {
            name_event: info.name_event.clone(),
            date: format_race_date(&perf.date()),
            distance: perf.distance(),
            time: perf.time().to_string(),
            location: info.location.clone(),
            url_results: info.url_results.clone(),
            url_strava: info.url_strava.clone(),
            iaaf_score: perf.score().map(|s| s.to_string()),
            rank: perf.rank().map(|r| r.to_string()),
            num_participants: perf.num_participants().map(|n| n.to_string()),
            sub_perfs: perf.sub_perfs().map(SubPerfRecord::from).collect(),
        }
    }
}

fn parse_count(field: &str, value: Option<String>) -> Result<Option<u32>, PerfError> {
    value
        .map(|v| {
            v.trim()
                .parse::<u32>()
                .map_err(|_| PerfError::Validation(format!("{} '{}' is not a whole number", field, v)))
        })
        .transpose()
}

impl PerfRecord {
    /// Rebuild the race, re-validating it and every nested sub-segment.
    pub fn into_main_perf(self) -> Result<MainPerf, PerfError> {
        let time: RaceTime = self.time.parse()?;
        let date = parse_race_date(&self.date).map_err(PerfError::Validation)?;

        let mut perf = MainPerf::new(NewPerformance {
            time,
            distance: self.distance,
            date,
            info: RaceInfo {
                name_event: self.name_event,
                location: self.location,
                url_results: self.url_results,
                url_strava: self.url_strava,
            },
            rank: parse_count("rank", self.rank)?,
            num_participants: parse_count("num_participants", self.num_participants)?,
        })?;
        perf.set_score(parse_count("iaaf_score", self.iaaf_score)?);

        for sub in self.sub_perfs {
            let key = SplitKey::new(sub.begin_distance, sub.end_distance);
            if snap_km(sub.distance) != key.length() {
                return Err(PerfError::InvariantViolation(format!(
                    "sub-segment {} has distance {}km, expected {}km",
                    key,
                    sub.distance,
                    key.length()
                )));
            }
            let time: RaceTime = sub.time.parse()?;
            perf.restore_sub_perf(key, time, parse_count("iaaf_score", sub.iaaf_score)?)?;
        }

        Ok(perf)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::time::TimeError;

    fn t(h: u32, m: u32, s: f64) -> RaceTime {
        RaceTime::new(h, m, s).unwrap()
    }

    fn split_ten_k() -> MainPerf {
        let mut perf = MainPerf::new(NewPerformance {
            time: t(0, 40, 0.0),
            distance: 10.0,
            date: parse_race_date("2022-05-01T09:30:00").unwrap(),
            info: RaceInfo {
                name_event: Some("Course du Lez".to_string()),
                location: Some("Montpellier".to_string()),
                ..RaceInfo::default()
            },
            rank: Some(12),
            num_participants: Some(340),
        })
        .unwrap();
        perf.add_splits(&[t(0, 20, 30.0), t(0, 19, 30.0)], 5.0).unwrap();
        perf
    }

    #[test]
    fn test_record_json_shape() {
        let record = PerfRecord::from(&split_ten_k());
        let json = serde_json::to_value(&record).unwrap();

        assert_eq!(json["date"], "2022-05-01T09:30:00");
        assert_eq!(json["time"], "40min0s");
        assert_eq!(json["distance"], 10.0);
        assert_eq!(json["rank"], "12");
        assert_eq!(json["num_participants"], "340");
        assert!(json.get("iaaf_score").is_none());
        assert!(json.get("url_strava").is_none());

        let subs = json["sub_perfs"].as_array().unwrap();
        assert_eq!(subs.len(), 2);
        assert_eq!(subs[1]["begin_distance"], 5.0);
        assert_eq!(subs[1]["end_distance"], 10.0);
        assert_eq!(subs[1]["time"], "19min30s");
    }

    #[test]
    fn test_record_without_splits_omits_sub_perfs() {
        let perf = MainPerf::from_result(
            t(0, 20, 0.0),
            5.0,
            parse_race_date("2024-06-01").unwrap(),
        )
        .unwrap();
        let json = serde_json::to_value(PerfRecord::from(&perf)).unwrap();
        assert!(json.get("sub_perfs").is_none());
    }

    #[test]
    fn test_minimal_record_parses() {
        let record: PerfRecord = serde_json::from_str(
            r#"{"date": "2021-10-10", "distance": 10, "time": "1h45min0s"}"#,
        )
        .unwrap();
        let perf = record.into_main_perf().unwrap();
        assert_eq!(perf.time(), t(1, 45, 0.0));
        assert_eq!(perf.distance(), 10.0);
        assert_eq!(perf.sub_perf_count(), 0);
    }

    #[test]
    fn test_roundtrip_preserves_race() {
        let perf = split_ten_k();
        let restored = PerfRecord::from(&perf).into_main_perf().unwrap();
        assert_eq!(restored, perf);
    }

    #[test]
    fn test_roundtrip_keeps_centiseconds() {
        let perf = MainPerf::from_result(
            "20min0.13s".parse().unwrap(),
            5.0,
            parse_race_date("2024-06-01").unwrap(),
        )
        .unwrap();
        let record = PerfRecord::from(&perf);
        assert_eq!(record.time, "20min0.13s");
        let restored = record.into_main_perf().unwrap();
        assert_eq!(restored.time(), perf.time());
        assert_eq!(restored.time().total_seconds(), 1200.13);
    }

    #[test]
    fn test_sub_centisecond_time_rejected() {
        let record: PerfRecord = serde_json::from_str(
            r#"{"date": "2024-06-01", "distance": 5, "time": "20min0.125s"}"#,
        )
        .unwrap();
        assert!(matches!(
            record.into_main_perf(),
            Err(PerfError::Time(TimeError::Validation(_)))
        ));
    }

    #[test]
    fn test_bad_rank_rejected() {
        let mut record = PerfRecord::from(&split_ten_k());
        record.rank = Some("first".to_string());
        assert!(matches!(record.into_main_perf(), Err(PerfError::Validation(_))));
    }

    #[test]
    fn test_sub_longer_than_race_rejected() {
        let mut record = PerfRecord::from(&split_ten_k());
        record.sub_perfs[1].end_distance = 12.0;
        record.sub_perfs[1].distance = 7.0;
        assert!(matches!(
            record.into_main_perf(),
            Err(PerfError::InvariantViolation(_))
        ));
    }

    #[test]
    fn test_sub_distance_mismatch_rejected() {
        let mut record = PerfRecord::from(&split_ten_k());
        record.sub_perfs[0].distance = 4.0;
        assert!(matches!(
            record.into_main_perf(),
            Err(PerfError::InvariantViolation(_))
        ));
    }
}

//! Performance HTTP endpoints.
//!
//! - GET  /api/v1/performances?location=&distance=
//! - POST /api/v1/performances
//! - GET  /api/v1/performances/export
//! - GET  /api/v1/performances/filters

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use perf_tracker::helpers::{format_race_date, parse_race_date};
use perf_tracker::services::collection::{TableFilter, TableRow};
use perf_tracker::services::performance::{MainPerf, NewPerformance, RaceInfo};
use perf_tracker::services::time::{Pace, RaceTime};
use perf_tracker::store::models::PerfRecord;

use super::SharedState;
use crate::errors::{AppError, ErrorResponse};

// ---------------------------------------------------------------------------
// Query / request types
// ---------------------------------------------------------------------------

#[derive(Debug, Default, Deserialize, IntoParams)]
pub struct PerformanceQuery {
    /// Only races held at this location
    pub location: Option<String>,
    /// Only races over this distance in km
    pub distance: Option<f64>,
}

/// Elementary splits recorded during a race.
#[derive(Debug, Deserialize, ToSchema)]
pub struct SplitsInput {
    /// Length of every split in km (e.g. 5.0, or 1.609 for miles)
    pub segment_distance: f64,
    /// Split times in race order, e.g. ["22min0s", "20min30s"]
    pub times: Vec<String>,
}

/// New race result.
#[derive(Debug, Deserialize, ToSchema)]
pub struct CreatePerformanceRequest {
    /// Finishing time, e.g. "1h25min0s"
    pub time: String,
    /// Distance in km
    pub distance: f64,
    /// Race date ("YYYY-MM-DD" or "YYYY-MM-DDTHH:MM:SS"); defaults to now
    pub date: Option<String>,
    pub name_event: Option<String>,
    pub location: Option<String>,
    pub url_results: Option<String>,
    pub url_strava: Option<String>,
    /// Finishing position (1-based)
    pub rank: Option<u32>,
    pub num_participants: Option<u32>,
    pub splits: Option<SplitsInput>,
}

// ---------------------------------------------------------------------------
// Response types
// ---------------------------------------------------------------------------

/// One race in the performance table.
#[derive(Debug, Serialize, ToSchema)]
pub struct PerformanceRow {
    pub name_event: Option<String>,
    /// Race date, "YYYY-MM-DDTHH:MM:SS"
    pub date: String,
    /// Distance in km
    pub distance: f64,
    /// Finishing time, e.g. "40min0s"
    pub time: String,
    /// Pace, e.g. "04'00 min/km (=15.00 km/h)"
    pub pace: Option<String>,
    pub location: Option<String>,
    pub iaaf_score: Option<u32>,
}

impl From<TableRow> for PerformanceRow {
    fn from(row: TableRow) -> Self {
        Self {
            pace: Pace::from_time_distance(&row.time, row.distance)
                .ok()
                .map(|p| p.to_string()),
            name_event: row.name,
            date: format_race_date(&row.date),
            distance: row.distance,
            time: row.time.to_string(),
            location: row.location,
            iaaf_score: row.score,
        }
    }
}

impl From<&MainPerf> for PerformanceRow {
    fn from(perf: &MainPerf) -> Self {
        Self {
            name_event: perf.info().name_event.clone(),
            date: format_race_date(&perf.date()),
            distance: perf.distance(),
            time: perf.time().to_string(),
            pace: perf.pace().ok().map(|p| p.to_string()),
            location: perf.info().location.clone(),
            iaaf_score: perf.score(),
        }
    }
}

/// Values available to the table filters.
#[derive(Debug, Serialize, ToSchema)]
pub struct FiltersResponse {
    pub locations: Vec<String>,
    pub distances: Vec<f64>,
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// List races, oldest first, optionally filtered by location and distance.
#[utoipa::path(
    get,
    path = "/api/v1/performances",
    tag = "Performances",
    params(PerformanceQuery),
    responses(
        (status = 200, description = "Races in date order", body = Vec<PerformanceRow>),
    )
)]
pub async fn list_performances(
    State(state): State<SharedState>,
    Query(query): Query<PerformanceQuery>,
) -> Json<Vec<PerformanceRow>> {
    let filter = TableFilter {
        location: query.location,
        distance: query.distance,
    };
    let s = state.read().await;
    let rows = s
        .collection
        .filtered_table(&filter)
        .into_iter()
        .map(PerformanceRow::from)
        .collect();
    Json(rows)
}

/// Record a new race, optionally with its elementary splits.
///
/// Splits are expanded into sub-segments before the race joins the
/// collection. Scores are recomputed when an athlete gender is configured,
/// and the collection is persisted.
#[utoipa::path(
    post,
    path = "/api/v1/performances",
    tag = "Performances",
    request_body = CreatePerformanceRequest,
    responses(
        (status = 201, description = "Race recorded", body = PerformanceRow),
        (status = 400, description = "Invalid race or splits", body = ErrorResponse),
        (status = 409, description = "Splits inconsistent with the race", body = ErrorResponse),
    )
)]
pub async fn create_performance(
    State(state): State<SharedState>,
    Json(req): Json<CreatePerformanceRequest>,
) -> Result<(StatusCode, Json<PerformanceRow>), AppError> {
    let time: RaceTime = req.time.parse()?;
    let date = match req.date.as_deref() {
        Some(date) => parse_race_date(date).map_err(AppError::BadRequest)?,
        None => chrono::Local::now().naive_local(),
    };

    let mut perf = MainPerf::new(NewPerformance {
        time,
        distance: req.distance,
        date,
        info: RaceInfo {
            name_event: req.name_event,
            location: req.location,
            url_results: req.url_results,
            url_strava: req.url_strava,
        },
        rank: req.rank,
        num_participants: req.num_participants,
    })?;

    if let Some(splits) = req.splits {
        let times = splits
            .times
            .iter()
            .map(|t| t.parse::<RaceTime>())
            .collect::<Result<Vec<_>, _>>()?;
        perf.add_splits(&times, splits.segment_distance)?;
    }

    let mut guard = state.write().await;
    let s = &mut *guard;
    let id = s.apply(|collection, scoring| {
        let id = collection.add(perf);
        if collection.gender().is_some() {
            collection.compute_scores(scoring);
        }
        Ok(id)
    })?;

    let created = s
        .collection
        .get(id)
        .map(PerformanceRow::from)
        .ok_or_else(|| AppError::InternalError("Recorded race vanished".to_string()))?;
    tracing::info!(
        "Recorded {}km race on {} ({} records)",
        created.distance,
        created.date,
        s.collection.len()
    );
    Ok((StatusCode::CREATED, Json(created)))
}

/// Export every race with its nested sub-segments, in insertion order.
#[utoipa::path(
    get,
    path = "/api/v1/performances/export",
    tag = "Performances",
    responses(
        (status = 200, description = "Persisted record form of the collection", body = Vec<PerfRecord>),
    )
)]
pub async fn export_performances(State(state): State<SharedState>) -> Json<Vec<PerfRecord>> {
    let s = state.read().await;
    Json(s.collection.serialize())
}

/// Distinct locations and distances of recorded races.
#[utoipa::path(
    get,
    path = "/api/v1/performances/filters",
    tag = "Performances",
    responses(
        (status = 200, description = "Filter values", body = FiltersResponse),
    )
)]
pub async fn get_filters(State(state): State<SharedState>) -> Json<FiltersResponse> {
    let options = state.read().await.collection.filter_options();
    Json(FiltersResponse {
        locations: options.locations,
        distances: options.distances,
    })
}

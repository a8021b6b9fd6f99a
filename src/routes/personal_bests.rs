//! Personal best endpoints.
//!
//! Bests are taken over every record, so a segment inside a longer race can
//! hold the best time for its distance.

use axum::extract::{Path, State};
use axum::Json;
use serde::Serialize;
use utoipa::ToSchema;

use perf_tracker::helpers::format_race_date;
use perf_tracker::services::performance::{PerfKind, Performance};

use super::SharedState;
use crate::errors::{AppError, ErrorResponse};

/// Fastest record over one distance.
#[derive(Debug, Serialize, ToSchema)]
pub struct PersonalBestResponse {
    /// Distance in km
    pub distance: f64,
    /// Best time, e.g. "37min30s"
    pub time: String,
    pub pace: Option<String>,
    /// Date of the race the record comes from
    pub date: String,
    pub name_event: Option<String>,
    pub location: Option<String>,
    pub iaaf_score: Option<u32>,
    /// Segment of a longer race, e.g. "10-20km"; absent for whole races
    pub segment: Option<String>,
    /// Distance of the race the segment was taken from
    pub race_distance: Option<f64>,
}

impl From<Performance<'_>> for PersonalBestResponse {
    fn from(perf: Performance<'_>) -> Self {
        let (segment, race_distance) = match perf.kind() {
            PerfKind::Main => (None, None),
            PerfKind::Sub => (
                perf.as_sub().map(|sub| sub.key().to_string()),
                perf.parent().map(|parent| parent.distance()),
            ),
        };
        Self {
            distance: perf.distance(),
            time: perf.time().to_string(),
            pace: perf.pace().ok().map(|p| p.to_string()),
            date: format_race_date(&perf.date()),
            name_event: perf.info().name_event.clone(),
            location: perf.info().location.clone(),
            iaaf_score: perf.score(),
            segment,
            race_distance,
        }
    }
}

/// Personal best for every distance in the collection, shortest first.
#[utoipa::path(
    get,
    path = "/api/v1/personal-bests",
    tag = "Personal bests",
    responses(
        (status = 200, description = "One best per distance", body = Vec<PersonalBestResponse>),
    )
)]
pub async fn list_personal_bests(
    State(state): State<SharedState>,
) -> Json<Vec<PersonalBestResponse>> {
    let s = state.read().await;
    let bests = s
        .collection
        .all_personal_bests()
        .into_iter()
        .map(|pb| PersonalBestResponse::from(pb.performance))
        .collect();
    Json(bests)
}

/// Personal best over exactly `distance` km.
#[utoipa::path(
    get,
    path = "/api/v1/personal-bests/{distance}",
    tag = "Personal bests",
    params(
        ("distance" = f64, Path, description = "Distance in km, e.g. 10 or 21.1"),
    ),
    responses(
        (status = 200, description = "Fastest record over the distance", body = PersonalBestResponse),
        (status = 404, description = "No record over this distance", body = ErrorResponse),
    )
)]
pub async fn get_personal_best(
    State(state): State<SharedState>,
    Path(distance): Path<f64>,
) -> Result<Json<PersonalBestResponse>, AppError> {
    let s = state.read().await;
    s.collection
        .personal_best(distance)
        .map(|perf| Json(PersonalBestResponse::from(perf)))
        .ok_or_else(|| AppError::NotFound(format!("No performance over {}km", distance)))
}

use axum::extract::State;
use axum::Json;
use serde::Serialize;
use utoipa::ToSchema;

use perf_tracker::services::collection::SkipReason;

use super::SharedState;
use crate::errors::{AppError, ErrorResponse};

/// A record the scorer left untouched.
#[derive(Debug, Serialize, ToSchema)]
pub struct SkippedScoreItem {
    /// Position in the flattened record sequence
    pub position: usize,
    /// Distance in km
    pub distance: f64,
    pub reason: String,
}

/// Result of a scoring pass.
#[derive(Debug, Serialize, ToSchema)]
pub struct ScoreReportResponse {
    /// Gender the scores were computed for
    pub gender: String,
    /// Number of records that received a score
    pub scored: usize,
    pub skipped: Vec<SkippedScoreItem>,
}

/// Recompute IAAF scores for every record and persist them.
#[utoipa::path(
    post,
    path = "/api/v1/scores",
    tag = "Scores",
    responses(
        (status = 200, description = "Scores recomputed", body = ScoreReportResponse),
        (status = 400, description = "Athlete gender not configured", body = ErrorResponse),
    )
)]
pub async fn compute_scores(
    State(state): State<SharedState>,
) -> Result<Json<ScoreReportResponse>, AppError> {
    let mut guard = state.write().await;
    let s = &mut *guard;
    let gender = s.collection.gender().ok_or_else(|| {
        AppError::BadRequest("Athlete gender is not configured (set ATHLETE_GENDER)".to_string())
    })?;
    let report = s.apply(|collection, scoring| {
        collection
            .compute_scores(scoring)
            .ok_or_else(|| AppError::InternalError("Scoring pass did not run".to_string()))
    })?;

    let skipped = report
        .skipped
        .into_iter()
        .map(|skip| SkippedScoreItem {
            position: skip.position,
            distance: skip.distance,
            reason: match skip.reason {
                SkipReason::NoEventClass => "not a standard event distance".to_string(),
                SkipReason::MissingCoefficients(msg) => msg,
            },
        })
        .collect();

    Ok(Json(ScoreReportResponse {
        gender: gender.to_string(),
        scored: report.scored,
        skipped,
    }))
}

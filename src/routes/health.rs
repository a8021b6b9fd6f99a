use axum::extract::State;
use axum::Json;
use serde::Serialize;
use utoipa::ToSchema;

use super::SharedState;

/// Health check response.
#[derive(Debug, Serialize, ToSchema)]
pub struct HealthResponse {
    /// Service status ("ok")
    pub status: String,
    /// API version
    pub version: String,
    /// Number of races in the collection
    pub races: usize,
    /// Number of records including split-derived segments
    pub records: usize,
    /// Whether scores are computed (athlete gender configured)
    pub scoring_enabled: bool,
}

/// Health check endpoint.
///
/// Returns the API status, version and the size of the loaded collection.
#[utoipa::path(
    get,
    path = "/api/v1/health",
    tag = "Health",
    responses(
        (status = 200, description = "Service is healthy", body = HealthResponse),
    )
)]
pub async fn health_check(State(state): State<SharedState>) -> Json<HealthResponse> {
    let s = state.read().await;
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        races: s.collection.main_count(),
        records: s.collection.len(),
        scoring_enabled: s.collection.gender().is_some(),
    })
}

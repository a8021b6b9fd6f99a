use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use utoipa::ToSchema;

use perf_tracker::services::performance::PerfError;
use perf_tracker::services::scoring::ScoringError;
use perf_tracker::services::time::TimeError;
use perf_tracker::store::file::StoreError;

/// Standard error response body.
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorResponse {
    /// Human-readable error message
    pub error: String,
}

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Internal error: {0}")]
    InternalError(String),

    #[error("Storage error: {0}")]
    StoreError(#[from] StoreError),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg.clone()),
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            AppError::Conflict(msg) => (StatusCode::CONFLICT, msg.clone()),
            AppError::InternalError(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg.clone()),
            AppError::StoreError(err) => {
                tracing::error!("Storage error: {:?}", err);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Failed to persist performances".to_string(),
                )
            }
        };

        (status, axum::Json(ErrorResponse { error: message })).into_response()
    }
}

impl From<PerfError> for AppError {
    fn from(err: PerfError) -> Self {
        match err {
            PerfError::AlreadyPopulated(_) => AppError::Conflict(err.to_string()),
            PerfError::InvariantViolation(_) => AppError::Conflict(err.to_string()),
            PerfError::Validation(_) | PerfError::Time(_) => AppError::BadRequest(err.to_string()),
        }
    }
}

impl From<TimeError> for AppError {
    fn from(err: TimeError) -> Self {
        AppError::BadRequest(err.to_string())
    }
}

impl From<ScoringError> for AppError {
    fn from(err: ScoringError) -> Self {
        match err {
            ScoringError::NotFound { .. } => AppError::NotFound(err.to_string()),
            other => AppError::InternalError(format!("Scoring table error: {}", other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_perf_error_status_mapping() {
        let cases = [
            (PerfError::Validation("bad".into()), StatusCode::BAD_REQUEST),
            (PerfError::InvariantViolation("bad".into()), StatusCode::CONFLICT),
            (PerfError::AlreadyPopulated(3), StatusCode::CONFLICT),
            (
                PerfError::Time(TimeError::Validation("bad".into())),
                StatusCode::BAD_REQUEST,
            ),
        ];
        for (err, status) in cases {
            assert_eq!(AppError::from(err).into_response().status(), status);
        }
    }

    #[test]
    fn test_scoring_error_status_mapping() {
        let missing = ScoringError::NotFound {
            gender: perf_tracker::services::scoring::Gender::Female,
            event: "5km".to_string(),
        };
        assert_eq!(
            AppError::from(missing).into_response().status(),
            StatusCode::NOT_FOUND
        );
        let invalid = ScoringError::InvalidTable("bad gender".to_string());
        assert_eq!(
            AppError::from(invalid).into_response().status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_store_error_is_internal() {
        let err = StoreError::Io {
            path: "/tmp/perfs.json".into(),
            source: std::io::Error::new(std::io::ErrorKind::Other, "disk full"),
        };
        let response = AppError::from(err).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}

// Performance Tracker API v0.1
use axum::{
    routing::{get, post},
    Router,
};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::sync::RwLock;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use perf_tracker::services::scoring::ScoringTable;
use perf_tracker::store::file::PerfStore;

mod config;
mod errors;
mod routes;

use config::AppConfig;
use routes::TrackerState;

/// OpenAPI document for the Performance Tracker API.
#[derive(OpenApi)]
#[openapi(
    info(
        title = "Performance Tracker API",
        version = "0.1.0",
        description = "Running performance tracker. Records race results with optional \
            elementary splits, derives every multi-split segment, finds personal bests \
            across whole races and segments, and scores records against the IAAF \
            scoring tables.",
        license(name = "MIT"),
    ),
    tags(
        (name = "Health", description = "Service health check"),
        (name = "Performances", description = "Race results, table view and export"),
        (name = "Personal bests", description = "Fastest record per distance"),
        (name = "Scores", description = "IAAF scoring"),
    ),
    paths(
        routes::health::health_check,
        routes::performances::list_performances,
        routes::performances::create_performance,
        routes::performances::export_performances,
        routes::performances::get_filters,
        routes::personal_bests::list_personal_bests,
        routes::personal_bests::get_personal_best,
        routes::scores::compute_scores,
    ),
    components(
        schemas(
            routes::health::HealthResponse,
            routes::performances::SplitsInput,
            routes::performances::CreatePerformanceRequest,
            routes::performances::PerformanceRow,
            routes::performances::FiltersResponse,
            routes::personal_bests::PersonalBestResponse,
            routes::scores::SkippedScoreItem,
            routes::scores::ScoreReportResponse,
            perf_tracker::store::models::PerfRecord,
            perf_tracker::store::models::SubPerfRecord,
            errors::ErrorResponse,
        )
    )
)]
struct ApiDoc;

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "perf_tracker=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = AppConfig::from_env();

    // The scoring table is required; there is nothing to fall back to.
    let scoring = ScoringTable::from_path(&config.scoring_table_path).unwrap_or_else(|e| {
        panic!(
            "Failed to load scoring table from {}: {}",
            config.scoring_table_path.display(),
            e
        )
    });

    let store = PerfStore::in_dir(&config.data_dir);
    let (mut collection, report) = store.load().unwrap_or_else(|e| {
        panic!(
            "Failed to load performances from {}: {}",
            store.path().display(),
            e
        )
    });
    for skipped in &report.skipped {
        tracing::warn!(
            "Ignored persisted record {}: {}",
            skipped.index,
            skipped.reason
        );
    }

    collection.set_gender(config.athlete_gender);
    match config.athlete_gender {
        Some(gender) => {
            collection.compute_scores(&scoring);
            tracing::info!("Scoring enabled for {} athlete", gender);
        }
        None => tracing::warn!("ATHLETE_GENDER not set, scores will not be computed"),
    }

    let state = Arc::new(RwLock::new(TrackerState {
        collection,
        store,
        scoring,
    }));

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([axum::http::Method::GET, axum::http::Method::POST])
        .allow_headers(Any);

    let app = Router::new()
        .route("/api/v1/health", get(routes::health::health_check))
        .route(
            "/api/v1/performances",
            get(routes::performances::list_performances)
                .post(routes::performances::create_performance),
        )
        .route(
            "/api/v1/performances/export",
            get(routes::performances::export_performances),
        )
        .route(
            "/api/v1/performances/filters",
            get(routes::performances::get_filters),
        )
        .route(
            "/api/v1/personal-bests",
            get(routes::personal_bests::list_personal_bests),
        )
        .route(
            "/api/v1/personal-bests/:distance",
            get(routes::personal_bests::get_personal_best),
        )
        .route("/api/v1/scores", post(routes::scores::compute_scores))
        .with_state(state)
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .layer(TraceLayer::new_for_http())
        .layer(cors);

    // Start server
    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    tracing::info!("API server listening on {}", addr);
    tracing::info!(
        "Swagger UI available at http://localhost:{}/swagger-ui/",
        config.port
    );

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind TCP listener");
    axum::serve(listener, app)
        .await
        .expect("Server terminated unexpectedly");
}

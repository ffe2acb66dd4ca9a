//! `cutover serve` -- HTTP JSON API for the migration dashboard.
//!
//! On startup the fixtures are loaded, the store is opened and seeded if it
//! holds no project, then the router is served until Ctrl+C.
//!
//! Endpoints:
//! - GET /health                                          - Server status
//! - GET /api/projects                                    - Project cards
//! - GET /api/projects/{id}                               - Project and its six stage views
//! - GET /api/projects/{id}/stages/{n}                    - Stage view and document (ETag)
//! - GET /api/projects/{id}/stages/{n}/summary            - Stage headline figures
//! - GET /api/projects/{id}/stages/{n}/assets             - Filtered, paged manifest assets (n = 3)
//! - GET /api/projects/{id}/stages/{n}/runtime?env=      - One environment's runtime config (n = 4)
//! - GET /api/projects/{id}/environments                  - Deployment environments (ETag)
//! - GET /api/projects/{id}/pipeline-executions           - Pipeline run history
//! - GET /api/navigate?path=...                           - Resolve a dashboard path
//! - GET /api/stages/{n}                                  - Raw fixture document (ETag)
//!
//! All responses use Content-Type: application/json.

mod handlers;
mod stages;
mod state;

use std::sync::Arc;

use axum::http::{Method, StatusCode};
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use cutover_core::{seed_project, StageDataAccessor};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use self::handlers::{
    handle_environments, handle_get_project, handle_health, handle_list_projects,
    handle_navigate, handle_not_found, handle_pipeline_executions,
};
use self::stages::{
    handle_get_stage, handle_list_assets, handle_raw_stage, handle_runtime_environment,
    handle_stage_summary,
};
use self::state::AppState;
use crate::boot;
use crate::config::Settings;

/// Construct a JSON error response with the given status code and message.
fn json_error(status: StatusCode, message: &str) -> impl IntoResponse {
    (status, Json(serde_json::json!({"error": message})))
}

pub(crate) fn router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET])
        .allow_headers(Any);

    Router::new()
        .route("/health", get(handle_health))
        .route("/api/projects", get(handle_list_projects))
        .route("/api/projects/{id}", get(handle_get_project))
        .route("/api/projects/{id}/stages/{stage}", get(handle_get_stage))
        .route(
            "/api/projects/{id}/stages/{stage}/summary",
            get(handle_stage_summary),
        )
        .route(
            "/api/projects/{id}/stages/{stage}/assets",
            get(handle_list_assets),
        )
        .route(
            "/api/projects/{id}/stages/{stage}/runtime",
            get(handle_runtime_environment),
        )
        .route("/api/projects/{id}/environments", get(handle_environments))
        .route(
            "/api/projects/{id}/pipeline-executions",
            get(handle_pipeline_executions),
        )
        .route("/api/navigate", get(handle_navigate))
        .route("/api/stages/{stage}", get(handle_raw_stage))
        .fallback(handle_not_found)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

/// Seed the configured store and serve the API until Ctrl+C.
pub(crate) async fn start_server(settings: &Settings) -> Result<(), Box<dyn std::error::Error>> {
    let fixtures = Arc::new(boot::load_fixtures(settings.fixtures.as_deref())?);
    let store = boot::open_store(settings.store.as_deref()).await?;

    let outcome = seed_project(store.as_ref(), &fixtures).await?;
    if outcome.seeded {
        tracing::info!(project_id = %outcome.project_id, "store seeded on startup");
    }

    let state = Arc::new(AppState {
        accessor: StageDataAccessor::new(fixtures),
        store,
        project_id: outcome.project_id,
    });

    let addr = format!("{}:{}", settings.host, settings.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(%addr, "cutover dashboard API listening");

    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("server shut down");
    Ok(())
}

/// Wait for a shutdown signal (Ctrl+C).
async fn shutdown_signal() {
    tokio::signal::ctrl_c()
        .await
        .expect("failed to install Ctrl+C handler");
    tracing::info!("received shutdown signal");
}

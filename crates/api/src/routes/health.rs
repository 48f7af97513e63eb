use axum::extract::State;
use axum::{routing::get, Json, Router};
use serde::Serialize;

use crate::state::AppState;

/// Health check response payload.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    /// Overall service status.
    pub status: &'static str,
    /// Crate version from Cargo.toml.
    pub version: &'static str,
    /// Jobs currently holding a worker slot.
    pub active_jobs: usize,
    /// Jobs waiting for a slot.
    pub pending_jobs: usize,
    pub max_workers: usize,
}

/// GET /health -- returns service status and queue occupancy.
async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let stats = state.queue.stats().await;

    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
        active_jobs: stats.active,
        pending_jobs: stats.pending,
        max_workers: stats.ceiling,
    })
}

/// Mount health check routes (not rate limited).
pub fn router() -> Router<AppState> {
    Router::new().route("/health", get(health_check))
}

pub mod health;

use axum::middleware;
use axum::routing::{get, post};
use axum::Router;

use crate::handlers;
use crate::middleware::rate_limit::rate_limit;
use crate::state::AppState;

/// Build the batch route tree.
///
/// ```text
/// POST /process-images          admit a batch and wait for its summary
/// GET  /status/{task_id}        ledger snapshot for a batch
/// ```
///
/// Both routes share the per-client rate limit.
pub fn api_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/process-images", post(handlers::batches::process_images))
        .route("/status/{task_id}", get(handlers::batches::get_status))
        .route_layer(middleware::from_fn_with_state(state, rate_limit))
}

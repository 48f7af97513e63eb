use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use imgbatch_core::error::CoreError;
use serde_json::json;

/// Message returned for unknown batch ids.
pub const MSG_TASK_NOT_FOUND: &str = "Task not found";
/// Message returned alongside the offending entries of a rejected batch.
pub const MSG_INVALID_URLS: &str = "The following URLs are invalid:";
/// Message returned when a client exceeds its request window.
pub const MSG_RATE_LIMITED: &str = "Too many requests, please try again later.";

/// Application-level error type for HTTP handlers.
///
/// Wraps [`CoreError`] for domain errors and adds HTTP-specific variants.
/// Implements [`IntoResponse`] to produce consistent JSON error responses.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// A domain-level error from `imgbatch_core`.
    #[error(transparent)]
    Core(#[from] CoreError),

    /// The client exhausted its request budget for the current window.
    #[error("Rate limit exceeded")]
    RateLimited,
}

/// Convenience type alias for handler return values.
pub type AppResult<T> = Result<T, AppError>;

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            // --- CoreError variants ---
            AppError::Core(core) => match core {
                CoreError::InvalidInput(msg) => {
                    (StatusCode::BAD_REQUEST, "INVALID_INPUT", msg.clone())
                }
                CoreError::InvalidUrls { invalid_urls } => {
                    let body = json!({
                        "error": MSG_INVALID_URLS,
                        "invalidUrls": invalid_urls,
                        "code": "INVALID_URLS",
                    });
                    return (StatusCode::BAD_REQUEST, axum::Json(body)).into_response();
                }
                CoreError::NotFound { .. } => (
                    StatusCode::NOT_FOUND,
                    "NOT_FOUND",
                    MSG_TASK_NOT_FOUND.to_string(),
                ),
                CoreError::DuplicateBatch(id) => {
                    tracing::error!(batch_id = %id, "Batch id collision");
                    internal()
                }
                CoreError::Internal(msg) => {
                    tracing::error!(error = %msg, "Internal core error");
                    internal()
                }
            },

            // --- HTTP-specific errors ---
            AppError::RateLimited => (
                StatusCode::TOO_MANY_REQUESTS,
                "RATE_LIMITED",
                MSG_RATE_LIMITED.to_string(),
            ),
        };

        let body = json!({
            "error": message,
            "code": code,
        });

        (status, axum::Json(body)).into_response()
    }
}

fn internal() -> (StatusCode, &'static str, String) {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        "INTERNAL_ERROR",
        "An internal error occurred".to_string(),
    )
}

//! Handlers for batch submission and status lookup.
//!
//! Submission is synchronous: the response is sent once every job in the
//! batch has settled. Progress of a batch in flight can be polled through
//! the status endpoint using the `taskId` logged at admission.

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::Json;
use imgbatch_core::batch::{BatchRecord, BatchSummary};
use imgbatch_core::error::CoreError;
use imgbatch_core::types::BatchId;
use imgbatch_core::validation::MSG_PROVIDE_URL_ARRAY;
use serde::Serialize;

use crate::error::{AppError, AppResult};
use crate::state::AppState;

/// Response body for a settled batch.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessImagesResponse {
    pub task_id: BatchId,
    pub summary: BatchSummary,
}

/// Ledger snapshot plus the derived count of unsettled jobs.
#[derive(Debug, Serialize)]
pub struct StatusResponse {
    #[serde(flatten)]
    pub record: BatchRecord,
    pub remaining: usize,
}

impl From<BatchRecord> for StatusResponse {
    fn from(record: BatchRecord) -> Self {
        let remaining = record.remaining();
        Self { record, remaining }
    }
}

// ---------------------------------------------------------------------------
// Submit
// ---------------------------------------------------------------------------

/// POST /process-images
///
/// Body: `{"urls": [...]}`. Every entry must be a valid absolute URL or the
/// whole batch is rejected and nothing is recorded.
pub async fn process_images(
    State(state): State<AppState>,
    body: Result<Json<serde_json::Value>, JsonRejection>,
) -> AppResult<Json<ProcessImagesResponse>> {
    let Json(body) = body.map_err(|rejection| {
        tracing::debug!(error = %rejection, "Rejected batch body");
        AppError::Core(CoreError::InvalidInput(MSG_PROVIDE_URL_ARRAY.to_string()))
    })?;

    let urls = body.get("urls").unwrap_or(&serde_json::Value::Null);
    let report = state.coordinator.process(urls).await?;

    Ok(Json(ProcessImagesResponse {
        task_id: report.batch_id,
        summary: report.summary,
    }))
}

// ---------------------------------------------------------------------------
// Status
// ---------------------------------------------------------------------------

/// GET /status/{task_id}
pub async fn get_status(
    State(state): State<AppState>,
    Path(task_id): Path<String>,
) -> AppResult<Json<StatusResponse>> {
    let record = state.reporter.get_status(&task_id).await?;
    Ok(Json(record.into()))
}

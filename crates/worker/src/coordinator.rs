//! Batch admission and settlement.
//!
//! [`BatchCoordinator::admit`] validates the URL list, creates the ledger
//! entry, and submits one job per URL. Settlement runs in its own task: it
//! records each outcome as it arrives, then finalizes the ledger entry once
//! every job has reported. Because that task is detached from the caller, a
//! caller that stops waiting (e.g. a dropped HTTP connection) does not stop
//! the batch from reaching `completed`.

use std::sync::Arc;
use std::time::Instant;

use futures::stream::{FuturesUnordered, StreamExt};
use imgbatch_core::batch::BatchSummary;
use imgbatch_core::error::CoreError;
use imgbatch_core::job::{FailureKind, Job, JobOutcome};
use imgbatch_core::types::{new_batch_id, BatchId};
use imgbatch_core::validation;
use imgbatch_db::Ledger;
use imgbatch_events::bus::{EVENT_BATCH_ADMITTED, EVENT_BATCH_COMPLETED};
use imgbatch_events::{EventBus, SchedulerEvent};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

use crate::dispatch::DispatchQueue;
use crate::execution::elapsed_ms;

/// Result of a fully settled batch.
#[derive(Debug, Clone, PartialEq)]
pub struct BatchReport {
    pub batch_id: BatchId,
    pub summary: BatchSummary,
}

/// An admitted batch whose jobs are in flight.
pub struct BatchHandle {
    batch_id: BatchId,
    settlement: JoinHandle<Result<BatchSummary, CoreError>>,
}

impl BatchHandle {
    pub fn batch_id(&self) -> &str {
        &self.batch_id
    }

    /// Wait for every job to settle and the ledger entry to be finalized.
    pub async fn wait(self) -> Result<BatchReport, CoreError> {
        let summary = self
            .settlement
            .await
            .map_err(|e| CoreError::Internal(format!("Batch settlement task failed: {e}")))??;
        Ok(BatchReport {
            batch_id: self.batch_id,
            summary,
        })
    }
}

/// Turns admission requests into jobs and jobs into a finalized batch.
pub struct BatchCoordinator {
    ledger: Arc<Ledger>,
    queue: Arc<DispatchQueue>,
    events: Arc<EventBus>,
}

impl BatchCoordinator {
    pub fn new(ledger: Arc<Ledger>, queue: Arc<DispatchQueue>, events: Arc<EventBus>) -> Self {
        Self {
            ledger,
            queue,
            events,
        }
    }

    /// Validate and admit a batch.
    ///
    /// Validation errors are returned before any ledger entry or job exists.
    pub async fn admit(&self, raw_urls: &serde_json::Value) -> Result<BatchHandle, CoreError> {
        let urls = validation::parse_url_list(raw_urls)?;
        let total = urls.len();
        let batch_id = new_batch_id();

        self.ledger.create_batch(&batch_id, total).await?;

        let jobs: Vec<Job> = urls
            .into_iter()
            .enumerate()
            .map(|(index, url)| Job::new(batch_id.clone(), index, url))
            .collect();

        self.events.publish(
            SchedulerEvent::new(EVENT_BATCH_ADMITTED)
                .with_batch(batch_id.clone())
                .with_payload(serde_json::json!({ "total": total })),
        );

        let receivers = self.queue.submit_all(jobs).await;

        let settlement = tokio::spawn(settle(
            Arc::clone(&self.ledger),
            Arc::clone(&self.events),
            batch_id.clone(),
            total,
            receivers,
        ));

        Ok(BatchHandle {
            batch_id,
            settlement,
        })
    }

    /// Admit a batch and wait for its summary.
    pub async fn process(&self, raw_urls: &serde_json::Value) -> Result<BatchReport, CoreError> {
        self.admit(raw_urls).await?.wait().await
    }
}

/// Record outcomes in arrival order, then finalize.
async fn settle(
    ledger: Arc<Ledger>,
    events: Arc<EventBus>,
    batch_id: BatchId,
    total: usize,
    receivers: Vec<oneshot::Receiver<JobOutcome>>,
) -> Result<BatchSummary, CoreError> {
    let admitted = Instant::now();
    let mut in_flight: FuturesUnordered<_> = receivers
        .into_iter()
        .enumerate()
        .map(|(index, rx)| async move { (index, rx.await) })
        .collect();

    let mut outcomes = Vec::with_capacity(total);
    while let Some((index, received)) = in_flight.next().await {
        // The dispatch supervisor always replies, including for crashed
        // workers. A closed channel means the supervisor itself was torn down
        // (runtime shutdown); the job still needs a terminal outcome.
        let outcome = received.unwrap_or_else(|_| {
            JobOutcome::failure(
                FailureKind::Crash,
                "Dispatch supervisor stopped before delivering an outcome",
                elapsed_ms(admitted),
            )
        });

        if let Err(e) = ledger.record_outcome(&batch_id, index, &outcome).await {
            tracing::error!(
                batch_id = %batch_id,
                job_index = index,
                error = %e,
                "Failed to record job outcome",
            );
        }
        outcomes.push(outcome);
    }

    let summary = BatchSummary::from_outcomes(total, outcomes.iter());
    ledger.finalize(&batch_id, &summary).await.map_err(|e| {
        tracing::error!(batch_id = %batch_id, error = %e, "Failed to finalize batch");
        CoreError::from(e)
    })?;

    events.publish(
        SchedulerEvent::new(EVENT_BATCH_COMPLETED)
            .with_batch(batch_id.clone())
            .with_payload(serde_json::json!({
                "total": summary.total,
                "completed": summary.completed,
                "failed": summary.failed,
                "average_time_ms": summary.average_time,
            })),
    );

    Ok(summary)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

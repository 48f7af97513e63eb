//! Bounded-concurrency dispatch queue.
//!
//! [`DispatchQueue`] owns a FIFO pending sequence and the count of active
//! jobs. Admission is edge-triggered: it runs whenever a job is submitted
//! and whenever an active job settles, always under the queue's single
//! lock, so two concurrent completions can never both claim the same free
//! slot. There is no polling loop.
//!
//! The pool is shared by every batch. A large batch submitted first will
//! occupy the slots until its jobs drain; later batches wait behind it.

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Instant;

use imgbatch_core::job::{FailureKind, Job, JobOutcome};
use imgbatch_events::bus::{EVENT_JOB_ADMITTED, EVENT_JOB_SETTLED};
use imgbatch_events::{EventBus, SchedulerEvent};
use tokio::sync::{oneshot, Mutex};
use tokio::task::JoinError;

use crate::execution::{elapsed_ms, JobRunner};

/// Default ceiling on simultaneously active jobs.
pub const DEFAULT_MAX_WORKERS: usize = 5;

/// Point-in-time view of the queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueueStats {
    pub ceiling: usize,
    pub active: usize,
    pub pending: usize,
    /// Highest `active` value observed since the queue was created.
    pub peak_active: usize,
}

struct PendingJob {
    job: Job,
    reply: oneshot::Sender<JobOutcome>,
}

#[derive(Default)]
struct QueueState {
    pending: VecDeque<PendingJob>,
    active: usize,
    peak_active: usize,
}

/// Shared job pool with a fixed concurrency ceiling.
///
/// Created once at startup and shared as `Arc<DispatchQueue>`.
pub struct DispatchQueue {
    ceiling: usize,
    runner: Arc<dyn JobRunner>,
    events: Arc<EventBus>,
    state: Mutex<QueueState>,
}

impl DispatchQueue {
    /// Create a queue. A ceiling of zero is raised to one.
    pub fn new(ceiling: usize, runner: Arc<dyn JobRunner>, events: Arc<EventBus>) -> Arc<Self> {
        Arc::new(Self {
            ceiling: ceiling.max(1),
            runner,
            events,
            state: Mutex::new(QueueState::default()),
        })
    }

    pub fn ceiling(&self) -> usize {
        self.ceiling
    }

    /// Enqueue one job. The receiver resolves with the job's outcome.
    pub async fn submit(self: &Arc<Self>, job: Job) -> oneshot::Receiver<JobOutcome> {
        let (reply, rx) = oneshot::channel();
        let mut state = self.state.lock().await;
        state.pending.push_back(PendingJob { job, reply });
        self.admit_next(&mut state);
        rx
    }

    /// Enqueue a batch's jobs contiguously, in order.
    pub async fn submit_all(
        self: &Arc<Self>,
        jobs: impl IntoIterator<Item = Job>,
    ) -> Vec<oneshot::Receiver<JobOutcome>> {
        let mut state = self.state.lock().await;
        let receivers = jobs
            .into_iter()
            .map(|job| {
                let (reply, rx) = oneshot::channel();
                state.pending.push_back(PendingJob { job, reply });
                rx
            })
            .collect();
        self.admit_next(&mut state);
        receivers
    }

    pub async fn stats(&self) -> QueueStats {
        let state = self.state.lock().await;
        QueueStats {
            ceiling: self.ceiling,
            active: state.active,
            pending: state.pending.len(),
            peak_active: state.peak_active,
        }
    }

    // -----------------------------------------------------------------------
    // Admission
    // -----------------------------------------------------------------------

    /// Move pending jobs to active while slots are free. Caller holds the lock.
    fn admit_next(self: &Arc<Self>, state: &mut QueueState) {
        while state.active < self.ceiling {
            let Some(next) = state.pending.pop_front() else {
                break;
            };
            state.active += 1;
            state.peak_active = state.peak_active.max(state.active);

            self.events.publish(
                SchedulerEvent::new(EVENT_JOB_ADMITTED)
                    .with_job(next.job.batch_id.clone(), next.job.index)
                    .with_payload(serde_json::json!({
                        "active": state.active,
                        "pending": state.pending.len(),
                    })),
            );
            self.launch(next);
        }
    }

    fn launch(self: &Arc<Self>, pending: PendingJob) {
        let queue = Arc::clone(self);
        tokio::spawn(async move { queue.supervise(pending).await });
    }

    /// Run the job in its own task and turn a dead task into a crash outcome.
    /// The slot is released before the outcome is delivered.
    async fn supervise(self: Arc<Self>, pending: PendingJob) {
        let PendingJob { job, reply } = pending;
        let started = Instant::now();

        let runner = Arc::clone(&self.runner);
        let run_job = job.clone();
        let outcome = match tokio::spawn(async move { runner.run(run_job).await }).await {
            Ok(outcome) => outcome,
            Err(err) => {
                let reason = crash_reason(err);
                tracing::error!(
                    batch_id = %job.batch_id,
                    job_index = job.index,
                    error = %reason,
                    "Worker crashed",
                );
                JobOutcome::failure(FailureKind::Crash, reason, elapsed_ms(started))
            }
        };

        self.release(&job, &outcome).await;

        if reply.send(outcome).is_err() {
            tracing::warn!(
                batch_id = %job.batch_id,
                job_index = job.index,
                "Outcome receiver dropped before job settled",
            );
        }
    }

    async fn release(self: &Arc<Self>, job: &Job, outcome: &JobOutcome) {
        let mut state = self.state.lock().await;
        state.active = state.active.saturating_sub(1);

        self.events.publish(
            SchedulerEvent::new(EVENT_JOB_SETTLED)
                .with_job(job.batch_id.clone(), job.index)
                .with_payload(serde_json::json!({
                    "outcome": outcome.label(),
                    "elapsed_ms": outcome.elapsed_ms(),
                    "active": state.active,
                })),
        );
        self.admit_next(&mut state);
    }
}

fn crash_reason(err: JoinError) -> String {
    if err.is_panic() {
        let payload = err.into_panic();
        let message = payload
            .downcast_ref::<&str>()
            .map(|s| s.to_string())
            .or_else(|| payload.downcast_ref::<String>().cloned())
            .unwrap_or_else(|| "unknown panic".to_string());
        format!("Worker crashed: {message}")
    } else {
        "Worker was cancelled before reporting an outcome".to_string()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

//! Scheduler lifecycle events.
//!
//! The dispatch queue and the batch coordinator publish a [`SchedulerEvent`]
//! at each transition they own. Observers subscribe to the shared
//! `Arc<EventBus>`; publishing never waits on them.

use chrono::{DateTime, Utc};
use imgbatch_core::types::BatchId;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

// ---------------------------------------------------------------------------
// Event names
// ---------------------------------------------------------------------------

/// A batch passed validation and its jobs were submitted.
pub const EVENT_BATCH_ADMITTED: &str = "batch.admitted";
/// A job left the pending sequence and took an execution slot.
pub const EVENT_JOB_ADMITTED: &str = "job.admitted";
/// A job produced its terminal outcome and released its slot.
pub const EVENT_JOB_SETTLED: &str = "job.settled";
/// Every job of a batch settled and the ledger entry was finalized.
pub const EVENT_BATCH_COMPLETED: &str = "batch.completed";

// ---------------------------------------------------------------------------
// SchedulerEvent
// ---------------------------------------------------------------------------

/// One scheduler transition. Start from [`SchedulerEvent::new`] and attach
/// the batch, job, or payload that apply.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerEvent {
    /// Dot-separated event name, e.g. `"job.admitted"`.
    pub event_type: String,

    pub batch_id: Option<BatchId>,

    pub job_index: Option<usize>,

    /// Counters at the time of the event (active slots, outcome label).
    pub payload: serde_json::Value,

    pub timestamp: DateTime<Utc>,
}

impl SchedulerEvent {
    pub fn new(event_type: impl Into<String>) -> Self {
        Self {
            event_type: event_type.into(),
            batch_id: None,
            job_index: None,
            payload: serde_json::json!({}),
            timestamp: Utc::now(),
        }
    }

    pub fn with_batch(mut self, batch_id: impl Into<BatchId>) -> Self {
        self.batch_id = Some(batch_id.into());
        self
    }

    pub fn with_job(mut self, batch_id: impl Into<BatchId>, index: usize) -> Self {
        self.batch_id = Some(batch_id.into());
        self.job_index = Some(index);
        self
    }

    pub fn with_payload(mut self, payload: serde_json::Value) -> Self {
        self.payload = payload;
        self
    }
}

// ---------------------------------------------------------------------------
// EventBus
// ---------------------------------------------------------------------------

/// Events buffered per subscriber before the slowest one starts lagging.
const DEFAULT_CAPACITY: usize = 1024;

/// Fan-out hub; every subscriber sees every event published after it
/// subscribed.
pub struct EventBus {
    sender: broadcast::Sender<SchedulerEvent>,
}

impl EventBus {
    /// A subscriber more than `capacity` events behind loses the oldest ones
    /// and gets `RecvError::Lagged` on its next receive.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    pub fn publish(&self, event: SchedulerEvent) {
        // Err only when nobody is listening.
        let _ = self.sender.send(event);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SchedulerEvent> {
        self.sender.subscribe()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

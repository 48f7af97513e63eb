//! Batch record, status machine, and summary arithmetic.
//!
//! Everything here is pure: the ledger in `imgbatch-db` supplies locking and
//! persistence and delegates every state change to [`BatchRecord`].

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::job::{JobOutcome, JobResult};
use crate::types::{BatchId, Timestamp};

// ---------------------------------------------------------------------------
// Status
// ---------------------------------------------------------------------------

/// Lifecycle of a batch: `queued -> in_progress -> completed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BatchStatus {
    Queued,
    InProgress,
    Completed,
}

impl BatchStatus {
    fn rank(self) -> u8 {
        match self {
            BatchStatus::Queued => 0,
            BatchStatus::InProgress => 1,
            BatchStatus::Completed => 2,
        }
    }

    /// Status never regresses; staying put is allowed.
    pub fn can_advance_to(self, next: BatchStatus) -> bool {
        next.rank() >= self.rank()
    }

    pub fn is_terminal(self) -> bool {
        self == BatchStatus::Completed
    }

    pub fn as_str(self) -> &'static str {
        match self {
            BatchStatus::Queued => "queued",
            BatchStatus::InProgress => "in_progress",
            BatchStatus::Completed => "completed",
        }
    }
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Rejected state changes on a [`BatchRecord`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BatchRecordError {
    #[error("job index {index} is out of range for batch of {total}")]
    IndexOutOfRange { index: usize, total: usize },

    #[error("batch is already completed")]
    AlreadyFinalized,

    #[error("batch still has {remaining} unsettled job(s)")]
    Incomplete { remaining: usize },

    #[error("summary counts ({completed}/{failed}) disagree with recorded outcomes")]
    SummaryMismatch { completed: usize, failed: usize },
}

/// What happened when an outcome was offered to the record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordStatus {
    /// The outcome was written and one counter was incremented.
    Recorded,
    /// This index already had an outcome; nothing changed.
    AlreadyRecorded,
}

// ---------------------------------------------------------------------------
// Record
// ---------------------------------------------------------------------------

/// Ledger state for one batch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchRecord {
    pub task_id: BatchId,
    pub status: BatchStatus,
    pub total: usize,
    pub completed: usize,
    pub failed: usize,
    pub results: BTreeMap<usize, JobResult>,
    /// Mean elapsed milliseconds over successful jobs; set at finalization.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub average_time: Option<f64>,
    pub created_at: Timestamp,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<Timestamp>,
}

impl BatchRecord {
    pub fn new(task_id: impl Into<BatchId>, total: usize, now: Timestamp) -> Self {
        Self {
            task_id: task_id.into(),
            status: BatchStatus::Queued,
            total,
            completed: 0,
            failed: 0,
            results: BTreeMap::new(),
            average_time: None,
            created_at: now,
            completed_at: None,
        }
    }

    /// Jobs that have not yet reported an outcome.
    pub fn remaining(&self) -> usize {
        self.total.saturating_sub(self.completed + self.failed)
    }

    /// Write a job's outcome and bump the matching counter.
    ///
    /// Idempotent per index: a second outcome for the same index is ignored
    /// whether or not it matches the first.
    pub fn apply_outcome(
        &mut self,
        index: usize,
        outcome: &JobOutcome,
    ) -> Result<RecordStatus, BatchRecordError> {
        if index >= self.total {
            return Err(BatchRecordError::IndexOutOfRange {
                index,
                total: self.total,
            });
        }
        if self.results.contains_key(&index) {
            return Ok(RecordStatus::AlreadyRecorded);
        }
        if self.status.is_terminal() {
            return Err(BatchRecordError::AlreadyFinalized);
        }

        self.results.insert(index, JobResult::from(outcome));
        if outcome.is_success() {
            self.completed += 1;
        } else {
            self.failed += 1;
        }
        if self.status.can_advance_to(BatchStatus::InProgress) {
            self.status = BatchStatus::InProgress;
        }
        Ok(RecordStatus::Recorded)
    }

    /// Mark the batch completed and store the derived average.
    pub fn finalize(
        &mut self,
        summary: &BatchSummary,
        now: Timestamp,
    ) -> Result<(), BatchRecordError> {
        if self.status.is_terminal() {
            return Err(BatchRecordError::AlreadyFinalized);
        }
        let remaining = self.remaining();
        if remaining > 0 {
            return Err(BatchRecordError::Incomplete { remaining });
        }
        if summary.completed != self.completed || summary.failed != self.failed {
            return Err(BatchRecordError::SummaryMismatch {
                completed: summary.completed,
                failed: summary.failed,
            });
        }

        self.status = BatchStatus::Completed;
        self.average_time = Some(summary.average_time);
        self.completed_at = Some(now);
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Summary
// ---------------------------------------------------------------------------

/// Final tally returned to the caller that admitted the batch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchSummary {
    pub total: usize,
    pub completed: usize,
    pub failed: usize,
    /// Milliseconds, rounded to two decimals. Zero when nothing succeeded.
    pub average_time: f64,
}

impl BatchSummary {
    pub fn from_outcomes<'a>(
        total: usize,
        outcomes: impl IntoIterator<Item = &'a JobOutcome>,
    ) -> Self {
        let mut completed = 0usize;
        let mut failed = 0usize;
        let mut success_ms: u64 = 0;

        for outcome in outcomes {
            if outcome.is_success() {
                completed += 1;
                success_ms += outcome.elapsed_ms();
            } else {
                failed += 1;
            }
        }

        Self {
            total,
            completed,
            failed,
            average_time: average_ms(success_ms, completed),
        }
    }
}

fn average_ms(sum_ms: u64, count: usize) -> f64 {
    if count == 0 {
        return 0.0;
    }
    let mean = sum_ms as f64 / count as f64;
    (mean * 100.0).round() / 100.0
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

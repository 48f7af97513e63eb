//! The unit of dispatch and its terminal outcome.

use serde::{Deserialize, Serialize};

use crate::types::BatchId;

/// One URL within one batch.
///
/// Owned by the dispatch queue until admitted, then by exactly one worker
/// execution until its outcome is recorded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Job {
    pub batch_id: BatchId,
    /// Position within the batch, 0-based.
    pub index: usize,
    pub url: String,
}

impl Job {
    pub fn new(batch_id: impl Into<BatchId>, index: usize, url: impl Into<String>) -> Self {
        Self {
            batch_id: batch_id.into(),
            index,
            url: url.into(),
        }
    }
}

/// Which stage of a job produced its failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    Fetch,
    Transform,
    Persist,
    /// The execution unit died instead of returning a result.
    Crash,
}

impl FailureKind {
    pub fn as_str(self) -> &'static str {
        match self {
            FailureKind::Fetch => "fetch",
            FailureKind::Transform => "transform",
            FailureKind::Persist => "persist",
            FailureKind::Crash => "crash",
        }
    }
}

impl std::fmt::Display for FailureKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Terminal result of one job. Exactly one is produced per job.
#[derive(Debug, Clone, PartialEq)]
pub enum JobOutcome {
    Success {
        stored_path: String,
        elapsed_ms: u64,
    },
    Failure {
        kind: FailureKind,
        reason: String,
        elapsed_ms: u64,
    },
}

impl JobOutcome {
    pub fn success(stored_path: impl Into<String>, elapsed_ms: u64) -> Self {
        JobOutcome::Success {
            stored_path: stored_path.into(),
            elapsed_ms,
        }
    }

    pub fn failure(kind: FailureKind, reason: impl Into<String>, elapsed_ms: u64) -> Self {
        JobOutcome::Failure {
            kind,
            reason: reason.into(),
            elapsed_ms,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, JobOutcome::Success { .. })
    }

    pub fn elapsed_ms(&self) -> u64 {
        match self {
            JobOutcome::Success { elapsed_ms, .. } | JobOutcome::Failure { elapsed_ms, .. } => {
                *elapsed_ms
            }
        }
    }

    /// Short label used in logs and events.
    pub fn label(&self) -> &'static str {
        match self {
            JobOutcome::Success { .. } => "success",
            JobOutcome::Failure { kind, .. } => kind.as_str(),
        }
    }
}

/// Ledger form of a [`JobOutcome`], as stored in `results` and returned by
/// status queries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobResult {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failure_kind: Option<FailureKind>,
    /// Elapsed milliseconds from job start to its outcome.
    pub time_taken: u64,
}

impl From<&JobOutcome> for JobResult {
    fn from(outcome: &JobOutcome) -> Self {
        match outcome {
            JobOutcome::Success {
                stored_path,
                elapsed_ms,
            } => JobResult {
                success: true,
                file_path: Some(stored_path.clone()),
                error: None,
                failure_kind: None,
                time_taken: *elapsed_ms,
            },
            JobOutcome::Failure {
                kind,
                reason,
                elapsed_ms,
            } => JobResult {
                success: false,
                file_path: None,
                error: Some(reason.clone()),
                failure_kind: Some(*kind),
                time_taken: *elapsed_ms,
            },
        }
    }
}

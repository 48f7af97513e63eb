use std::path::PathBuf;

use imgbatch_core::batch::BatchRecordError;
use imgbatch_core::error::CoreError;
use imgbatch_core::types::BatchId;

/// Errors raised by the [`Ledger`](crate::Ledger).
#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    #[error("Batch not found: {0}")]
    NotFound(BatchId),

    #[error("Batch already exists: {0}")]
    DuplicateBatch(BatchId),

    #[error("Rejected update for batch {batch_id}: {source}")]
    Record {
        batch_id: BatchId,
        #[source]
        source: BatchRecordError,
    },

    #[error("Ledger I/O error at {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Ledger serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl From<LedgerError> for CoreError {
    fn from(err: LedgerError) -> Self {
        match err {
            LedgerError::NotFound(batch_id) => CoreError::NotFound { batch_id },
            LedgerError::DuplicateBatch(batch_id) => CoreError::DuplicateBatch(batch_id),
            other => CoreError::Internal(other.to_string()),
        }
    }
}

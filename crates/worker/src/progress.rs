//! Read-only projection of ledger state for status queries.

use std::sync::Arc;

use imgbatch_core::batch::BatchRecord;
use imgbatch_core::error::CoreError;
use imgbatch_db::Ledger;

/// Answers "where is batch X?" without touching in-flight jobs.
#[derive(Clone)]
pub struct ProgressReporter {
    ledger: Arc<Ledger>,
}

impl ProgressReporter {
    pub fn new(ledger: Arc<Ledger>) -> Self {
        Self { ledger }
    }

    /// Whatever the ledger currently holds for `batch_id`, partial results
    /// included.
    pub async fn get_status(&self, batch_id: &str) -> Result<BatchRecord, CoreError> {
        Ok(self.ledger.read(batch_id).await?)
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use imgbatch_core::batch::BatchStatus;
    use imgbatch_core::job::JobOutcome;

    use super::*;

    #[tokio::test]
    async fn unknown_batch_is_not_found() {
        let reporter = ProgressReporter::new(Arc::new(Ledger::in_memory()));
        assert_matches!(
            reporter.get_status("unknown-id").await,
            Err(CoreError::NotFound { batch_id }) if batch_id == "unknown-id"
        );
    }

    #[tokio::test]
    async fn reports_partial_results() {
        let ledger = Arc::new(Ledger::in_memory());
        ledger.create_batch("b1", 3).await.unwrap();
        ledger
            .record_outcome("b1", 2, &JobOutcome::success("p", 4))
            .await
            .unwrap();

        let snap = ProgressReporter::new(ledger).get_status("b1").await.unwrap();
        assert_eq!(snap.status, BatchStatus::InProgress);
        assert_eq!(snap.results.len(), 1);
        assert_eq!(snap.remaining(), 2);
        assert!(snap.average_time.is_none());
    }
}

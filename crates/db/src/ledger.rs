//! The progress ledger: batch id -> [`BatchRecord`].
//!
//! Records live in memory behind one mutex per batch, so updates to the same
//! batch are linearized while different batches proceed in parallel. Memory is
//! the authority: every mutation is committed there first and then flushed to
//! the [`LedgerStore`] (when one is configured). A failed flush is logged and
//! the recorded outcome stays in memory; the next flush of that batch writes
//! the whole record again.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use chrono::Utc;
use imgbatch_core::batch::{BatchRecord, BatchRecordError, BatchStatus, BatchSummary, RecordStatus};
use imgbatch_core::job::JobOutcome;
use imgbatch_core::types::BatchId;
use tokio::sync::{Mutex, RwLock};

use crate::error::LedgerError;
use crate::store::LedgerStore;

type Entry = Arc<Mutex<BatchRecord>>;

/// Durable mapping from batch id to batch state.
///
/// Shared as `Arc<Ledger>`; all methods take `&self`.
pub struct Ledger {
    entries: RwLock<HashMap<BatchId, Entry>>,
    store: Option<LedgerStore>,
}

impl Ledger {
    /// A ledger with no persistence. Used by tests and ephemeral setups.
    pub fn in_memory() -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            store: None,
        }
    }

    /// Open a directory-backed ledger, loading every record already on disk.
    pub async fn open(dir: impl Into<PathBuf>) -> Result<Self, LedgerError> {
        let store = LedgerStore::open(dir).await?;
        let records = store.load_all().await?;

        let mut entries = HashMap::with_capacity(records.len());
        for record in records {
            if !record.status.is_terminal() {
                tracing::warn!(
                    batch_id = %record.task_id,
                    remaining = record.remaining(),
                    "Loaded interrupted batch; it will not be resumed",
                );
            }
            entries.insert(record.task_id.clone(), Arc::new(Mutex::new(record)));
        }

        tracing::info!(
            dir = %store.dir().display(),
            batches = entries.len(),
            "Ledger opened",
        );

        Ok(Self {
            entries: RwLock::new(entries),
            store: Some(store),
        })
    }

    /// Create a batch in `queued` state with zero counts.
    ///
    /// The entry is visible to [`read`](Self::read) as soon as this returns.
    pub async fn create_batch(
        &self,
        batch_id: &str,
        total: usize,
    ) -> Result<BatchRecord, LedgerError> {
        let record = BatchRecord::new(batch_id, total, Utc::now());
        let entry: Entry = Arc::new(Mutex::new(record.clone()));

        // Hold the entry lock across publication so no update can land
        // before the initial record is flushed.
        let guard = {
            let mut entries = self.entries.write().await;
            if entries.contains_key(batch_id) {
                return Err(LedgerError::DuplicateBatch(batch_id.to_string()));
            }
            let guard = Arc::clone(&entry).lock_owned().await;
            entries.insert(batch_id.to_string(), entry);
            guard
        };

        if let Err(e) = self.persist(&record).await {
            drop(guard);
            self.entries.write().await.remove(batch_id);
            return Err(e);
        }
        drop(guard);

        tracing::debug!(batch_id, total, "Ledger entry created");
        Ok(record)
    }

    /// Record one job's outcome: write `results[index]` and bump the matching
    /// counter as a single step with respect to other calls on this batch.
    ///
    /// Repeated calls for an index that already has an outcome change nothing
    /// and return [`RecordStatus::AlreadyRecorded`].
    pub async fn record_outcome(
        &self,
        batch_id: &str,
        index: usize,
        outcome: &JobOutcome,
    ) -> Result<RecordStatus, LedgerError> {
        let status = self
            .update(batch_id, |record| {
                let status = record.apply_outcome(index, outcome)?;
                if status == RecordStatus::AlreadyRecorded
                    && record.results.get(&index).map(|r| r.success) != Some(outcome.is_success())
                {
                    tracing::warn!(
                        batch_id = %record.task_id,
                        job_index = index,
                        "Ignoring conflicting outcome for already-recorded job",
                    );
                }
                Ok(status)
            })
            .await?;
        Ok(status)
    }

    /// Mark the batch `completed` and store its derived average time.
    ///
    /// Fails if any job index is still unsettled or the batch was already
    /// finalized.
    pub async fn finalize(
        &self,
        batch_id: &str,
        summary: &BatchSummary,
    ) -> Result<BatchRecord, LedgerError> {
        let now = Utc::now();
        self.update(batch_id, |record| {
            record.finalize(summary, now)?;
            Ok(record.clone())
        })
        .await
    }

    /// Current snapshot of a batch, including partial results.
    pub async fn read(&self, batch_id: &str) -> Result<BatchRecord, LedgerError> {
        let entry = self.entry(batch_id).await?;
        let record = entry.lock().await;
        Ok(record.clone())
    }

    /// Status only, without cloning the results map.
    pub async fn status(&self, batch_id: &str) -> Result<BatchStatus, LedgerError> {
        let entry = self.entry(batch_id).await?;
        let record = entry.lock().await;
        Ok(record.status)
    }

    /// Number of batches known to the ledger.
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    // -----------------------------------------------------------------------
    // Internals
    // -----------------------------------------------------------------------

    async fn entry(&self, batch_id: &str) -> Result<Entry, LedgerError> {
        self.entries
            .read()
            .await
            .get(batch_id)
            .cloned()
            .ok_or_else(|| LedgerError::NotFound(batch_id.to_string()))
    }

    /// Read-modify-write under the batch's lock.
    async fn update<T>(
        &self,
        batch_id: &str,
        apply: impl FnOnce(&mut BatchRecord) -> Result<T, BatchRecordError>,
    ) -> Result<T, LedgerError> {
        let entry = self.entry(batch_id).await?;
        let mut current = entry.lock().await;

        let mut next = current.clone();
        let value = apply(&mut next).map_err(|source| LedgerError::Record {
            batch_id: batch_id.to_string(),
            source,
        })?;

        if next != *current {
            *current = next;
            if let Err(e) = self.persist(&current).await {
                tracing::error!(
                    batch_id,
                    error = %e,
                    "Ledger flush failed; record kept in memory",
                );
            }
        }
        Ok(value)
    }

    async fn persist(&self, record: &BatchRecord) -> Result<(), LedgerError> {
        match &self.store {
            Some(store) => store.write(record).await,
            None => Ok(()),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

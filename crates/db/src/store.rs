//! File persistence for ledger records.
//!
//! One JSON document per batch (`<dir>/<batch_id>.json`). Writes go to a
//! sibling `.tmp` file first and are renamed into place, so a reader never
//! sees a half-written record. Callers serialize writes per batch.

use std::path::{Path, PathBuf};

use imgbatch_core::batch::BatchRecord;

use crate::error::LedgerError;

const RECORD_EXT: &str = "json";
const TMP_EXT: &str = "json.tmp";

/// Directory-backed record store.
#[derive(Debug, Clone)]
pub struct LedgerStore {
    dir: PathBuf,
}

impl LedgerStore {
    /// Open (and create if needed) the ledger directory.
    pub async fn open(dir: impl Into<PathBuf>) -> Result<Self, LedgerError> {
        let dir = dir.into();
        tokio::fs::create_dir_all(&dir)
            .await
            .map_err(|source| LedgerError::Io {
                path: dir.clone(),
                source,
            })?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn record_path(&self, batch_id: &str) -> PathBuf {
        self.dir.join(format!("{batch_id}.{RECORD_EXT}"))
    }

    /// Atomically replace the persisted record for its batch.
    pub async fn write(&self, record: &BatchRecord) -> Result<(), LedgerError> {
        let body = serde_json::to_vec_pretty(record)?;
        let path = self.record_path(&record.task_id);
        let tmp = self.dir.join(format!("{}.{TMP_EXT}", record.task_id));

        // The directory may have been removed underneath a running ledger.
        tokio::fs::create_dir_all(&self.dir)
            .await
            .map_err(|source| LedgerError::Io {
                path: self.dir.clone(),
                source,
            })?;
        tokio::fs::write(&tmp, &body)
            .await
            .map_err(|source| LedgerError::Io {
                path: tmp.clone(),
                source,
            })?;
        tokio::fs::rename(&tmp, &path)
            .await
            .map_err(|source| LedgerError::Io { path, source })
    }

    /// Load every persisted record.
    ///
    /// Unreadable or corrupt files are skipped with a warning rather than
    /// failing startup.
    pub async fn load_all(&self) -> Result<Vec<BatchRecord>, LedgerError> {
        let mut dir = tokio::fs::read_dir(&self.dir)
            .await
            .map_err(|source| LedgerError::Io {
                path: self.dir.clone(),
                source,
            })?;

        let mut records = Vec::new();
        loop {
            let entry = match dir.next_entry().await {
                Ok(Some(entry)) => entry,
                Ok(None) => break,
                Err(source) => {
                    return Err(LedgerError::Io {
                        path: self.dir.clone(),
                        source,
                    })
                }
            };

            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some(RECORD_EXT) {
                continue;
            }

            match read_record(&path).await {
                Ok(record) => records.push(record),
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "Skipping unreadable ledger record");
                }
            }
        }
        Ok(records)
    }
}

async fn read_record(path: &Path) -> Result<BatchRecord, LedgerError> {
    let bytes = tokio::fs::read(path)
        .await
        .map_err(|source| LedgerError::Io {
            path: path.to_path_buf(),
            source,
        })?;
    Ok(serde_json::from_slice(&bytes)?)
}

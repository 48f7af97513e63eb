//! Artifact persistence.

use std::path::PathBuf;

use async_trait::async_trait;
use imgbatch_core::job::Job;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Failed to write artifact {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Persist a job's transformed bytes and return where they landed.
#[async_trait]
pub trait ArtifactStore: Send + Sync {
    async fn store(&self, job: &Job, bytes: &[u8]) -> Result<String, StoreError>;
}

/// Writes `<root>/<batch_id>/resized_<index>.jpg`.
#[derive(Debug, Clone)]
pub struct FsArtifactStore {
    root: PathBuf,
}

impl FsArtifactStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn artifact_path(&self, job: &Job) -> PathBuf {
        self.root
            .join(&job.batch_id)
            .join(format!("resized_{}.jpg", job.index))
    }
}

#[async_trait]
impl ArtifactStore for FsArtifactStore {
    async fn store(&self, job: &Job, bytes: &[u8]) -> Result<String, StoreError> {
        let path = self.artifact_path(job);
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|source| StoreError::Io {
                    path: parent.to_path_buf(),
                    source,
                })?;
        }
        tokio::fs::write(&path, bytes)
            .await
            .map_err(|source| StoreError::Io {
                path: path.clone(),
                source,
            })?;
        Ok(path.display().to_string())
    }
}

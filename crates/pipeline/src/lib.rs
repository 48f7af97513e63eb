//! The per-job capabilities: fetch, transform, persist.
//!
//! Each stage is a trait object so the scheduler never depends on a concrete
//! HTTP client, codec, or filesystem layout, and tests can substitute fakes.

use std::sync::Arc;

pub mod fetch;
pub mod store;
pub mod transform;

pub use fetch::{FetchError, Fetcher, HttpFetcher, MAX_IMAGE_BYTES};
pub use store::{ArtifactStore, FsArtifactStore, StoreError};
pub use transform::{ResizeTransformer, TransformError, Transformer};

/// The three capabilities one job execution runs through.
#[derive(Clone)]
pub struct Pipeline {
    pub fetcher: Arc<dyn Fetcher>,
    pub transformer: Arc<dyn Transformer>,
    pub store: Arc<dyn ArtifactStore>,
}

impl Pipeline {
    pub fn new(
        fetcher: Arc<dyn Fetcher>,
        transformer: Arc<dyn Transformer>,
        store: Arc<dyn ArtifactStore>,
    ) -> Self {
        Self {
            fetcher,
            transformer,
            store,
        }
    }
}

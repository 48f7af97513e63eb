//! Deterministic capabilities and runners for scheduler tests.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use imgbatch_core::job::{FailureKind, Job, JobOutcome};
use imgbatch_pipeline::{
    ArtifactStore, FetchError, Fetcher, Pipeline, StoreError, TransformError, Transformer,
};
use tokio::sync::Semaphore;

use crate::execution::JobRunner;

// ---------------------------------------------------------------------------
// Capabilities
// ---------------------------------------------------------------------------

/// Returns the URL's bytes after `delay`; URLs containing `fail` error out.
pub struct FakeFetcher {
    delay: Duration,
}

impl FakeFetcher {
    pub fn with_delay(delay: Duration) -> Self {
        Self { delay }
    }
}

impl Default for FakeFetcher {
    fn default() -> Self {
        Self::with_delay(Duration::from_millis(5))
    }
}

#[async_trait]
impl Fetcher for FakeFetcher {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>, FetchError> {
        tokio::time::sleep(self.delay).await;
        if url.contains("fail") {
            return Err(FetchError::Other(format!("Failed to fetch image from {url}")));
        }
        Ok(url.as_bytes().to_vec())
    }
}

/// Echoes its input; inputs containing `corrupt` fail.
pub struct PassthroughTransformer;

#[async_trait]
impl Transformer for PassthroughTransformer {
    async fn transform(&self, bytes: Vec<u8>) -> Result<Vec<u8>, TransformError> {
        if bytes.windows(7).any(|w| w == b"corrupt") {
            return Err(TransformError::Other("unsupported image format".into()));
        }
        Ok(bytes)
    }
}

#[derive(Default)]
pub struct MemoryStore {
    fail: bool,
    pub stored: Mutex<Vec<String>>,
}

impl MemoryStore {
    pub fn failing() -> Self {
        Self {
            fail: true,
            stored: Mutex::default(),
        }
    }
}

#[async_trait]
impl ArtifactStore for MemoryStore {
    async fn store(&self, job: &Job, _bytes: &[u8]) -> Result<String, StoreError> {
        let path = format!("mem://{}/{}", job.batch_id, job.index);
        if self.fail {
            return Err(StoreError::Io {
                path: path.into(),
                source: std::io::Error::other("disk full"),
            });
        }
        self.stored.lock().unwrap().push(path.clone());
        Ok(path)
    }
}

pub fn fake_pipeline() -> Pipeline {
    Pipeline::new(
        Arc::new(FakeFetcher::default()),
        Arc::new(PassthroughTransformer),
        Arc::new(MemoryStore::default()),
    )
}

// ---------------------------------------------------------------------------
// CountingRunner
// ---------------------------------------------------------------------------

/// Runner that measures its own concurrency.
///
/// URLs containing `panic` panic, URLs containing `fail` fail, everything
/// else succeeds after `hold`. With a gate set, every job waits for a gate
/// permit before finishing.
pub struct CountingRunner {
    hold: Duration,
    gate: Option<Arc<Semaphore>>,
    current: AtomicUsize,
    peak: AtomicUsize,
    started: Mutex<Vec<(String, usize)>>,
}

impl CountingRunner {
    pub fn new(hold: Duration) -> Self {
        Self {
            hold,
            gate: None,
            current: AtomicUsize::new(0),
            peak: AtomicUsize::new(0),
            started: Mutex::new(Vec::new()),
        }
    }

    pub fn gated(hold: Duration, gate: Arc<Semaphore>) -> Self {
        Self {
            gate: Some(gate),
            ..Self::new(hold)
        }
    }

    pub fn peak(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }

    pub fn started(&self) -> Vec<(String, usize)> {
        self.started.lock().unwrap().clone()
    }
}

#[async_trait]
impl JobRunner for CountingRunner {
    async fn run(&self, job: Job) -> JobOutcome {
        self.started
            .lock()
            .unwrap()
            .push((job.batch_id.clone(), job.index));
        let now = self.current.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);

        tokio::time::sleep(self.hold).await;
        if let Some(gate) = &self.gate {
            gate.acquire().await.unwrap().forget();
        }
        self.current.fetch_sub(1, Ordering::SeqCst);

        let elapsed_ms = self.hold.as_millis() as u64;
        if job.url.contains("panic") {
            panic!("stub worker died on {}", job.url);
        }
        if job.url.contains("fail") {
            return JobOutcome::failure(FailureKind::Fetch, "stub fetch failed", elapsed_ms);
        }
        JobOutcome::success(format!("stub://{}/{}", job.batch_id, job.index), elapsed_ms)
    }
}

//! Worker execution: run one job through fetch, transform, and persist.
//!
//! Every path produces exactly one [`JobOutcome`]. Panics are not caught
//! here; the dispatch queue supervises each execution and maps a dead
//! execution to a `crash` failure.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use imgbatch_core::job::{FailureKind, Job, JobOutcome};
use imgbatch_pipeline::{FetchError, Pipeline};

/// Hard ceiling on a single fetch, independent of the fetcher's own timeout.
pub const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(10);

/// Something that can execute a job to its terminal outcome.
#[async_trait]
pub trait JobRunner: Send + Sync {
    async fn run(&self, job: Job) -> JobOutcome;
}

/// Production runner backed by a [`Pipeline`].
pub struct PipelineRunner {
    pipeline: Pipeline,
    fetch_timeout: Duration,
}

impl PipelineRunner {
    pub fn new(pipeline: Pipeline, fetch_timeout: Duration) -> Self {
        Self {
            pipeline,
            fetch_timeout,
        }
    }
}

#[async_trait]
impl JobRunner for PipelineRunner {
    async fn run(&self, job: Job) -> JobOutcome {
        execute(&self.pipeline, &job, self.fetch_timeout).await
    }
}

/// Execute one job. Elapsed time is measured from job start for every
/// outcome, successful or not.
pub async fn execute(pipeline: &Pipeline, job: &Job, fetch_timeout: Duration) -> JobOutcome {
    let started = Instant::now();

    let fetched = tokio::time::timeout(fetch_timeout, pipeline.fetcher.fetch(&job.url)).await;
    let source = match fetched {
        Ok(Ok(bytes)) => bytes,
        Ok(Err(e)) => return failed(job, FailureKind::Fetch, e.to_string(), started),
        Err(_) => {
            let e = FetchError::Timeout(fetch_timeout);
            return failed(job, FailureKind::Fetch, e.to_string(), started);
        }
    };

    let transformed = match pipeline.transformer.transform(source).await {
        Ok(bytes) => bytes,
        Err(e) => return failed(job, FailureKind::Transform, e.to_string(), started),
    };

    match pipeline.store.store(job, &transformed).await {
        Ok(stored_path) => {
            let elapsed_ms = elapsed_ms(started);
            tracing::debug!(
                batch_id = %job.batch_id,
                job_index = job.index,
                stored_path = %stored_path,
                elapsed_ms,
                "Processed image",
            );
            JobOutcome::success(stored_path, elapsed_ms)
        }
        Err(e) => failed(job, FailureKind::Persist, e.to_string(), started),
    }
}

fn failed(job: &Job, kind: FailureKind, reason: String, started: Instant) -> JobOutcome {
    let elapsed_ms = elapsed_ms(started);
    tracing::warn!(
        batch_id = %job.batch_id,
        job_index = job.index,
        url = %job.url,
        stage = %kind,
        error = %reason,
        "Error processing image",
    );
    JobOutcome::failure(kind, reason, elapsed_ms)
}

pub(crate) fn elapsed_ms(started: Instant) -> u64 {
    u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX)
}

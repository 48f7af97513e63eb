//! Job scheduling for image batches.
//!
//! - [`DispatchQueue`] -- FIFO pending sequence plus a global ceiling on
//!   simultaneously active jobs.
//! - [`execution`] -- runs one job through fetch, transform, and persist.
//! - [`BatchCoordinator`] -- admits batches, records outcomes, finalizes.
//! - [`ProgressReporter`] -- read-only status projection over the ledger.
//!
//! A crashed execution is a terminal `crash` failure for its job; there is
//! no automatic retry.

pub mod coordinator;
pub mod dispatch;
pub mod execution;
pub mod progress;

#[cfg(test)]
mod test_support;

pub use coordinator::{BatchCoordinator, BatchHandle, BatchReport};
pub use dispatch::{DispatchQueue, QueueStats, DEFAULT_MAX_WORKERS};
pub use execution::{JobRunner, PipelineRunner, DEFAULT_FETCH_TIMEOUT};
pub use progress::ProgressReporter;

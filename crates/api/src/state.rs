use std::sync::Arc;
use std::time::Duration;

use imgbatch_db::Ledger;
use imgbatch_events::EventBus;
use imgbatch_worker::{BatchCoordinator, DispatchQueue, JobRunner, ProgressReporter};

use crate::config::ServerConfig;
use crate::middleware::rate_limit::RateLimiter;

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// This is cheaply cloneable (inner data is behind `Arc` or is already `Clone`).
#[derive(Clone)]
pub struct AppState {
    /// Server configuration.
    pub config: Arc<ServerConfig>,
    /// Admits batches and drives them to completion.
    pub coordinator: Arc<BatchCoordinator>,
    /// Read-only status lookups.
    pub reporter: ProgressReporter,
    /// Shared job pool, exposed for health reporting.
    pub queue: Arc<DispatchQueue>,
    /// Scheduler lifecycle events.
    pub event_bus: Arc<EventBus>,
    /// Per-client request budget for the batch endpoints.
    pub rate_limiter: Arc<RateLimiter>,
}

impl AppState {
    /// Wire the scheduler together around `ledger` and `runner`.
    pub fn new(
        config: ServerConfig,
        ledger: Arc<Ledger>,
        runner: Arc<dyn JobRunner>,
        event_bus: Arc<EventBus>,
    ) -> Self {
        let queue = DispatchQueue::new(config.max_workers, runner, Arc::clone(&event_bus));
        let coordinator = BatchCoordinator::new(
            Arc::clone(&ledger),
            Arc::clone(&queue),
            Arc::clone(&event_bus),
        );
        let rate_limiter = RateLimiter::new(
            config.rate_limit_max,
            Duration::from_secs(config.rate_limit_window_secs),
        );

        Self {
            config: Arc::new(config),
            coordinator: Arc::new(coordinator),
            reporter: ProgressReporter::new(ledger),
            queue,
            event_bus,
            rate_limiter: Arc::new(rate_limiter),
        }
    }
}

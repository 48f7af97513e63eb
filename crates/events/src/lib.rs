//! Scheduler event bus.
//!
//! - [`EventBus`] -- in-process publish/subscribe hub backed by
//!   `tokio::sync::broadcast`.
//! - [`SchedulerEvent`] -- the event envelope (batch id, job index, payload).
//! - [`EventLog`] -- background subscriber that mirrors events to `tracing`.

pub mod bus;
pub mod log;

pub use bus::{EventBus, SchedulerEvent};
pub use log::EventLog;

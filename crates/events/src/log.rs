//! Mirrors scheduler events into the tracing log.
//!
//! [`EventLog`] subscribes to the [`EventBus`](crate::bus::EventBus) and
//! emits one structured log line per event. It runs as a long-lived
//! background task and exits when the bus sender is dropped.

use tokio::sync::broadcast;

use crate::bus::{SchedulerEvent, EVENT_BATCH_ADMITTED, EVENT_BATCH_COMPLETED};

/// Background service that logs scheduler events.
pub struct EventLog;

impl EventLog {
    /// Run the logging loop until the channel closes.
    pub async fn run(mut receiver: broadcast::Receiver<SchedulerEvent>) {
        loop {
            match receiver.recv().await {
                Ok(event) => Self::log(&event),
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    tracing::warn!(skipped = n, "Event log lagged, some events were not logged");
                }
                Err(broadcast::error::RecvError::Closed) => {
                    tracing::info!("Event bus closed, event log shutting down");
                    break;
                }
            }
        }
    }

    fn log(event: &SchedulerEvent) {
        let batch_id = event.batch_id.as_deref().unwrap_or("-");
        match event.event_type.as_str() {
            // Batch boundaries are rare enough to log at INFO.
            EVENT_BATCH_ADMITTED | EVENT_BATCH_COMPLETED => tracing::info!(
                event_type = %event.event_type,
                batch_id,
                payload = %event.payload,
                "Scheduler event",
            ),
            _ => tracing::debug!(
                event_type = %event.event_type,
                batch_id,
                job_index = event.job_index,
                payload = %event.payload,
                "Scheduler event",
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::bus::{EventBus, EVENT_JOB_SETTLED};

    #[tokio::test]
    async fn run_exits_when_bus_is_dropped() {
        let bus = EventBus::default();
        let handle = tokio::spawn(EventLog::run(bus.subscribe()));

        bus.publish(SchedulerEvent::new(EVENT_JOB_SETTLED).with_job("b1", 0));
        drop(bus);

        tokio::time::timeout(Duration::from_secs(2), handle)
            .await
            .expect("event log should stop after the bus closes")
            .unwrap();
    }
}

//! In-process event bus.

use tokio::sync::broadcast;
use crate::events::{EventSink, WorkerEvent};

/// Broadcasts worker events to every subscriber.
///
/// Slow subscribers lag and lose the oldest events rather than blocking
/// the scheduler.
#[derive(Debug, Clone)]
pub struct EventBus {
    tx: broadcast::Sender<WorkerEvent>,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<WorkerEvent> {
        self.tx.subscribe()
    }

    pub fn receiver_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(256)
    }
}

impl EventSink for EventBus {
    fn publish(&self, event: WorkerEvent) {
        // No subscribers is fine.
        if self.tx.send(event).is_err() {
            tracing::trace!("Worker event dropped: no subscribers");
        }
    }
}

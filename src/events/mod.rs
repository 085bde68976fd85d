//! Worker lifecycle events.
//!
//! # Data Flow
//! ```text
//! SchedulerCore (spawn / commit / kill / exit watcher)
//!     → EventSink::publish(WorkerEvent)
//!     → bus.rs (tokio broadcast) or any host-provided sink
//! ```
//!
//! # Design Decisions
//! - Publishing is fire-and-forget; a sink never fails the scheduler
//! - Events are serializable so hosts can forward them as JSON

pub mod bus;

use serde::Serialize;
use crate::scheduler::worker::WorkerId;

pub use bus::EventBus;

/// Something that happened to a worker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum WorkerEvent {
    /// A launch was requested for a cold app.
    Spawning { app: String, worker: WorkerId },
    /// The launch succeeded and the worker joined the pool.
    Started { app: String, worker: WorkerId },
    /// The launch failed; the pool for the app is empty again.
    SpawnFailed {
        app: String,
        worker: WorkerId,
        error: String,
    },
    /// The worker was marked killed and no longer receives traffic.
    Killed { app: String, worker: WorkerId },
    /// The worker's process exited and it left the pool.
    Exited { app: String, worker: WorkerId },
}

impl WorkerEvent {
    pub fn app(&self) -> &str {
        match self {
            WorkerEvent::Spawning { app, .. }
            | WorkerEvent::Started { app, .. }
            | WorkerEvent::SpawnFailed { app, .. }
            | WorkerEvent::Killed { app, .. }
            | WorkerEvent::Exited { app, .. } => app,
        }
    }

    pub fn worker(&self) -> WorkerId {
        match self {
            WorkerEvent::Spawning { worker, .. }
            | WorkerEvent::Started { worker, .. }
            | WorkerEvent::SpawnFailed { worker, .. }
            | WorkerEvent::Killed { worker, .. }
            | WorkerEvent::Exited { worker, .. } => *worker,
        }
    }
}

/// Write-only destination for lifecycle events.
pub trait EventSink: Send + Sync {
    fn publish(&self, event: WorkerEvent);
}

/// Discards every event.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl EventSink for NullSink {
    fn publish(&self, _event: WorkerEvent) {}
}

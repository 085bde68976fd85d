//! Scheduler error types.

use thiserror::Error;

/// Errors returned synchronously by the scheduler.
#[derive(Debug, Error)]
pub enum SchedulerError {
    /// The least-loaded worker is already at the app's request ceiling.
    #[error("app {app} is at capacity: load {load} >= max_requests {max_requests}")]
    CapacityExceeded {
        app: String,
        load: usize,
        max_requests: usize,
    },

    /// No application with this key is present in the catalog.
    #[error("unknown app: {0}")]
    UnknownApp(String),

    /// A spawn was needed but no tokio runtime is available to drive it.
    #[error("no tokio runtime available to drive worker spawn for app {0}")]
    NoRuntime(String),
}

/// Result type for scheduler operations.
pub type SchedulerResult<T> = Result<T, SchedulerError>;

/// Failure of a worker spawn, delivered through the worker's handle.
///
/// Cloneable so every request waiting on the same spawn observes the same error.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SpawnError {
    /// The launcher reported a failure.
    #[error("launch failed: {0}")]
    Launch(String),

    /// The task driving the spawn went away before resolving the handle.
    #[error("spawn abandoned before the worker handle resolved")]
    Abandoned,

    /// The worker was killed while it was still launching.
    #[error("worker killed before it started")]
    Killed,
}

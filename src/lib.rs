//! Request-to-worker dispatcher for an application server.
//!
//! Each hosted app runs in one or more worker processes. For every request
//! the scheduler picks the least-loaded worker of the app, enforces the app's
//! per-worker request ceiling on session-opening traffic, and starts exactly
//! one worker when the app has none.

pub mod app;
pub mod config;
pub mod error;
pub mod events;
pub mod lifecycle;
pub mod observability;
pub mod scheduler;

pub use app::{AppCatalog, AppSpec};
pub use config::SchedulerConfig;
pub use error::{SchedulerError, SchedulerResult, SpawnError};
pub use events::{EventBus, EventSink, WorkerEvent};
pub use lifecycle::{Shutdown, ShutdownSignal};
pub use scheduler::{Launcher, ProcessHandle, RouteClass, SchedulerCore, WorkerEntry, WorkerPool};

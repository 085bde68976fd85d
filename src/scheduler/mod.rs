//! Request-to-worker scheduling.
//!
//! # Data Flow
//! ```text
//! Request (app key, route token)
//!     → route.rs (Root / WebSocket / Other)
//!     → dispatcher.rs acquire_worker
//!         → pool.rs (lock app, live workers)
//!         → empty: launcher.rs spawn, or join the in-flight spawn
//!         → else least_load.rs (smallest total load; ties by route admission load, then oldest)
//!         → admission check for Root / WebSocket against max_requests
//!     → WorkerEntry (worker.rs); caller awaits handle.rs for the process
//! ```
//!
//! # Design Decisions
//! - The decision runs under one per-app lock and never suspends
//! - Capacity rejection is synchronous; spawn failure arrives via the handle
//! - A full pool is a hard limit: rejection never triggers a spawn
//! - Other-class traffic is never rejected here

pub mod dispatcher;
pub mod handle;
pub mod launcher;
pub mod least_load;
pub mod pool;
pub mod route;
pub mod worker;

pub use dispatcher::SchedulerCore;
pub use handle::{HandleState, ProcessHandle, WorkerHandle};
pub use launcher::{LaunchResult, Launcher};
pub use least_load::{LeastLoaded, WorkerSelector};
pub use pool::WorkerPool;
pub use route::RouteClass;
pub use worker::{ConnectionGuard, ConnectionKind, WorkerEntry, WorkerId, WorkerSnapshot, WorkerState};

//! Scheduler metrics.
//!
//! # Metrics
//! - `scheduler_acquire_total` (counter): acquire outcomes by app, route, outcome
//! - `scheduler_spawn_total` (counter): launch outcomes by app
//! - `scheduler_workers` (gauge): registered workers per app
//!
//! Recording is a no-op until the host installs a `metrics` recorder.

use crate::scheduler::route::RouteClass;

/// How an acquire call ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AcquireOutcome {
    /// An existing worker was returned.
    Admitted,
    /// Rejected at capacity.
    Rejected,
    /// A new spawn was started.
    Spawned,
    /// Joined a spawn already in flight.
    Joined,
}

impl AcquireOutcome {
    pub fn as_str(self) -> &'static str {
        match self {
            AcquireOutcome::Admitted => "admitted",
            AcquireOutcome::Rejected => "rejected",
            AcquireOutcome::Spawned => "spawned",
            AcquireOutcome::Joined => "joined",
        }
    }
}

pub fn record_acquire(app: &str, route: RouteClass, outcome: AcquireOutcome) {
    metrics::counter!(
        "scheduler_acquire_total",
        "app" => app.to_string(),
        "route" => route.as_str(),
        "outcome" => outcome.as_str()
    )
    .increment(1);
}

pub fn record_spawn(app: &str, success: bool) {
    let outcome = if success { "success" } else { "failure" };
    metrics::counter!("scheduler_spawn_total", "app" => app.to_string(), "outcome" => outcome)
        .increment(1);
}

pub fn record_worker_count(app: &str, count: usize) {
    metrics::gauge!("scheduler_workers", "app" => app.to_string()).set(count as f64);
}

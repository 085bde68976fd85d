//! Least-load worker selection.

use std::sync::Arc;
use crate::scheduler::route::RouteClass;
use crate::scheduler::worker::WorkerEntry;

/// Strategy that picks one worker out of an app's live workers.
pub trait WorkerSelector: Send + Sync + std::fmt::Debug {
    fn select(&self, workers: &[Arc<WorkerEntry>], route: RouteClass) -> Option<Arc<WorkerEntry>>;
}

/// Selects the worker with the smallest total load.
///
/// Among workers with equal total load, the one with the smallest load as
/// seen by `route`'s admission check wins, so a websocket request prefers a
/// worker whose load is partly pending connections. Remaining ties go to the
/// oldest worker.
#[derive(Debug, Default)]
pub struct LeastLoaded;

impl LeastLoaded {
    pub fn new() -> Self {
        Self
    }
}

impl WorkerSelector for LeastLoaded {
    fn select(&self, workers: &[Arc<WorkerEntry>], route: RouteClass) -> Option<Arc<WorkerEntry>> {
        // min_by_key keeps the first of equal minima.
        workers
            .iter()
            .filter(|w| !w.is_killed())
            .min_by_key(|w| (w.total_load(), w.admission_load(route)))
            .cloned()
    }
}

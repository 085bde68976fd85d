//! Worker pool management.
//!
//! # Responsibilities
//! - Keep each app's workers in creation order
//! - Hold at most one in-flight spawn per app
//! - Give the scheduler one lock per app for read-decide-commit

use std::sync::Arc;
use dashmap::mapref::one::RefMut;
use dashmap::DashMap;
use crate::error::SpawnError;
use crate::scheduler::handle::{HandleResolver, ProcessHandle};
use crate::scheduler::worker::{WorkerEntry, WorkerId, WorkerSnapshot};

/// Returned by `register_spawning` when a spawn for the app is already
/// outstanding. Carries the in-flight entry so the caller can wait on it.
#[derive(Debug, Clone)]
pub struct SpawnAlreadyInFlight(pub Arc<WorkerEntry>);

#[derive(Debug)]
struct InFlight {
    entry: Arc<WorkerEntry>,
    resolver: HandleResolver,
}

/// Workers of a single application.
#[derive(Debug, Default)]
pub struct AppWorkers {
    entries: Vec<Arc<WorkerEntry>>,
    spawning: Option<InFlight>,
}

impl AppWorkers {
    /// Non-killed workers in creation order.
    pub fn live(&self) -> Vec<Arc<WorkerEntry>> {
        self.entries
            .iter()
            .filter(|e| !e.is_killed())
            .cloned()
            .collect()
    }

    /// The entry of the outstanding spawn, if any.
    pub fn in_flight(&self) -> Option<&Arc<WorkerEntry>> {
        self.spawning.as_ref().map(|s| &s.entry)
    }

    /// Take the spawn lock for `app_key` and create the pending entry.
    pub fn register_spawning(&mut self, app_key: &str) -> Result<Arc<WorkerEntry>, SpawnAlreadyInFlight> {
        if let Some(in_flight) = &self.spawning {
            return Err(SpawnAlreadyInFlight(in_flight.entry.clone()));
        }
        let (entry, resolver) = WorkerEntry::spawning(app_key);
        let entry = Arc::new(entry);
        self.spawning = Some(InFlight {
            entry: entry.clone(),
            resolver,
        });
        Ok(entry)
    }

    /// Release the spawn lock if it is held by worker `id`.
    fn take_in_flight(&mut self, id: WorkerId) -> Option<InFlight> {
        if self.spawning.as_ref()?.entry.id() != id {
            return None;
        }
        self.spawning.take()
    }

    /// Append the in-flight entry `id`, release the spawn lock and wake its
    /// waiters. Returns `None` if `id` no longer holds the lock, e.g. because
    /// it was killed while launching.
    pub fn commit(&mut self, id: WorkerId, process: Arc<dyn ProcessHandle>) -> Option<Arc<WorkerEntry>> {
        let InFlight { entry, resolver } = self.take_in_flight(id)?;
        entry.mark_ready();
        self.entries.push(entry.clone());
        resolver.resolve(process);
        Some(entry)
    }

    /// Release the spawn lock held by `id` without adding an entry; waiters get `err`.
    pub fn abort_spawn(&mut self, id: WorkerId, err: SpawnError) -> Option<Arc<WorkerEntry>> {
        let InFlight { entry, resolver } = self.take_in_flight(id)?;
        entry.mark_killed();
        resolver.fail(err);
        Some(entry)
    }

    /// Mark worker `id` killed so it is never selected again. Killing the
    /// in-flight entry aborts its spawn with [`SpawnError::Killed`].
    ///
    /// Returns the entry only if this call killed it.
    pub fn kill(&mut self, id: WorkerId) -> Option<Arc<WorkerEntry>> {
        if self.in_flight().is_some_and(|e| e.id() == id) {
            return self.abort_spawn(id, SpawnError::Killed);
        }
        let entry = self.entries.iter().find(|e| e.id() == id)?;
        entry.mark_killed().then(|| entry.clone())
    }

    /// Append an already running worker.
    pub fn push(&mut self, entry: Arc<WorkerEntry>) {
        self.entries.push(entry);
    }

    pub fn remove(&mut self, id: WorkerId) -> Option<Arc<WorkerEntry>> {
        let idx = self.entries.iter().position(|e| e.id() == id)?;
        Some(self.entries.remove(idx))
    }

    /// Find a worker by id, including the one being spawned.
    pub fn find(&self, id: WorkerId) -> Option<Arc<WorkerEntry>> {
        self.entries
            .iter()
            .chain(self.in_flight())
            .find(|e| e.id() == id)
            .cloned()
    }

    /// Number of registered workers, killed ones included.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Registry of workers for all apps, keyed by app key.
#[derive(Debug, Default)]
pub struct WorkerPool {
    apps: DashMap<String, AppWorkers>,
}

impl WorkerPool {
    pub fn new() -> Self {
        Self::default()
    }

    /// Lock one app's workers. Do not call other pool methods for the same
    /// app while holding the guard.
    pub fn lock(&self, app_key: &str) -> RefMut<'_, String, AppWorkers> {
        self.apps.entry(app_key.to_string()).or_default()
    }

    /// Non-killed workers of the app in creation order.
    pub fn entries_for(&self, app_key: &str) -> Vec<Arc<WorkerEntry>> {
        self.apps
            .get(app_key)
            .map(|app| app.live())
            .unwrap_or_default()
    }

    pub fn register_spawning(&self, app_key: &str) -> Result<Arc<WorkerEntry>, SpawnAlreadyInFlight> {
        self.lock(app_key).register_spawning(app_key)
    }

    pub fn commit(&self, app_key: &str, id: WorkerId, process: Arc<dyn ProcessHandle>) -> Option<Arc<WorkerEntry>> {
        self.apps.get_mut(app_key)?.commit(id, process)
    }

    pub fn abort_spawn(&self, app_key: &str, id: WorkerId, err: SpawnError) -> Option<Arc<WorkerEntry>> {
        self.apps.get_mut(app_key)?.abort_spawn(id, err)
    }

    pub fn kill(&self, app_key: &str, id: WorkerId) -> Option<Arc<WorkerEntry>> {
        self.apps.get_mut(app_key)?.kill(id)
    }

    /// Register a worker whose process is already running.
    pub fn insert_ready(&self, app_key: &str, process: Arc<dyn ProcessHandle>) -> Arc<WorkerEntry> {
        let entry = Arc::new(WorkerEntry::ready(app_key, process));
        self.lock(app_key).push(entry.clone());
        entry
    }

    /// Drop a worker from the pool, typically after its process exited.
    pub fn remove(&self, app_key: &str, id: WorkerId) -> Option<Arc<WorkerEntry>> {
        self.apps.get_mut(app_key)?.remove(id)
    }

    pub fn find(&self, app_key: &str, id: WorkerId) -> Option<Arc<WorkerEntry>> {
        self.apps.get(app_key)?.find(id)
    }

    /// Registered workers for the app, killed ones included.
    pub fn len(&self, app_key: &str) -> usize {
        self.apps.get(app_key).map(|app| app.len()).unwrap_or(0)
    }

    /// Keys of all apps the pool has seen.
    pub fn apps(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.apps.iter().map(|r| r.key().clone()).collect();
        keys.sort();
        keys
    }

    pub fn snapshot(&self, app_key: &str) -> Vec<WorkerSnapshot> {
        self.apps
            .get(app_key)
            .map(|app| app.entries.iter().map(|e| e.snapshot()).collect())
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures_util::future::{self, BoxFuture, FutureExt};
    use crate::scheduler::worker::WorkerState;

    #[derive(Debug)]
    struct Idle;

    impl ProcessHandle for Idle {
        fn target(&self) -> &str {
            "idle"
        }

        fn exited(&self) -> BoxFuture<'static, ()> {
            future::pending().boxed()
        }
    }

    #[test]
    fn test_single_spawn_per_app() {
        let pool = WorkerPool::new();
        let first = pool.register_spawning("app").unwrap();
        let joined = pool.register_spawning("app").unwrap_err();
        assert_eq!(joined.0.id(), first.id());

        // Other apps are independent.
        assert!(pool.register_spawning("other").is_ok());

        // Spawning entries are not selectable yet.
        assert!(pool.entries_for("app").is_empty());
    }

    #[tokio::test]
    async fn test_commit_appends_and_resolves() {
        let pool = WorkerPool::new();
        let entry = pool.register_spawning("app").unwrap();
        let committed = pool.commit("app", entry.id(), Arc::new(Idle)).unwrap();

        assert_eq!(committed.id(), entry.id());
        assert_eq!(entry.state(), WorkerState::Ready);
        assert_eq!(pool.entries_for("app").len(), 1);
        assert_eq!(entry.handle().wait().await.unwrap().target(), "idle");

        // The spawn lock was released.
        assert!(pool.register_spawning("app").is_ok());
    }

    #[tokio::test]
    async fn test_abort_releases_lock() {
        let pool = WorkerPool::new();
        let entry = pool.register_spawning("app").unwrap();
        pool.abort_spawn("app", entry.id(), SpawnError::Launch("no ports".into()));

        assert!(pool.entries_for("app").is_empty());
        assert_eq!(
            entry.handle().wait().await.unwrap_err(),
            SpawnError::Launch("no ports".into())
        );
        assert!(pool.register_spawning("app").is_ok());
    }

    #[tokio::test]
    async fn test_stale_spawn_cannot_settle_newer_one() {
        let pool = WorkerPool::new();
        let stale = pool.register_spawning("app").unwrap();
        assert!(pool.kill("app", stale.id()).is_some());
        assert_eq!(stale.handle().wait().await.unwrap_err(), SpawnError::Killed);

        let fresh = pool.register_spawning("app").unwrap();
        assert!(pool.commit("app", stale.id(), Arc::new(Idle)).is_none());
        assert!(pool.abort_spawn("app", stale.id(), SpawnError::Abandoned).is_none());
        assert!(fresh.handle().is_pending());

        assert!(pool.commit("app", fresh.id(), Arc::new(Idle)).is_some());
        assert_eq!(pool.entries_for("app").len(), 1);
        assert_eq!(pool.entries_for("app")[0].id(), fresh.id());
    }

    #[test]
    fn test_kill_only_once() {
        let pool = WorkerPool::new();
        let a = pool.insert_ready("app", Arc::new(Idle));
        assert!(pool.kill("app", a.id()).is_some());
        assert!(pool.kill("app", a.id()).is_none());
        assert!(pool.kill("missing", a.id()).is_none());
        assert_eq!(pool.len("app"), 1);
    }

    #[test]
    fn test_killed_entries_filtered_and_removed() {
        let pool = WorkerPool::new();
        let a = pool.insert_ready("app", Arc::new(Idle));
        let b = pool.insert_ready("app", Arc::new(Idle));

        a.mark_killed();
        let live = pool.entries_for("app");
        assert_eq!(live.len(), 1);
        assert_eq!(live[0].id(), b.id());
        assert_eq!(pool.len("app"), 2);

        assert!(pool.remove("app", a.id()).is_some());
        assert!(pool.remove("app", a.id()).is_none());
        assert_eq!(pool.len("app"), 1);
        assert_eq!(pool.snapshot("app")[0].id, b.id());
        assert_eq!(pool.apps(), vec!["app".to_string()]);
    }
}

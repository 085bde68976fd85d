//! Worker acquisition: selection, admission control, spawn coordination.

use std::sync::Arc;
use tokio::runtime::Handle;
use crate::app::{AppCatalog, AppSpec};
use crate::config::ObservabilityConfig;
use crate::error::{SchedulerError, SchedulerResult, SpawnError};
use crate::events::{EventSink, NullSink, WorkerEvent};
use crate::lifecycle::{Shutdown, ShutdownSignal};
use crate::observability::metrics::{self, AcquireOutcome};
use crate::scheduler::handle::ProcessHandle;
use crate::scheduler::launcher::{LaunchResult, Launcher};
use crate::scheduler::least_load::{LeastLoaded, WorkerSelector};
use crate::scheduler::pool::{SpawnAlreadyInFlight, WorkerPool};
use crate::scheduler::route::RouteClass;
use crate::scheduler::worker::{WorkerEntry, WorkerId};

enum Decision {
    Existing(Arc<WorkerEntry>),
    Spawn(Arc<WorkerEntry>),
    Join(Arc<WorkerEntry>),
}

/// Decides which worker serves a request for an app.
pub struct SchedulerCore {
    pool: Arc<WorkerPool>,
    launcher: Arc<dyn Launcher>,
    events: Arc<dyn EventSink>,
    selector: Box<dyn WorkerSelector>,
    catalog: Option<Arc<AppCatalog>>,
    shutdown: Arc<Shutdown>,
    metrics_enabled: bool,
}

impl SchedulerCore {
    pub fn new(pool: Arc<WorkerPool>, launcher: Arc<dyn Launcher>) -> Self {
        Self {
            pool,
            launcher,
            events: Arc::new(NullSink),
            selector: Box::new(LeastLoaded::new()),
            catalog: None,
            shutdown: Arc::new(Shutdown::new()),
            metrics_enabled: true,
        }
    }

    pub fn with_events(mut self, events: Arc<dyn EventSink>) -> Self {
        self.events = events;
        self
    }

    pub fn with_selector(mut self, selector: Box<dyn WorkerSelector>) -> Self {
        self.selector = selector;
        self
    }

    /// Resolve app keys through `catalog` in [`acquire_by_key`](Self::acquire_by_key).
    pub fn with_catalog(mut self, catalog: Arc<AppCatalog>) -> Self {
        self.catalog = Some(catalog);
        self
    }

    pub fn with_shutdown(mut self, shutdown: Arc<Shutdown>) -> Self {
        self.shutdown = shutdown;
        self
    }

    pub fn with_metrics(mut self, enabled: bool) -> Self {
        self.metrics_enabled = enabled;
        self
    }

    /// Apply the `[observability]` settings that concern the scheduler.
    pub fn with_observability(self, config: &ObservabilityConfig) -> Self {
        self.with_metrics(config.metrics_enabled)
    }

    pub fn metrics_enabled(&self) -> bool {
        self.metrics_enabled
    }

    pub fn pool(&self) -> &Arc<WorkerPool> {
        &self.pool
    }

    /// Pick a worker for a request of class `route` to `app`.
    ///
    /// Returns immediately. When the app has no live worker, the returned
    /// entry is still spawning and its handle settles once the launch does;
    /// concurrent cold requests all get the same spawning entry.
    ///
    /// Fails with [`SchedulerError::CapacityExceeded`] when the least-loaded
    /// worker is already at the app's ceiling for a root or websocket
    /// request. No extra worker is spawned in that case.
    pub fn acquire_worker(&self, app: &AppSpec, route: RouteClass) -> SchedulerResult<Arc<WorkerEntry>> {
        let key = app.key();

        let decision = {
            let mut workers = self.pool.lock(key);
            let live = workers.live();

            match self.selector.select(&live, route) {
                Some(best) => {
                    if let Err(err) = self.admit(app, route, &best) {
                        drop(workers);
                        self.record_acquire(key, route, AcquireOutcome::Rejected);
                        return Err(err);
                    }
                    Decision::Existing(best)
                }
                None => match workers.in_flight() {
                    Some(entry) => Decision::Join(entry.clone()),
                    None => {
                        if Handle::try_current().is_err() {
                            return Err(SchedulerError::NoRuntime(key.to_string()));
                        }
                        match workers.register_spawning(key) {
                            Ok(entry) => Decision::Spawn(entry),
                            Err(SpawnAlreadyInFlight(entry)) => Decision::Join(entry),
                        }
                    }
                },
            }
        };

        match decision {
            Decision::Existing(best) => {
                tracing::debug!(
                    app = %key,
                    route = %route,
                    worker = %best.id(),
                    load = best.total_load(),
                    "Worker selected"
                );
                self.record_acquire(key, route, AcquireOutcome::Admitted);
                Ok(best)
            }
            Decision::Join(entry) => {
                tracing::debug!(app = %key, worker = %entry.id(), "Joining in-flight spawn");
                self.record_acquire(key, route, AcquireOutcome::Joined);
                Ok(entry)
            }
            Decision::Spawn(entry) => {
                self.start_spawn(app, &entry);
                self.record_acquire(key, route, AcquireOutcome::Spawned);
                Ok(entry)
            }
        }
    }

    /// Like [`acquire_worker`](Self::acquire_worker), looking the app up by key.
    pub fn acquire_by_key(&self, app_key: &str, route: RouteClass) -> SchedulerResult<Arc<WorkerEntry>> {
        let app = self
            .catalog
            .as_ref()
            .and_then(|catalog| catalog.get(app_key))
            .ok_or_else(|| SchedulerError::UnknownApp(app_key.to_string()))?;
        self.acquire_worker(&app, route)
    }

    fn admit(&self, app: &AppSpec, route: RouteClass, best: &WorkerEntry) -> SchedulerResult<()> {
        if !route.is_admission_controlled() || app.is_unlimited() {
            return Ok(());
        }

        let load = best.admission_load(route);
        if load >= app.max_requests() {
            tracing::warn!(
                app = %app.key(),
                route = %route,
                worker = %best.id(),
                load,
                max_requests = app.max_requests(),
                "App at capacity, rejecting request"
            );
            return Err(SchedulerError::CapacityExceeded {
                app: app.key().to_string(),
                load,
                max_requests: app.max_requests(),
            });
        }
        Ok(())
    }

    fn start_spawn(&self, app: &AppSpec, entry: &Arc<WorkerEntry>) {
        tracing::info!(app = %app.key(), worker = %entry.id(), "Spawning worker");
        self.events.publish(WorkerEvent::Spawning {
            app: app.key().to_string(),
            worker: entry.id(),
        });

        let launch = self.launcher.spawn(app);
        let ctx = self.spawn_context(app.key(), entry.id());
        tokio::spawn(ctx.drive(launch));
    }

    /// Register a worker process that is already running, e.g. one started
    /// before this scheduler. It is removed again when the process exits.
    ///
    /// Watching for that exit needs a tokio runtime; without one nothing is
    /// registered and [`SchedulerError::NoRuntime`] is returned.
    pub fn adopt(&self, app_key: &str, process: Arc<dyn ProcessHandle>) -> SchedulerResult<Arc<WorkerEntry>> {
        if Handle::try_current().is_err() {
            return Err(SchedulerError::NoRuntime(app_key.to_string()));
        }

        let entry = self.pool.insert_ready(app_key, process.clone());
        tracing::info!(app = %app_key, worker = %entry.id(), endpoint = %process.target(), "Worker adopted");

        let ctx = self.spawn_context(app_key, entry.id());
        tokio::spawn(ctx.watch_exit(process, self.shutdown.subscribe()));
        if self.metrics_enabled {
            metrics::record_worker_count(app_key, self.pool.len(app_key));
        }
        Ok(entry)
    }

    /// Stop routing new work to a worker. A worker that is still launching
    /// has its spawn aborted, so its waiters fail with
    /// [`SpawnError::Killed`] and the next request starts a fresh spawn.
    ///
    /// Returns false if the worker was unknown or already killed.
    pub fn kill_worker(&self, app_key: &str, worker: WorkerId) -> bool {
        if self.pool.kill(app_key, worker).is_none() {
            tracing::debug!(app = %app_key, worker = %worker, "Kill requested for unknown or killed worker");
            return false;
        }

        tracing::info!(app = %app_key, worker = %worker, "Worker killed");
        self.events.publish(WorkerEvent::Killed {
            app: app_key.to_string(),
            worker,
        });
        true
    }

    fn spawn_context(&self, app_key: &str, worker: WorkerId) -> SpawnContext {
        SpawnContext {
            pool: self.pool.clone(),
            events: self.events.clone(),
            shutdown: self.shutdown.clone(),
            app_key: app_key.to_string(),
            worker,
            metrics_enabled: self.metrics_enabled,
        }
    }

    fn record_acquire(&self, app: &str, route: RouteClass, outcome: AcquireOutcome) {
        if self.metrics_enabled {
            metrics::record_acquire(app, route, outcome);
        }
    }
}

/// What a spawn or exit-watch task needs from the scheduler.
struct SpawnContext {
    pool: Arc<WorkerPool>,
    events: Arc<dyn EventSink>,
    shutdown: Arc<Shutdown>,
    app_key: String,
    worker: WorkerId,
    metrics_enabled: bool,
}

/// Fails the in-flight spawn if the driving task is dropped before settling.
struct AbandonGuard {
    pool: Arc<WorkerPool>,
    app_key: String,
    worker: WorkerId,
    armed: bool,
}

impl Drop for AbandonGuard {
    fn drop(&mut self) {
        if self.armed {
            tracing::warn!(app = %self.app_key, worker = %self.worker, "Spawn task dropped before the launch settled");
            self.pool.abort_spawn(&self.app_key, self.worker, SpawnError::Abandoned);
        }
    }
}

impl SpawnContext {
    async fn drive(self, launch: futures_util::future::BoxFuture<'static, LaunchResult>) {
        let mut guard = AbandonGuard {
            pool: self.pool.clone(),
            app_key: self.app_key.clone(),
            worker: self.worker,
            armed: true,
        };
        let outcome = launch.await;
        guard.armed = false;

        match outcome {
            Ok(process) => {
                if self.pool.commit(&self.app_key, self.worker, process.clone()).is_none() {
                    // Killed while launching; the process is never handed out.
                    tracing::warn!(
                        app = %self.app_key,
                        worker = %self.worker,
                        endpoint = %process.target(),
                        "Spawn no longer wanted, discarding launched process"
                    );
                    return;
                }
                tracing::info!(
                    app = %self.app_key,
                    worker = %self.worker,
                    endpoint = %process.target(),
                    "Worker started"
                );
                self.events.publish(WorkerEvent::Started {
                    app: self.app_key.clone(),
                    worker: self.worker,
                });
                if self.metrics_enabled {
                    metrics::record_spawn(&self.app_key, true);
                    metrics::record_worker_count(&self.app_key, self.pool.len(&self.app_key));
                }
                let shutdown = self.shutdown.subscribe();
                self.watch_exit(process, shutdown).await;
            }
            Err(err) => {
                self.pool.abort_spawn(&self.app_key, self.worker, err.clone());
                tracing::warn!(app = %self.app_key, worker = %self.worker, error = %err, "Worker spawn failed");
                self.events.publish(WorkerEvent::SpawnFailed {
                    app: self.app_key.clone(),
                    worker: self.worker,
                    error: err.to_string(),
                });
                if self.metrics_enabled {
                    metrics::record_spawn(&self.app_key, false);
                }
            }
        }
    }

    async fn watch_exit(self, process: Arc<dyn ProcessHandle>, mut shutdown: ShutdownSignal) {
        tokio::select! {
            _ = process.exited() => {}
            _ = shutdown.recv() => {
                tracing::debug!(app = %self.app_key, worker = %self.worker, "Exit watcher stopping on shutdown");
                return;
            }
        }

        if let Some(entry) = self.pool.remove(&self.app_key, self.worker) {
            entry.mark_killed();
        }
        tracing::info!(app = %self.app_key, worker = %self.worker, "Worker exited");
        self.events.publish(WorkerEvent::Exited {
            app: self.app_key.clone(),
            worker: self.worker,
        });
        if self.metrics_enabled {
            metrics::record_worker_count(&self.app_key, self.pool.len(&self.app_key));
        }
    }
}

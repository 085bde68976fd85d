//! Shared test doubles for scheduler integration tests.

#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use futures_util::future::{BoxFuture, FutureExt};
use tokio::sync::watch;
use worker_dispatcher::scheduler::{ConnectionKind, LaunchResult};
use worker_dispatcher::{AppSpec, Launcher, ProcessHandle, SchedulerCore, SpawnError, WorkerEntry};

/// A fake worker process that exits when told to.
#[derive(Debug)]
pub struct MockProcess {
    target: String,
    exit_tx: watch::Sender<bool>,
}

impl MockProcess {
    pub fn new(target: impl Into<String>) -> Arc<Self> {
        let (exit_tx, _) = watch::channel(false);
        Arc::new(Self {
            target: target.into(),
            exit_tx,
        })
    }

    pub fn exit(&self) {
        self.exit_tx.send_replace(true);
    }
}

impl ProcessHandle for MockProcess {
    fn target(&self) -> &str {
        &self.target
    }

    fn exited(&self) -> BoxFuture<'static, ()> {
        let mut rx = self.exit_tx.subscribe();
        async move {
            let _ = rx.wait_for(|exited| *exited).await;
        }
        .boxed()
    }
}

/// Launcher that counts calls and can hold launches until released.
#[derive(Debug)]
pub struct MockLauncher {
    calls: AtomicUsize,
    gate: watch::Sender<bool>,
    fail_with: Mutex<Option<String>>,
    processes: Mutex<Vec<Arc<MockProcess>>>,
}

impl MockLauncher {
    /// Launches complete as soon as they are polled.
    pub fn immediate() -> Arc<Self> {
        Self::build(true)
    }

    /// Launches stay pending until [`release`](Self::release).
    pub fn gated() -> Arc<Self> {
        Self::build(false)
    }

    fn build(open: bool) -> Arc<Self> {
        let (gate, _) = watch::channel(open);
        Arc::new(Self {
            calls: AtomicUsize::new(0),
            gate,
            fail_with: Mutex::new(None),
            processes: Mutex::new(Vec::new()),
        })
    }

    pub fn release(&self) {
        self.gate.send_replace(true);
    }

    /// Make the next launch fail with `msg`.
    pub fn fail_next(&self, msg: &str) {
        *self.fail_with.lock().unwrap() = Some(msg.to_string());
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn processes(&self) -> Vec<Arc<MockProcess>> {
        self.processes.lock().unwrap().clone()
    }
}

impl Launcher for MockLauncher {
    fn spawn(&self, app: &AppSpec) -> BoxFuture<'static, LaunchResult> {
        let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        let mut gate = self.gate.subscribe();
        let failure = self.fail_with.lock().unwrap().take();
        let process = MockProcess::new(format!("{}#{}", app.key(), n));
        if failure.is_none() {
            self.processes.lock().unwrap().push(process.clone());
        }

        async move {
            let _ = gate.wait_for(|open| *open).await;
            match failure {
                Some(msg) => Err(SpawnError::Launch(msg)),
                None => Ok(process as Arc<dyn ProcessHandle>),
            }
        }
        .boxed()
    }
}

/// Register a running worker with the given connection counts.
pub fn add_worker(
    scheduler: &SchedulerCore,
    app: &AppSpec,
    socket: usize,
    http: usize,
    pending: usize,
) -> Arc<WorkerEntry> {
    let entry = scheduler
        .pool()
        .insert_ready(app.key(), MockProcess::new(format!("{}-adopted", app.key())));
    let counts = [
        (ConnectionKind::Socket, socket),
        (ConnectionKind::Http, http),
        (ConnectionKind::Pending, pending),
    ];
    for (kind, n) in counts {
        for _ in 0..n {
            entry.connection_opened(kind);
        }
    }
    entry
}

/// Poll `cond` until it holds or a few seconds pass.
pub async fn eventually(mut cond: impl FnMut() -> bool) -> bool {
    for _ in 0..200 {
        if cond() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    cond()
}

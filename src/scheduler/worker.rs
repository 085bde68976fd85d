//! Worker entry abstraction.
//!
//! # Responsibilities
//! - Represent a single backend worker process of one app
//! - Track socket, HTTP and pending connection counts
//! - Compute fairness and admission load figures
//! - Track lifecycle state (Spawning/Ready/Killed)

use std::fmt;
use std::ops::Deref;
use std::sync::atomic::{AtomicU8, AtomicUsize, Ordering};
use std::sync::Arc;
use serde::Serialize;
use uuid::Uuid;
use crate::scheduler::handle::{HandleResolver, ProcessHandle, WorkerHandle};
use crate::scheduler::route::RouteClass;

/// Unique identity of a worker entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct WorkerId(Uuid);

impl WorkerId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for WorkerId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for WorkerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Worker lifecycle state.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkerState {
    Spawning = 0,
    Ready = 1,
    Killed = 2,
}

impl From<u8> for WorkerState {
    fn from(val: u8) -> Self {
        match val {
            1 => WorkerState::Ready,
            2 => WorkerState::Killed,
            _ => WorkerState::Spawning,
        }
    }
}

/// Category of a connection held against a worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConnectionKind {
    /// Live realtime socket.
    Socket,
    /// Persistent HTTP session.
    Http,
    /// Accepted handshake not yet promoted to a socket.
    Pending,
}

/// One backend worker process of an application.
#[derive(Debug)]
pub struct WorkerEntry {
    id: WorkerId,
    app_key: String,
    handle: WorkerHandle,
    socket_conns: AtomicUsize,
    http_conns: AtomicUsize,
    pending_conns: AtomicUsize,
    state: AtomicU8,
}

impl WorkerEntry {
    /// Create an entry for a worker that is still being launched.
    pub fn spawning(app_key: impl Into<String>) -> (Self, HandleResolver) {
        let (handle, resolver) = WorkerHandle::pending();
        (Self::build(app_key.into(), handle, WorkerState::Spawning), resolver)
    }

    /// Create an entry for a worker whose process is already running.
    pub fn ready(app_key: impl Into<String>, process: Arc<dyn ProcessHandle>) -> Self {
        Self::build(app_key.into(), WorkerHandle::ready(process), WorkerState::Ready)
    }

    fn build(app_key: String, handle: WorkerHandle, state: WorkerState) -> Self {
        Self {
            id: WorkerId::new(),
            app_key,
            handle,
            socket_conns: AtomicUsize::new(0),
            http_conns: AtomicUsize::new(0),
            pending_conns: AtomicUsize::new(0),
            state: AtomicU8::new(state as u8),
        }
    }

    pub fn id(&self) -> WorkerId {
        self.id
    }

    pub fn app_key(&self) -> &str {
        &self.app_key
    }

    /// The future side of this worker's process.
    pub fn handle(&self) -> &WorkerHandle {
        &self.handle
    }

    pub fn state(&self) -> WorkerState {
        WorkerState::from(self.state.load(Ordering::Acquire))
    }

    pub fn is_killed(&self) -> bool {
        self.state() == WorkerState::Killed
    }

    pub fn socket_conn_count(&self) -> usize {
        self.socket_conns.load(Ordering::Relaxed)
    }

    pub fn http_conn_count(&self) -> usize {
        self.http_conns.load(Ordering::Relaxed)
    }

    pub fn pending_conn_count(&self) -> usize {
        self.pending_conns.load(Ordering::Relaxed)
    }

    /// Load used to pick the least busy worker, whatever the route.
    pub fn total_load(&self) -> usize {
        self.socket_conn_count() + self.http_conn_count() + self.pending_conn_count()
    }

    /// Load compared against the app's request ceiling.
    ///
    /// A websocket request is usually the promotion of one of the pending
    /// handshakes, so pending slots are not charged against it.
    pub fn admission_load(&self, route: RouteClass) -> usize {
        match route {
            RouteClass::WebSocket => self.socket_conn_count() + self.http_conn_count(),
            RouteClass::Root | RouteClass::Other => self.total_load(),
        }
    }

    /// `Spawning → Ready`. Returns false if the entry was not spawning.
    pub fn mark_ready(&self) -> bool {
        self.state
            .compare_exchange(
                WorkerState::Spawning as u8,
                WorkerState::Ready as u8,
                Ordering::AcqRel,
                Ordering::Acquire,
            )
            .is_ok()
    }

    /// Exclude this worker from selection. Idempotent; returns true on the
    /// first call only.
    pub fn mark_killed(&self) -> bool {
        self.state.swap(WorkerState::Killed as u8, Ordering::AcqRel) != WorkerState::Killed as u8
    }

    fn counter(&self, kind: ConnectionKind) -> &AtomicUsize {
        match kind {
            ConnectionKind::Socket => &self.socket_conns,
            ConnectionKind::Http => &self.http_conns,
            ConnectionKind::Pending => &self.pending_conns,
        }
    }

    /// Record a newly opened connection.
    pub fn connection_opened(&self, kind: ConnectionKind) {
        self.counter(kind).fetch_add(1, Ordering::Relaxed);
    }

    /// Record a closed connection. The counter never goes below zero.
    pub fn connection_closed(&self, kind: ConnectionKind) {
        let res = self
            .counter(kind)
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |n| n.checked_sub(1));
        if res.is_err() {
            tracing::error!(
                worker = %self.id,
                app = %self.app_key,
                kind = ?kind,
                "Connection closed on a worker with no open connections of this kind"
            );
            debug_assert!(false, "connection counter underflow");
        }
    }

    /// Open a connection and get a guard that closes it on drop.
    pub fn open_connection(self: &Arc<Self>, kind: ConnectionKind) -> ConnectionGuard {
        self.connection_opened(kind);
        ConnectionGuard {
            entry: self.clone(),
            kind,
        }
    }

    pub fn snapshot(&self) -> WorkerSnapshot {
        WorkerSnapshot {
            id: self.id,
            app: self.app_key.clone(),
            state: self.state(),
            socket_conns: self.socket_conn_count(),
            http_conns: self.http_conn_count(),
            pending_conns: self.pending_conn_count(),
        }
    }
}

/// Point-in-time view of a worker for diagnostics.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WorkerSnapshot {
    pub id: WorkerId,
    pub app: String,
    pub state: WorkerState,
    pub socket_conns: usize,
    pub http_conns: usize,
    pub pending_conns: usize,
}

/// A RAII guard that holds one connection slot on a worker.
#[derive(Debug)]
pub struct ConnectionGuard {
    entry: Arc<WorkerEntry>,
    kind: ConnectionKind,
}

impl ConnectionGuard {
    pub fn kind(&self) -> ConnectionKind {
        self.kind
    }

    /// Turn a pending handshake into a live socket. The socket slot is taken
    /// before the pending one is released, so total load never dips.
    pub fn promote(mut self) -> Self {
        if self.kind == ConnectionKind::Pending {
            self.entry.connection_opened(ConnectionKind::Socket);
            self.entry.connection_closed(ConnectionKind::Pending);
            self.kind = ConnectionKind::Socket;
        }
        self
    }
}

impl Deref for ConnectionGuard {
    type Target = WorkerEntry;
    fn deref(&self) -> &Self::Target {
        &self.entry
    }
}

impl Drop for ConnectionGuard {
    fn drop(&mut self) {
        self.entry.connection_closed(self.kind);
    }
}

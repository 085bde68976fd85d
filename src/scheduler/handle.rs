//! Worker process handles.
//!
//! A [`WorkerHandle`] is the future side of a spawn: it starts out pending
//! and settles exactly once, either with a [`ProcessHandle`] or with a
//! [`SpawnError`]. Every clone observes the same outcome, so any number of
//! requests can wait on a single spawn.

use std::fmt;
use std::sync::Arc;
use futures_util::future::BoxFuture;
use tokio::sync::watch;
use crate::error::SpawnError;

/// A running backend worker process, as seen by the scheduler.
pub trait ProcessHandle: Send + Sync + fmt::Debug {
    /// Opaque address the transport layer connects to (socket path, host:port, ...).
    fn target(&self) -> &str;

    /// Resolves once the process has exited.
    fn exited(&self) -> BoxFuture<'static, ()>;
}

/// Observable state of a worker handle.
#[derive(Debug, Clone)]
pub enum HandleState {
    Pending,
    Ready(Arc<dyn ProcessHandle>),
    Failed(SpawnError),
}

impl HandleState {
    pub fn is_pending(&self) -> bool {
        matches!(self, HandleState::Pending)
    }
}

/// Shared, awaitable handle to a worker's process.
#[derive(Debug, Clone)]
pub struct WorkerHandle {
    rx: watch::Receiver<HandleState>,
}

/// Write side of a pending [`WorkerHandle`]. Dropping it unresolved fails
/// all waiters with [`SpawnError::Abandoned`].
#[derive(Debug)]
pub struct HandleResolver {
    tx: watch::Sender<HandleState>,
}

impl WorkerHandle {
    /// Create a pending handle and the resolver that settles it.
    pub fn pending() -> (Self, HandleResolver) {
        let (tx, rx) = watch::channel(HandleState::Pending);
        (Self { rx }, HandleResolver { tx })
    }

    /// A handle that is already resolved.
    pub fn ready(process: Arc<dyn ProcessHandle>) -> Self {
        let (_tx, rx) = watch::channel(HandleState::Ready(process));
        Self { rx }
    }

    /// Current state without waiting.
    pub fn state(&self) -> HandleState {
        self.rx.borrow().clone()
    }

    pub fn is_pending(&self) -> bool {
        self.rx.borrow().is_pending()
    }

    /// Wait for the spawn to settle.
    pub async fn wait(&self) -> Result<Arc<dyn ProcessHandle>, SpawnError> {
        let mut rx = self.rx.clone();
        let settled = match rx.wait_for(|state| !state.is_pending()).await {
            Ok(state) => state.clone(),
            Err(_) => return Err(SpawnError::Abandoned),
        };

        match settled {
            HandleState::Ready(process) => Ok(process),
            HandleState::Failed(err) => Err(err),
            HandleState::Pending => Err(SpawnError::Abandoned),
        }
    }
}

impl HandleResolver {
    pub fn resolve(self, process: Arc<dyn ProcessHandle>) {
        self.tx.send_replace(HandleState::Ready(process));
    }

    pub fn fail(self, err: SpawnError) {
        self.tx.send_replace(HandleState::Failed(err));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures_util::FutureExt;

    #[derive(Debug)]
    struct Fixed(&'static str);

    impl ProcessHandle for Fixed {
        fn target(&self) -> &str {
            self.0
        }

        fn exited(&self) -> BoxFuture<'static, ()> {
            futures_util::future::pending().boxed()
        }
    }

    #[tokio::test]
    async fn test_all_waiters_see_resolution() {
        let (handle, resolver) = WorkerHandle::pending();
        let other = handle.clone();
        assert!(handle.is_pending());

        let waiter = tokio::spawn(async move { other.wait().await });
        resolver.resolve(Arc::new(Fixed("unix:/tmp/w1.sock")));

        assert_eq!(handle.wait().await.unwrap().target(), "unix:/tmp/w1.sock");
        assert_eq!(waiter.await.unwrap().unwrap().target(), "unix:/tmp/w1.sock");
        assert!(matches!(handle.state(), HandleState::Ready(_)));
    }

    #[tokio::test]
    async fn test_failure_and_abandon() {
        let (handle, resolver) = WorkerHandle::pending();
        resolver.fail(SpawnError::Launch("boom".into()));
        assert_eq!(
            handle.wait().await.unwrap_err(),
            SpawnError::Launch("boom".into())
        );

        let (handle, resolver) = WorkerHandle::pending();
        drop(resolver);
        assert_eq!(handle.wait().await.unwrap_err(), SpawnError::Abandoned);
    }

    #[tokio::test]
    async fn test_ready_handle() {
        let handle = WorkerHandle::ready(Arc::new(Fixed("127.0.0.1:4000")));
        assert!(!handle.is_pending());
        assert_eq!(handle.wait().await.unwrap().target(), "127.0.0.1:4000");
    }
}

//! Boundary to whatever actually starts worker processes.

use std::sync::Arc;
use futures_util::future::BoxFuture;
use crate::app::AppSpec;
use crate::error::SpawnError;
use crate::scheduler::handle::ProcessHandle;

/// Outcome of a launch.
pub type LaunchResult = Result<Arc<dyn ProcessHandle>, SpawnError>;

/// Starts a new worker process for an app.
///
/// The returned future is driven to completion by the scheduler on a tokio
/// task. Timeouts and retries, if wanted, belong inside the launcher.
pub trait Launcher: Send + Sync {
    fn spawn(&self, app: &AppSpec) -> BoxFuture<'static, LaunchResult>;
}

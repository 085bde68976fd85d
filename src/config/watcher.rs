//! Configuration file watcher for hot reload.
//!
//! The parent directory is watched rather than the file itself: editors
//! that save by writing a temp file and renaming it over the original would
//! otherwise detach the watch after the first save. Events for sibling files
//! are ignored.

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::time::Duration;
use notify::{Config, Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;
use crate::config::loader::load_config;
use crate::config::schema::SchedulerConfig;

/// Reloads the scheduler config whenever its file changes and forwards each
/// valid result. Invalid edits are logged and skipped.
pub struct ConfigWatcher {
    path: PathBuf,
    update_tx: mpsc::UnboundedSender<SchedulerConfig>,
}

impl ConfigWatcher {
    /// Returns the watcher and a receiver for configuration updates, suitable
    /// for [`AppCatalog::follow`](crate::app::AppCatalog::follow).
    pub fn new(path: &Path) -> (Self, mpsc::UnboundedReceiver<SchedulerConfig>) {
        let (update_tx, update_rx) = mpsc::unbounded_channel();
        let watcher = Self {
            path: path.to_path_buf(),
            update_tx,
        };
        (watcher, update_rx)
    }

    /// Start watching. Keep the returned watcher alive for as long as
    /// updates are wanted.
    pub fn run(self) -> Result<RecommendedWatcher, notify::Error> {
        let file_name = self.path.file_name().map(OsString::from).ok_or_else(|| {
            notify::Error::generic("config path has no file name").add_path(self.path.clone())
        })?;
        let dir = match self.path.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => dir.to_path_buf(),
            _ => PathBuf::from("."),
        };

        let path = self.path.clone();
        let tx = self.update_tx;
        let mut watcher = RecommendedWatcher::new(
            move |res: notify::Result<Event>| match res {
                Ok(event) if touches_config(&event, &file_name) => reload(&path, &tx),
                Ok(_) => {}
                Err(e) => tracing::error!(error = ?e, "Config watch error"),
            },
            Config::default().with_poll_interval(Duration::from_secs(2)),
        )?;
        watcher.watch(&dir, RecursiveMode::NonRecursive)?;

        tracing::info!(path = ?self.path, dir = ?dir, "Config watcher started");
        Ok(watcher)
    }
}

/// Whether `event` may have changed the file named `file_name`.
fn touches_config(event: &Event, file_name: &OsString) -> bool {
    let relevant_kind = matches!(
        event.kind,
        EventKind::Create(_) | EventKind::Modify(_) | EventKind::Any
    );
    relevant_kind
        && event
            .paths
            .iter()
            .any(|p| p.file_name() == Some(file_name.as_os_str()))
}

fn reload(path: &Path, tx: &mpsc::UnboundedSender<SchedulerConfig>) {
    match load_config(path) {
        Ok(config) => {
            tracing::info!(path = ?path, apps = config.apps.len(), "Config file changed, reloaded");
            if tx.send(config).is_err() {
                tracing::debug!("No one is following config updates");
            }
        }
        Err(e) => {
            tracing::error!(
                path = ?path,
                error = %e,
                "Failed to reload config, keeping current configuration"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use notify::event::{CreateKind, ModifyKind, RemoveKind};

    fn event(kind: EventKind, path: &str) -> Event {
        Event::new(kind).add_path(PathBuf::from(path))
    }

    #[test]
    fn test_only_config_file_events_count() {
        let name = OsString::from("scheduler.toml");

        assert!(touches_config(&event(EventKind::Modify(ModifyKind::Any), "/etc/app/scheduler.toml"), &name));
        assert!(touches_config(&event(EventKind::Create(CreateKind::File), "/etc/app/scheduler.toml"), &name));
        assert!(!touches_config(&event(EventKind::Modify(ModifyKind::Any), "/etc/app/other.toml"), &name));
        assert!(!touches_config(&event(EventKind::Remove(RemoveKind::File), "/etc/app/scheduler.toml"), &name));
    }

    #[tokio::test]
    async fn test_reload_on_change_ignores_siblings() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("scheduler.toml");
        std::fs::write(&path, "[[apps]]\nkey = \"before\"\n").unwrap();

        let (watcher, mut updates) = ConfigWatcher::new(&path);
        let _guard = watcher.run().unwrap();

        // A broken sibling must not trigger a reload of anything.
        std::fs::write(dir.path().join("notes.toml"), "not = [valid").unwrap();
        std::fs::write(&path, "[[apps]]\nkey = \"after\"\n").unwrap();

        let update = tokio::time::timeout(Duration::from_secs(10), async {
            loop {
                match updates.recv().await {
                    Some(config) if config.apps.iter().any(|a| a.key == "after") => {
                        return Some(config);
                    }
                    Some(_) => continue,
                    None => return None,
                }
            }
        })
        .await
        .expect("no config update observed");

        assert!(update.is_some());
    }

    #[test]
    fn test_path_without_file_name_rejected() {
        let (watcher, _updates) = ConfigWatcher::new(Path::new("/"));
        assert!(watcher.run().is_err());
    }
}

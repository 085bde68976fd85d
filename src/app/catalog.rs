//! Hot-swappable table of application specs.

use std::collections::HashMap;
use std::sync::Arc;
use arc_swap::ArcSwap;
use tokio::sync::mpsc;
use crate::app::AppSpec;
use crate::config::SchedulerConfig;
use crate::lifecycle::ShutdownSignal;

type AppTable = HashMap<String, Arc<AppSpec>>;

/// Application specs keyed by app key.
///
/// Readers always see a complete table; a reload replaces it in one swap.
#[derive(Debug)]
pub struct AppCatalog {
    apps: ArcSwap<AppTable>,
}

impl AppCatalog {
    /// Build a catalog from a validated configuration.
    pub fn from_config(config: &SchedulerConfig) -> Self {
        Self {
            apps: ArcSwap::from_pointee(build_table(config)),
        }
    }

    /// Look up an app by key.
    pub fn get(&self, key: &str) -> Option<Arc<AppSpec>> {
        self.apps.load().get(key).cloned()
    }

    pub fn len(&self) -> usize {
        self.apps.load().len()
    }

    pub fn is_empty(&self) -> bool {
        self.apps.load().is_empty()
    }

    /// Replace the whole table with the apps of `config`.
    pub fn reload(&self, config: &SchedulerConfig) {
        let table = build_table(config);
        tracing::info!(apps = table.len(), "App catalog reloaded");
        self.apps.store(Arc::new(table));
    }

    /// Apply config updates until shutdown or until the sender side closes.
    pub async fn follow(
        self: Arc<Self>,
        mut updates: mpsc::UnboundedReceiver<SchedulerConfig>,
        mut shutdown: ShutdownSignal,
    ) {
        loop {
            tokio::select! {
                update = updates.recv() => match update {
                    Some(config) => self.reload(&config),
                    None => {
                        tracing::debug!("Config update channel closed");
                        break;
                    }
                },
                _ = shutdown.recv() => {
                    tracing::info!("App catalog received shutdown signal, exiting loop");
                    break;
                }
            }
        }
    }
}

fn build_table(config: &SchedulerConfig) -> AppTable {
    let default_max = config.scheduler.max_requests;
    config
        .apps
        .iter()
        .map(|app| {
            let spec = AppSpec::from_config(app, default_max);
            (spec.key().to_string(), Arc::new(spec))
        })
        .collect()
}

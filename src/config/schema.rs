//! Configuration schema definitions.
//!
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};

/// Root configuration for the dispatcher.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct SchedulerConfig {
    /// Scheduler-wide defaults.
    pub scheduler: SchedulerSettings,

    /// Hosted applications.
    pub apps: Vec<AppConfig>,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Scheduler-wide settings.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct SchedulerSettings {
    /// Default per-worker request ceiling for apps that do not set one (0 = unlimited).
    pub max_requests: usize,
}

/// A hosted application.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AppConfig {
    /// Stable application key.
    pub key: String,

    /// Per-worker request ceiling; falls back to `scheduler.max_requests`.
    #[serde(default)]
    pub max_requests: Option<usize>,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Record scheduler metrics.
    pub metrics_enabled: bool,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics_enabled: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_minimal_config_uses_defaults() {
        let config: SchedulerConfig = toml::from_str("").unwrap();
        assert_eq!(config.scheduler.max_requests, 0);
        assert!(config.apps.is_empty());
        assert_eq!(config.observability.log_level, "info");
        assert!(config.observability.metrics_enabled);
    }

    #[test]
    fn test_parse_apps() {
        let config: SchedulerConfig = toml::from_str(
            r#"
            [scheduler]
            max_requests = 4

            [[apps]]
            key = "dash"

            [[apps]]
            key = "report"
            max_requests = 0
            "#,
        )
        .unwrap();
        assert_eq!(config.scheduler.max_requests, 4);
        assert_eq!(config.apps.len(), 2);
        assert_eq!(config.apps[0].max_requests, None);
        assert_eq!(config.apps[1].max_requests, Some(0));
    }
}

//! Typed application spec consumed by the scheduler.

use crate::config::AppConfig;

/// Identity and capacity settings of one hosted application.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppSpec {
    key: String,
    max_requests: usize,
}

impl AppSpec {
    /// Create a spec. `max_requests == 0` means unlimited.
    pub fn new(key: impl Into<String>, max_requests: usize) -> Self {
        Self {
            key: key.into(),
            max_requests,
        }
    }

    /// Build a spec from config, falling back to the scheduler-wide default.
    pub fn from_config(config: &AppConfig, default_max_requests: usize) -> Self {
        Self::new(
            config.key.clone(),
            config.max_requests.unwrap_or(default_max_requests),
        )
    }

    /// Stable identity key of the application.
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Per-worker request ceiling for admitted traffic; 0 is unlimited.
    pub fn max_requests(&self) -> usize {
        self.max_requests
    }

    pub fn is_unlimited(&self) -> bool {
        self.max_requests == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_config_uses_default() {
        let cfg = AppConfig {
            key: "report".into(),
            max_requests: None,
        };
        let spec = AppSpec::from_config(&cfg, 7);
        assert_eq!(spec.key(), "report");
        assert_eq!(spec.max_requests(), 7);

        let cfg = AppConfig {
            key: "report".into(),
            max_requests: Some(0),
        };
        assert!(AppSpec::from_config(&cfg, 7).is_unlimited());
    }
}

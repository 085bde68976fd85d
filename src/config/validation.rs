//! Configuration validation.
//!
//! Serde handles syntax; this module checks semantics and reports every
//! problem found, not just the first.

use std::collections::HashSet;
use thiserror::Error;
use crate::config::schema::SchedulerConfig;

/// A single semantic problem in a configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("app #{0} has an empty key")]
    EmptyAppKey(usize),

    #[error("duplicate app key: {0}")]
    DuplicateAppKey(String),

    #[error("unknown log level: {0}")]
    UnknownLogLevel(String),
}

const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

/// Validate a parsed configuration.
pub fn validate_config(config: &SchedulerConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();
    let mut seen = HashSet::new();

    for (i, app) in config.apps.iter().enumerate() {
        if app.key.trim().is_empty() {
            errors.push(ValidationError::EmptyAppKey(i));
        } else if !seen.insert(app.key.as_str()) {
            errors.push(ValidationError::DuplicateAppKey(app.key.clone()));
        }
    }

    let level = config.observability.log_level.to_ascii_lowercase();
    if !LOG_LEVELS.contains(&level.as_str()) {
        errors.push(ValidationError::UnknownLogLevel(
            config.observability.log_level.clone(),
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

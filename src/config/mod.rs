//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → SchedulerConfig (validated, immutable)
//!     → AppCatalog (typed AppSpec table)
//!
//! On file change:
//!     watcher.rs detects change
//!     → loader.rs loads new config
//!     → validation.rs validates
//!     → AppCatalog swaps its table
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; changes require full reload
//! - All fields have defaults to allow minimal configs
//! - Invalid reloads are logged and the current config is kept

pub mod loader;
pub mod schema;
pub mod validation;
pub mod watcher;

pub use loader::{load_config, ConfigError};
pub use schema::{AppConfig, ObservabilityConfig, SchedulerConfig, SchedulerSettings};
pub use validation::ValidationError;
pub use watcher::ConfigWatcher;

//! Application specs.
//!
//! # Data Flow
//! ```text
//! SchedulerConfig.apps
//!     → spec.rs (typed AppSpec, defaults resolved)
//!     → catalog.rs (keyed table, swapped on reload)
//!     → SchedulerCore::acquire_by_key
//! ```

pub mod catalog;
pub mod spec;

pub use catalog::AppCatalog;
pub use spec::AppSpec;

//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! Scheduler decisions, spawns, exits
//!     → logging.rs (structured tracing events)
//!     → metrics.rs (counters, gauges)
//! ```
//!
//! # Design Decisions
//! - Structured fields (app, worker, route) on every scheduler event
//! - Metrics go through the `metrics` facade; the host picks the exporter

pub mod logging;
pub mod metrics;

//! Lifecycle management.
//!
//! Background tasks owned by the scheduler (worker exit watchers, catalog
//! follower) listen on a shared [`Shutdown`] and stop when it fires.

pub mod shutdown;

pub use shutdown::{Shutdown, ShutdownSignal};

//! Thread-safe run accumulators
//!
//! Workers push into the [`ErrorSink`] and bump [`RunStats`] counters from
//! any task; a presentation layer pulls immutable snapshots whenever it
//! wants. These two are the only cross-worker mutable state in a run besides
//! the namespace cache.

pub mod error_sink;
pub mod stats;

pub use error_sink::{ErrorSink, ErrorSnapshot};
pub use stats::{RunStats, StatsSnapshot};

//! Scheduler layer for the analyzer
//!
//! Fans run aggregation out over a bounded pool of tasks and gathers the
//! results through a single channel consumer.

pub mod batch;

pub use batch::{BatchError, BatchOutcome, process_runs_parallel};

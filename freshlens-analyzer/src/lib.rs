//! freshlens analyzer
//!
//! Turns dbt Cloud runs into per-run aggregates and reports.
//!
//! Architecture:
//! - Sources: narrow async traits over the HTTP client (steps, artifacts, listings)
//! - Steps: classification of run steps into workload and auxiliary commands
//! - Aggregate: merging of per-step result artifacts into one view per run
//! - Scheduler: bounded parallel processing of many runs
//! - Services: run selection, cost/trend, overlap and opportunity pipelines

pub mod aggregate;
pub mod config;
pub mod scheduler;
pub mod service;
pub mod source;
pub mod steps;

#[cfg(test)]
pub(crate) mod testing;

pub use aggregate::{FailureReason, RunFailure, aggregate_run};
pub use config::{AnalyzerConfig, ConfigError};
pub use scheduler::{BatchError, BatchOutcome, process_runs_parallel};
pub use source::{JobSource, RunSource};
pub use steps::{StepKind, classify_run_steps};

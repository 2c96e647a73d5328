//! Core domain types
//!
//! This module contains the entities fetched from the dbt Cloud APIs and the
//! values derived from them. All of them are read-only snapshots held for the
//! duration of one analysis; nothing here is persisted.

pub mod aggregate;
pub mod artifact;
pub mod job;
pub mod manifest;
pub mod model;
pub mod run;

/// dbt Cloud job definition identifier
pub type JobId = i64;

/// dbt Cloud run identifier
pub type RunId = i64;

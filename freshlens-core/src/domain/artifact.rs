//! Run result artifacts (`run_results.json`)
//!
//! The raw artifact keeps every row as reported. Only model rows are turned
//! into [`ItemObservation`]s; tests, seeds and snapshots share the artifact
//! with models during `dbt build` and carry statuses (`pass`, `warn`, ...)
//! outside the tracked enumeration.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::job::null_as_default;

/// Resource type tracked from result artifacts
pub const TRACKED_RESOURCE_TYPE: &str = "model";

/// Errors raised while reading an artifact that was fetched successfully
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ArtifactError {
    /// A tracked row is missing a required field
    #[error("result row is missing field '{0}'")]
    MissingField(&'static str),
}

/// A tracked row whose status is outside the merge enumeration
/// (e.g. `partial success` from a microbatch model)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnrecognizedRow {
    pub unique_id: String,
    pub status: String,
}

/// Tracked rows of one artifact
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StepObservations {
    pub items: Vec<ItemObservation>,
    /// Rows left out of the merge because of their status
    pub unrecognized: Vec<UnrecognizedRow>,
}

/// Outcome of one item within one step
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemStatus {
    Error,
    Success,
    Skipped,
}

impl ItemStatus {
    /// Merge precedence, strongest first
    pub const PRECEDENCE: [ItemStatus; 3] = [ItemStatus::Error, ItemStatus::Success, ItemStatus::Skipped];

    /// Position in [`Self::PRECEDENCE`]; lower wins
    pub fn rank(self) -> usize {
        Self::PRECEDENCE
            .iter()
            .position(|status| *status == self)
            .unwrap_or(Self::PRECEDENCE.len())
    }

    /// The status that wins when an item is observed with both
    pub fn dominant(self, other: ItemStatus) -> ItemStatus {
        if other.rank() < self.rank() { other } else { self }
    }

    /// Parses a wire status; `reused` counts as a skip
    pub fn from_wire(status: &str) -> Option<ItemStatus> {
        match status {
            "success" => Some(ItemStatus::Success),
            "error" => Some(ItemStatus::Error),
            "skipped" | "reused" => Some(ItemStatus::Skipped),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ItemStatus::Error => "error",
            ItemStatus::Success => "success",
            ItemStatus::Skipped => "skipped",
        }
    }
}

impl std::fmt::Display for ItemStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// `run_results.json` as served by the artifacts endpoint
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RunResults {
    #[serde(default, deserialize_with = "null_as_default")]
    pub results: Vec<RawResult>,
}

/// One row of `run_results.json`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawResult {
    #[serde(default)]
    pub unique_id: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub execution_time: Option<f64>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub timing: Vec<TimingEntry>,
}

/// Phase timing inside a result row
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimingEntry {
    pub name: String,
    #[serde(default)]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub completed_at: Option<DateTime<Utc>>,
}

/// One item as observed in one step's artifact
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemObservation {
    pub unique_id: String,
    pub status: ItemStatus,
    /// Seconds; near zero when the work was reused
    pub execution_time: f64,
    /// Step index the artifact was fetched for; `None` for the default artifact
    pub step: Option<u32>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
}

/// Resource type prefix of a unique id (`model.pkg.name` -> `model`)
pub fn resource_type(unique_id: &str) -> &str {
    unique_id.split('.').next().unwrap_or_default()
}

/// Short item name (`model.pkg.name` -> `name`)
pub fn item_name(unique_id: &str) -> &str {
    unique_id.rsplit('.').next().unwrap_or(unique_id)
}

/// Package segment of a unique id (`model.pkg.name` -> `pkg`)
pub fn package_name(unique_id: &str) -> Option<&str> {
    let mut parts = unique_id.split('.');
    parts.next()?;
    parts.next()
}

impl RunResults {
    /// Extracts tracked item observations
    ///
    /// # Arguments
    /// * `step` - Step index the artifact belongs to (`None` for the default artifact)
    ///
    /// Rows with an unrecognized status are set aside rather than failing the
    /// whole artifact.
    ///
    /// # Errors
    /// Returns an error if a row lacks its unique id or a tracked row lacks a status
    pub fn observations(&self, step: Option<u32>) -> Result<StepObservations, ArtifactError> {
        let mut observations = StepObservations::default();

        for row in &self.results {
            let unique_id = row
                .unique_id
                .as_deref()
                .ok_or(ArtifactError::MissingField("unique_id"))?;

            if resource_type(unique_id) != TRACKED_RESOURCE_TYPE {
                continue;
            }

            let raw_status = row
                .status
                .as_deref()
                .ok_or(ArtifactError::MissingField("status"))?;
            let Some(status) = ItemStatus::from_wire(raw_status) else {
                observations.unrecognized.push(UnrecognizedRow {
                    unique_id: unique_id.to_string(),
                    status: raw_status.to_string(),
                });
                continue;
            };

            let execute = row.timing.iter().find(|t| t.name == "execute");

            observations.items.push(ItemObservation {
                unique_id: unique_id.to_string(),
                status,
                execution_time: row.execution_time.unwrap_or(0.0),
                step,
                started_at: execute.and_then(|t| t.started_at),
                completed_at: execute.and_then(|t| t.completed_at),
            });
        }

        Ok(observations)
    }
}

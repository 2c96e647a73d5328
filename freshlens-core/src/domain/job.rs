//! Job domain types

use serde::{Deserialize, Serialize};

use super::JobId;

/// Feature tag that enables state-aware orchestration on a job
pub const STATE_AWARE_ORCHESTRATION: &str = "state_aware_orchestration";

/// Job definition snapshot
///
/// Fetched per request and never mutated.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Job {
    pub id: JobId,
    pub name: String,
    #[serde(default)]
    pub environment_id: Option<i64>,
    #[serde(default)]
    pub project_id: Option<i64>,
    #[serde(default)]
    pub triggers: JobTriggers,
    /// Optimization feature tags (e.g. `state_aware_orchestration`)
    #[serde(default, deserialize_with = "null_as_default")]
    pub cost_optimization_features: Vec<String>,
    /// Configured commands, in execution order
    #[serde(default, deserialize_with = "null_as_default")]
    pub execute_steps: Vec<String>,
}

/// Trigger configuration of a job
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobTriggers {
    #[serde(default, deserialize_with = "null_as_default")]
    pub schedule: bool,
    #[serde(default, deserialize_with = "null_as_default")]
    pub github_webhook: bool,
    #[serde(default, deserialize_with = "null_as_default")]
    pub git_provider_webhook: bool,
    #[serde(default, deserialize_with = "null_as_default")]
    pub on_merge: bool,
    /// Restricts webhook runs to pull-request branches
    #[serde(default, deserialize_with = "null_as_default")]
    pub custom_branch_only: bool,
}

impl JobTriggers {
    /// Whether any webhook-style trigger is configured
    pub fn has_webhook(&self) -> bool {
        self.github_webhook || self.git_provider_webhook || self.on_merge
    }
}

/// Job classification derived from its triggers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobType {
    Scheduled,
    Ci,
    Merge,
    Other,
}

impl JobType {
    pub const ALL: [JobType; 4] = [JobType::Ci, JobType::Merge, JobType::Scheduled, JobType::Other];

    pub fn as_str(&self) -> &'static str {
        match self {
            JobType::Scheduled => "scheduled",
            JobType::Ci => "ci",
            JobType::Merge => "merge",
            JobType::Other => "other",
        }
    }
}

impl std::fmt::Display for JobType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for JobType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "scheduled" => Ok(JobType::Scheduled),
            "ci" => Ok(JobType::Ci),
            "merge" => Ok(JobType::Merge),
            "other" => Ok(JobType::Other),
            other => Err(format!("unknown job type '{}'", other)),
        }
    }
}

/// Treats an explicit JSON `null` like a missing field
pub(crate) fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: serde::Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_job_deserializes_with_nulls() {
        let job: Job = serde_json::from_value(serde_json::json!({
            "id": 42,
            "name": "nightly",
            "triggers": { "schedule": true, "github_webhook": null },
            "cost_optimization_features": null,
            "execute_steps": ["dbt build"]
        }))
        .unwrap();

        assert!(job.triggers.schedule);
        assert!(!job.triggers.has_webhook());
        assert!(job.cost_optimization_features.is_empty());
        assert_eq!(job.execute_steps, vec!["dbt build".to_string()]);
    }

    #[test]
    fn test_job_type_parse() {
        assert_eq!("CI".parse::<JobType>().unwrap(), JobType::Ci);
        assert_eq!(" scheduled ".parse::<JobType>().unwrap(), JobType::Scheduled);
        assert!("nightly".parse::<JobType>().is_err());
    }
}

//! Run domain types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::job::{Job, null_as_default};
use super::{JobId, RunId};

/// A single execution of a job
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Run {
    pub id: RunId,
    #[serde(rename = "job_definition_id")]
    pub job_id: JobId,
    #[serde(default)]
    pub environment_id: Option<i64>,
    pub status: RunStatus,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub finished_at: Option<DateTime<Utc>>,
    /// Owning job, present when requested through `include_related`
    #[serde(default)]
    pub job: Option<Job>,
    /// Executed steps, present when requested through `include_related`
    #[serde(default, deserialize_with = "null_as_default")]
    pub run_steps: Vec<RunStep>,
}

impl Run {
    /// Wall-clock duration between start and finish, in seconds
    pub fn duration_seconds(&self) -> Option<f64> {
        match (self.started_at, self.finished_at) {
            (Some(started), Some(finished)) if finished >= started => {
                Some((finished - started).num_milliseconds() as f64 / 1000.0)
            }
            _ => None,
        }
    }

    /// Name of the owning job when it was included in the response
    pub fn job_name(&self) -> Option<&str> {
        self.job.as_ref().map(|job| job.name.as_str())
    }
}

/// Run status as reported by the API (integer codes on the wire)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "i64")]
pub enum RunStatus {
    Queued,
    Starting,
    Running,
    Success,
    Error,
    Cancelled,
}

impl RunStatus {
    pub fn code(&self) -> i64 {
        match self {
            RunStatus::Queued => 1,
            RunStatus::Starting => 2,
            RunStatus::Running => 3,
            RunStatus::Success => 10,
            RunStatus::Error => 20,
            RunStatus::Cancelled => 30,
        }
    }

    /// Queued, starting or running
    pub fn is_in_progress(&self) -> bool {
        matches!(
            self,
            RunStatus::Queued | RunStatus::Starting | RunStatus::Running
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RunStatus::Queued => "queued",
            RunStatus::Starting => "starting",
            RunStatus::Running => "running",
            RunStatus::Success => "success",
            RunStatus::Error => "error",
            RunStatus::Cancelled => "cancelled",
        }
    }
}

impl TryFrom<i64> for RunStatus {
    type Error = String;

    fn try_from(code: i64) -> Result<Self, String> {
        match code {
            1 => Ok(RunStatus::Queued),
            2 => Ok(RunStatus::Starting),
            3 => Ok(RunStatus::Running),
            10 => Ok(RunStatus::Success),
            20 => Ok(RunStatus::Error),
            30 => Ok(RunStatus::Cancelled),
            other => Err(format!("unknown run status code {}", other)),
        }
    }
}

impl From<RunStatus> for i64 {
    fn from(status: RunStatus) -> Self {
        status.code()
    }
}

impl std::fmt::Display for RunStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for RunStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "queued" => Ok(RunStatus::Queued),
            "starting" => Ok(RunStatus::Starting),
            "running" => Ok(RunStatus::Running),
            "success" => Ok(RunStatus::Success),
            "error" => Ok(RunStatus::Error),
            "cancelled" => Ok(RunStatus::Cancelled),
            other => Err(format!("unknown run status '{}'", other)),
        }
    }
}

/// One sub-command executed within a run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunStep {
    pub index: u32,
    /// Human-readable invocation, e.g. "Invoke dbt with `dbt build`"
    #[serde(rename = "name")]
    pub command: String,
    #[serde(default)]
    pub status_humanized: Option<String>,
}

impl RunStep {
    pub fn new(index: u32, command: impl Into<String>) -> Self {
        Self {
            index,
            command: command.into(),
            status_humanized: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_run_deserializes_status_code() {
        let run: Run = serde_json::from_value(serde_json::json!({
            "id": 7,
            "job_definition_id": 3,
            "status": 10,
            "created_at": "2025-01-02T03:04:05Z",
            "started_at": "2025-01-02T03:04:05Z",
            "finished_at": "2025-01-02T03:06:05Z",
            "run_steps": [{ "index": 1, "name": "Clone git repository" }]
        }))
        .unwrap();

        assert_eq!(run.status, RunStatus::Success);
        assert_eq!(run.duration_seconds(), Some(120.0));
        assert_eq!(run.run_steps[0].command, "Clone git repository");
    }

    #[test]
    fn test_unknown_status_code_is_rejected() {
        let result: Result<Run, _> = serde_json::from_value(serde_json::json!({
            "id": 7,
            "job_definition_id": 3,
            "status": 99
        }));
        assert!(result.is_err());
    }

    #[test]
    fn test_in_progress() {
        assert!(RunStatus::Starting.is_in_progress());
        assert!(!RunStatus::Cancelled.is_in_progress());
        assert_eq!(i64::from(RunStatus::Error), 20);
    }
}

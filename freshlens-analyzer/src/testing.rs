//! In-memory dbt Cloud fake shared by the analyzer tests

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use freshlens_client::{ClientError, Result};
use freshlens_core::domain::artifact::RunResults;
use freshlens_core::domain::job::{Job, JobTriggers};
use freshlens_core::domain::run::{Run, RunStatus, RunStep};
use freshlens_core::domain::{JobId, RunId};
use freshlens_core::dto::query::ListFilters;

use crate::source::{JobSource, RunSource};

/// Artifact payload, or the HTTP status the fake answers with
pub enum FakeArtifact {
    Json(serde_json::Value),
    Status(u16),
}

#[derive(Default)]
pub struct FakeCloud {
    pub steps: HashMap<RunId, Vec<RunStep>>,
    pub step_errors: HashMap<RunId, u16>,
    pub artifacts: HashMap<(RunId, Option<u32>), FakeArtifact>,
    pub jobs: Vec<Job>,
    pub runs: Vec<Run>,
    pub run_errors: HashMap<JobId, u16>,
    pub delay: Option<Duration>,
    pub in_flight: AtomicUsize,
    pub max_in_flight: AtomicUsize,
    /// Step listings plus artifact requests served
    pub calls: AtomicUsize,
}

impl FakeCloud {
    pub fn with_steps(mut self, run_id: RunId, commands: &[&str]) -> Self {
        let steps = commands
            .iter()
            .enumerate()
            .map(|(i, command)| RunStep::new(i as u32 + 1, *command))
            .collect();
        self.steps.insert(run_id, steps);
        self
    }

    pub fn with_artifact(mut self, run_id: RunId, step: Option<u32>, rows: serde_json::Value) -> Self {
        self.artifacts.insert((run_id, step), FakeArtifact::Json(rows));
        self
    }

    pub fn with_artifact_status(mut self, run_id: RunId, step: Option<u32>, status: u16) -> Self {
        self.artifacts.insert((run_id, step), FakeArtifact::Status(status));
        self
    }
}

/// `run_results.json` body from `(unique_id, status, seconds)` rows
pub fn results(rows: &[(&str, &str, f64)]) -> serde_json::Value {
    let rows: Vec<serde_json::Value> = rows
        .iter()
        .map(|(id, status, secs)| {
            serde_json::json!({
                "unique_id": id,
                "status": status,
                "execution_time": secs,
                "timing": []
            })
        })
        .collect();
    serde_json::json!({ "results": rows })
}

pub fn job(id: JobId, triggers: JobTriggers, features: &[&str]) -> Job {
    Job {
        id,
        name: format!("job-{}", id),
        environment_id: Some(1),
        project_id: Some(1),
        triggers,
        cost_optimization_features: features.iter().map(|f| f.to_string()).collect(),
        execute_steps: vec!["dbt build".to_string()],
    }
}

/// A run created `id` minutes after a fixed epoch, lasting `minutes`
pub fn run(id: RunId, job_id: JobId, status: RunStatus, minutes: i64) -> Run {
    let created = Utc.with_ymd_and_hms(2025, 5, 1, 0, 0, 0).unwrap() + chrono::Duration::minutes(id);
    Run {
        id,
        job_id,
        environment_id: Some(1),
        status,
        created_at: Some(created),
        started_at: Some(created),
        finished_at: Some(created + chrono::Duration::minutes(minutes)),
        job: None,
        run_steps: vec![],
    }
}

#[async_trait]
impl RunSource for FakeCloud {
    async fn run_steps(&self, run_id: RunId) -> Result<Vec<RunStep>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(status) = self.step_errors.get(&run_id) {
            return Err(ClientError::api_error(*status, "step listing failed"));
        }
        Ok(self.steps.get(&run_id).cloned().unwrap_or_default())
    }

    async fn run_results(&self, run_id: RunId, step: Option<u32>) -> Result<RunResults> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let current = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(current, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        match self.artifacts.get(&(run_id, step)) {
            Some(FakeArtifact::Json(value)) => serde_json::from_value(value.clone())
                .map_err(|e| ClientError::ParseError(e.to_string())),
            Some(FakeArtifact::Status(status)) => {
                Err(ClientError::api_error(*status, "artifact request failed"))
            }
            None => Err(ClientError::api_error(404, "artifact not found")),
        }
    }
}

#[async_trait]
impl JobSource for FakeCloud {
    async fn environment_jobs(&self, environment_id: i64) -> Result<Vec<Job>> {
        Ok(self
            .jobs
            .iter()
            .filter(|job| job.environment_id == Some(environment_id))
            .cloned()
            .collect())
    }

    async fn job(&self, job_id: JobId) -> Result<Job> {
        self.jobs
            .iter()
            .find(|job| job.id == job_id)
            .cloned()
            .ok_or_else(|| ClientError::api_error(404, "job not found"))
    }

    async fn runs(&self, filters: &ListFilters, want: usize) -> Result<Vec<Run>> {
        if let Some(status) = filters.job_id.and_then(|id| self.run_errors.get(&id)) {
            return Err(ClientError::api_error(*status, "run listing failed"));
        }
        let mut runs: Vec<Run> = self
            .runs
            .iter()
            .filter(|run| filters.job_id.is_none_or(|id| run.job_id == id))
            .filter(|run| filters.statuses.is_empty() || filters.statuses.contains(&run.status))
            .cloned()
            .collect();
        runs.sort_by_key(|run| std::cmp::Reverse(run.id));
        runs.truncate(want);
        Ok(runs)
    }
}

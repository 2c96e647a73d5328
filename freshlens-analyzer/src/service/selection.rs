//! Run selection
//!
//! Picks the runs a report looks at: the jobs of an environment (or a single
//! job), narrowed by job type, with each job's runs fetched newest-first.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use freshlens_client::ClientError;
use freshlens_core::analysis::classify::{filter_jobs_by_type, has_sao};
use freshlens_core::domain::JobId;
use freshlens_core::domain::job::{Job, JobType};
use freshlens_core::domain::run::{Run, RunStatus};
use freshlens_core::dto::query::ListFilters;
use tracing::{debug, info};

use crate::source::JobSource;

/// What to select
#[derive(Debug, Clone, PartialEq)]
pub struct RunSelection {
    pub environment_id: Option<i64>,
    /// Takes precedence over the environment
    pub job_id: Option<JobId>,
    /// Empty keeps every type
    pub job_types: Vec<JobType>,
    /// Empty keeps every status
    pub statuses: Vec<RunStatus>,
    pub max_runs: usize,
    /// Runs created at or after this instant
    pub since: Option<DateTime<Utc>>,
    /// Runs created strictly before this instant
    pub until: Option<DateTime<Utc>>,
}

impl Default for RunSelection {
    fn default() -> Self {
        Self {
            environment_id: None,
            job_id: None,
            job_types: Vec::new(),
            statuses: vec![RunStatus::Success, RunStatus::Error],
            max_runs: 10,
            since: None,
            until: None,
        }
    }
}

impl RunSelection {
    fn in_range(&self, run: &Run) -> bool {
        let Some(created) = run.created_at else {
            return self.since.is_none() && self.until.is_none();
        };
        self.since.is_none_or(|since| created >= since) && self.until.is_none_or(|until| created < until)
    }
}

/// Selected jobs and their runs, newest first
#[derive(Debug, Clone, Default)]
pub struct SelectedRuns {
    pub jobs: Vec<Job>,
    pub runs: Vec<Run>,
}

impl SelectedRuns {
    pub fn job(&self, job_id: JobId) -> Option<&Job> {
        self.jobs.iter().find(|job| job.id == job_id)
    }

    /// Splits runs by whether their job has state-aware orchestration enabled
    pub fn split_by_sao(&self) -> (Vec<&Run>, Vec<&Run>) {
        self.runs.iter().partition(|run| {
            run.job
                .as_ref()
                .or_else(|| self.job(run.job_id))
                .is_some_and(has_sao)
        })
    }
}

/// Resolves a selection into jobs and runs
///
/// # Errors
/// Fails when neither an environment nor a job is given, or when any job or
/// run listing fails.
pub async fn select_runs<S>(source: &S, selection: &RunSelection) -> Result<SelectedRuns, ClientError>
where
    S: JobSource + ?Sized,
{
    let jobs = match (selection.job_id, selection.environment_id) {
        (Some(job_id), _) => vec![source.job(job_id).await?],
        (None, Some(environment_id)) => source.environment_jobs(environment_id).await?,
        (None, None) => {
            return Err(ClientError::InvalidRequest(
                "an environment id or a job id is required".to_string(),
            ));
        }
    };

    let jobs = if selection.job_types.is_empty() {
        jobs
    } else {
        filter_jobs_by_type(jobs, &selection.job_types)
    };
    info!("Selected {} job(s)", jobs.len());

    let snapshots: HashMap<JobId, &Job> = jobs.iter().map(|job| (job.id, job)).collect();
    let mut runs = Vec::new();
    for job in &jobs {
        let filters = ListFilters::for_job(job.id).with_statuses(selection.statuses.iter().copied());
        let job_runs = source.runs(&filters, selection.max_runs).await?;
        debug!("Job {} contributed {} run(s)", job.id, job_runs.len());
        runs.extend(job_runs);
    }

    runs.sort_by(|a, b| b.created_at.cmp(&a.created_at).then_with(|| b.id.cmp(&a.id)));
    runs.truncate(selection.max_runs);
    runs.retain(|run| selection.in_range(run));

    for run in &mut runs {
        if run.job.is_none() {
            run.job = snapshots.get(&run.job_id).map(|job| (*job).clone());
        }
    }

    Ok(SelectedRuns { jobs, runs })
}

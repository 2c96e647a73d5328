//! Data sources
//!
//! The analyzer reads dbt Cloud through two narrow traits so pipelines can be
//! exercised against in-memory fakes. [`CloudClient`] implements both.

use async_trait::async_trait;
use freshlens_client::{CloudClient, Result};
use freshlens_core::domain::artifact::RunResults;
use freshlens_core::domain::job::Job;
use freshlens_core::domain::run::{Run, RunStep};
use freshlens_core::domain::{JobId, RunId};
use freshlens_core::dto::query::ListFilters;

/// Per-run step and artifact access
#[async_trait]
pub trait RunSource: Send + Sync {
    /// Ordered steps of a run
    async fn run_steps(&self, run_id: RunId) -> Result<Vec<RunStep>>;

    /// Result artifact of a step, or the run's default artifact for `None`
    async fn run_results(&self, run_id: RunId, step: Option<u32>) -> Result<RunResults>;
}

/// Job and run listings
#[async_trait]
pub trait JobSource: Send + Sync {
    /// Every job of an environment
    async fn environment_jobs(&self, environment_id: i64) -> Result<Vec<Job>>;

    async fn job(&self, job_id: JobId) -> Result<Job>;

    /// Up to `want` runs matching `filters`
    async fn runs(&self, filters: &ListFilters, want: usize) -> Result<Vec<Run>>;
}

#[async_trait]
impl RunSource for CloudClient {
    async fn run_steps(&self, run_id: RunId) -> Result<Vec<RunStep>> {
        CloudClient::run_steps(self, run_id).await
    }

    async fn run_results(&self, run_id: RunId, step: Option<u32>) -> Result<RunResults> {
        CloudClient::run_results(self, run_id, step).await
    }
}

#[async_trait]
impl JobSource for CloudClient {
    async fn environment_jobs(&self, environment_id: i64) -> Result<Vec<Job>> {
        CloudClient::environment_jobs(self, environment_id).await
    }

    async fn job(&self, job_id: JobId) -> Result<Job> {
        self.get_job(job_id).await
    }

    async fn runs(&self, filters: &ListFilters, want: usize) -> Result<Vec<Run>> {
        self.list_runs(filters, want).await
    }
}

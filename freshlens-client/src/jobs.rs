//! Job-related API endpoints

use freshlens_core::domain::JobId;
use freshlens_core::domain::job::Job;
use freshlens_core::dto::query::{ListFilters, ListResource};

use crate::CloudClient;
use crate::error::Result;

/// Upper bound when listing every job of an environment
pub const MAX_JOBS: usize = 1000;

impl CloudClient {
    // =============================================================================
    // Jobs
    // =============================================================================

    /// List job definitions
    ///
    /// # Arguments
    /// * `filters` - Environment/project filters; status filters are ignored
    /// * `want` - Maximum number of jobs to return
    pub async fn list_jobs(&self, filters: &ListFilters, want: usize) -> Result<Vec<Job>> {
        let filters = ListFilters {
            statuses: Vec::new(),
            ..filters.clone()
        };
        self.fetch_paginated(ListResource::Jobs, &filters, want).await
    }

    /// List every job of an environment
    pub async fn environment_jobs(&self, environment_id: i64) -> Result<Vec<Job>> {
        self.list_jobs(&ListFilters::for_environment(environment_id), MAX_JOBS)
            .await
    }

    /// Get a job by ID
    pub async fn get_job(&self, job_id: JobId) -> Result<Job> {
        self.get_data(&format!("jobs/{}/", job_id), &[]).await
    }
}

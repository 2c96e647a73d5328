//! Run-related API endpoints and the paginated list fetcher

use freshlens_core::domain::run::{Run, RunStatus, RunStep};
use freshlens_core::domain::{JobId, RunId};
use freshlens_core::dto::query::{Identified, ListFilters, ListResource};
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::CloudClient;
use crate::error::Result;
use crate::pagination::collect_by_status;

/// Related objects embedded in run listings
pub const RUN_LIST_RELATED: &[&str] = &["job", "trigger", "environment", "repository"];

impl CloudClient {
    // =============================================================================
    // Paginated Listing
    // =============================================================================

    /// Fetch up to `want` records of a list resource
    ///
    /// With a single (or no) status filter this is one offset walk in server
    /// order. With several statuses, each status is walked separately and the
    /// results are merged, deduplicated and ordered newest-first.
    ///
    /// # Arguments
    /// * `resource` - Which collection to list
    /// * `filters` - Query filters
    /// * `want` - Maximum number of records to return
    ///
    /// # Returns
    /// At most `want` records. Any failing page fails the whole call.
    pub async fn fetch_paginated<T>(
        &self,
        resource: ListResource,
        filters: &ListFilters,
        want: usize,
    ) -> Result<Vec<T>>
    where
        T: DeserializeOwned + Identified,
    {
        debug!(
            "Listing up to {} {} (statuses: {:?})",
            want,
            resource.path(),
            filters.statuses
        );

        collect_by_status(&filters.statuses, want, self.page_cap, |status, offset, limit| {
            let mut query = filters.query_pairs(status);
            query.push(("limit", limit.to_string()));
            query.push(("offset", offset.to_string()));
            async move { self.get_data::<Vec<T>>(resource.path(), &query).await }
        })
        .await
    }

    // =============================================================================
    // Runs
    // =============================================================================

    /// List runs matching `filters`, embedding job/trigger/environment details
    pub async fn list_runs(&self, filters: &ListFilters, want: usize) -> Result<Vec<Run>> {
        let mut filters = filters.clone();
        if filters.include_related.is_empty() {
            filters = filters.with_related(RUN_LIST_RELATED);
        }
        self.fetch_paginated(ListResource::Runs, &filters, want).await
    }

    /// Get a single run
    ///
    /// # Arguments
    /// * `run_id` - The run identifier
    /// * `with_steps` - Whether to embed the run's steps
    pub async fn get_run(&self, run_id: RunId, with_steps: bool) -> Result<Run> {
        let mut query = Vec::new();
        if with_steps {
            query.push(("include_related", "[\"run_steps\"]".to_string()));
        }
        self.get_data(&format!("runs/{}/", run_id), &query).await
    }

    /// Ordered steps of a run
    pub async fn run_steps(&self, run_id: RunId) -> Result<Vec<RunStep>> {
        let mut steps = self.get_run(run_id, true).await?.run_steps;
        steps.sort_by_key(|step| step.index);
        Ok(steps)
    }

    /// Most recent run of a job, in any status
    pub async fn latest_run(&self, job_id: JobId) -> Result<Option<Run>> {
        let runs = self.list_runs(&ListFilters::for_job(job_id), 1).await?;
        Ok(runs.into_iter().next())
    }

    /// Most recent successful runs of a job, newest first
    pub async fn recent_successful_runs(&self, job_id: JobId, want: usize) -> Result<Vec<Run>> {
        let filters = ListFilters::for_job(job_id).with_statuses([RunStatus::Success]);
        self.list_runs(&filters, want).await
    }

    /// Most recent successful run of a job
    pub async fn latest_successful_run(&self, job_id: JobId) -> Result<Option<Run>> {
        Ok(self.recent_successful_runs(job_id, 1).await?.into_iter().next())
    }
}

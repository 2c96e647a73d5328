//! REST list query parameters

use serde::{Deserialize, Serialize};

use crate::domain::run::RunStatus;
use crate::domain::JobId;

/// Hard per-request limit enforced by the list endpoints
pub const API_MAX_LIMIT: usize = 100;

/// Listable REST collections
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ListResource {
    Jobs,
    Runs,
}

impl ListResource {
    /// Path segment below `/api/v2/accounts/{account_id}/`
    pub fn path(&self) -> &'static str {
        match self {
            ListResource::Jobs => "jobs/",
            ListResource::Runs => "runs/",
        }
    }
}

/// Filters applied to a list request
///
/// The runs endpoint accepts a single status per request; several statuses
/// are fetched one by one and merged by the caller.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListFilters {
    pub job_id: Option<JobId>,
    pub environment_id: Option<i64>,
    pub project_id: Option<i64>,
    pub statuses: Vec<RunStatus>,
    /// Related objects to embed (`job`, `trigger`, `run_steps`, ...)
    pub include_related: Vec<String>,
    /// Sort expression, e.g. `-id` for newest first
    pub order_by: Option<String>,
}

impl ListFilters {
    pub fn for_job(job_id: JobId) -> Self {
        Self {
            job_id: Some(job_id),
            order_by: Some("-id".to_string()),
            ..Default::default()
        }
    }

    pub fn for_environment(environment_id: i64) -> Self {
        Self {
            environment_id: Some(environment_id),
            ..Default::default()
        }
    }

    pub fn with_statuses(mut self, statuses: impl IntoIterator<Item = RunStatus>) -> Self {
        self.statuses = statuses.into_iter().collect();
        self
    }

    pub fn with_related(mut self, related: &[&str]) -> Self {
        self.include_related = related.iter().map(|r| r.to_string()).collect();
        self
    }

    /// Query pairs for one request, pinned to a single status
    pub fn query_pairs(&self, status: Option<RunStatus>) -> Vec<(&'static str, String)> {
        let mut pairs = Vec::new();
        if let Some(job_id) = self.job_id {
            pairs.push(("job_definition_id", job_id.to_string()));
        }
        if let Some(environment_id) = self.environment_id {
            pairs.push(("environment_id", environment_id.to_string()));
        }
        if let Some(project_id) = self.project_id {
            pairs.push(("project_id", project_id.to_string()));
        }
        if let Some(status) = status {
            pairs.push(("status", status.code().to_string()));
        }
        if !self.include_related.is_empty() {
            let related: Vec<String> = self
                .include_related
                .iter()
                .map(|r| format!("\"{}\"", r))
                .collect();
            pairs.push(("include_related", format!("[{}]", related.join(","))));
        }
        if let Some(order_by) = &self.order_by {
            pairs.push(("order_by", order_by.clone()));
        }
        pairs
    }
}

/// Records that can be deduplicated and ordered newest-first by identifier
pub trait Identified {
    fn record_id(&self) -> i64;
}

impl Identified for crate::domain::run::Run {
    fn record_id(&self) -> i64 {
        self.id
    }
}

impl Identified for crate::domain::job::Job {
    fn record_id(&self) -> i64 {
        self.id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_query_pairs() {
        let filters = ListFilters::for_job(12)
            .with_statuses([RunStatus::Success, RunStatus::Error])
            .with_related(&["job", "trigger"]);

        let pairs = filters.query_pairs(Some(RunStatus::Error));
        assert!(pairs.contains(&("job_definition_id", "12".to_string())));
        assert!(pairs.contains(&("status", "20".to_string())));
        assert!(pairs.contains(&("include_related", "[\"job\",\"trigger\"]".to_string())));
        assert!(pairs.contains(&("order_by", "-id".to_string())));
    }

    #[test]
    fn test_query_pairs_without_status() {
        let pairs = ListFilters::for_environment(5).query_pairs(None);
        assert_eq!(pairs, vec![("environment_id", "5".to_string())]);
    }
}

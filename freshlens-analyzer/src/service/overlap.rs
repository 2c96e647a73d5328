//! Job overlap analysis
//!
//! Compares the latest successful run of each candidate job to find items
//! that several jobs build independently.

use std::collections::BTreeMap;
use std::sync::Arc;

use freshlens_core::analysis::overlap::OverlapReport;
use freshlens_core::domain::job::Job;
use freshlens_core::domain::run::RunStatus;
use freshlens_core::domain::{JobId, RunId};
use freshlens_core::dto::query::ListFilters;
use tracing::{info, warn};

use super::ServiceError;
use crate::aggregate::RunFailure;
use crate::scheduler::process_runs_parallel;
use crate::source::{JobSource, RunSource};

/// Overlap report plus the bookkeeping of skipped jobs
#[derive(Debug, Default)]
pub struct OverlapAnalysis {
    pub report: OverlapReport,
    /// Analyzed run per job
    pub runs: BTreeMap<JobId, RunId>,
    /// Jobs whose most recent run is still queued or running
    pub in_progress: Vec<JobId>,
    /// Jobs without any successful run
    pub never_succeeded: Vec<JobId>,
    /// Jobs whose run produced no usable items
    pub missing_artifacts: Vec<JobId>,
    /// Jobs whose run lookups failed
    pub lookup_errors: Vec<JobId>,
    pub failures: Vec<RunFailure>,
}

impl OverlapAnalysis {
    pub fn skipped(&self) -> usize {
        self.never_succeeded.len() + self.missing_artifacts.len() + self.lookup_errors.len()
    }
}

/// Runs the overlap pipeline over `jobs`
///
/// An in-progress latest run is only noted; the job is still analyzed through
/// its latest successful run.
pub async fn analyze_overlap<S, F>(
    source: Arc<S>,
    jobs: &[Job],
    max_workers: usize,
    on_progress: F,
) -> Result<OverlapAnalysis, ServiceError>
where
    S: JobSource + RunSource + 'static,
    F: FnMut(usize, usize),
{
    let mut analysis = OverlapAnalysis::default();

    for job in jobs {
        match source.runs(&ListFilters::for_job(job.id), 1).await {
            Ok(latest) => {
                if latest.first().is_some_and(|run| run.status.is_in_progress()) {
                    analysis.in_progress.push(job.id);
                }
            }
            Err(e) if e.is_unauthorized() => return Err(e.into()),
            Err(e) => warn!("Could not check latest run of job {}: {}", job.id, e),
        }

        let filters = ListFilters::for_job(job.id).with_statuses([RunStatus::Success]);
        match source.runs(&filters, 1).await {
            Ok(runs) => match runs.first() {
                Some(run) => {
                    analysis.runs.insert(job.id, run.id);
                }
                None => analysis.never_succeeded.push(job.id),
            },
            Err(e) if e.is_unauthorized() => return Err(e.into()),
            Err(e) => {
                warn!("Could not find a successful run of job {}: {}", job.id, e);
                analysis.lookup_errors.push(job.id);
            }
        }
    }

    let run_ids: Vec<RunId> = analysis.runs.values().copied().collect();
    let outcome = process_runs_parallel(source, &run_ids, max_workers, on_progress).await?;

    let mut aggregates = BTreeMap::new();
    for (job_id, run_id) in &analysis.runs {
        match outcome.results.get(run_id) {
            Some(aggregate) if aggregate.item_count() > 0 => {
                aggregates.insert(*job_id, aggregate.clone());
            }
            _ => analysis.missing_artifacts.push(*job_id),
        }
    }
    analysis.runs.retain(|job_id, _| aggregates.contains_key(job_id));
    analysis.failures = outcome.failures;
    analysis.report = OverlapReport::from_aggregates(&aggregates);

    info!(
        "Overlap analysis: {} job(s) compared, {} skipped, {} overlapping item(s)",
        analysis.report.jobs_analyzed(),
        analysis.skipped(),
        analysis.report.overlapping().len()
    );

    Ok(analysis)
}

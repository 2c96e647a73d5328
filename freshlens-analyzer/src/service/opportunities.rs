//! SAO opportunity search

use freshlens_core::analysis::classify::has_sao;
use freshlens_core::analysis::opportunity::{Opportunity, rank_opportunities, score_opportunity};
use freshlens_core::domain::job::Job;
use freshlens_core::domain::run::RunStatus;
use freshlens_core::dto::query::ListFilters;
use tracing::{debug, warn};

use crate::source::JobSource;

/// Non-SAO jobs inspected per search
pub const MAX_CANDIDATE_JOBS: usize = 20;

/// Successful runs sampled per job
pub const RECENT_RUNS_PER_JOB: usize = 10;

/// Scores the first non-SAO jobs by recent activity, highest impact first
///
/// Jobs whose runs cannot be listed are skipped with a warning.
pub async fn find_opportunities<S>(source: &S, jobs: &[Job]) -> Vec<Opportunity>
where
    S: JobSource + ?Sized,
{
    let mut opportunities = Vec::new();

    for job in jobs.iter().filter(|job| !has_sao(job)).take(MAX_CANDIDATE_JOBS) {
        let filters = ListFilters::for_job(job.id).with_statuses([RunStatus::Success]);
        match source.runs(&filters, RECENT_RUNS_PER_JOB).await {
            Ok(runs) => {
                debug!("Job {} has {} recent successful run(s)", job.id, runs.len());
                opportunities.extend(score_opportunity(job, &runs));
            }
            Err(e) => warn!("Skipping job {} in opportunity search: {}", job.id, e),
        }
    }

    rank_opportunities(opportunities)
}

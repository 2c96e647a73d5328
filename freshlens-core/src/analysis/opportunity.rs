//! SAO opportunity scoring
//!
//! Ranks jobs without state-aware orchestration by how much enabling it
//! could save: frequent, long-running jobs first.

use serde::{Deserialize, Serialize};

use super::classify::classify_job_type;
use crate::domain::JobId;
use crate::domain::job::{Job, JobType};
use crate::domain::run::Run;

/// Urgency bucket derived from the job type
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Priority {
    High,
    Medium,
    Low,
}

impl Priority {
    /// CI and merge jobs run on every change and come first
    pub fn for_job_type(job_type: JobType) -> Self {
        match job_type {
            JobType::Ci | JobType::Merge => Priority::High,
            JobType::Scheduled => Priority::Medium,
            JobType::Other => Priority::Low,
        }
    }
}

impl std::fmt::Display for Priority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            Priority::High => "High",
            Priority::Medium => "Medium",
            Priority::Low => "Low",
        };
        f.write_str(label)
    }
}

/// A job that would benefit from enabling SAO
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Opportunity {
    pub job_id: JobId,
    pub job_name: String,
    pub job_type: JobType,
    pub recent_runs: usize,
    pub avg_duration_mins: f64,
    /// `recent_runs * avg_duration_mins`
    pub impact_score: f64,
    pub priority: Priority,
}

/// Scores a job from its recent runs; `None` when there are no runs
///
/// Runs without start/finish timestamps count with zero duration.
pub fn score_opportunity(job: &Job, recent_runs: &[Run]) -> Option<Opportunity> {
    if recent_runs.is_empty() {
        return None;
    }

    let run_count = recent_runs.len();
    let total_seconds: f64 = recent_runs
        .iter()
        .map(|run| run.duration_seconds().unwrap_or(0.0))
        .sum();
    let avg_duration_mins = total_seconds / run_count as f64 / 60.0;
    let job_type = classify_job_type(&job.triggers);

    Some(Opportunity {
        job_id: job.id,
        job_name: job.name.clone(),
        job_type,
        recent_runs: run_count,
        avg_duration_mins,
        impact_score: run_count as f64 * avg_duration_mins,
        priority: Priority::for_job_type(job_type),
    })
}

/// Orders opportunities by impact score, highest first
pub fn rank_opportunities(mut opportunities: Vec<Opportunity>) -> Vec<Opportunity> {
    opportunities.sort_by(|a, b| {
        b.impact_score
            .total_cmp(&a.impact_score)
            .then_with(|| a.priority.cmp(&b.priority))
            .then_with(|| a.job_id.cmp(&b.job_id))
    });
    opportunities
}

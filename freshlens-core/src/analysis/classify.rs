//! Job classification
//!
//! Derives job types and optimization flags from job definitions.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::domain::aggregate::percentage;
use crate::domain::job::{Job, JobTriggers, JobType, STATE_AWARE_ORCHESTRATION};
use crate::domain::run::Run;

/// Classifies a job from its triggers
///
/// Precedence is fixed: a schedule wins over any webhook, and webhook jobs
/// split into CI (restricted to custom branches) and merge jobs.
pub fn classify_job_type(triggers: &JobTriggers) -> JobType {
    if triggers.schedule {
        JobType::Scheduled
    } else if triggers.has_webhook() && triggers.custom_branch_only {
        JobType::Ci
    } else if triggers.has_webhook() {
        JobType::Merge
    } else {
        JobType::Other
    }
}

/// Exact-match lookup of an optimization feature tag
pub fn has_optimization_feature(job: &Job, feature: &str) -> bool {
    job.cost_optimization_features.iter().any(|f| f == feature)
}

/// Whether state-aware orchestration is enabled on the job
pub fn has_sao(job: &Job) -> bool {
    has_optimization_feature(job, STATE_AWARE_ORCHESTRATION)
}

/// Whether any configured step references a freshness operation
pub fn has_freshness_step(job: &Job) -> bool {
    job.execute_steps
        .iter()
        .any(|step| step.to_lowercase().contains("freshness"))
}

/// Keeps the jobs whose type is in `types`
pub fn filter_jobs_by_type(jobs: Vec<Job>, types: &[JobType]) -> Vec<Job> {
    jobs.into_iter()
        .filter(|job| types.contains(&classify_job_type(&job.triggers)))
        .collect()
}

/// Splits runs by whether their embedded job has SAO enabled
///
/// Runs without an embedded job count as non-SAO.
pub fn partition_runs_by_sao(runs: Vec<Run>) -> (Vec<Run>, Vec<Run>) {
    runs.into_iter()
        .partition(|run| run.job.as_ref().is_some_and(has_sao))
}

/// Combination of SAO and freshness configuration on one job
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ConfigCoverage {
    /// SAO and freshness checks
    Both,
    /// SAO without freshness checks; may not reuse effectively
    SaoOnly,
    /// Freshness checks without SAO; an optimization opportunity
    FreshnessOnly,
    Neither,
}

impl ConfigCoverage {
    pub fn of(job: &Job) -> Self {
        match (has_sao(job), has_freshness_step(job)) {
            (true, true) => ConfigCoverage::Both,
            (true, false) => ConfigCoverage::SaoOnly,
            (false, true) => ConfigCoverage::FreshnessOnly,
            (false, false) => ConfigCoverage::Neither,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            ConfigCoverage::Both => "SAO + freshness",
            ConfigCoverage::SaoOnly => "SAO only",
            ConfigCoverage::FreshnessOnly => "freshness only",
            ConfigCoverage::Neither => "neither",
        }
    }
}

/// Per-job classification row
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobProfile {
    pub job_id: i64,
    pub job_name: String,
    pub job_type: JobType,
    pub sao: bool,
    pub freshness: bool,
    pub coverage: ConfigCoverage,
}

impl JobProfile {
    pub fn of(job: &Job) -> Self {
        Self {
            job_id: job.id,
            job_name: job.name.clone(),
            job_type: classify_job_type(&job.triggers),
            sao: has_sao(job),
            freshness: has_freshness_step(job),
            coverage: ConfigCoverage::of(job),
        }
    }
}

/// SAO adoption within one job type
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SaoAdoption {
    pub job_type: JobType,
    pub total: usize,
    pub with_sao: usize,
}

impl SaoAdoption {
    pub fn percent(&self) -> f64 {
        percentage(self.with_sao, self.total)
    }
}

/// SAO adoption grouped by job type, for the types present in `jobs`
pub fn sao_adoption_by_type(jobs: &[Job]) -> Vec<SaoAdoption> {
    let mut by_type: BTreeMap<JobType, (usize, usize)> = BTreeMap::new();
    for job in jobs {
        let entry = by_type.entry(classify_job_type(&job.triggers)).or_default();
        entry.0 += 1;
        if has_sao(job) {
            entry.1 += 1;
        }
    }

    by_type
        .into_iter()
        .map(|(job_type, (total, with_sao))| SaoAdoption {
            job_type,
            total,
            with_sao,
        })
        .collect()
}

/// Groups job profiles by configuration coverage
pub fn coverage_breakdown(jobs: &[Job]) -> BTreeMap<ConfigCoverage, Vec<JobProfile>> {
    let mut breakdown: BTreeMap<ConfigCoverage, Vec<JobProfile>> = BTreeMap::new();
    for job in jobs {
        let profile = JobProfile::of(job);
        breakdown.entry(profile.coverage).or_default().push(profile);
    }
    breakdown
}

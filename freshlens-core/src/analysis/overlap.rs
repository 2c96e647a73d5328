//! Job overlap detection
//!
//! Finds items that several jobs execute independently, based on the
//! aggregate of each job's latest successful run.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::domain::JobId;
use crate::domain::aggregate::{AggregatedRunResult, percentage};

/// Maps every item to the jobs whose aggregate contains it
pub fn compute_overlap(
    job_aggregates: &BTreeMap<JobId, AggregatedRunResult>,
) -> BTreeMap<String, BTreeSet<JobId>> {
    let mut item_jobs: BTreeMap<String, BTreeSet<JobId>> = BTreeMap::new();
    for (job_id, aggregate) in job_aggregates {
        for unique_id in aggregate.items.keys() {
            item_jobs.entry(unique_id.clone()).or_default().insert(*job_id);
        }
    }
    item_jobs
}

/// How much duplicated work the overlap represents
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WasteLevel {
    None,
    Low,
    Moderate,
    High,
}

/// An item executed by two or more jobs
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OverlappingItem {
    pub unique_id: String,
    pub jobs: BTreeSet<JobId>,
}

/// Overlap across a set of analyzed jobs
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OverlapReport {
    pub item_jobs: BTreeMap<String, BTreeSet<JobId>>,
    /// Item count per analyzed job
    pub job_item_counts: BTreeMap<JobId, usize>,
}

impl OverlapReport {
    pub fn from_aggregates(job_aggregates: &BTreeMap<JobId, AggregatedRunResult>) -> Self {
        Self {
            item_jobs: compute_overlap(job_aggregates),
            job_item_counts: job_aggregates
                .iter()
                .map(|(job_id, aggregate)| (*job_id, aggregate.item_count()))
                .collect(),
        }
    }

    pub fn jobs_analyzed(&self) -> usize {
        self.job_item_counts.len()
    }

    pub fn total_items(&self) -> usize {
        self.item_jobs.len()
    }

    /// Overlapping items, most duplicated first
    pub fn overlapping(&self) -> Vec<OverlappingItem> {
        let mut items: Vec<OverlappingItem> = self
            .item_jobs
            .iter()
            .filter(|(_, jobs)| jobs.len() >= 2)
            .map(|(unique_id, jobs)| OverlappingItem {
                unique_id: unique_id.clone(),
                jobs: jobs.clone(),
            })
            .collect();
        items.sort_by(|a, b| {
            b.jobs
                .len()
                .cmp(&a.jobs.len())
                .then_with(|| a.unique_id.cmp(&b.unique_id))
        });
        items
    }

    /// Share of items run by more than one job, in percent
    pub fn overlap_rate(&self) -> f64 {
        let overlapping = self.item_jobs.values().filter(|jobs| jobs.len() >= 2).count();
        percentage(overlapping, self.total_items())
    }

    /// Executions beyond the first, summed over overlapping items
    pub fn redundant_executions(&self) -> usize {
        self.item_jobs
            .values()
            .map(|jobs| jobs.len().saturating_sub(1))
            .sum()
    }

    pub fn avg_redundancy_per_job(&self) -> f64 {
        if self.jobs_analyzed() == 0 {
            0.0
        } else {
            self.redundant_executions() as f64 / self.jobs_analyzed() as f64
        }
    }

    pub fn waste_level(&self) -> WasteLevel {
        let rate = self.overlap_rate();
        if self.redundant_executions() == 0 {
            WasteLevel::None
        } else if rate < 10.0 {
            WasteLevel::Low
        } else if rate < 25.0 {
            WasteLevel::Moderate
        } else {
            WasteLevel::High
        }
    }
}

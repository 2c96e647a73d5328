//! Aggregated per-run results

use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::RunId;
use super::artifact::ItemStatus;

/// The resolved outcome of one item across every meaningful step of a run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregatedItem {
    pub unique_id: String,
    pub status: ItemStatus,
    /// Seconds, taken from the observations that carry the winning status
    pub execution_time: f64,
    /// Step indices the item was observed in (empty for the default artifact)
    pub steps: BTreeSet<u32>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
}

/// A meaningful step whose artifact could not be used
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepFailure {
    pub step: u32,
    pub reason: String,
}

/// Merged result of one run
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AggregatedRunResult {
    pub run_id: RunId,
    /// One entry per item, keyed by unique id
    pub items: BTreeMap<String, AggregatedItem>,
    /// Meaningful steps whose artifact was merged
    pub steps_used: usize,
    /// Meaningful steps skipped because their artifact was unavailable
    pub step_failures: Vec<StepFailure>,
    /// Whether the run's default artifact was used instead of per-step artifacts
    pub used_fallback: bool,
    /// Tracked rows left out because their status is not merged
    #[serde(default)]
    pub unrecognized_rows: usize,
}

/// Counts of resolved statuses within one aggregate
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusCounts {
    pub success: usize,
    pub error: usize,
    pub skipped: usize,
}

impl StatusCounts {
    pub fn total(&self) -> usize {
        self.success + self.error + self.skipped
    }

    /// Share of skipped items, in percent
    pub fn reuse_rate(&self) -> f64 {
        percentage(self.skipped, self.total())
    }
}

impl AggregatedRunResult {
    pub fn item_count(&self) -> usize {
        self.items.len()
    }

    pub fn steps_skipped(&self) -> usize {
        self.step_failures.len()
    }

    pub fn status_counts(&self) -> StatusCounts {
        let mut counts = StatusCounts::default();
        for item in self.items.values() {
            match item.status {
                ItemStatus::Success => counts.success += 1,
                ItemStatus::Error => counts.error += 1,
                ItemStatus::Skipped => counts.skipped += 1,
            }
        }
        counts
    }

    /// Items that appeared in more than one meaningful step
    pub fn multi_step_items(&self) -> impl Iterator<Item = &AggregatedItem> {
        self.items.values().filter(|item| item.steps.len() > 1)
    }
}

/// `part / total * 100`, or zero for an empty total
pub fn percentage(part: usize, total: usize) -> f64 {
    if total == 0 {
        0.0
    } else {
        part as f64 / total as f64 * 100.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(id: &str, status: ItemStatus, steps: &[u32]) -> AggregatedItem {
        AggregatedItem {
            unique_id: id.to_string(),
            status,
            execution_time: 1.0,
            steps: steps.iter().copied().collect(),
            started_at: None,
            completed_at: None,
        }
    }

    #[test]
    fn test_status_counts() {
        let mut aggregate = AggregatedRunResult {
            run_id: 1,
            ..Default::default()
        };
        for (id, status) in [
            ("model.a.x", ItemStatus::Success),
            ("model.a.y", ItemStatus::Skipped),
            ("model.a.z", ItemStatus::Skipped),
            ("model.a.w", ItemStatus::Error),
        ] {
            aggregate.items.insert(id.to_string(), item(id, status, &[2]));
        }

        let counts = aggregate.status_counts();
        assert_eq!(counts.total(), 4);
        assert_eq!(counts.skipped, 2);
        assert_eq!(counts.reuse_rate(), 50.0);
    }

    #[test]
    fn test_multi_step_items() {
        let mut aggregate = AggregatedRunResult::default();
        aggregate
            .items
            .insert("model.a.x".into(), item("model.a.x", ItemStatus::Success, &[2, 3]));
        aggregate
            .items
            .insert("model.a.y".into(), item("model.a.y", ItemStatus::Success, &[3]));

        let ids: Vec<_> = aggregate.multi_step_items().map(|i| i.unique_id.as_str()).collect();
        assert_eq!(ids, vec!["model.a.x"]);
    }

    #[test]
    fn test_percentage_of_empty_total() {
        assert_eq!(percentage(3, 0), 0.0);
    }
}

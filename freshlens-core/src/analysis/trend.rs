//! Reuse trend across runs

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::ItemExecution;
use crate::domain::RunId;
use crate::domain::aggregate::percentage;
use crate::domain::artifact::ItemStatus;

/// Item outcome counts of one run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunReuse {
    pub run_id: RunId,
    pub created_at: Option<DateTime<Utc>>,
    pub total: usize,
    pub reused: usize,
    pub success: usize,
    pub error: usize,
}

impl RunReuse {
    pub fn reuse_rate(&self) -> f64 {
        percentage(self.reused, self.total)
    }
}

/// Per-run reuse, ordered by run creation time
pub fn reuse_trend(executions: &[ItemExecution]) -> Vec<RunReuse> {
    let mut runs: BTreeMap<RunId, RunReuse> = BTreeMap::new();
    for execution in executions {
        let entry = runs.entry(execution.run_id).or_insert_with(|| RunReuse {
            run_id: execution.run_id,
            created_at: execution.run_created_at,
            total: 0,
            reused: 0,
            success: 0,
            error: 0,
        });
        entry.total += 1;
        match execution.status {
            ItemStatus::Skipped => entry.reused += 1,
            ItemStatus::Success => entry.success += 1,
            ItemStatus::Error => entry.error += 1,
        }
    }

    let mut trend: Vec<RunReuse> = runs.into_values().collect();
    trend.sort_by_key(|run| (run.created_at, run.run_id));
    trend
}

/// Direction of reuse between the oldest and newest runs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TrendDirection {
    Improving,
    Declining,
    Stable,
}

/// Compares the mean reuse rate of the newest `window` runs with the oldest
///
/// A shift of at least 5 points counts as a change. Needs more than `window`
/// runs.
pub fn trend_direction(trend: &[RunReuse], window: usize) -> Option<TrendDirection> {
    if window == 0 || trend.len() <= window {
        return None;
    }
    let mean = |runs: &[RunReuse]| {
        runs.iter().map(RunReuse::reuse_rate).sum::<f64>() / runs.len() as f64
    };
    let delta = mean(&trend[trend.len() - window..]) - mean(&trend[..window]);
    Some(if delta >= 5.0 {
        TrendDirection::Improving
    } else if delta <= -5.0 {
        TrendDirection::Declining
    } else {
        TrendDirection::Stable
    })
}

//! Pure derivations over fetched data
//!
//! Nothing in this module performs I/O. Every function takes jobs, runs or
//! aggregates that were already fetched and returns reportable values.

pub mod classify;
pub mod cost;
pub mod environment;
pub mod freshness;
pub mod opportunity;
pub mod overlap;
pub mod trend;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::aggregate::AggregatedRunResult;
use crate::domain::artifact::ItemStatus;
use crate::domain::{JobId, RunId};

/// One resolved item outcome within one run, flattened for tabular analysis
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemExecution {
    pub run_id: RunId,
    pub job_id: Option<JobId>,
    pub run_created_at: Option<DateTime<Utc>>,
    pub unique_id: String,
    pub status: ItemStatus,
    pub execution_time: f64,
}

/// Flattens one run's aggregate into execution rows
pub fn item_executions(
    aggregate: &AggregatedRunResult,
    job_id: Option<JobId>,
    run_created_at: Option<DateTime<Utc>>,
) -> Vec<ItemExecution> {
    aggregate
        .items
        .values()
        .map(|item| ItemExecution {
            run_id: aggregate.run_id,
            job_id,
            run_created_at,
            unique_id: item.unique_id.clone(),
            status: item.status,
            execution_time: item.execution_time,
        })
        .collect()
}

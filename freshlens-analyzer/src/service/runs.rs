//! Run analysis
//!
//! Aggregates a set of selected runs and flattens the aggregates into item
//! executions for the cost and reuse-trend reports.

use std::collections::BTreeMap;
use std::sync::Arc;

use freshlens_core::analysis::cost::{CostModel, CostReport};
use freshlens_core::analysis::trend::{RunReuse, reuse_trend};
use freshlens_core::analysis::{ItemExecution, item_executions};
use freshlens_core::domain::RunId;
use freshlens_core::domain::aggregate::AggregatedRunResult;
use freshlens_core::domain::run::Run;

use crate::aggregate::RunFailure;
use crate::scheduler::{BatchError, process_runs_parallel};
use crate::source::RunSource;

/// Aggregated view of a set of runs
#[derive(Debug, Default)]
pub struct RunAnalysis {
    pub aggregates: BTreeMap<RunId, AggregatedRunResult>,
    pub failures: Vec<RunFailure>,
    /// One row per item per aggregated run
    pub executions: Vec<ItemExecution>,
}

impl RunAnalysis {
    pub fn cost(&self, model: &CostModel) -> CostReport {
        model.analyze(&self.executions)
    }

    pub fn reuse_trend(&self) -> Vec<RunReuse> {
        reuse_trend(&self.executions)
    }
}

/// Aggregates `runs` through the orchestrator
pub async fn analyze_runs<S, F>(
    source: Arc<S>,
    runs: &[Run],
    max_workers: usize,
    on_progress: F,
) -> Result<RunAnalysis, BatchError>
where
    S: RunSource + 'static,
    F: FnMut(usize, usize),
{
    let ids: Vec<RunId> = runs.iter().map(|run| run.id).collect();
    let outcome = process_runs_parallel(source, &ids, max_workers, on_progress).await?;

    let mut analysis = RunAnalysis {
        failures: outcome.failures,
        ..Default::default()
    };

    for run in runs {
        let Some(aggregate) = outcome.results.get(&run.id) else {
            continue;
        };
        if analysis.aggregates.contains_key(&run.id) {
            continue;
        }
        analysis
            .executions
            .extend(item_executions(aggregate, Some(run.job_id), run.created_at));
        analysis.aggregates.insert(run.id, aggregate.clone());
    }

    Ok(analysis)
}

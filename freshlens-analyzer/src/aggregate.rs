//! Step-result aggregation
//!
//! Builds one [`AggregatedRunResult`] per run by merging the result artifacts
//! of its workload steps. A step whose artifact cannot be fetched or read is
//! recorded and skipped; the run only fails when no artifact was usable.

use std::collections::BTreeMap;
use std::collections::btree_map::Entry;

use freshlens_client::ClientError;
use freshlens_core::domain::RunId;
use freshlens_core::domain::aggregate::{AggregatedItem, AggregatedRunResult, StepFailure};
use freshlens_core::domain::artifact::{ItemObservation, StepObservations};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

use crate::source::RunSource;
use crate::steps::classify_run_steps;

/// Why a run produced no aggregate
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
pub enum FailureReason {
    #[error("no artifact available")]
    NoArtifact,

    #[error("transport error: {0}")]
    Transport(String),

    #[error("malformed artifact: {0}")]
    Malformed(String),

    #[error("unauthorized")]
    Unauthorized,

    #[error("worker panicked: {0}")]
    Panicked(String),
}

impl FailureReason {
    pub fn from_client(err: &ClientError) -> Self {
        if err.is_unauthorized() {
            FailureReason::Unauthorized
        } else if err.is_not_found() {
            FailureReason::NoArtifact
        } else if let ClientError::ParseError(message) = err {
            FailureReason::Malformed(message.clone())
        } else {
            FailureReason::Transport(err.to_string())
        }
    }

    /// Higher values explain a failed run better
    fn weight(&self) -> u8 {
        match self {
            FailureReason::NoArtifact => 0,
            FailureReason::Malformed(_) => 1,
            FailureReason::Transport(_) => 2,
            FailureReason::Panicked(_) => 3,
            FailureReason::Unauthorized => 4,
        }
    }
}

/// A run that could not be aggregated
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[error("run {run_id} failed: {reason}")]
pub struct RunFailure {
    pub run_id: RunId,
    pub reason: FailureReason,
}

impl RunFailure {
    pub fn new(run_id: RunId, reason: FailureReason) -> Self {
        Self { run_id, reason }
    }
}

/// Folds one observation into the per-item map
///
/// The winning status follows error > success > skipped. The duration and
/// timing window come from the observations carrying the winning status; among
/// those the longest one is kept.
pub fn merge_observation(items: &mut BTreeMap<String, AggregatedItem>, observation: ItemObservation) {
    match items.entry(observation.unique_id.clone()) {
        Entry::Vacant(slot) => {
            slot.insert(AggregatedItem {
                unique_id: observation.unique_id,
                status: observation.status,
                execution_time: observation.execution_time,
                steps: observation.step.into_iter().collect(),
                started_at: observation.started_at,
                completed_at: observation.completed_at,
            });
        }
        Entry::Occupied(mut slot) => {
            let item = slot.get_mut();
            if let Some(step) = observation.step {
                item.steps.insert(step);
            }

            let takes_over = if observation.status == item.status {
                observation.execution_time > item.execution_time
            } else {
                item.status.dominant(observation.status) == observation.status
            };

            if takes_over {
                item.status = observation.status;
                item.execution_time = observation.execution_time;
                item.started_at = observation.started_at;
                item.completed_at = observation.completed_at;
            }
        }
    }
}

/// Aggregates a run from its workload steps
///
/// Lists the run's steps and merges the artifact of every workload step. When
/// the listing fails or holds no workload step, the run's default artifact is
/// used instead.
pub async fn aggregate_run<S>(source: &S, run_id: RunId) -> Result<AggregatedRunResult, RunFailure>
where
    S: RunSource + ?Sized,
{
    let meaningful = match source.run_steps(run_id).await {
        Ok(steps) => classify_run_steps(&steps),
        Err(e) => {
            warn!("Could not list steps of run {}, using default artifact: {}", run_id, e);
            Vec::new()
        }
    };

    if meaningful.is_empty() {
        aggregate_default(source, run_id).await
    } else {
        aggregate_steps(source, run_id, &meaningful).await
    }
}

/// Merges the artifacts of the given steps
pub async fn aggregate_steps<S>(
    source: &S,
    run_id: RunId,
    steps: &[u32],
) -> Result<AggregatedRunResult, RunFailure>
where
    S: RunSource + ?Sized,
{
    let mut aggregate = AggregatedRunResult {
        run_id,
        ..Default::default()
    };
    let mut worst: Option<FailureReason> = None;

    for &step in steps {
        let outcome = match source.run_results(run_id, Some(step)).await {
            Ok(results) => results
                .observations(Some(step))
                .map_err(|e| FailureReason::Malformed(e.to_string())),
            Err(e) => Err(FailureReason::from_client(&e)),
        };

        match outcome {
            Ok(observations) => {
                debug!(
                    "Run {} step {}: {} observations",
                    run_id,
                    step,
                    observations.items.len()
                );
                merge_step(&mut aggregate, observations);
                aggregate.steps_used += 1;
            }
            Err(reason) => {
                warn!("Skipping step {} of run {}: {}", step, run_id, reason);
                aggregate.step_failures.push(StepFailure {
                    step,
                    reason: reason.to_string(),
                });
                if worst.as_ref().is_none_or(|w| reason.weight() > w.weight()) {
                    worst = Some(reason);
                }
            }
        }
    }

    if aggregate.steps_used == 0 {
        let reason = worst.unwrap_or(FailureReason::NoArtifact);
        return Err(RunFailure::new(run_id, reason));
    }

    Ok(aggregate)
}

/// Reads the run's default artifact
pub async fn aggregate_default<S>(source: &S, run_id: RunId) -> Result<AggregatedRunResult, RunFailure>
where
    S: RunSource + ?Sized,
{
    let results = source
        .run_results(run_id, None)
        .await
        .map_err(|e| RunFailure::new(run_id, FailureReason::from_client(&e)))?;
    let observations = results
        .observations(None)
        .map_err(|e| RunFailure::new(run_id, FailureReason::Malformed(e.to_string())))?;

    let mut aggregate = AggregatedRunResult {
        run_id,
        used_fallback: true,
        ..Default::default()
    };
    merge_step(&mut aggregate, observations);
    Ok(aggregate)
}

fn merge_step(aggregate: &mut AggregatedRunResult, observations: StepObservations) {
    for row in &observations.unrecognized {
        warn!(
            "Run {}: leaving out {} with unrecognized status '{}'",
            aggregate.run_id, row.unique_id, row.status
        );
    }
    aggregate.unrecognized_rows += observations.unrecognized.len();

    for observation in observations.items {
        merge_observation(&mut aggregate.items, observation);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{FakeCloud, results};
    use freshlens_core::domain::artifact::ItemStatus;

    const STEPS: &[&str] = &[
        "Clone git repository",
        "Invoke dbt with `dbt deps`",
        "Invoke dbt with `dbt run --select staging`",
        "Invoke dbt with `dbt build --select marts`",
    ];

    #[tokio::test]
    async fn test_merges_workload_steps() {
        let source = FakeCloud::default()
            .with_steps(1, STEPS)
            .with_artifact(
                1,
                Some(3),
                results(&[
                    ("model.shop.a", "success", 10.0),
                    ("model.shop.b", "success", 4.0),
                    ("model.shop.c", "reused", 0.1),
                ]),
            )
            .with_artifact(
                1,
                Some(4),
                results(&[
                    ("model.shop.a", "error", 2.0),
                    ("model.shop.b", "success", 6.0),
                    ("model.shop.c", "success", 8.0),
                    ("test.shop.not_null", "pass", 0.3),
                ]),
            );

        let aggregate = aggregate_run(&source, 1).await.unwrap();
        assert_eq!(aggregate.steps_used, 2);
        assert!(!aggregate.used_fallback);
        assert_eq!(aggregate.item_count(), 3);

        let a = &aggregate.items["model.shop.a"];
        assert_eq!(a.status, ItemStatus::Error);
        assert_eq!(a.execution_time, 2.0);

        let b = &aggregate.items["model.shop.b"];
        assert_eq!(b.execution_time, 6.0);
        assert_eq!(b.steps.len(), 2);

        assert_eq!(aggregate.items["model.shop.c"].status, ItemStatus::Success);
        assert_eq!(aggregate.multi_step_items().count(), 3);
    }

    #[tokio::test]
    async fn test_unrecognized_status_keeps_the_step() {
        let ids: Vec<String> = (0..50).map(|i| format!("model.shop.m{}", i)).collect();
        let mut rows: Vec<(&str, &str, f64)> = ids.iter().map(|id| (id.as_str(), "success", 1.0)).collect();
        rows.push(("model.shop.micro", "partial success", 3.0));

        let source = FakeCloud::default()
            .with_steps(1, &["Invoke dbt with `dbt build`"])
            .with_artifact(1, Some(1), results(&rows));

        let aggregate = aggregate_run(&source, 1).await.unwrap();
        assert_eq!(aggregate.steps_used, 1);
        assert_eq!(aggregate.item_count(), 50);
        assert_eq!(aggregate.unrecognized_rows, 1);
        assert!(!aggregate.items.contains_key("model.shop.micro"));
    }

    #[tokio::test]
    async fn test_failed_step_is_skipped() {
        let source = FakeCloud::default()
            .with_steps(2, STEPS)
            .with_artifact_status(2, Some(3), 500)
            .with_artifact(2, Some(4), results(&[("model.shop.a", "success", 1.0)]));

        let aggregate = aggregate_run(&source, 2).await.unwrap();
        assert_eq!(aggregate.steps_used, 1);
        assert_eq!(aggregate.steps_skipped(), 1);
        assert_eq!(aggregate.step_failures[0].step, 3);
    }

    #[tokio::test]
    async fn test_all_steps_failing_fails_the_run() {
        let source = FakeCloud::default()
            .with_steps(3, STEPS)
            .with_artifact(3, Some(3), results(&[("model.shop.a", "exploded", 1.0)]));

        let failure = aggregate_run(&source, 3).await.unwrap_err();
        assert_eq!(failure.run_id, 3);
        assert!(matches!(failure.reason, FailureReason::Malformed(_)));
    }

    #[tokio::test]
    async fn test_unauthorized_outweighs_missing() {
        let source = FakeCloud::default()
            .with_steps(4, STEPS)
            .with_artifact_status(4, Some(4), 401);

        let failure = aggregate_run(&source, 4).await.unwrap_err();
        assert_eq!(failure.reason, FailureReason::Unauthorized);
    }

    #[tokio::test]
    async fn test_fallback_without_workload_steps() {
        let source = FakeCloud::default()
            .with_steps(5, &["Clone git repository", "Invoke dbt with `dbt source freshness`"])
            .with_artifact(5, None, results(&[("model.shop.a", "reused", 0.2)]));

        let aggregate = aggregate_run(&source, 5).await.unwrap();
        assert!(aggregate.used_fallback);
        assert_eq!(aggregate.status_counts().skipped, 1);
        assert!(aggregate.items["model.shop.a"].steps.is_empty());
    }

    #[tokio::test]
    async fn test_fallback_when_step_listing_fails() {
        let mut source = FakeCloud::default()
            .with_artifact(6, None, results(&[("model.shop.a", "success", 3.0)]));
        source.step_errors.insert(6, 503);

        let aggregate = aggregate_run(&source, 6).await.unwrap();
        assert!(aggregate.used_fallback);
        assert_eq!(aggregate.item_count(), 1);
    }

    #[tokio::test]
    async fn test_missing_default_artifact() {
        let failure = aggregate_run(&FakeCloud::default(), 7).await.unwrap_err();
        assert_eq!(failure.reason, FailureReason::NoArtifact);
    }

    #[test]
    fn test_merge_keeps_longest_of_winning_status() {
        let mut items = BTreeMap::new();
        let observe = |status, secs, step| ItemObservation {
            unique_id: "model.p.x".to_string(),
            status,
            execution_time: secs,
            step: Some(step),
            started_at: None,
            completed_at: None,
        };
        merge_observation(&mut items, observe(ItemStatus::Skipped, 0.1, 1));
        merge_observation(&mut items, observe(ItemStatus::Success, 5.0, 2));
        merge_observation(&mut items, observe(ItemStatus::Success, 9.0, 3));
        merge_observation(&mut items, observe(ItemStatus::Skipped, 20.0, 4));

        let item = &items["model.p.x"];
        assert_eq!(item.status, ItemStatus::Success);
        assert_eq!(item.execution_time, 9.0);
        assert_eq!(item.steps.len(), 4);
    }
}

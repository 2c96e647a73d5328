//! Parallel run processing
//!
//! Each run is aggregated in its own task. A semaphore caps how many tasks
//! talk to the API at once; every task reports exactly once over an `mpsc`
//! channel, and the caller's progress callback fires as reports arrive.
//! A batch whose first report is an authorization failure is cancelled.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use freshlens_core::domain::RunId;
use freshlens_core::domain::aggregate::AggregatedRunResult;
use thiserror::Error;
use tokio::sync::{Semaphore, mpsc};
use tracing::{debug, error, info, warn};

use crate::aggregate::{FailureReason, RunFailure, aggregate_run};
use crate::source::RunSource;

/// Aggregates and failures of one batch
#[derive(Debug, Default)]
pub struct BatchOutcome {
    pub results: HashMap<RunId, AggregatedRunResult>,
    pub failures: Vec<RunFailure>,
}

impl BatchOutcome {
    pub fn processed(&self) -> usize {
        self.results.len() + self.failures.len()
    }
}

/// A batch that failed as a whole
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BatchError {
    /// Runs were rejected by the API before any succeeded
    #[error("{0} run(s) rejected as unauthorized before any succeeded; check the API key and account id")]
    Unauthorized(usize),
}

type Report = (RunId, Result<AggregatedRunResult, RunFailure>);

/// Aggregates `run_ids` with at most `max_workers` runs in flight
///
/// Duplicate ids are processed once. `on_progress` receives
/// `(completed, total)` after each run finishes. A worker that panics is
/// reported as a failure of its run.
///
/// # Errors
/// Returns [`BatchError::Unauthorized`] as soon as a run fails authorization
/// while no run has succeeded yet. Queued runs are not started and running
/// ones are aborted.
pub async fn process_runs_parallel<S, F>(
    source: Arc<S>,
    run_ids: &[RunId],
    max_workers: usize,
    mut on_progress: F,
) -> Result<BatchOutcome, BatchError>
where
    S: RunSource + 'static,
    F: FnMut(usize, usize),
{
    let mut seen = HashSet::new();
    let run_ids: Vec<RunId> = run_ids.iter().copied().filter(|id| seen.insert(*id)).collect();
    let total = run_ids.len();
    let mut outcome = BatchOutcome::default();

    if total == 0 {
        return Ok(outcome);
    }

    let workers = max_workers.max(1);
    info!("Processing {} run(s) with {} worker(s)", total, workers);

    let semaphore = Arc::new(Semaphore::new(workers));
    let (tx, mut rx) = mpsc::unbounded_channel::<Report>();
    let mut handles = Vec::with_capacity(total);

    for run_id in run_ids {
        let source = Arc::clone(&source);
        let semaphore = Arc::clone(&semaphore);
        let tx = tx.clone();

        let handle = tokio::spawn(async move {
            let report = match semaphore.acquire_owned().await {
                Ok(_permit) => aggregate_run(source.as_ref(), run_id).await,
                Err(e) => Err(RunFailure::new(run_id, FailureReason::Transport(e.to_string()))),
            };
            // Receiver outlives every worker
            let _ = tx.send((run_id, report));
        });
        handles.push((run_id, handle));
    }
    drop(tx);

    let mut completed = 0;
    let mut reported = HashSet::with_capacity(total);

    while let Some((run_id, report)) = rx.recv().await {
        let rejected = matches!(&report, Err(failure) if failure.reason == FailureReason::Unauthorized);
        reported.insert(run_id);
        record(&mut outcome, run_id, report);
        completed += 1;
        on_progress(completed, total);

        if rejected && outcome.results.is_empty() && all_unauthorized(&outcome.failures) {
            warn!(
                "Run {} was rejected as unauthorized before any run succeeded; cancelling {} remaining",
                run_id,
                total - completed
            );
            semaphore.close();
            for (_, handle) in &handles {
                handle.abort();
            }
            return Err(BatchError::Unauthorized(outcome.failures.len()));
        }
    }

    for (run_id, handle) in handles {
        if let Err(e) = handle.await {
            if reported.contains(&run_id) {
                continue;
            }
            error!("Worker for run {} panicked: {}", run_id, e);
            let failure = RunFailure::new(run_id, FailureReason::Panicked(e.to_string()));
            record(&mut outcome, run_id, Err(failure));
            completed += 1;
            on_progress(completed, total);
        }
    }

    info!(
        "Processed {} run(s): {} aggregated, {} failed",
        total,
        outcome.results.len(),
        outcome.failures.len()
    );

    Ok(outcome)
}

fn all_unauthorized(failures: &[RunFailure]) -> bool {
    failures
        .iter()
        .all(|failure| failure.reason == FailureReason::Unauthorized)
}

fn record(outcome: &mut BatchOutcome, run_id: RunId, report: Result<AggregatedRunResult, RunFailure>) {
    match report {
        Ok(aggregate) => {
            debug!("Run {} aggregated {} item(s)", run_id, aggregate.item_count());
            outcome.results.insert(run_id, aggregate);
        }
        Err(failure) => {
            warn!("{}", failure);
            outcome.failures.push(failure);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{FakeCloud, results};
    use async_trait::async_trait;
    use freshlens_client::Result as ClientResult;
    use freshlens_core::domain::artifact::RunResults;
    use freshlens_core::domain::run::RunStep;
    use std::sync::atomic::Ordering;
    use std::time::Duration;

    fn fake_with_runs(ids: impl IntoIterator<Item = RunId>) -> FakeCloud {
        ids.into_iter().fold(FakeCloud::default(), |fake, id| {
            fake.with_artifact(id, None, results(&[("model.shop.orders", "success", id as f64)]))
        })
    }

    #[tokio::test]
    async fn test_one_failure_in_fifteen() {
        let source = Arc::new(fake_with_runs((1..=15).filter(|id| *id != 7)));
        let ids: Vec<RunId> = (1..=15).collect();
        let mut progress = Vec::new();

        let outcome = process_runs_parallel(source, &ids, 10, |done, total| progress.push((done, total)))
            .await
            .unwrap();

        assert_eq!(outcome.results.len(), 14);
        assert_eq!(outcome.failures.len(), 1);
        assert_eq!(outcome.failures[0].run_id, 7);
        assert_eq!(outcome.failures[0].reason, FailureReason::NoArtifact);
        assert_eq!(progress.len(), 15);
        assert_eq!(progress.last(), Some(&(15, 15)));
    }

    #[tokio::test]
    async fn test_worker_bound_is_respected() {
        let mut fake = fake_with_runs(1..=12);
        fake.delay = Some(Duration::from_millis(20));
        let source = Arc::new(fake);
        let ids: Vec<RunId> = (1..=12).collect();

        let outcome = process_runs_parallel(Arc::clone(&source), &ids, 3, |_, _| {})
            .await
            .unwrap();

        assert_eq!(outcome.processed(), 12);
        assert!(source.max_in_flight.load(Ordering::SeqCst) <= 3);
    }

    #[tokio::test]
    async fn test_duplicates_and_empty_input() {
        let source = Arc::new(fake_with_runs([1, 2]));
        let outcome = process_runs_parallel(Arc::clone(&source), &[1, 2, 1, 2], 4, |_, _| {})
            .await
            .unwrap();
        assert_eq!(outcome.processed(), 2);

        let mut calls = 0;
        let outcome = process_runs_parallel(source, &[], 4, |_, _| calls += 1)
            .await
            .unwrap();
        assert_eq!(outcome.processed(), 0);
        assert_eq!(calls, 0);
    }

    #[tokio::test]
    async fn test_unauthorized_batch_stops_early() {
        let mut fake = (1..=20).fold(FakeCloud::default(), |fake, id| {
            fake.with_artifact_status(id, None, 401)
        });
        fake.delay = Some(Duration::from_millis(10));
        let source = Arc::new(fake);
        let ids: Vec<RunId> = (1..=20).collect();

        let err = process_runs_parallel(Arc::clone(&source), &ids, 2, |_, _| {})
            .await
            .unwrap_err();

        let BatchError::Unauthorized(rejected) = err;
        assert!((1..=2).contains(&rejected));
        // One step listing plus one artifact request per run
        assert!(source.calls.load(Ordering::SeqCst) < 2 * ids.len());
    }

    #[tokio::test]
    async fn test_unauthorized_after_success_is_not_collapsed() {
        let fake = fake_with_runs([1]).with_artifact_status(2, None, 403);
        let outcome = process_runs_parallel(Arc::new(fake), &[1, 2], 1, |_, _| {})
            .await
            .unwrap();
        assert_eq!(outcome.results.len(), 1);
        assert_eq!(outcome.failures[0].reason, FailureReason::Unauthorized);
    }

    struct PanickingSource;

    #[async_trait]
    impl RunSource for PanickingSource {
        async fn run_steps(&self, _run_id: RunId) -> ClientResult<Vec<RunStep>> {
            Ok(vec![])
        }

        async fn run_results(&self, run_id: RunId, _step: Option<u32>) -> ClientResult<RunResults> {
            if run_id == 2 {
                panic!("corrupted state");
            }
            Ok(serde_json::from_value(results(&[("model.shop.a", "success", 1.0)])).unwrap())
        }
    }

    #[tokio::test]
    async fn test_panicking_worker_becomes_failure() {
        let mut progress = 0;
        let outcome = process_runs_parallel(Arc::new(PanickingSource), &[1, 2, 3], 2, |done, _| progress = done)
            .await
            .unwrap();

        assert_eq!(outcome.results.len(), 2);
        assert!(matches!(outcome.failures[0].reason, FailureReason::Panicked(_)));
        assert_eq!(progress, 3);
    }
}

//! Run artifact endpoints

use freshlens_core::domain::RunId;
use freshlens_core::domain::artifact::RunResults;
use freshlens_core::domain::manifest::Manifest;
use serde::de::DeserializeOwned;

use crate::CloudClient;
use crate::error::Result;

impl CloudClient {
    // =============================================================================
    // Artifacts
    // =============================================================================

    /// Fetch an artifact file of a run
    ///
    /// # Arguments
    /// * `run_id` - The run identifier
    /// * `name` - Artifact path, e.g. `run_results.json`
    /// * `step` - Step index; `None` selects the run's default artifact
    pub async fn artifact<T: DeserializeOwned>(
        &self,
        run_id: RunId,
        name: &str,
        step: Option<u32>,
    ) -> Result<T> {
        self.get_raw(&format!("runs/{}/artifacts/{}", run_id, name), &artifact_query(step))
            .await
    }

    /// `run_results.json` of a run or of one of its steps
    pub async fn run_results(&self, run_id: RunId, step: Option<u32>) -> Result<RunResults> {
        self.artifact(run_id, "run_results.json", step).await
    }

    /// `manifest.json` of a run or of one of its steps
    pub async fn manifest(&self, run_id: RunId, step: Option<u32>) -> Result<Manifest> {
        self.artifact(run_id, "manifest.json", step).await
    }
}

/// `?step=N` for a step artifact; no query for the run's default one
fn artifact_query(step: Option<u32>) -> Vec<(&'static str, String)> {
    step.map(|step| vec![("step", step.to_string())])
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_step_selects_query() {
        assert_eq!(artifact_query(Some(4)), vec![("step", "4".to_string())]);
        assert!(artifact_query(None).is_empty());
    }
}

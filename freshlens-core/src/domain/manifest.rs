//! Manifest artifact (`manifest.json`)
//!
//! Only the parts needed for freshness-configuration coverage are modeled.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::job::null_as_default;

/// Project manifest of one run
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Manifest {
    #[serde(default, deserialize_with = "null_as_default")]
    pub nodes: BTreeMap<String, ManifestNode>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub sources: BTreeMap<String, ManifestSource>,
}

/// A model, seed, test, snapshot, ... entry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ManifestNode {
    #[serde(default)]
    pub unique_id: Option<String>,
    #[serde(default)]
    pub resource_type: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub package_name: Option<String>,
    #[serde(default)]
    pub config: Option<NodeConfig>,
    /// Legacy location of the freshness block
    #[serde(default)]
    pub freshness: Option<FreshnessConfig>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NodeConfig {
    #[serde(default)]
    pub freshness: Option<FreshnessConfig>,
    #[serde(default)]
    pub materialized: Option<String>,
}

/// A declared source table
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ManifestSource {
    #[serde(default)]
    pub unique_id: Option<String>,
    #[serde(default)]
    pub resource_type: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub package_name: Option<String>,
    #[serde(default)]
    pub freshness: Option<FreshnessConfig>,
}

/// Freshness block shared by nodes, sources and applied model configs
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FreshnessConfig {
    #[serde(default)]
    pub warn_after: Option<FreshnessThreshold>,
    #[serde(default)]
    pub error_after: Option<FreshnessThreshold>,
    #[serde(default)]
    pub build_after: Option<FreshnessThreshold>,
    #[serde(default)]
    pub updates_on: Option<String>,
}

/// `{count, period}` pair, with `updates_on` when used as `build_after`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FreshnessThreshold {
    #[serde(default)]
    pub count: Option<i64>,
    #[serde(default)]
    pub period: Option<String>,
    #[serde(default)]
    pub updates_on: Option<String>,
}

impl FreshnessConfig {
    pub fn is_empty(&self) -> bool {
        self.warn_after.is_none()
            && self.error_after.is_none()
            && self.build_after.is_none()
            && self.updates_on.is_none()
    }

    /// Whether warn_after or error_after carries a count
    pub fn has_alerting_count(&self) -> bool {
        [&self.warn_after, &self.error_after]
            .into_iter()
            .flatten()
            .any(|threshold| threshold.count.is_some())
    }

    /// `updates_on` from the block itself or from `build_after`
    pub fn updates_on(&self) -> Option<&str> {
        self.updates_on
            .as_deref()
            .or_else(|| self.build_after.as_ref()?.updates_on.as_deref())
    }
}

impl ManifestNode {
    /// Freshness block from `config.freshness`, falling back to `freshness`
    pub fn freshness(&self) -> Option<&FreshnessConfig> {
        self.config
            .as_ref()
            .and_then(|config| config.freshness.as_ref())
            .filter(|freshness| !freshness.is_empty())
            .or(self.freshness.as_ref())
    }
}

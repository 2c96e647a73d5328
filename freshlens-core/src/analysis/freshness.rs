//! Freshness configuration coverage of a run's manifest

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::domain::aggregate::percentage;
use crate::domain::manifest::{FreshnessConfig, FreshnessThreshold, Manifest};

/// Node types that never carry a build freshness policy
pub const EXCLUDED_NODE_TYPES: &[&str] = &[
    "source", "analysis", "operation", "seed", "snapshot", "test",
];

/// One node or source with its freshness settings flattened
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FreshnessRow {
    pub unique_id: Option<String>,
    pub resource_type: String,
    pub name: Option<String>,
    pub package_name: Option<String>,
    pub configured: bool,
    pub warn_after_count: Option<i64>,
    pub warn_after_period: Option<String>,
    pub error_after_count: Option<i64>,
    pub error_after_period: Option<String>,
    pub build_after_count: Option<i64>,
    pub build_after_period: Option<String>,
    pub updates_on: Option<String>,
}

impl FreshnessRow {
    fn with_config(mut self, config: Option<&FreshnessConfig>) -> Self {
        let Some(config) = config else {
            return self;
        };
        let split = |threshold: &Option<FreshnessThreshold>| {
            threshold
                .as_ref()
                .map(|t| (t.count, t.period.clone()))
                .unwrap_or_default()
        };
        (self.warn_after_count, self.warn_after_period) = split(&config.warn_after);
        (self.error_after_count, self.error_after_period) = split(&config.error_after);
        (self.build_after_count, self.build_after_period) = split(&config.build_after);
        self.updates_on = config.updates_on().map(str::to_string);
        self
    }
}

/// Flattens manifest nodes and sources into coverage rows
///
/// Nodes count as configured when they carry any non-empty freshness block.
/// Sources only count when `warn_after` or `error_after` has a count; an
/// unconfigured source reports no thresholds at all.
pub fn freshness_rows(manifest: &Manifest) -> Vec<FreshnessRow> {
    let nodes = manifest.nodes.values().filter_map(|node| {
        let resource_type = node.resource_type.clone().unwrap_or_default();
        if EXCLUDED_NODE_TYPES.contains(&resource_type.as_str()) {
            return None;
        }
        let freshness = node.freshness().filter(|f| !f.is_empty());
        let row = FreshnessRow {
            unique_id: node.unique_id.clone(),
            resource_type,
            name: node.name.clone(),
            package_name: node.package_name.clone(),
            configured: freshness.is_some(),
            ..Default::default()
        };
        Some(row.with_config(freshness))
    });

    let sources = manifest.sources.values().map(|source| {
        let freshness = source
            .freshness
            .as_ref()
            .filter(|f| f.has_alerting_count());
        let row = FreshnessRow {
            unique_id: source.unique_id.clone(),
            resource_type: source
                .resource_type
                .clone()
                .unwrap_or_else(|| "source".to_string()),
            name: source.name.clone(),
            package_name: source.package_name.clone(),
            configured: freshness.is_some(),
            ..Default::default()
        };
        row.with_config(freshness)
    });

    nodes.chain(sources).collect()
}

/// Configured/total counter
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Coverage {
    pub total: usize,
    pub configured: usize,
}

impl Coverage {
    fn add(&mut self, configured: bool) {
        self.total += 1;
        if configured {
            self.configured += 1;
        }
    }

    pub fn percent(&self) -> f64 {
        percentage(self.configured, self.total)
    }
}

/// Coverage overall, per resource type and per package + resource type
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FreshnessSummary {
    pub overall: Coverage,
    pub by_resource_type: BTreeMap<String, Coverage>,
    /// Package name, then resource type
    pub by_package: BTreeMap<String, BTreeMap<String, Coverage>>,
}

impl FreshnessSummary {
    pub fn of(rows: &[FreshnessRow]) -> Self {
        let mut summary = Self::default();
        for row in rows {
            summary.overall.add(row.configured);
            summary
                .by_resource_type
                .entry(row.resource_type.clone())
                .or_default()
                .add(row.configured);
            let package = row.package_name.clone().unwrap_or_else(|| "unknown".to_string());
            summary
                .by_package
                .entry(package)
                .or_default()
                .entry(row.resource_type.clone())
                .or_default()
                .add(row.configured);
        }
        summary
    }
}

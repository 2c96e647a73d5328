//! Environment inventory metrics
//!
//! Computed over the applied models of one environment as returned by the
//! metadata API. Third-party packages are excluded before anything is counted.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::aggregate::percentage;
use crate::domain::model::AppliedModel;

/// Utility packages whose models say nothing about the project itself
pub const EXCLUDED_PACKAGES: &[&str] = &[
    "dbt_project_evaluator",
    "dbt_artifacts",
    "dbt_utils",
    "dbt_expectations",
    "codegen",
    "audit_helper",
    "dbt_meta_testing",
    "elementary",
    "re_data",
];

/// Reuse rate a healthy SAO environment is expected to reach, in percent
pub const REUSE_TARGET_PERCENT: f64 = 30.0;

pub fn is_excluded_package(package: Option<&str>) -> bool {
    package.is_some_and(|p| EXCLUDED_PACKAGES.contains(&p))
}

/// Drops models from excluded packages
pub fn project_models(models: Vec<AppliedModel>) -> Vec<AppliedModel> {
    models
        .into_iter()
        .filter(|model| !is_excluded_package(model.package_name.as_deref()))
        .collect()
}

/// Hours a model may go between builds, from its `build_after` threshold
///
/// Only `day` and `hour` periods are understood.
pub fn expected_hours(count: Option<i64>, period: Option<&str>) -> Option<f64> {
    let count = count? as f64;
    match period? {
        "day" => Some(count * 24.0),
        "hour" => Some(count),
        _ => None,
    }
}

/// Per-model SLO row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelSlo {
    pub name: String,
    pub package_name: Option<String>,
    pub last_run_status: Option<String>,
    pub materialized: Option<String>,
    pub build_after_count: Option<i64>,
    pub build_after_period: Option<String>,
    pub updates_on: Option<String>,
    pub execute_completed_at: Option<DateTime<Utc>>,
    pub hours_since_last_execution: Option<f64>,
    pub expected_hours_between_runs: Option<f64>,
    pub outside_slo: bool,
}

impl ModelSlo {
    pub fn of(model: &AppliedModel, now: DateTime<Utc>) -> Self {
        let config = model.parsed_config().unwrap_or_default();
        let build_after = config
            .freshness
            .as_ref()
            .and_then(|freshness| freshness.build_after.clone())
            .unwrap_or_default();
        let updates_on = config
            .freshness
            .as_ref()
            .and_then(|freshness| freshness.updates_on())
            .map(str::to_string);

        let execute_completed_at = model
            .execution_info
            .as_ref()
            .and_then(|info| info.execute_completed_at);
        let hours_since = execute_completed_at
            .map(|completed| (now - completed).num_seconds() as f64 / 3600.0);
        let expected = expected_hours(build_after.count, build_after.period.as_deref());

        let outside_slo = matches!(
            (hours_since, expected),
            (Some(since), Some(expected)) if since > expected
        );

        Self {
            name: model.name.clone(),
            package_name: model.package_name.clone(),
            last_run_status: model.last_run_status().map(str::to_string),
            materialized: config.materialized,
            build_after_count: build_after.count,
            build_after_period: build_after.period,
            updates_on,
            execute_completed_at,
            hours_since_last_execution: hours_since,
            expected_hours_between_runs: expected,
            outside_slo,
        }
    }

    pub fn has_build_after(&self) -> bool {
        self.build_after_count.is_some()
    }

    /// Label such as `2 day(s)` for distribution charts
    pub fn build_after_label(&self) -> Option<String> {
        match (self.build_after_count, self.build_after_period.as_deref()) {
            (Some(count), Some(period)) => Some(format!("{} {}(s)", count, period)),
            _ => None,
        }
    }
}

/// How the reuse rate compares to the target
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReuseGrade {
    MeetsTarget,
    Approaching,
    BelowTarget,
}

impl ReuseGrade {
    pub fn of(reuse_rate: f64) -> Self {
        if reuse_rate >= REUSE_TARGET_PERCENT {
            ReuseGrade::MeetsTarget
        } else if reuse_rate >= 20.0 {
            ReuseGrade::Approaching
        } else {
            ReuseGrade::BelowTarget
        }
    }
}

/// Summary over an environment's project models
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EnvironmentMetrics {
    pub rows: Vec<ModelSlo>,
    pub total: usize,
    pub reused: usize,
    pub succeeded: usize,
    pub errored: usize,
    pub with_build_after: usize,
    pub outside_slo: usize,
}

impl EnvironmentMetrics {
    /// Computes metrics at `now`, excluding third-party packages
    pub fn compute(models: &[AppliedModel], now: DateTime<Utc>) -> Self {
        let rows: Vec<ModelSlo> = models
            .iter()
            .filter(|model| !is_excluded_package(model.package_name.as_deref()))
            .map(|model| ModelSlo::of(model, now))
            .collect();

        let count_status = |status: &str| {
            rows.iter()
                .filter(|row| row.last_run_status.as_deref() == Some(status))
                .count()
        };

        Self {
            total: rows.len(),
            reused: count_status("reused"),
            succeeded: count_status("success"),
            errored: count_status("error"),
            with_build_after: rows.iter().filter(|row| row.has_build_after()).count(),
            outside_slo: rows.iter().filter(|row| row.outside_slo).count(),
            rows,
        }
    }

    pub fn reuse_rate(&self) -> f64 {
        percentage(self.reused, self.total)
    }

    pub fn success_rate(&self) -> f64 {
        percentage(self.succeeded, self.total)
    }

    pub fn error_rate(&self) -> f64 {
        percentage(self.errored, self.total)
    }

    pub fn build_after_coverage(&self) -> f64 {
        percentage(self.with_build_after, self.total)
    }

    pub fn outside_slo_rate(&self) -> f64 {
        percentage(self.outside_slo, self.total)
    }

    pub fn reuse_grade(&self) -> ReuseGrade {
        ReuseGrade::of(self.reuse_rate())
    }

    /// Model counts per `build_after` label
    pub fn build_after_distribution(&self) -> BTreeMap<String, usize> {
        let mut distribution = BTreeMap::new();
        for label in self.rows.iter().filter_map(ModelSlo::build_after_label) {
            *distribution.entry(label).or_insert(0) += 1;
        }
        distribution
    }

    /// Models outside their SLO, most overdue first
    pub fn overdue(&self) -> Vec<&ModelSlo> {
        let mut overdue: Vec<&ModelSlo> = self.rows.iter().filter(|row| row.outside_slo).collect();
        overdue.sort_by(|a, b| {
            let lateness = |row: &ModelSlo| {
                row.hours_since_last_execution.unwrap_or(0.0)
                    - row.expected_hours_between_runs.unwrap_or(0.0)
            };
            lateness(b).total_cmp(&lateness(a))
        });
        overdue
    }
}

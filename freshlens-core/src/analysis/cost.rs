//! Cost and savings estimation
//!
//! Billing is modeled as linear in execution time at a fixed hourly rate,
//! with no idle time or minimum charge.
//!
//! - Executed items (success or error) cost `seconds / 3600 * rate`.
//! - Skipped items cost nothing and save what the item costs on average when
//!   it does run successfully within the analyzed set of runs.

use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::ItemExecution;
use crate::domain::RunId;
use crate::domain::artifact::ItemStatus;

const SECONDS_PER_HOUR: f64 = 3600.0;

/// Typical warehouse sizes and their on-demand hourly cost
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WarehouseSize {
    XSmall,
    Small,
    Medium,
    Large,
    XLarge,
    X2Large,
    X3Large,
    X4Large,
}

impl WarehouseSize {
    pub fn hourly_rate(&self) -> f64 {
        match self {
            WarehouseSize::XSmall => 1.0,
            WarehouseSize::Small => 2.0,
            WarehouseSize::Medium => 4.0,
            WarehouseSize::Large => 8.0,
            WarehouseSize::XLarge => 16.0,
            WarehouseSize::X2Large => 32.0,
            WarehouseSize::X3Large => 64.0,
            WarehouseSize::X4Large => 128.0,
        }
    }
}

impl std::str::FromStr for WarehouseSize {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized: String = s
            .chars()
            .filter(|c| c.is_ascii_alphanumeric())
            .collect::<String>()
            .to_ascii_lowercase();
        match normalized.as_str() {
            "xsmall" | "xs" => Ok(WarehouseSize::XSmall),
            "small" | "s" => Ok(WarehouseSize::Small),
            "medium" | "m" => Ok(WarehouseSize::Medium),
            "large" | "l" => Ok(WarehouseSize::Large),
            "xlarge" | "xl" => Ok(WarehouseSize::XLarge),
            "2xlarge" | "2xl" => Ok(WarehouseSize::X2Large),
            "3xlarge" | "3xl" => Ok(WarehouseSize::X3Large),
            "4xlarge" | "4xl" => Ok(WarehouseSize::X4Large),
            _ => Err(format!("unknown warehouse size '{}'", s)),
        }
    }
}

/// Linear hourly cost model
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CostModel {
    pub hourly_rate: f64,
}

/// One execution row with its cost attribution
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CostedExecution {
    pub execution: ItemExecution,
    pub cost: f64,
    pub savings: f64,
}

impl CostedExecution {
    /// What the row would have cost had the item not been reused
    pub fn cost_without_reuse(&self) -> f64 {
        self.cost + self.savings
    }
}

/// Cost totals of one run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunCost {
    pub run_id: RunId,
    pub created_at: Option<DateTime<Utc>>,
    pub cost: f64,
    pub savings: f64,
}

/// Cost totals of one item across runs
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemCost {
    pub unique_id: String,
    pub executions: usize,
    pub reuses: usize,
    pub total_cost: f64,
    pub total_savings: f64,
    pub mean_success_time: Option<f64>,
}

/// Result of costing a set of item executions
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CostReport {
    pub rows: Vec<CostedExecution>,
    pub total_cost: f64,
    pub total_savings: f64,
    pub run_count: usize,
}

impl CostModel {
    pub fn new(hourly_rate: f64) -> Self {
        Self { hourly_rate }
    }

    /// Cost of running an item for `seconds`
    pub fn cost_of(&self, seconds: f64) -> f64 {
        seconds / SECONDS_PER_HOUR * self.hourly_rate
    }

    /// Cost actually incurred by an observation
    pub fn execution_cost(&self, status: ItemStatus, seconds: f64) -> f64 {
        match status {
            ItemStatus::Success | ItemStatus::Error => self.cost_of(seconds),
            ItemStatus::Skipped => 0.0,
        }
    }

    /// Costs every execution and totals the result
    ///
    /// Savings of a skipped row use the mean successful duration of the same
    /// item across all of `executions`; an item that never succeeded in the
    /// set falls back to the skip's own duration.
    pub fn analyze(&self, executions: &[ItemExecution]) -> CostReport {
        let means = mean_success_times(executions);

        let rows: Vec<CostedExecution> = executions
            .iter()
            .map(|execution| {
                let cost = self.execution_cost(execution.status, execution.execution_time);
                let savings = match execution.status {
                    ItemStatus::Skipped => {
                        let expected = means
                            .get(execution.unique_id.as_str())
                            .copied()
                            .unwrap_or(execution.execution_time);
                        self.cost_of(expected)
                    }
                    _ => 0.0,
                };
                CostedExecution {
                    execution: execution.clone(),
                    cost,
                    savings,
                }
            })
            .collect();

        let mut runs: Vec<RunId> = executions.iter().map(|e| e.run_id).collect();
        runs.sort_unstable();
        runs.dedup();

        CostReport {
            total_cost: rows.iter().map(|r| r.cost).sum(),
            total_savings: rows.iter().map(|r| r.savings).sum(),
            run_count: runs.len(),
            rows,
        }
    }
}

/// Mean duration of successful executions per item
pub fn mean_success_times(executions: &[ItemExecution]) -> HashMap<&str, f64> {
    let mut sums: HashMap<&str, (f64, usize)> = HashMap::new();
    for execution in executions {
        if execution.status == ItemStatus::Success {
            let entry = sums.entry(execution.unique_id.as_str()).or_default();
            entry.0 += execution.execution_time;
            entry.1 += 1;
        }
    }
    sums.into_iter()
        .map(|(id, (sum, count))| (id, sum / count as f64))
        .collect()
}

impl CostReport {
    pub fn total_cost_without_reuse(&self) -> f64 {
        self.total_cost + self.total_savings
    }

    pub fn avg_cost_per_run(&self) -> f64 {
        if self.run_count == 0 {
            0.0
        } else {
            self.total_cost / self.run_count as f64
        }
    }

    /// Savings relative to spend, in percent
    pub fn roi(&self) -> f64 {
        if self.total_cost > 0.0 {
            self.total_savings / self.total_cost * 100.0
        } else {
            0.0
        }
    }

    /// Share of the no-reuse cost that was saved, in percent
    pub fn savings_percent(&self) -> f64 {
        let without = self.total_cost_without_reuse();
        if without > 0.0 {
            self.total_savings / without * 100.0
        } else {
            0.0
        }
    }

    /// Per-run totals ordered by run creation time
    pub fn by_run(&self) -> Vec<RunCost> {
        let mut runs: BTreeMap<RunId, RunCost> = BTreeMap::new();
        for row in &self.rows {
            let entry = runs.entry(row.execution.run_id).or_insert_with(|| RunCost {
                run_id: row.execution.run_id,
                created_at: row.execution.run_created_at,
                cost: 0.0,
                savings: 0.0,
            });
            entry.cost += row.cost;
            entry.savings += row.savings;
        }

        let mut runs: Vec<RunCost> = runs.into_values().collect();
        runs.sort_by_key(|run| (run.created_at, run.run_id));
        runs
    }

    /// Per-item totals, most expensive first
    pub fn by_item(&self) -> Vec<ItemCost> {
        let executions: Vec<ItemExecution> = self.rows.iter().map(|r| r.execution.clone()).collect();
        let means = mean_success_times(&executions);

        let mut items: BTreeMap<&str, ItemCost> = BTreeMap::new();
        for row in &self.rows {
            let id = row.execution.unique_id.as_str();
            let entry = items.entry(id).or_insert_with(|| ItemCost {
                unique_id: id.to_string(),
                executions: 0,
                reuses: 0,
                total_cost: 0.0,
                total_savings: 0.0,
                mean_success_time: means.get(id).copied(),
            });
            match row.execution.status {
                ItemStatus::Skipped => entry.reuses += 1,
                _ => entry.executions += 1,
            }
            entry.total_cost += row.cost;
            entry.total_savings += row.savings;
        }

        let mut items: Vec<ItemCost> = items.into_values().collect();
        items.sort_by(|a, b| {
            b.total_cost
                .total_cmp(&a.total_cost)
                .then_with(|| a.unique_id.cmp(&b.unique_id))
        });
        items
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn exec(run_id: RunId, id: &str, status: ItemStatus, secs: f64) -> ItemExecution {
        ItemExecution {
            run_id,
            job_id: None,
            run_created_at: None,
            unique_id: id.to_string(),
            status,
            execution_time: secs,
        }
    }

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-4
    }

    #[test]
    fn test_executed_item_cost() {
        let model = CostModel::new(4.0);
        assert!(close(model.execution_cost(ItemStatus::Success, 120.0), 0.1333));
        assert!(close(model.execution_cost(ItemStatus::Error, 120.0), 0.1333));
        assert_eq!(model.execution_cost(ItemStatus::Skipped, 120.0), 0.0);
    }

    #[test]
    fn test_skip_savings_use_historical_mean() {
        let model = CostModel::new(4.0);
        let report = model.analyze(&[
            exec(1, "model.a.x", ItemStatus::Success, 100.0),
            exec(2, "model.a.x", ItemStatus::Success, 140.0),
            exec(3, "model.a.x", ItemStatus::Skipped, 0.5),
        ]);

        let skipped = &report.rows[2];
        assert_eq!(skipped.cost, 0.0);
        assert!(close(skipped.savings, 120.0 / 3600.0 * 4.0));
        assert!(close(report.total_cost, 240.0 / 3600.0 * 4.0));
        assert_eq!(report.run_count, 3);
        assert!(close(report.roi(), 50.0));
    }

    #[test]
    fn test_skip_without_success_history_uses_own_time() {
        let model = CostModel::new(3600.0);
        let report = model.analyze(&[exec(1, "model.a.y", ItemStatus::Skipped, 0.5)]);
        assert!(close(report.total_savings, 0.5));
        assert_eq!(report.total_cost, 0.0);
        assert_eq!(report.roi(), 0.0);
    }

    #[test]
    fn test_by_item_sorted_by_cost() {
        let model = CostModel::new(3600.0);
        let report = model.analyze(&[
            exec(1, "model.a.cheap", ItemStatus::Success, 1.0),
            exec(1, "model.a.pricey", ItemStatus::Success, 10.0),
            exec(2, "model.a.pricey", ItemStatus::Skipped, 0.0),
        ]);

        let items = report.by_item();
        assert_eq!(items[0].unique_id, "model.a.pricey");
        assert_eq!(items[0].executions, 1);
        assert_eq!(items[0].reuses, 1);
        assert!(close(items[0].total_savings, 10.0));

        let runs = report.by_run();
        assert_eq!(runs.len(), 2);
        assert!(close(runs[0].cost, 11.0));
        assert!(close(report.avg_cost_per_run(), 5.5));
    }

    #[test]
    fn test_warehouse_size_parse() {
        assert_eq!("X-Small".parse::<WarehouseSize>().unwrap().hourly_rate(), 1.0);
        assert_eq!("2X-Large".parse::<WarehouseSize>().unwrap().hourly_rate(), 32.0);
        assert!("huge".parse::<WarehouseSize>().is_err());
    }
}

//! Cost and savings report

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Args;
use colored::*;
use freshlens_analyzer::config::parse_hourly_rate;
use freshlens_analyzer::service::{analyze_runs, select_runs};
use freshlens_core::analysis::cost::CostModel;

use super::runs::print_failures;
use super::selection::SelectionArgs;
use super::{money, print_heading, print_rule};
use crate::config::Config;
use crate::progress::{progress_bar, tracker};

#[derive(Args, Debug)]
pub struct CostArgs {
    #[command(flatten)]
    pub selection: SelectionArgs,

    /// Warehouse cost per hour, in dollars or as a size (X-Small .. 4X-Large)
    #[arg(long, value_parser = parse_rate)]
    pub hourly_rate: Option<f64>,

    /// Most expensive items to list
    #[arg(long, default_value_t = 10)]
    pub top: usize,
}

fn parse_rate(value: &str) -> Result<f64, String> {
    parse_hourly_rate(value)
        .filter(|rate| rate.is_finite() && *rate >= 0.0)
        .ok_or_else(|| format!("'{}' is neither a dollar amount nor a warehouse size", value))
}

/// Handle the cost command
pub async fn handle_cost_command(args: CostArgs, config: &Config) -> Result<()> {
    let selection = args.selection.to_selection(config.environment_id)?;
    let model = args
        .hourly_rate
        .map(CostModel::new)
        .unwrap_or_else(|| config.analyzer.cost_model());
    let client = Arc::new(config.client()?);

    let selected = select_runs(client.as_ref(), &selection)
        .await
        .context("Failed to select runs")?;
    if selected.runs.is_empty() {
        println!("{}", "No runs matched the selection.".yellow());
        return Ok(());
    }

    let pb = progress_bar(selected.runs.len() as u64, "Aggregating runs");
    let analysis = analyze_runs(client, &selected.runs, config.analyzer.max_workers, tracker(&pb))
        .await
        .context("Failed to aggregate runs")?;
    pb.finish_and_clear();

    let report = analysis.cost(&model);

    println!(
        "{}",
        format!(
            "Cost of {} run(s) at {}/hour",
            report.run_count,
            money(model.hourly_rate)
        )
        .bold()
    );
    print_rule();
    println!("  Total cost:            {}", money(report.total_cost));
    println!("  Saved by reuse:        {}", money(report.total_savings).green());
    println!("  Cost without reuse:    {}", money(report.total_cost_without_reuse()));
    println!("  Average cost per run:  {}", money(report.avg_cost_per_run()));
    println!("  Savings share:         {:.1}%", report.savings_percent());
    println!("  ROI:                   {}", format!("{:.1}%", report.roi()).cyan());

    print_heading("Per run (oldest first)");
    for run in report.by_run() {
        let created = run
            .created_at
            .map(|at| at.format("%Y-%m-%d %H:%M").to_string())
            .unwrap_or_else(|| "-".to_string());
        println!(
            "  {:<12} {:<20} cost {:>10}  saved {:>10}",
            run.run_id,
            created,
            money(run.cost),
            money(run.savings)
        );
    }

    let items = report.by_item();
    print_heading(&format!("Top {} items by cost", args.top.min(items.len())));
    for item in items.iter().take(args.top) {
        println!(
            "  {} {:<60} {:>10}  saved {:>10}  runs {:>3}  reused {:>3}",
            "▸".cyan(),
            item.unique_id,
            money(item.total_cost),
            money(item.total_savings),
            item.executions,
            item.reuses
        );
    }

    print_failures(&analysis.failures);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_rate() {
        assert_eq!(parse_rate("$6.5"), Ok(6.5));
        assert_eq!(parse_rate("2X-Large"), Ok(32.0));
        assert!(parse_rate("-3").is_err());
        assert!(parse_rate("huge").is_err());
    }
}

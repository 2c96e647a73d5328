//! Run reuse report

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Args;
use colored::*;
use freshlens_analyzer::RunFailure;
use freshlens_analyzer::service::{analyze_runs, select_runs};
use freshlens_core::analysis::trend::{TrendDirection, trend_direction};
use tracing::debug;

use super::selection::SelectionArgs;
use super::{print_heading, print_rule};
use crate::config::Config;
use crate::progress::{progress_bar, tracker};

#[derive(Args, Debug)]
pub struct RunsArgs {
    #[command(flatten)]
    pub selection: SelectionArgs,

    /// Runs compared at each end of the trend
    #[arg(long, default_value_t = 3)]
    pub window: usize,
}

/// Handle the runs command
pub async fn handle_runs_command(args: RunsArgs, config: &Config) -> Result<()> {
    let selection = args.selection.to_selection(config.environment_id)?;
    debug!("Run selection: {:?}", selection);
    let client = Arc::new(config.client()?);

    let selected = select_runs(client.as_ref(), &selection)
        .await
        .context("Failed to select runs")?;
    if selected.runs.is_empty() {
        println!("{}", "No runs matched the selection.".yellow());
        return Ok(());
    }

    let (sao, non_sao) = selected.split_by_sao();
    println!(
        "{}",
        format!(
            "Analyzing {} run(s) from {} job(s) ({} with SAO, {} without)",
            selected.runs.len(),
            selected.jobs.len(),
            sao.len(),
            non_sao.len()
        )
        .bold()
    );

    let pb = progress_bar(selected.runs.len() as u64, "Aggregating runs");
    let analysis = analyze_runs(client, &selected.runs, config.analyzer.max_workers, tracker(&pb))
        .await
        .context("Failed to aggregate runs")?;
    pb.finish_and_clear();

    let trend = analysis.reuse_trend();
    print_heading("Reuse by run (oldest first)");
    println!(
        "  {:<12} {:<20} {:>6} {:>7} {:>8} {:>6} {:>8}",
        "run", "created", "items", "reused", "success", "error", "reuse"
    );
    for run in &trend {
        let created = run
            .created_at
            .map(|at| at.format("%Y-%m-%d %H:%M").to_string())
            .unwrap_or_else(|| "-".to_string());
        println!(
            "  {:<12} {:<20} {:>6} {:>7} {:>8} {:>6} {:>8}",
            run.run_id,
            created,
            run.total,
            run.reused,
            run.success,
            run.error,
            format!("{:.1}%", run.reuse_rate()).cyan()
        );
    }
    print_rule();

    match trend_direction(&trend, args.window) {
        Some(TrendDirection::Improving) => println!("Trend: {}", "improving".green()),
        Some(TrendDirection::Declining) => println!("Trend: {}", "declining".red()),
        Some(TrendDirection::Stable) => println!("Trend: {}", "stable".normal()),
        None => println!(
            "{}",
            format!("Not enough runs for a trend over a window of {}", args.window).dimmed()
        ),
    }

    let multi_step: usize = analysis
        .aggregates
        .values()
        .map(|aggregate| aggregate.multi_step_items().count())
        .sum();
    if multi_step > 0 {
        println!(
            "{}",
            format!("{} item execution(s) were merged across several steps", multi_step).dimmed()
        );
    }

    print_failures(&analysis.failures);
    Ok(())
}

pub(super) fn print_failures(failures: &[RunFailure]) {
    if failures.is_empty() {
        return;
    }
    println!();
    println!(
        "{}",
        format!("⚠ {} run(s) could not be aggregated:", failures.len()).yellow()
    );
    for failure in failures {
        println!("  {} {}", "✗".red(), failure);
    }
}

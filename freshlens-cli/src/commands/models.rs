//! Environment model inventory report

use anyhow::{Context, Result};
use chrono::Utc;
use clap::Args;
use colored::*;
use freshlens_core::analysis::environment::{EnvironmentMetrics, REUSE_TARGET_PERCENT, ReuseGrade};

use super::{print_heading, print_rule};
use crate::config::Config;

#[derive(Args, Debug)]
pub struct ModelsArgs {
    /// Overdue models to list
    #[arg(long, default_value_t = 20)]
    pub top: usize,
}

/// Handle the models command
pub async fn handle_models_command(args: ModelsArgs, config: &Config) -> Result<()> {
    let environment_id = config.environment_id()?;
    let client = config.client()?;

    let models = client
        .environment_models(environment_id, config.analyzer.graphql_page_size)
        .await
        .with_context(|| format!("Failed to fetch models of environment {}", environment_id))?;

    let metrics = EnvironmentMetrics::compute(&models, Utc::now());
    if metrics.total == 0 {
        println!("{}", "No project models found.".yellow());
        return Ok(());
    }

    println!(
        "{}",
        format!(
            "{} project model(s) in environment {} ({} from packages excluded)",
            metrics.total,
            environment_id,
            models.len() - metrics.total
        )
        .bold()
    );
    print_rule();

    let grade = match metrics.reuse_grade() {
        ReuseGrade::MeetsTarget => "meets target".green(),
        ReuseGrade::Approaching => "approaching target".yellow(),
        ReuseGrade::BelowTarget => "below target".red(),
    };
    println!(
        "  Reuse rate:             {:.1}% ({}, target {:.0}%)",
        metrics.reuse_rate(),
        grade,
        REUSE_TARGET_PERCENT
    );
    println!("  Success rate:           {:.1}%", metrics.success_rate());
    println!("  Error rate:             {:.1}%", metrics.error_rate());
    println!("  build_after coverage:   {:.1}%", metrics.build_after_coverage());
    println!("  Outside SLO:            {:.1}%", metrics.outside_slo_rate());

    let distribution = metrics.build_after_distribution();
    if !distribution.is_empty() {
        print_heading("build_after thresholds");
        for (label, count) in &distribution {
            println!("  {:<16} {}", label, count);
        }
    }

    let overdue = metrics.overdue();
    if !overdue.is_empty() {
        print_heading(&format!("{} model(s) outside their SLO", overdue.len()));
        for row in overdue.iter().take(args.top) {
            println!(
                "  {} {:<50} last built {:>7.1}h ago, expected every {:>5.1}h",
                "✗".red(),
                row.name,
                row.hours_since_last_execution.unwrap_or_default(),
                row.expected_hours_between_runs.unwrap_or_default()
            );
        }
    }

    Ok(())
}

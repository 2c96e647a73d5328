//! Commands module
//!
//! Defines all CLI commands and their handlers.

mod cost;
mod freshness;
mod jobs;
mod models;
mod opportunities;
mod overlap;
mod runs;
mod selection;

use cost::CostArgs;
use freshness::FreshnessArgs;
use jobs::JobsArgs;
use models::ModelsArgs;
use overlap::OverlapArgs;
use runs::RunsArgs;

use anyhow::Result;
use clap::Subcommand;
use colored::*;

use crate::config::Config;

/// Top-level CLI commands
#[derive(Subcommand)]
pub enum Commands {
    /// Classify the environment's jobs and report SAO and freshness coverage
    Jobs(JobsArgs),
    /// Reuse rate of recent runs
    Runs(RunsArgs),
    /// Estimated warehouse cost and savings from reuse
    Cost(CostArgs),
    /// Models built independently by several jobs
    Overlap(OverlapArgs),
    /// Non-SAO jobs ranked by how much they would gain from SAO
    Opportunities,
    /// Environment model inventory and freshness SLOs
    Models(ModelsArgs),
    /// Freshness configuration coverage of a run's manifest
    Freshness(FreshnessArgs),
}

/// Handle a CLI command
///
/// Routes the command to the appropriate handler module.
pub async fn handle_command(command: Commands, config: &Config) -> Result<()> {
    match command {
        Commands::Jobs(args) => jobs::handle_jobs_command(args, config).await,
        Commands::Runs(args) => runs::handle_runs_command(args, config).await,
        Commands::Cost(args) => cost::handle_cost_command(args, config).await,
        Commands::Overlap(args) => overlap::handle_overlap_command(args, config).await,
        Commands::Opportunities => opportunities::handle_opportunities_command(config).await,
        Commands::Models(args) => models::handle_models_command(args, config).await,
        Commands::Freshness(args) => freshness::handle_freshness_command(args, config).await,
    }
}

fn print_rule() {
    println!("{}", "─".repeat(80).dimmed());
}

fn print_heading(text: &str) {
    println!();
    println!("{}", text.bold());
    print_rule();
}

fn money(value: f64) -> String {
    format!("${:.2}", value)
}

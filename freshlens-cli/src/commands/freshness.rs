//! Manifest freshness coverage report

use anyhow::{Context, Result, bail};
use clap::Args;
use colored::*;
use freshlens_core::analysis::freshness::{Coverage, FreshnessSummary, freshness_rows};
use freshlens_core::domain::RunId;
use tracing::info;

use super::{print_heading, print_rule};
use crate::config::Config;

#[derive(Args, Debug)]
pub struct FreshnessArgs {
    /// Run whose manifest is inspected
    #[arg(long, conflicts_with = "job_id")]
    pub run_id: Option<RunId>,

    /// Inspect the latest successful run of this job
    #[arg(long)]
    pub job_id: Option<i64>,

    /// Step whose manifest is fetched (defaults to the run's last step)
    #[arg(long)]
    pub step: Option<u32>,

    /// List nodes without freshness configuration
    #[arg(long)]
    pub show_missing: bool,
}

/// Handle the freshness command
pub async fn handle_freshness_command(args: FreshnessArgs, config: &Config) -> Result<()> {
    let client = config.client()?;

    let run_id = match (args.run_id, args.job_id) {
        (Some(run_id), _) => run_id,
        (None, Some(job_id)) => {
            let run = client
                .latest_successful_run(job_id)
                .await
                .with_context(|| format!("Failed to find runs of job {}", job_id))?
                .with_context(|| format!("Job {} has no successful run", job_id))?;
            info!("Using run {} of job {}", run.id, job_id);
            run.id
        }
        (None, None) => bail!("Pass --run-id or --job-id"),
    };

    let manifest = client
        .manifest(run_id, args.step)
        .await
        .with_context(|| format!("Failed to fetch the manifest of run {}", run_id))?;

    let rows = freshness_rows(&manifest);
    let summary = FreshnessSummary::of(&rows);

    println!(
        "{}",
        format!("Freshness coverage of run {}", run_id).bold()
    );
    print_rule();
    print_coverage("overall", &summary.overall);

    print_heading("By resource type");
    for (resource_type, coverage) in &summary.by_resource_type {
        print_coverage(resource_type, coverage);
    }

    print_heading("By package");
    for (package, by_type) in &summary.by_package {
        for (resource_type, coverage) in by_type {
            print_coverage(&format!("{} / {}", package, resource_type), coverage);
        }
    }

    if args.show_missing {
        print_heading("Without freshness configuration");
        for row in rows.iter().filter(|row| !row.configured) {
            println!(
                "  {} {}",
                "▸".cyan(),
                row.unique_id.as_deref().or(row.name.as_deref()).unwrap_or("-")
            );
        }
    }

    Ok(())
}

fn print_coverage(label: &str, coverage: &Coverage) {
    let percent = format!("{:.1}%", coverage.percent());
    let percent = if coverage.percent() >= 50.0 {
        percent.green()
    } else {
        percent.yellow()
    };
    println!(
        "  {:<40} {:>5}/{:<5} {}",
        label, coverage.configured, coverage.total, percent
    );
}

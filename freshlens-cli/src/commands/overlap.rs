//! Job overlap report

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Args;
use colored::*;
use freshlens_analyzer::service::analyze_overlap;
use freshlens_core::analysis::classify::filter_jobs_by_type;
use freshlens_core::analysis::overlap::WasteLevel;
use freshlens_core::domain::job::JobType;

use super::runs::print_failures;
use super::{print_heading, print_rule};
use crate::config::Config;
use crate::progress::{progress_bar, tracker};

#[derive(Args, Debug)]
pub struct OverlapArgs {
    /// Keep only jobs of these types (ci, merge, scheduled, other)
    #[arg(long = "type", value_delimiter = ',')]
    pub job_types: Vec<JobType>,

    /// Overlapping items to list
    #[arg(long, default_value_t = 20)]
    pub top: usize,
}

/// Handle the overlap command
pub async fn handle_overlap_command(args: OverlapArgs, config: &Config) -> Result<()> {
    let environment_id = config.environment_id()?;
    let client = Arc::new(config.client()?);

    let jobs = client
        .environment_jobs(environment_id)
        .await
        .with_context(|| format!("Failed to list jobs of environment {}", environment_id))?;
    let jobs = if args.job_types.is_empty() {
        jobs
    } else {
        filter_jobs_by_type(jobs, &args.job_types)
    };

    if jobs.len() < 2 {
        println!("{}", "Overlap needs at least two jobs.".yellow());
        return Ok(());
    }

    let pb = progress_bar(jobs.len() as u64, "Aggregating latest successful runs");
    let analysis = analyze_overlap(client, &jobs, config.analyzer.max_workers, tracker(&pb))
        .await
        .context("Overlap analysis failed")?;
    pb.finish_and_clear();

    let report = &analysis.report;
    let job_name = |id: i64| {
        jobs.iter()
            .find(|job| job.id == id)
            .map(|job| job.name.clone())
            .unwrap_or_else(|| id.to_string())
    };

    println!(
        "{}",
        format!(
            "Compared {} job(s), {} skipped",
            report.jobs_analyzed(),
            analysis.skipped()
        )
        .bold()
    );
    print_rule();
    println!("  Distinct items:         {}", report.total_items());
    println!("  Overlapping items:      {}", report.overlapping().len());
    println!("  Overlap rate:           {:.1}%", report.overlap_rate());
    println!("  Redundant executions:   {}", report.redundant_executions());
    println!("  Redundancy per job:     {:.1}", report.avg_redundancy_per_job());
    let waste = match report.waste_level() {
        WasteLevel::None => "none".green(),
        WasteLevel::Low => "low".green(),
        WasteLevel::Moderate => "moderate".yellow(),
        WasteLevel::High => "high".red(),
    };
    println!("  Waste:                  {}", waste);

    let overlapping = report.overlapping();
    if !overlapping.is_empty() {
        print_heading("Most duplicated items");
        for item in overlapping.iter().take(args.top) {
            let names: Vec<String> = item.jobs.iter().map(|id| job_name(*id)).collect();
            println!(
                "  {} {:<60} {} jobs: {}",
                "▸".cyan(),
                item.unique_id,
                item.jobs.len(),
                names.join(", ").dimmed()
            );
        }
    }

    let notes = [
        ("still running", &analysis.in_progress),
        ("never succeeded", &analysis.never_succeeded),
        ("missing artifacts", &analysis.missing_artifacts),
        ("lookup failed", &analysis.lookup_errors),
    ];
    if notes.iter().any(|(_, ids)| !ids.is_empty()) {
        print_heading("Job notes");
        for (label, ids) in notes {
            if ids.is_empty() {
                continue;
            }
            let names: Vec<String> = ids.iter().map(|id| job_name(*id)).collect();
            println!("  {:<18} {}", label, names.join(", "));
        }
    }

    print_failures(&analysis.failures);
    Ok(())
}

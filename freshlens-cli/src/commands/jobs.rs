//! Job configuration report

use anyhow::{Context, Result};
use clap::Args;
use colored::*;
use freshlens_core::analysis::classify::{
    ConfigCoverage, JobProfile, coverage_breakdown, filter_jobs_by_type, sao_adoption_by_type,
};
use freshlens_core::domain::job::JobType;

use super::{print_heading, print_rule};
use crate::config::Config;

#[derive(Args, Debug)]
pub struct JobsArgs {
    /// Keep only jobs of these types (ci, merge, scheduled, other)
    #[arg(long = "type", value_delimiter = ',')]
    pub job_types: Vec<JobType>,
}

/// Handle the jobs command
pub async fn handle_jobs_command(args: JobsArgs, config: &Config) -> Result<()> {
    let environment_id = config.environment_id()?;
    let client = config.client()?;

    let jobs = client
        .environment_jobs(environment_id)
        .await
        .with_context(|| format!("Failed to list jobs of environment {}", environment_id))?;
    let jobs = if args.job_types.is_empty() {
        jobs
    } else {
        filter_jobs_by_type(jobs, &args.job_types)
    };

    if jobs.is_empty() {
        println!("{}", "No jobs found.".yellow());
        return Ok(());
    }

    println!(
        "{}",
        format!("Found {} job(s) in environment {}:", jobs.len(), environment_id).bold()
    );
    print_rule();
    for job in &jobs {
        print_profile(&JobProfile::of(job));
    }

    print_heading("SAO adoption by job type");
    for adoption in sao_adoption_by_type(&jobs) {
        println!(
            "  {:<10} {:>3}/{:<3} {}",
            adoption.job_type.to_string(),
            adoption.with_sao,
            adoption.total,
            format!("{:.1}%", adoption.percent()).cyan()
        );
    }

    print_heading("Configuration coverage");
    for (coverage, profiles) in coverage_breakdown(&jobs) {
        println!("  {:<16} {}", coverage.label(), profiles.len());
        if coverage == ConfigCoverage::FreshnessOnly {
            for profile in &profiles {
                println!(
                    "    {} {} could enable SAO",
                    "▸".cyan(),
                    profile.job_name.dimmed()
                );
            }
        }
    }

    Ok(())
}

fn print_profile(profile: &JobProfile) {
    let flag = |on: bool| if on { "yes".green() } else { "no".dimmed() };

    println!(
        "  {} {:<8} {:<40} type: {:<9} SAO: {:<3} freshness: {}",
        "▸".cyan(),
        profile.job_id.to_string().dimmed(),
        profile.job_name,
        profile.job_type.to_string(),
        flag(profile.sao),
        flag(profile.freshness)
    );
}

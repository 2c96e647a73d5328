//! SAO opportunity report

use anyhow::{Context, Result};
use colored::*;
use freshlens_analyzer::service::find_opportunities;
use freshlens_core::analysis::opportunity::Priority;

use super::print_rule;
use crate::config::Config;

/// Handle the opportunities command
pub async fn handle_opportunities_command(config: &Config) -> Result<()> {
    let environment_id = config.environment_id()?;
    let client = config.client()?;

    let jobs = client
        .environment_jobs(environment_id)
        .await
        .with_context(|| format!("Failed to list jobs of environment {}", environment_id))?;

    let opportunities = find_opportunities(&client, &jobs).await;
    if opportunities.is_empty() {
        println!("{}", "No SAO opportunities found.".yellow());
        return Ok(());
    }

    println!(
        "{}",
        format!("Found {} job(s) that could enable SAO:", opportunities.len()).bold()
    );
    print_rule();
    for opportunity in &opportunities {
        let priority = match opportunity.priority {
            Priority::High => opportunity.priority.to_string().red(),
            Priority::Medium => opportunity.priority.to_string().yellow(),
            Priority::Low => opportunity.priority.to_string().normal(),
        };
        println!(
            "  {} {:<40} {:<9} {:<6} {:>3} run(s) x {:>6.1} min  impact {}",
            "▸".cyan(),
            opportunity.job_name,
            opportunity.job_type.to_string(),
            priority,
            opportunity.recent_runs,
            opportunity.avg_duration_mins,
            format!("{:.1}", opportunity.impact_score).cyan()
        );
    }

    Ok(())
}

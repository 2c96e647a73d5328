//! freshlens CLI
//!
//! Command-line reports over a dbt Cloud account: job configuration, reuse
//! trends, cost, job overlap and freshness coverage.

mod commands;
mod config;
mod progress;

use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use commands::{Commands, handle_command};
use config::Config;
use freshlens_analyzer::AnalyzerConfig;
use freshlens_client::{Credentials, DEFAULT_API_BASE, DEFAULT_METADATA_URL};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "freshlens")]
#[command(about = "dbt Cloud freshness and reuse analytics", long_about = None)]
struct Cli {
    /// dbt Cloud host
    #[arg(long, env = "DBT_CLOUD_URL", default_value = DEFAULT_API_BASE)]
    url: String,

    /// Service token
    #[arg(long, env = "DBT_CLOUD_API_KEY", hide_env_values = true)]
    api_key: Option<String>,

    #[arg(long, env = "DBT_CLOUD_ACCOUNT_ID")]
    account_id: Option<i64>,

    /// Environment the reports look at
    #[arg(long, env = "DBT_CLOUD_ENVIRONMENT_ID")]
    environment_id: Option<i64>,

    /// Metadata API endpoint
    #[arg(long, env = "DBT_CLOUD_METADATA_URL", default_value = DEFAULT_METADATA_URL)]
    metadata_url: String,

    /// Per-request timeout in seconds
    #[arg(long, env = "DBT_CLOUD_TIMEOUT_SECS")]
    timeout: Option<u64>,

    /// Runs processed concurrently
    #[arg(long)]
    max_workers: Option<usize>,

    #[command(subcommand)]
    command: Commands,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| "freshlens=info".into()))
        .with(fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    let mut analyzer = AnalyzerConfig::from_env().context("Invalid analyzer environment")?;
    if let Some(secs) = cli.timeout {
        analyzer.request_timeout = Duration::from_secs(secs);
    }
    if let Some(workers) = cli.max_workers {
        analyzer = analyzer.with_max_workers(workers);
    }

    let credentials = Credentials::new(
        cli.url,
        cli.api_key.unwrap_or_default(),
        cli.account_id.unwrap_or_default(),
    )
    .with_metadata_url(cli.metadata_url);

    let config = Config::new(credentials, cli.environment_id, analyzer);
    config.validate()?;

    handle_command(cli.command, &config).await
}

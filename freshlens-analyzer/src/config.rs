//! Analyzer configuration
//!
//! Tuning knobs for the run orchestrator and the cost model. Credentials are
//! not part of this config; they travel with the client.

use std::time::Duration;

use freshlens_core::analysis::cost::{CostModel, WarehouseSize};
use freshlens_core::dto::graphql::DEFAULT_PAGE_SIZE;
use freshlens_core::dto::query::API_MAX_LIMIT;
use thiserror::Error;

/// Default number of runs processed concurrently
pub const DEFAULT_MAX_WORKERS: usize = 10;

/// Invalid analyzer configuration
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("{name} has invalid value '{value}'")]
    InvalidEnv { name: &'static str, value: String },

    #[error("{0} must be greater than 0")]
    Zero(&'static str),

    #[error("page_cap cannot exceed the API limit of {API_MAX_LIMIT}")]
    PageCapTooLarge,

    #[error("hourly_rate must be a finite, non-negative number")]
    InvalidRate,
}

/// Analyzer configuration
#[derive(Debug, Clone, PartialEq)]
pub struct AnalyzerConfig {
    /// Runs processed concurrently by the orchestrator
    pub max_workers: usize,

    /// Items requested per list call
    pub page_cap: usize,

    /// Nodes requested per metadata API page
    pub graphql_page_size: usize,

    /// Warehouse cost per hour of execution
    pub hourly_rate: f64,

    /// Timeout of each HTTP request
    pub request_timeout: Duration,
}

impl AnalyzerConfig {
    /// Creates a configuration with defaults
    pub fn new() -> Self {
        Self {
            max_workers: DEFAULT_MAX_WORKERS,
            page_cap: API_MAX_LIMIT,
            graphql_page_size: DEFAULT_PAGE_SIZE,
            hourly_rate: WarehouseSize::Medium.hourly_rate(),
            request_timeout: Duration::from_secs(30),
        }
    }

    /// Creates configuration from environment variables
    ///
    /// Expected environment variables:
    /// - FRESHLENS_MAX_WORKERS (optional, default: 10)
    /// - FRESHLENS_HOURLY_RATE (optional, dollars or a warehouse size such as `X-Small`, default: 4)
    /// - FRESHLENS_REQUEST_TIMEOUT (optional, seconds, default: 30)
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut config = Self::new();

        if let Some(value) = lookup("FRESHLENS_MAX_WORKERS") {
            config.max_workers = value.parse().map_err(|_| ConfigError::InvalidEnv {
                name: "FRESHLENS_MAX_WORKERS",
                value: value.clone(),
            })?;
        }

        if let Some(value) = lookup("FRESHLENS_HOURLY_RATE") {
            config.hourly_rate = parse_hourly_rate(&value).ok_or_else(|| ConfigError::InvalidEnv {
                name: "FRESHLENS_HOURLY_RATE",
                value: value.clone(),
            })?;
        }

        if let Some(value) = lookup("FRESHLENS_REQUEST_TIMEOUT") {
            let secs: u64 = value.parse().map_err(|_| ConfigError::InvalidEnv {
                name: "FRESHLENS_REQUEST_TIMEOUT",
                value: value.clone(),
            })?;
            config.request_timeout = Duration::from_secs(secs);
        }

        Ok(config)
    }

    pub fn with_max_workers(mut self, max_workers: usize) -> Self {
        self.max_workers = max_workers;
        self
    }

    pub fn with_hourly_rate(mut self, hourly_rate: f64) -> Self {
        self.hourly_rate = hourly_rate;
        self
    }

    pub fn cost_model(&self) -> CostModel {
        CostModel::new(self.hourly_rate)
    }

    /// Validates the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_workers == 0 {
            return Err(ConfigError::Zero("max_workers"));
        }

        if self.page_cap == 0 {
            return Err(ConfigError::Zero("page_cap"));
        }

        if self.page_cap > API_MAX_LIMIT {
            return Err(ConfigError::PageCapTooLarge);
        }

        if self.graphql_page_size == 0 {
            return Err(ConfigError::Zero("graphql_page_size"));
        }

        if !self.hourly_rate.is_finite() || self.hourly_rate < 0.0 {
            return Err(ConfigError::InvalidRate);
        }

        if self.request_timeout.is_zero() {
            return Err(ConfigError::Zero("request_timeout"));
        }

        Ok(())
    }
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Accepts a dollar amount or a warehouse size name
pub fn parse_hourly_rate(value: &str) -> Option<f64> {
    value
        .trim()
        .trim_start_matches('$')
        .parse::<f64>()
        .ok()
        .or_else(|| value.parse::<WarehouseSize>().ok().map(|size| size.hourly_rate()))
}

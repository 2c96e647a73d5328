//! CLI configuration
//!
//! Credentials, the target environment and analyzer tuning, gathered from
//! flags and environment variables.

use anyhow::{Context, Result, bail};
use freshlens_analyzer::AnalyzerConfig;
use freshlens_client::{CloudClient, Credentials};

/// CLI configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub credentials: Credentials,
    pub environment_id: Option<i64>,
    pub analyzer: AnalyzerConfig,
}

impl Config {
    pub fn new(credentials: Credentials, environment_id: Option<i64>, analyzer: AnalyzerConfig) -> Self {
        Self {
            credentials,
            environment_id,
            analyzer,
        }
    }

    /// Rejects configurations that cannot reach an account
    pub fn validate(&self) -> Result<()> {
        if self.credentials.api_key.trim().is_empty() {
            bail!("An API key is required (--api-key or DBT_CLOUD_API_KEY)");
        }

        if self.credentials.account_id <= 0 {
            bail!("An account id is required (--account-id or DBT_CLOUD_ACCOUNT_ID)");
        }

        for (name, url) in [
            ("URL", &self.credentials.api_base),
            ("metadata URL", &self.credentials.metadata_url),
        ] {
            if !url.starts_with("http://") && !url.starts_with("https://") {
                bail!("The {} must start with http:// or https://, got '{}'", name, url);
            }
        }

        self.analyzer.validate().context("Invalid analyzer settings")?;

        Ok(())
    }

    /// Environment the reports run against
    pub fn environment_id(&self) -> Result<i64> {
        self.environment_id
            .context("An environment id is required (--environment-id or DBT_CLOUD_ENVIRONMENT_ID)")
    }

    /// Builds an API client honoring the timeout and page cap
    pub fn client(&self) -> Result<CloudClient> {
        let client = CloudClient::with_timeout(self.credentials.clone(), self.analyzer.request_timeout)
            .context("Failed to build HTTP client")?;
        Ok(client.with_page_cap(self.analyzer.page_cap))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(api_base: &str, api_key: &str, account_id: i64) -> Config {
        Config::new(
            Credentials::new(api_base, api_key, account_id),
            Some(3),
            AnalyzerConfig::default(),
        )
    }

    #[test]
    fn test_valid_config() {
        let config = config("https://cloud.getdbt.com", "dbtc_x", 12);
        assert!(config.validate().is_ok());
        assert_eq!(config.environment_id().unwrap(), 3);
        assert_eq!(config.client().unwrap().account_id(), 12);
    }

    #[test]
    fn test_rejects_missing_credentials() {
        assert!(config("https://cloud.getdbt.com", " ", 12).validate().is_err());
        assert!(config("https://cloud.getdbt.com", "dbtc_x", 0).validate().is_err());
    }

    #[test]
    fn test_rejects_non_http_url() {
        let err = config("cloud.getdbt.com", "dbtc_x", 12).validate().unwrap_err();
        assert!(err.to_string().contains("http://"));
    }

    #[test]
    fn test_rejects_zero_workers() {
        let mut config = config("https://cloud.getdbt.com", "dbtc_x", 12);
        config.analyzer = config.analyzer.with_max_workers(0);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_missing_environment() {
        let mut config = config("https://cloud.getdbt.com", "dbtc_x", 12);
        config.environment_id = None;
        assert!(config.environment_id().is_err());
    }
}

//! dbt Cloud HTTP Client
//!
//! A small, typed client for the dbt Cloud administrative (REST v2) and
//! metadata (GraphQL) APIs.
//!
//! Credentials are passed explicitly; nothing is read from the environment
//! here, so several accounts can be queried side by side.
//!
//! # Example
//!
//! ```no_run
//! use freshlens_client::{CloudClient, Credentials};
//! use freshlens_core::dto::query::ListFilters;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), freshlens_client::ClientError> {
//!     let client = CloudClient::new(Credentials::new(
//!         "https://cloud.getdbt.com",
//!         "dbtc_secret",
//!         12345,
//!     ));
//!
//!     let runs = client.list_runs(&ListFilters::for_job(42), 250).await?;
//!     println!("Fetched {} runs", runs.len());
//!     Ok(())
//! }
//! ```

mod artifacts;
pub mod error;
mod jobs;
mod metadata;
pub mod pagination;
mod runs;

pub use error::{ClientError, Result};

use std::time::Duration;

use freshlens_core::dto::ApiEnvelope;
use freshlens_core::dto::query::API_MAX_LIMIT;
use reqwest::header::AUTHORIZATION;
use reqwest::{Client, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;

/// Default host of the administrative API
pub const DEFAULT_API_BASE: &str = "https://cloud.getdbt.com";

/// Default endpoint of the metadata API
pub const DEFAULT_METADATA_URL: &str = "https://metadata.cloud.getdbt.com/graphql";

/// Account credentials for both APIs
#[derive(Clone)]
pub struct Credentials {
    /// Host of the REST API, e.g. `https://cloud.getdbt.com`
    pub api_base: String,
    /// Service token, sent as `Token` (REST) or `Bearer` (GraphQL)
    pub api_key: String,
    pub account_id: i64,
    pub metadata_url: String,
}

impl Credentials {
    pub fn new(api_base: impl Into<String>, api_key: impl Into<String>, account_id: i64) -> Self {
        Self {
            api_base: api_base.into(),
            api_key: api_key.into(),
            account_id,
            metadata_url: DEFAULT_METADATA_URL.to_string(),
        }
    }

    pub fn with_metadata_url(mut self, metadata_url: impl Into<String>) -> Self {
        self.metadata_url = metadata_url.into();
        self
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("api_base", &self.api_base)
            .field("api_key", &"<redacted>")
            .field("account_id", &self.account_id)
            .field("metadata_url", &self.metadata_url)
            .finish()
    }
}

/// HTTP client for dbt Cloud
///
/// Endpoints are grouped by resource:
/// - Jobs (list, get)
/// - Runs (paginated listing, steps, latest runs)
/// - Artifacts (`run_results.json`, `manifest.json`)
/// - Metadata (environment model inventory over GraphQL)
#[derive(Debug, Clone)]
pub struct CloudClient {
    /// REST host with trailing slashes removed
    api_base: String,
    credentials: Credentials,
    /// Per-request item cap of list endpoints
    page_cap: usize,
    client: Client,
}

impl CloudClient {
    /// Create a client with a default HTTP client
    pub fn new(credentials: Credentials) -> Self {
        Self::with_client(credentials, Client::new())
    }

    /// Create a client whose requests time out after `timeout`
    pub fn with_timeout(credentials: Credentials, timeout: Duration) -> Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self::with_client(credentials, client))
    }

    /// Create a client around a preconfigured reqwest client
    pub fn with_client(credentials: Credentials, client: Client) -> Self {
        Self {
            api_base: credentials.api_base.trim_end_matches('/').to_string(),
            credentials,
            page_cap: API_MAX_LIMIT,
            client,
        }
    }

    /// Lower the per-request cap of list endpoints (never above the API limit)
    pub fn with_page_cap(mut self, page_cap: usize) -> Self {
        self.page_cap = page_cap.clamp(1, API_MAX_LIMIT);
        self
    }

    pub fn api_base(&self) -> &str {
        &self.api_base
    }

    pub fn account_id(&self) -> i64 {
        self.credentials.account_id
    }

    pub fn page_cap(&self) -> usize {
        self.page_cap
    }

    /// URL of an account-scoped REST path such as `runs/42/`
    pub fn account_url(&self, path: &str) -> String {
        format!(
            "{}/api/v2/accounts/{}/{}",
            self.api_base,
            self.credentials.account_id,
            path.trim_start_matches('/')
        )
    }

    fn rest_get(&self, url: &str) -> RequestBuilder {
        self.client
            .get(url)
            .header(AUTHORIZATION, format!("Token {}", self.credentials.api_key))
    }

    /// GET an enveloped REST resource and unwrap `data`
    async fn get_data<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<T> {
        let url = self.account_url(path);
        tracing::debug!("GET {} {:?}", url, query);
        let response = self.rest_get(&url).query(query).send().await?;
        let envelope: ApiEnvelope<T> = self.handle_response(response).await?;
        Ok(envelope.data)
    }

    /// GET a raw (non-enveloped) document such as an artifact file
    async fn get_raw<T: DeserializeOwned>(&self, path: &str, query: &[(&str, String)]) -> Result<T> {
        let url = self.account_url(path);
        tracing::debug!("GET {} {:?}", url, query);
        let response = self.rest_get(&url).query(query).send().await?;
        self.handle_response(response).await
    }

    async fn handle_response<T: DeserializeOwned>(&self, response: reqwest::Response) -> Result<T> {
        let status = response.status();
        let body = response.bytes().await?;
        decode_response(status, &body)
    }
}

/// Turns a non-2xx answer into [`ClientError::ApiError`] carrying the body,
/// and otherwise decodes the JSON payload
fn decode_response<T: DeserializeOwned>(status: StatusCode, body: &[u8]) -> Result<T> {
    if !status.is_success() {
        let message = String::from_utf8_lossy(body).into_owned();
        return Err(ClientError::api_error(status.as_u16(), message));
    }

    serde_json::from_slice(body).map_err(|e| ClientError::ParseError(e.to_string()))
}

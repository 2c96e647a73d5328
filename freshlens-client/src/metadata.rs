//! Metadata (GraphQL) API endpoints

use freshlens_core::domain::model::AppliedModel;
use freshlens_core::dto::graphql::{
    Connection, ENVIRONMENT_MODELS_QUERY, EnvironmentData, EnvironmentModelsVariables,
    GraphQlRequest, GraphQlResponse, PageInfo,
};
use reqwest::header::AUTHORIZATION;
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::info;

use crate::CloudClient;
use crate::error::{ClientError, Result};
use crate::pagination::collect_cursor_pages;

impl CloudClient {
    // =============================================================================
    // Metadata API
    // =============================================================================

    /// Run a GraphQL query and return its `data`
    ///
    /// A response carrying `errors` fails, even when partial data is present.
    pub async fn graphql<V, T>(&self, query: &str, variables: V) -> Result<T>
    where
        V: Serialize,
        T: DeserializeOwned,
    {
        let response = self
            .client
            .post(&self.credentials.metadata_url)
            .header(AUTHORIZATION, format!("Bearer {}", self.credentials.api_key))
            .json(&GraphQlRequest { query, variables })
            .send()
            .await?;
        let body: GraphQlResponse<T> = self.handle_response(response).await?;

        if let Some(errors) = body.errors.filter(|errors| !errors.is_empty()) {
            let messages: Vec<String> = errors.into_iter().map(|e| e.message).collect();
            return Err(ClientError::GraphQl(messages.join("; ")));
        }
        body.data
            .ok_or_else(|| ClientError::GraphQl("response has no data".to_string()))
    }

    /// Every applied model of an environment
    ///
    /// # Arguments
    /// * `environment_id` - The environment to inventory
    /// * `page_size` - Nodes requested per page
    pub async fn environment_models(
        &self,
        environment_id: i64,
        page_size: usize,
    ) -> Result<Vec<AppliedModel>> {
        let models = collect_cursor_pages(|after| async move {
            let variables = EnvironmentModelsVariables {
                environment_id,
                first: page_size,
                after,
            };
            let data: EnvironmentData = self.graphql(ENVIRONMENT_MODELS_QUERY, variables).await?;
            Ok(data.into_models().unwrap_or_else(empty_connection))
        })
        .await?;

        info!(
            "Fetched {} applied models for environment {}",
            models.len(),
            environment_id
        );
        Ok(models)
    }
}

fn empty_connection<T>() -> Connection<T> {
    Connection {
        page_info: PageInfo::default(),
        edges: Vec::new(),
    }
}

//! Metadata (GraphQL) API request and response shapes

use serde::{Deserialize, Serialize};

use crate::domain::model::AppliedModel;

/// Default number of nodes requested per page
pub const DEFAULT_PAGE_SIZE: usize = 500;

/// Environment-wide applied model inventory
pub const ENVIRONMENT_MODELS_QUERY: &str = r#"
query Environment($environmentId: BigInt!, $first: Int, $after: String) {
  environment(id: $environmentId) {
    applied {
      models(first: $first, after: $after) {
        pageInfo {
          startCursor
          endCursor
          hasNextPage
        }
        edges {
          node {
            config
            name
            packageName
            resourceType
            executionInfo {
              lastRunGeneratedAt
              lastRunStatus
              lastSuccessJobDefinitionId
              lastSuccessRunId
              lastRunError
              executeCompletedAt
            }
          }
        }
      }
    }
  }
}
"#;

/// Request body for the GraphQL endpoint
#[derive(Debug, Clone, Serialize)]
pub struct GraphQlRequest<'a, V: Serialize> {
    pub query: &'a str,
    pub variables: V,
}

/// Variables of [`ENVIRONMENT_MODELS_QUERY`]
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EnvironmentModelsVariables {
    pub environment_id: i64,
    pub first: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub after: Option<String>,
}

/// Generic GraphQL response
#[derive(Debug, Clone, Deserialize)]
pub struct GraphQlResponse<T> {
    #[serde(default = "Option::default")]
    pub data: Option<T>,
    #[serde(default)]
    pub errors: Option<Vec<GraphQlError>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GraphQlError {
    pub message: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EnvironmentData {
    pub environment: Option<EnvironmentNode>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EnvironmentNode {
    pub applied: Option<AppliedState>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppliedState {
    pub models: Option<Connection<AppliedModel>>,
}

/// Relay-style connection page
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Connection<T> {
    pub page_info: PageInfo,
    #[serde(default = "Vec::new")]
    pub edges: Vec<Edge<T>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Edge<T> {
    pub node: T,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageInfo {
    #[serde(default)]
    pub start_cursor: Option<String>,
    #[serde(default)]
    pub end_cursor: Option<String>,
    #[serde(default)]
    pub has_next_page: bool,
}

impl EnvironmentData {
    /// The models connection, if every level of the response is present
    pub fn into_models(self) -> Option<Connection<AppliedModel>> {
        self.environment?.applied?.models
    }
}

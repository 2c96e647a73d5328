//! Data Transfer Objects for the dbt Cloud APIs
//!
//! Wire envelopes and query parameters. Domain entities themselves live in
//! [`crate::domain`]; the types here only wrap or select them.

pub mod graphql;
pub mod query;

use serde::{Deserialize, Serialize};

/// Standard `{"data": ...}` envelope of the REST API
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiEnvelope<T> {
    pub data: T,
}

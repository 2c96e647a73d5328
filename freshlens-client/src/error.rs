//! Client errors

use thiserror::Error;

pub type Result<T> = std::result::Result<T, ClientError>;

/// Failures of a dbt Cloud call
#[derive(Debug, Error)]
pub enum ClientError {
    /// No response: connection, TLS or timeout
    #[error("dbt Cloud request failed: {0}")]
    RequestFailed(#[from] reqwest::Error),

    /// Non-2xx answer, with the response body when there was one
    #[error("dbt Cloud answered {status}: {message}")]
    ApiError { status: u16, message: String },

    /// Body did not match the expected shape
    #[error("unexpected response body: {0}")]
    ParseError(String),

    /// The metadata API answered with an `errors` array
    #[error("GraphQL error: {0}")]
    GraphQl(String),

    /// Rejected before any request was sent
    #[error("invalid request: {0}")]
    InvalidRequest(String),
}

impl ClientError {
    pub fn api_error(status: u16, message: impl Into<String>) -> Self {
        Self::ApiError {
            status,
            message: message.into(),
        }
    }

    /// HTTP status of an API error
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::ApiError { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Missing run, job or artifact (404)
    pub fn is_not_found(&self) -> bool {
        self.status() == Some(404)
    }

    /// Credentials rejected (401/403)
    pub fn is_unauthorized(&self) -> bool {
        matches!(self.status(), Some(401 | 403))
    }

    pub fn is_client_error(&self) -> bool {
        self.status().is_some_and(|status| (400..500).contains(&status))
    }

    pub fn is_server_error(&self) -> bool {
        self.status().is_some_and(|status| status >= 500)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_predicates() {
        assert!(ClientError::api_error(401, "bad token").is_unauthorized());
        assert!(ClientError::api_error(403, "forbidden").is_unauthorized());
        assert!(!ClientError::api_error(404, "gone").is_unauthorized());
        assert!(ClientError::api_error(404, "gone").is_not_found());
        assert!(ClientError::api_error(502, "bad gateway").is_server_error());
        assert!(ClientError::api_error(429, "slow down").is_client_error());
        assert!(!ClientError::api_error(429, "slow down").is_server_error());
        assert_eq!(ClientError::GraphQl("boom".into()).status(), None);
    }

    #[test]
    fn test_display_keeps_body() {
        let err = ClientError::api_error(400, "{\"status\":{\"user_message\":\"bad limit\"}}");
        assert!(err.to_string().contains("bad limit"));
    }
}

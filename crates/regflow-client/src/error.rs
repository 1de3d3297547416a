//! Registration API client error types.

use regflow_core::AdapterError;

/// Errors from registration API calls.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// HTTP transport error.
    #[error("HTTP error calling {endpoint}: {source}")]
    Http {
        endpoint: String,
        source: reqwest::Error,
    },
    /// The API returned a non-2xx status.
    #[error("{endpoint} returned {status}: {body}")]
    Api {
        endpoint: String,
        status: u16,
        body: String,
    },
    /// The registration does not exist.
    #[error("registration {registration_id} not found")]
    NotFound { registration_id: String },
    /// The payment endpoint refused the charge.
    #[error("payment declined ({status}): {body}")]
    Declined { status: u16, body: String },
    /// Response deserialization failed.
    #[error("failed to deserialize response from {endpoint}: {source}")]
    Deserialization {
        endpoint: String,
        source: reqwest::Error,
    },
    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(#[from] super::config::ConfigError),
}

impl From<ApiError> for AdapterError {
    fn from(err: ApiError) -> Self {
        match err {
            ApiError::NotFound { registration_id } => AdapterError::NotFound { registration_id },
            ApiError::Declined { status, body } => AdapterError::Declined {
                reason: if body.trim().is_empty() {
                    format!("HTTP {status}")
                } else {
                    body
                },
            },
            ApiError::Api {
                endpoint,
                status,
                body,
            } => AdapterError::Unavailable {
                operation: endpoint,
                reason: format!("HTTP {status}: {body}"),
            },
            ApiError::Http { endpoint, source } => AdapterError::Unavailable {
                operation: endpoint,
                reason: source.to_string(),
            },
            ApiError::Deserialization { endpoint, source } => AdapterError::Malformed {
                operation: endpoint,
                reason: source.to_string(),
            },
            ApiError::Config(e) => AdapterError::Unavailable {
                operation: "client configuration".into(),
                reason: e.to_string(),
            },
        }
    }
}

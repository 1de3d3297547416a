//! # regflow-client -- HTTP collaborators for the registration flow
//!
//! Typed `reqwest` clients for the two backend services the orchestrator
//! needs, each implementing its collaborator trait from `regflow-core`:
//!
//! | Method | Path | Client | Trait |
//! |--------|------|--------|-------|
//! | GET    | `/api/v1/registrations/{id}/status` | [`StatusClient`] | `RegistrationStatusSource` |
//! | POST   | `/api/v1/payments` | [`PaymentClient`] | `PaymentGateway` |
//!
//! Every request carries the configured bearer token. There is no retry
//! layer: a failed call surfaces once and retrying is the user's decision.

pub mod config;
pub mod error;
pub mod payments;
pub mod status;

pub use config::{ConfigError, RegistrationApiConfig};
pub use error::ApiError;
pub use payments::PaymentClient;
pub use status::StatusClient;

use std::time::Duration;

use url::Url;

/// Top-level registration API client. Holds one sub-client per service.
#[derive(Debug, Clone)]
pub struct RegistrationApiClient {
    status: StatusClient,
    payments: PaymentClient,
}

impl RegistrationApiClient {
    /// Create a new client from configuration.
    pub fn new(config: RegistrationApiConfig) -> Result<Self, ApiError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .default_headers({
                let mut headers = reqwest::header::HeaderMap::new();
                let mut auth = reqwest::header::HeaderValue::from_str(&format!(
                    "Bearer {}",
                    config.api_token.as_str()
                ))
                .map_err(|_| ApiError::Config(ConfigError::MissingToken))?;
                auth.set_sensitive(true);
                headers.insert(reqwest::header::AUTHORIZATION, auth);
                headers.insert(
                    reqwest::header::ACCEPT,
                    reqwest::header::HeaderValue::from_static("application/json"),
                );
                headers
            })
            .build()
            .map_err(|e| ApiError::Http {
                endpoint: "client_init".into(),
                source: e,
            })?;

        Ok(Self {
            status: StatusClient::new(http.clone(), config.base_url.clone()),
            payments: PaymentClient::new(http, config.base_url),
        })
    }

    /// Access the registration status client.
    pub fn status(&self) -> &StatusClient {
        &self.status
    }

    /// Access the payments client.
    pub fn payments(&self) -> &PaymentClient {
        &self.payments
    }
}

/// Append path segments to `base`, percent-encoding each one.
pub(crate) fn endpoint_url(base: &Url, segments: &[&str]) -> Result<Url, ApiError> {
    let mut url = base.clone();
    url.path_segments_mut()
        .map_err(|_| ConfigError::InvalidUrl(base.to_string(), "cannot be a base URL".into()))?
        .pop_if_empty()
        .extend(segments);
    Ok(url)
}

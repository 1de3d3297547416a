//! Typed client for the registration status endpoint.
//!
//! | Method | Path | Operation |
//! |--------|------|-----------|
//! | GET    | `/api/v1/registrations/{id}/status` | Program, saved form data, financial summary, balance due |

use async_trait::async_trait;
use reqwest::StatusCode;
use url::Url;

use regflow_core::{AdapterError, RegistrationId, RegistrationStatus, RegistrationStatusSource};

use crate::endpoint_url;
use crate::error::ApiError;

/// Client for registration status reads.
#[derive(Debug, Clone)]
pub struct StatusClient {
    http: reqwest::Client,
    base_url: Url,
}

impl StatusClient {
    pub(crate) fn new(http: reqwest::Client, base_url: Url) -> Self {
        Self { http, base_url }
    }

    /// Fetch the durable state of a registration.
    ///
    /// Calls `GET {base_url}/api/v1/registrations/{id}/status`.
    pub async fn get_status(&self, id: &RegistrationId) -> Result<RegistrationStatus, ApiError> {
        let endpoint = format!("GET /api/v1/registrations/{id}/status");
        let url = endpoint_url(
            &self.base_url,
            &["api", "v1", "registrations", id.as_str(), "status"],
        )?;
        tracing::debug!(%url, "fetching registration status");

        let resp = self
            .http
            .get(url)
            .send()
            .await
            .map_err(|e| ApiError::Http {
                endpoint: endpoint.clone(),
                source: e,
            })?;

        let status = resp.status();
        if status == StatusCode::NOT_FOUND {
            return Err(ApiError::NotFound {
                registration_id: id.to_string(),
            });
        }
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(ApiError::Api {
                endpoint,
                status: status.as_u16(),
                body,
            });
        }

        resp.json().await.map_err(|e| ApiError::Deserialization {
            endpoint,
            source: e,
        })
    }
}

#[async_trait]
impl RegistrationStatusSource for StatusClient {
    async fn fetch_status(&self, id: &RegistrationId) -> Result<RegistrationStatus, AdapterError> {
        self.get_status(id).await.map_err(|e| {
            tracing::warn!(registration_id = %id, error = %e, "registration status request failed");
            AdapterError::from(e)
        })
    }
}

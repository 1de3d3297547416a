//! Typed client for the payments endpoint.
//!
//! | Method | Path | Operation |
//! |--------|------|-----------|
//! | POST   | `/api/v1/payments` | Charge `{ amount, registrationId, programName }` |
//!
//! A 4xx answer is the provider refusing the charge and maps to
//! [`ApiError::Declined`]; 5xx and transport failures are unavailability.

use async_trait::async_trait;
use url::Url;

use regflow_core::{AdapterError, PaymentGateway, PaymentReceipt, PaymentRequest};

use crate::endpoint_url;
use crate::error::ApiError;

const ENDPOINT: &str = "POST /api/v1/payments";

/// Client for payment submission.
#[derive(Debug, Clone)]
pub struct PaymentClient {
    http: reqwest::Client,
    base_url: Url,
}

impl PaymentClient {
    pub(crate) fn new(http: reqwest::Client, base_url: Url) -> Self {
        Self { http, base_url }
    }

    /// Submit a charge. Called at most once per user action.
    pub async fn submit(&self, request: &PaymentRequest) -> Result<PaymentReceipt, ApiError> {
        let url = endpoint_url(&self.base_url, &["api", "v1", "payments"])?;
        tracing::debug!(%url, amount = %request.amount, "submitting payment");

        let resp = self
            .http
            .post(url)
            .json(request)
            .send()
            .await
            .map_err(|e| ApiError::Http {
                endpoint: ENDPOINT.into(),
                source: e,
            })?;

        let status = resp.status();
        if status.is_client_error() {
            let body = resp.text().await.unwrap_or_default();
            return Err(ApiError::Declined {
                status: status.as_u16(),
                body,
            });
        }
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(ApiError::Api {
                endpoint: ENDPOINT.into(),
                status: status.as_u16(),
                body,
            });
        }

        resp.json().await.map_err(|e| ApiError::Deserialization {
            endpoint: ENDPOINT.into(),
            source: e,
        })
    }
}

#[async_trait]
impl PaymentGateway for PaymentClient {
    async fn submit_payment(&self, request: &PaymentRequest) -> Result<PaymentReceipt, AdapterError> {
        self.submit(request).await.map_err(|e| {
            tracing::warn!(
                registration_id = %request.registration_id,
                error = %e,
                "payment request failed"
            );
            AdapterError::from(e)
        })
    }
}

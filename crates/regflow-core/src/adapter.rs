//! # Collaborator Contracts
//!
//! The orchestrator talks to exactly two external systems:
//!
//! - **Registration status** (read): given a registration identifier, returns
//!   the program, previously saved form data, the financial summary and the
//!   balance still owed. Used by flow restoration and by the payment step.
//! - **Payment**: given `{ amount, registrationId, programName }`, either
//!   completes with a receipt or fails with a message. Nothing else.
//!
//! Both are object-safe async traits so a session can hold them as
//! `Arc<dyn ...>`. Wire documents use camelCase field names.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::amount::Amount;
use crate::data::{FormData, ProgramSummary};
use crate::identity::RegistrationId;

/// Id carried by the synthesized payment intent when nothing is owed.
pub const NO_PAYMENT_INTENT_ID: &str = "no-payment-required";

/// Status carried by the synthesized payment record when nothing is owed.
pub const NO_PAYMENT_STATUS: &str = "no_payment_required";

// ─── Registration status ─────────────────────────────────────────────

/// Durable server-side state of a registration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegistrationStatus {
    #[serde(default)]
    pub program: Option<ProgramSummary>,
    #[serde(default)]
    pub form_data: FormData,
    #[serde(default)]
    pub financial_summary: Option<Value>,
    pub balance_due: Amount,
    #[serde(default)]
    pub total_amount_due: Amount,
}

// ─── Payment ─────────────────────────────────────────────────────────

/// What the payment collaborator is asked to charge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentRequest {
    pub amount: Amount,
    pub registration_id: RegistrationId,
    pub program_name: String,
}

/// Payment intent as reported by the payment provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentIntent {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(default)]
    pub amount: Amount,
    #[serde(flatten)]
    pub details: serde_json::Map<String, Value>,
}

/// Payment record as stored by the registration backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub status: String,
    #[serde(default)]
    pub amount: Amount,
    #[serde(flatten)]
    pub details: serde_json::Map<String, Value>,
}

/// Successful outcome of the payment collaborator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentReceipt {
    pub payment_intent: PaymentIntent,
    pub payment: PaymentRecord,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl PaymentReceipt {
    /// The receipt synthesized when the balance due is zero or negative.
    ///
    /// Downstream steps read it exactly like a real receipt, so "nothing to
    /// pay" and "paid" share one contract.
    pub fn no_payment_required() -> Self {
        Self {
            payment_intent: PaymentIntent {
                id: NO_PAYMENT_INTENT_ID.to_string(),
                status: Some("succeeded".to_string()),
                amount: Amount::ZERO,
                details: serde_json::Map::new(),
            },
            payment: PaymentRecord {
                id: None,
                status: NO_PAYMENT_STATUS.to_string(),
                amount: Amount::ZERO,
                details: serde_json::Map::new(),
            },
            message: Some("No payment required".to_string()),
        }
    }

    /// Whether this receipt is the synthesized zero-payment result.
    pub fn is_no_payment_required(&self) -> bool {
        self.payment.status == NO_PAYMENT_STATUS
    }
}

// ─── Errors ──────────────────────────────────────────────────────────

/// Failure reported by a collaborator.
///
/// Every variant is recoverable from the flow's point of view: the message
/// is shown and the user decides whether to retry or go back.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AdapterError {
    /// The registration does not exist on the backend.
    #[error("registration {registration_id} not found")]
    NotFound { registration_id: String },

    /// Transport failure or non-success response.
    #[error("{operation} unavailable: {reason}")]
    Unavailable { operation: String, reason: String },

    /// The payment provider refused the charge.
    #[error("payment declined: {reason}")]
    Declined { reason: String },

    /// The collaborator answered with a document we could not read.
    #[error("malformed response from {operation}: {reason}")]
    Malformed { operation: String, reason: String },
}

// ─── Traits ──────────────────────────────────────────────────────────

/// Read access to durable registration state.
#[async_trait]
pub trait RegistrationStatusSource: Send + Sync {
    async fn fetch_status(&self, id: &RegistrationId) -> Result<RegistrationStatus, AdapterError>;
}

/// Submits a charge. Implementations must not retry internally; a retry is
/// always a user decision.
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    async fn submit_payment(&self, request: &PaymentRequest)
        -> Result<PaymentReceipt, AdapterError>;
}

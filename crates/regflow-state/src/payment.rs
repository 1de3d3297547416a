//! # Payment Subflow State Machine
//!
//! Local state machine hosted by the payment step.
//!
//! ## States
//!
//! ```text
//!            ┌──────── balance <= 0 (synthesized receipt) ────────┐
//!            │                                                    ▼
//! IDLE ─▶ LOADING ──balance > 0──▶ READY ──submit──▶ PROCESSING ──▶ SUCCESS (terminal)
//!            │                                           │
//!            └──fetch failed──▶ ERROR ◀──payment failed──┘
//!                                 │
//!                                 └──retry──▶ LOADING
//! ```
//!
//! `SUCCESS` is sticky: leaving and re-entering the payment step keeps the
//! stored receipt, so a second pass never fetches or charges again. Any other
//! phase falls back to `IDLE` when the step is left.

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::json;
use thiserror::Error;

use regflow_core::{Amount, PaymentReceipt, RegistrationStatus};

use crate::state::FlowPatch;

/// Form field set when the payment step is left through success.
pub const PAYMENT_COMPLETED_FIELD: &str = "paymentCompleted";

/// Form field carrying the receipt when the payment step is left.
pub const PAYMENT_RESULT_FIELD: &str = "paymentResult";

// ─── Phase ───────────────────────────────────────────────────────────

/// Current phase, with the data that phase owns.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "phase", rename_all = "snake_case")]
pub enum PaymentPhase {
    /// Payment step not entered in this pass.
    Idle,
    /// Waiting for the balance due.
    Loading,
    /// Balance known and owed; waiting for the user to pay.
    Ready { amount_due: Amount },
    /// Charge handed to the payment collaborator.
    Processing { amount: Amount },
    /// Paid, or nothing was owed (terminal).
    Success { receipt: PaymentReceipt },
    /// Status fetch or charge failed; retry or go back.
    Error { message: String },
}

impl PaymentPhase {
    pub fn stage(&self) -> PaymentStage {
        match self {
            Self::Idle => PaymentStage::Idle,
            Self::Loading => PaymentStage::Loading,
            Self::Ready { .. } => PaymentStage::Ready,
            Self::Processing { .. } => PaymentStage::Processing,
            Self::Success { .. } => PaymentStage::Success,
            Self::Error { .. } => PaymentStage::Error,
        }
    }
}

/// Fieldless mirror of [`PaymentPhase`] for logs and transition records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum PaymentStage {
    Idle,
    Loading,
    Ready,
    Processing,
    Success,
    Error,
}

impl PaymentStage {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Success)
    }
}

impl std::fmt::Display for PaymentStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Idle => "IDLE",
            Self::Loading => "LOADING",
            Self::Ready => "READY",
            Self::Processing => "PROCESSING",
            Self::Success => "SUCCESS",
            Self::Error => "ERROR",
        };
        f.write_str(s)
    }
}

// ─── Errors ──────────────────────────────────────────────────────────

/// A payment event arrived in a phase that does not accept it.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PaymentError {
    #[error("payment event {event} is not valid in phase {stage}")]
    InvalidEvent {
        event: &'static str,
        stage: PaymentStage,
    },

    /// The flow is not on the payment step.
    #[error("the current step does not host the payment subflow")]
    NotOnPaymentStep,

    /// A request for the payment step is already outstanding.
    #[error("a payment request is already in flight")]
    Busy,

    /// Nothing to charge against.
    #[error("no registration id is known for this session")]
    MissingRegistration,
}

/// Record of a payment phase change.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PaymentTransitionRecord {
    pub from: PaymentStage,
    pub to: PaymentStage,
    pub at: DateTime<Utc>,
}

// ─── Subflow ─────────────────────────────────────────────────────────

/// The payment subflow and its transition log.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PaymentSubflow {
    phase: PaymentPhase,
    transitions: Vec<PaymentTransitionRecord>,
}

impl Default for PaymentSubflow {
    fn default() -> Self {
        Self::new()
    }
}

impl PaymentSubflow {
    pub fn new() -> Self {
        Self {
            phase: PaymentPhase::Idle,
            transitions: Vec::new(),
        }
    }

    pub fn phase(&self) -> &PaymentPhase {
        &self.phase
    }

    pub fn stage(&self) -> PaymentStage {
        self.phase.stage()
    }

    pub fn transitions(&self) -> &[PaymentTransitionRecord] {
        &self.transitions
    }

    /// The stored receipt, once successful.
    pub fn receipt(&self) -> Option<&PaymentReceipt> {
        match &self.phase {
            PaymentPhase::Success { receipt } => Some(receipt),
            _ => None,
        }
    }

    /// Error message, when in `ERROR`.
    pub fn error_message(&self) -> Option<&str> {
        match &self.phase {
            PaymentPhase::Error { message } => Some(message),
            _ => None,
        }
    }

    /// Called when the flow lands on the payment step. Returns whether the
    /// balance due has to be loaded.
    pub(crate) fn enter(&mut self) -> bool {
        match self.stage() {
            PaymentStage::Success => false,
            PaymentStage::Loading => true,
            _ => {
                self.transition(PaymentPhase::Loading);
                true
            }
        }
    }

    /// Called when the flow leaves the payment step.
    pub(crate) fn leave(&mut self) {
        if !matches!(self.stage(), PaymentStage::Success | PaymentStage::Idle) {
            self.transition(PaymentPhase::Idle);
        }
    }

    /// LOADING → READY, or LOADING → SUCCESS when nothing is owed.
    pub(crate) fn status_loaded(&mut self, status: &RegistrationStatus) -> Result<(), PaymentError> {
        self.require(PaymentStage::Loading, "status_loaded")?;
        if status.balance_due.is_positive() {
            self.transition(PaymentPhase::Ready {
                amount_due: status.balance_due,
            });
        } else {
            tracing::info!(
                balance_due = %status.balance_due,
                "no balance due; synthesizing zero-payment receipt"
            );
            self.transition(PaymentPhase::Success {
                receipt: PaymentReceipt::no_payment_required(),
            });
        }
        Ok(())
    }

    /// LOADING → ERROR.
    pub(crate) fn status_failed(&mut self, message: String) -> Result<(), PaymentError> {
        self.require(PaymentStage::Loading, "status_failed")?;
        self.transition(PaymentPhase::Error { message });
        Ok(())
    }

    /// READY → PROCESSING. Returns the amount to charge.
    pub(crate) fn begin_processing(&mut self) -> Result<Amount, PaymentError> {
        let amount = match &self.phase {
            PaymentPhase::Ready { amount_due } => *amount_due,
            _ => {
                return Err(PaymentError::InvalidEvent {
                    event: "submit",
                    stage: self.stage(),
                })
            }
        };
        self.transition(PaymentPhase::Processing { amount });
        Ok(amount)
    }

    /// PROCESSING → SUCCESS.
    pub(crate) fn payment_succeeded(&mut self, receipt: PaymentReceipt) -> Result<(), PaymentError> {
        self.require(PaymentStage::Processing, "payment_succeeded")?;
        self.transition(PaymentPhase::Success { receipt });
        Ok(())
    }

    /// PROCESSING → ERROR.
    pub(crate) fn payment_failed(&mut self, message: String) -> Result<(), PaymentError> {
        self.require(PaymentStage::Processing, "payment_failed")?;
        self.transition(PaymentPhase::Error { message });
        Ok(())
    }

    /// ERROR → LOADING (user-initiated).
    pub(crate) fn retry(&mut self) -> Result<(), PaymentError> {
        self.require(PaymentStage::Error, "retry")?;
        self.transition(PaymentPhase::Loading);
        Ok(())
    }

    /// The update handed to `advance` when leaving through SUCCESS.
    ///
    /// Built from the stored receipt every time, so proceeding twice merges
    /// the same keys with the same values.
    pub fn proceed_patch(&self) -> Result<FlowPatch, PaymentError> {
        let receipt = self.receipt().ok_or(PaymentError::InvalidEvent {
            event: "proceed",
            stage: self.stage(),
        })?;
        let result = serde_json::to_value(receipt).unwrap_or_else(|e| {
            tracing::warn!("payment receipt could not be serialized: {e}");
            json!(null)
        });
        Ok(FlowPatch::new()
            .field(PAYMENT_COMPLETED_FIELD, json!(true))
            .field(PAYMENT_RESULT_FIELD, result)
            .payment_intent(receipt.payment_intent.clone()))
    }

    fn require(&self, expected: PaymentStage, event: &'static str) -> Result<(), PaymentError> {
        if self.stage() != expected {
            return Err(PaymentError::InvalidEvent {
                event,
                stage: self.stage(),
            });
        }
        Ok(())
    }

    fn transition(&mut self, to: PaymentPhase) {
        let from = self.stage();
        let to_stage = to.stage();
        tracing::debug!(%from, to = %to_stage, "payment subflow transition");
        self.transitions.push(PaymentTransitionRecord {
            from,
            to: to_stage,
            at: Utc::now(),
        });
        self.phase = to;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use regflow_core::{FormData, PaymentIntent, PaymentRecord};

    fn status(balance: i64) -> RegistrationStatus {
        RegistrationStatus {
            program: None,
            form_data: FormData::new(),
            financial_summary: None,
            balance_due: Amount::from_minor_units(balance),
            total_amount_due: Amount::from_minor_units(balance.max(0)),
        }
    }

    fn receipt(id: &str) -> PaymentReceipt {
        PaymentReceipt {
            payment_intent: PaymentIntent {
                id: id.into(),
                status: Some("succeeded".into()),
                amount: Amount::from_minor_units(5000),
                details: Default::default(),
            },
            payment: PaymentRecord {
                id: Some("pay_1".into()),
                status: "completed".into(),
                amount: Amount::from_minor_units(5000),
                details: Default::default(),
            },
            message: None,
        }
    }

    fn ready(balance: i64) -> PaymentSubflow {
        let mut flow = PaymentSubflow::new();
        assert!(flow.enter());
        flow.status_loaded(&status(balance)).unwrap();
        flow
    }

    #[test]
    fn positive_balance_goes_ready() {
        let flow = ready(5000);
        assert_eq!(
            flow.phase(),
            &PaymentPhase::Ready {
                amount_due: Amount::from_minor_units(5000)
            }
        );
    }

    #[test]
    fn zero_balance_synthesizes_success() {
        let mut flow = PaymentSubflow::new();
        flow.enter();
        flow.status_loaded(&status(0)).unwrap();
        let receipt = flow.receipt().unwrap();
        assert_eq!(receipt.payment.status, "no_payment_required");
        assert_eq!(receipt.payment_intent.id, "no-payment-required");
    }

    #[test]
    fn negative_balance_is_nothing_owed() {
        let mut flow = PaymentSubflow::new();
        flow.enter();
        flow.status_loaded(&status(-250)).unwrap();
        assert_eq!(flow.stage(), PaymentStage::Success);
    }

    #[test]
    fn fetch_failure_then_retry_reloads() {
        let mut flow = PaymentSubflow::new();
        flow.enter();
        flow.status_failed("timeout".into()).unwrap();
        assert_eq!(flow.error_message(), Some("timeout"));
        flow.retry().unwrap();
        assert_eq!(flow.stage(), PaymentStage::Loading);
    }

    #[test]
    fn full_charge_path() {
        let mut flow = ready(5000);
        let amount = flow.begin_processing().unwrap();
        assert_eq!(amount.minor_units(), 5000);
        assert_eq!(flow.stage(), PaymentStage::Processing);
        flow.payment_succeeded(receipt("pi_1")).unwrap();
        assert!(flow.stage().is_terminal());
        assert_eq!(flow.transitions().len(), 4);
    }

    #[test]
    fn charge_failure_routes_to_error() {
        let mut flow = ready(5000);
        flow.begin_processing().unwrap();
        flow.payment_failed("card declined".into()).unwrap();
        assert_eq!(flow.error_message(), Some("card declined"));
    }

    #[test]
    fn cannot_submit_twice() {
        let mut flow = ready(5000);
        flow.begin_processing().unwrap();
        assert!(matches!(
            flow.begin_processing(),
            Err(PaymentError::InvalidEvent {
                stage: PaymentStage::Processing,
                ..
            })
        ));
    }

    #[test]
    fn success_survives_leave_and_reenter() {
        let mut flow = ready(5000);
        flow.begin_processing().unwrap();
        flow.payment_succeeded(receipt("pi_1")).unwrap();
        flow.leave();
        assert!(!flow.enter(), "success must not reload");
        assert_eq!(flow.receipt().unwrap().payment_intent.id, "pi_1");
    }

    #[test]
    fn leaving_before_success_resets_to_idle() {
        let mut flow = ready(5000);
        flow.leave();
        assert_eq!(flow.stage(), PaymentStage::Idle);
        assert!(flow.enter());
        assert_eq!(flow.stage(), PaymentStage::Loading);
    }

    #[test]
    fn events_rejected_out_of_phase() {
        let mut flow = PaymentSubflow::new();
        assert!(flow.status_loaded(&status(1)).is_err());
        assert!(flow.retry().is_err());
        assert!(flow.payment_succeeded(receipt("x")).is_err());
        assert!(flow.proceed_patch().is_err());
    }

    #[test]
    fn proceed_patch_is_stable() {
        let mut flow = ready(5000);
        flow.begin_processing().unwrap();
        flow.payment_succeeded(receipt("pi_7")).unwrap();
        let a = flow.proceed_patch().unwrap();
        let b = flow.proceed_patch().unwrap();
        assert_eq!(a, b);
        assert_eq!(a.form_data.get(PAYMENT_COMPLETED_FIELD), Some(&json!(true)));
        assert_eq!(
            a.form_data.get(PAYMENT_RESULT_FIELD).unwrap()["paymentIntent"]["id"],
            json!("pi_7")
        );
        assert_eq!(a.payment_intent.unwrap().id, "pi_7");
    }

    #[test]
    fn stage_display() {
        assert_eq!(PaymentStage::Processing.to_string(), "PROCESSING");
    }
}

//! # Action Scripts
//!
//! A script is a JSON array of actions applied in order to one session:
//!
//! ```json
//! [
//!   {"action": "next", "patch": {"registrationId": "R1", "program": {"name": "Fall Camp"}}},
//!   {"action": "update", "patch": {"formData": {"firstName": "Ada"}}},
//!   {"action": "next"},
//!   {"action": "jump", "to": 3},
//!   {"action": "pay"},
//!   {"action": "proceed"}
//! ]
//! ```

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use regflow_core::RegistrationId;
use regflow_state::{FlowPatch, FlowSession, PaymentError, ResumeChannel, RestoreStatus};

/// One scripted user action.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum Action {
    /// Leave the step forward, optionally contributing data.
    Next {
        #[serde(default)]
        patch: Option<FlowPatch>,
    },
    Back,
    Jump {
        to: usize,
    },
    /// Live-save without leaving the step.
    Update {
        patch: FlowPatch,
    },
    Restore {
        registration_id: RegistrationId,
    },
    Pay,
    /// Retry whatever failed: a restore first, otherwise the payment step.
    Retry,
    Proceed,
    Reset,
}

impl Action {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Next { .. } => "next",
            Self::Back => "back",
            Self::Jump { .. } => "jump",
            Self::Update { .. } => "update",
            Self::Restore { .. } => "restore",
            Self::Pay => "pay",
            Self::Retry => "retry",
            Self::Proceed => "proceed",
            Self::Reset => "reset",
        }
    }
}

/// Parse a script document.
pub fn parse_script(text: &str) -> Result<Vec<Action>> {
    serde_json::from_str(text).context("invalid action script")
}

/// What one action did.
#[derive(Debug, Clone, Serialize)]
pub struct ActionReport {
    pub action: &'static str,
    pub step: String,
    pub outcome: Value,
}

/// Apply `actions` in order. Payment errors are reported per action and do
/// not stop the script.
pub async fn apply<C: ResumeChannel>(
    session: &mut FlowSession<C>,
    actions: Vec<Action>,
) -> Result<Vec<ActionReport>> {
    let mut reports = Vec::with_capacity(actions.len());
    for action in actions {
        let name = action.name();
        let outcome = match action {
            Action::Next { patch } => serde_json::to_value(session.advance(patch).await)?,
            Action::Back => serde_json::to_value(session.retreat().await)?,
            Action::Jump { to } => serde_json::to_value(session.jump_to(to).await)?,
            Action::Update { patch } => {
                session.update(patch);
                Value::String("updated".into())
            }
            Action::Restore { registration_id } => {
                Value::Bool(session.restore_from_identifier(registration_id).await)
            }
            Action::Pay => match session.pay().await {
                Ok(()) => serde_json::to_value(session.controller().payment().stage())?,
                Err(e) => rejected(e),
            },
            Action::Retry => {
                if matches!(
                    session.controller().restore_status(),
                    RestoreStatus::Failed { .. }
                ) {
                    Value::Bool(session.retry_restore().await)
                } else {
                    match session.retry_payment().await {
                        Ok(()) => serde_json::to_value(session.controller().payment().stage())?,
                        Err(e) => rejected(e),
                    }
                }
            }
            Action::Proceed => match session.proceed_from_payment().await {
                Ok(outcome) => serde_json::to_value(outcome)?,
                Err(e) => rejected(e),
            },
            Action::Reset => serde_json::to_value(session.start_new_registration().await)?,
        };

        let step = session.controller().current_step().id.to_string();
        tracing::info!(action = name, %step, %outcome, "applied action");
        reports.push(ActionReport {
            action: name,
            step,
            outcome,
        });
    }
    Ok(reports)
}

fn rejected(e: PaymentError) -> Value {
    tracing::warn!(error = %e, "payment action rejected");
    serde_json::json!({ "error": e.to_string() })
}

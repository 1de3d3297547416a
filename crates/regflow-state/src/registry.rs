//! # Step Registry
//!
//! Ordered, immutable catalog of the steps in a flow. Registry order is the
//! canonical sequence order.
//!
//! ## Bounded Indices
//!
//! Positions are handed out as [`StepIndex`] values, which only a registry
//! can mint. The controller never holds a raw `usize` for the current step,
//! so an out-of-range lookup cannot be expressed through its API.
//!
//! ## Variants
//!
//! ```text
//! standard:  program ─▶ player-info ─▶ fee-summary ─▶ payment ─▶ confirmation
//! legacy:    program ─▶ player-info ─────────────────▶ payment ─▶ confirmation
//! ```
//!
//! Both run on the same controller; nothing downstream special-cases either.

use std::collections::HashSet;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use regflow_core::StepId;

// ─── Step Kind ───────────────────────────────────────────────────────

/// Which renderer draws a step. Resolved to a concrete renderer once, when
/// a [`crate::renderer::RendererSet`] is bound to a registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepKind {
    /// Choose the program; produces the registration.
    ProgramSelection,
    /// Participant details form.
    ParticipantDetails,
    /// Read-only review of computed fees.
    FeeSummary,
    /// Hosts the payment subflow.
    Payment,
    /// Final confirmation (terminal step).
    Confirmation,
}

impl StepKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ProgramSelection => "PROGRAM_SELECTION",
            Self::ParticipantDetails => "PARTICIPANT_DETAILS",
            Self::FeeSummary => "FEE_SUMMARY",
            Self::Payment => "PAYMENT",
            Self::Confirmation => "CONFIRMATION",
        }
    }
}

impl std::fmt::Display for StepKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ─── Step ────────────────────────────────────────────────────────────

/// An immutable step definition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Step {
    pub id: StepId,
    pub title: String,
    pub description: String,
    pub kind: StepKind,
}

impl Step {
    pub fn new(
        id: StepId,
        title: impl Into<String>,
        description: impl Into<String>,
        kind: StepKind,
    ) -> Self {
        Self {
            id,
            title: title.into(),
            description: description.into(),
            kind,
        }
    }
}

/// Position of a step within the registry that minted it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct StepIndex(usize);

impl StepIndex {
    /// The zero-based position.
    pub fn get(self) -> usize {
        self.0
    }
}

impl std::fmt::Display for StepIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ─── Errors ──────────────────────────────────────────────────────────

/// A registry definition was rejected at construction.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    #[error("registry {name} has no steps")]
    Empty { name: String },

    #[error("registry {name} defines step {id} more than once")]
    DuplicateId { name: String, id: StepId },

    /// The payment subflow attaches to a single step.
    #[error("registry {name} has more than one payment step")]
    MultiplePaymentSteps { name: String },
}

// ─── Registry ────────────────────────────────────────────────────────

/// Ordered catalog of steps. Cheap to clone.
#[derive(Debug, Clone)]
pub struct StepRegistry {
    name: String,
    steps: Arc<[Step]>,
}

impl StepRegistry {
    /// Build a registry, validating that it is non-empty, ids are unique,
    /// and there is at most one payment step.
    pub fn new(name: impl Into<String>, steps: Vec<Step>) -> Result<Self, RegistryError> {
        let name = name.into();
        if steps.is_empty() {
            return Err(RegistryError::Empty { name });
        }

        let mut seen = HashSet::new();
        for step in &steps {
            if !seen.insert(step.id.clone()) {
                return Err(RegistryError::DuplicateId {
                    name,
                    id: step.id.clone(),
                });
            }
        }

        let payment_steps = steps.iter().filter(|s| s.kind == StepKind::Payment).count();
        if payment_steps > 1 {
            return Err(RegistryError::MultiplePaymentSteps { name });
        }

        Ok(Self {
            name,
            steps: steps.into(),
        })
    }

    /// The five-step flow with a fee review before payment.
    pub fn standard() -> Self {
        Self::builtin(
            "standard",
            vec![
                program_step(),
                player_info_step(),
                Step::new(
                    StepId::from_static("fee-summary"),
                    "Review Fees",
                    "Review the computed fees before paying",
                    StepKind::FeeSummary,
                ),
                payment_step(),
                confirmation_step(),
            ],
        )
    }

    /// The older four-step flow without a separate fee review.
    pub fn legacy() -> Self {
        Self::builtin(
            "legacy",
            vec![
                program_step(),
                player_info_step(),
                payment_step(),
                confirmation_step(),
            ],
        )
    }

    /// Look up a built-in variant by name.
    pub fn variant(name: &str) -> Option<Self> {
        match name {
            "standard" => Some(Self::standard()),
            "legacy" => Some(Self::legacy()),
            _ => None,
        }
    }

    // Built-in definitions are unique and non-empty by inspection.
    fn builtin(name: &str, steps: Vec<Step>) -> Self {
        Self {
            name: name.to_string(),
            steps: steps.into(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn count(&self) -> usize {
        self.steps.len()
    }

    /// The step at `index`.
    pub fn step_at(&self, index: StepIndex) -> &Step {
        &self.steps[index.0]
    }

    /// Mint an index for a raw position, if it is in range.
    pub fn index(&self, position: usize) -> Option<StepIndex> {
        (position < self.steps.len()).then_some(StepIndex(position))
    }

    /// Resolve a step id to its index.
    pub fn index_of(&self, id: &str) -> Option<StepIndex> {
        self.steps
            .iter()
            .position(|s| s.id.as_str() == id)
            .map(StepIndex)
    }

    pub fn first(&self) -> StepIndex {
        StepIndex(0)
    }

    pub fn last(&self) -> StepIndex {
        StepIndex(self.steps.len() - 1)
    }

    /// The following index, or `None` on the last step.
    pub fn next(&self, index: StepIndex) -> Option<StepIndex> {
        self.index(index.0 + 1)
    }

    /// The preceding index, or `None` on the first step.
    pub fn prev(&self, index: StepIndex) -> Option<StepIndex> {
        index.0.checked_sub(1).map(StepIndex)
    }

    /// Index of the step hosting the payment subflow, if the flow has one.
    pub fn payment_index(&self) -> Option<StepIndex> {
        self.steps
            .iter()
            .position(|s| s.kind == StepKind::Payment)
            .map(StepIndex)
    }

    /// All indices strictly before `index`.
    pub fn before(&self, index: StepIndex) -> impl Iterator<Item = StepIndex> {
        (0..index.0).map(StepIndex)
    }

    pub fn iter(&self) -> impl Iterator<Item = (StepIndex, &Step)> {
        self.steps.iter().enumerate().map(|(i, s)| (StepIndex(i), s))
    }
}

fn program_step() -> Step {
    Step::new(
        StepId::from_static("program"),
        "Choose Program",
        "Select the program to register for",
        StepKind::ProgramSelection,
    )
}

fn player_info_step() -> Step {
    Step::new(
        StepId::from_static("player-info"),
        "Player Information",
        "Tell us about the participant",
        StepKind::ParticipantDetails,
    )
}

fn payment_step() -> Step {
    Step::new(
        StepId::from_static("payment"),
        "Payment",
        "Pay the outstanding balance",
        StepKind::Payment,
    )
}

fn confirmation_step() -> Step {
    Step::new(
        StepId::from_static("confirmation"),
        "Confirmation",
        "Registration complete",
        StepKind::Confirmation,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn step(id: &str, kind: StepKind) -> Step {
        Step::new(StepId::new(id).unwrap(), id, "", kind)
    }

    #[test]
    fn standard_has_five_steps_in_order() {
        let reg = StepRegistry::standard();
        let ids: Vec<&str> = reg.iter().map(|(_, s)| s.id.as_str()).collect();
        assert_eq!(
            ids,
            ["program", "player-info", "fee-summary", "payment", "confirmation"]
        );
        assert_eq!(reg.count(), 5);
        assert_eq!(reg.payment_index().map(StepIndex::get), Some(3));
        assert_eq!(reg.last().get(), 4);
    }

    #[test]
    fn legacy_skips_fee_summary() {
        let reg = StepRegistry::legacy();
        assert_eq!(reg.count(), 4);
        assert!(reg.index_of("fee-summary").is_none());
        assert_eq!(reg.payment_index().map(StepIndex::get), Some(2));
    }

    #[test]
    fn index_of_and_bounds() {
        let reg = StepRegistry::standard();
        assert_eq!(reg.index_of("payment").map(StepIndex::get), Some(3));
        assert!(reg.index_of("nope").is_none());
        assert!(reg.index(4).is_some());
        assert!(reg.index(5).is_none());
    }

    #[test]
    fn next_and_prev_clamp_at_ends() {
        let reg = StepRegistry::standard();
        assert!(reg.prev(reg.first()).is_none());
        assert!(reg.next(reg.last()).is_none());
        assert_eq!(reg.next(reg.first()).map(StepIndex::get), Some(1));
    }

    #[test]
    fn rejects_empty_registry() {
        assert!(matches!(
            StepRegistry::new("x", vec![]),
            Err(RegistryError::Empty { .. })
        ));
    }

    #[test]
    fn rejects_duplicate_ids() {
        let result = StepRegistry::new(
            "dup",
            vec![step("a", StepKind::ProgramSelection), step("a", StepKind::Confirmation)],
        );
        assert!(matches!(result, Err(RegistryError::DuplicateId { .. })));
    }

    #[test]
    fn rejects_two_payment_steps() {
        let result = StepRegistry::new(
            "pay2",
            vec![step("p1", StepKind::Payment), step("p2", StepKind::Payment)],
        );
        assert!(matches!(
            result,
            Err(RegistryError::MultiplePaymentSteps { .. })
        ));
    }

    #[test]
    fn variant_lookup() {
        assert_eq!(StepRegistry::variant("legacy").unwrap().name(), "legacy");
        assert!(StepRegistry::variant("v3").is_none());
    }

    #[test]
    fn step_kind_display() {
        assert_eq!(StepKind::Payment.to_string(), "PAYMENT");
        assert_eq!(StepKind::FeeSummary.to_string(), "FEE_SUMMARY");
    }
}

//! # Flow State
//!
//! The mutable record of one registration session, and the partial update
//! shape (`FlowPatch`) steps contribute through.
//!
//! Mutation is crate-private: outside this crate a `FlowState` is a read-only
//! snapshot, and every change funnels through [`crate::FlowController`].

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use regflow_core::{FormData, PaymentIntent, ProgramSummary, RegistrationId};

use crate::registry::StepIndex;

/// Results computed outside the form itself.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SecondaryResults {
    pub fee_calculation: Option<Value>,
    pub payment_intent: Option<PaymentIntent>,
}

/// Progress of one registration session.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FlowState {
    pub(crate) current: StepIndex,
    pub(crate) registration_id: Option<RegistrationId>,
    pub(crate) form_data: FormData,
    pub(crate) secondary: SecondaryResults,
    pub(crate) completed: BTreeSet<StepIndex>,
    pub(crate) program: Option<ProgramSummary>,
}

impl FlowState {
    pub(crate) fn fresh(start: StepIndex) -> Self {
        Self {
            current: start,
            registration_id: None,
            form_data: FormData::new(),
            secondary: SecondaryResults::default(),
            completed: BTreeSet::new(),
            program: None,
        }
    }

    pub fn current(&self) -> StepIndex {
        self.current
    }

    pub fn registration_id(&self) -> Option<&RegistrationId> {
        self.registration_id.as_ref()
    }

    pub fn form_data(&self) -> &FormData {
        &self.form_data
    }

    pub fn secondary(&self) -> &SecondaryResults {
        &self.secondary
    }

    pub fn completed(&self) -> &BTreeSet<StepIndex> {
        &self.completed
    }

    pub fn is_completed(&self, index: StepIndex) -> bool {
        self.completed.contains(&index)
    }

    pub fn program(&self) -> Option<&ProgramSummary> {
        self.program.as_ref()
    }

    /// Merge a partial update. Never touches `current` or `completed`.
    ///
    /// A registration id is only taken when none is set yet; a conflicting
    /// one is ignored.
    pub(crate) fn apply(&mut self, patch: FlowPatch) {
        let FlowPatch {
            form_data,
            fee_calculation,
            payment_intent,
            registration_id,
            program,
        } = patch;

        self.form_data.merge(form_data);
        if let Some(fees) = fee_calculation {
            self.secondary.fee_calculation = Some(fees);
        }
        if let Some(intent) = payment_intent {
            self.secondary.payment_intent = Some(intent);
        }
        if let Some(program) = program {
            self.program = Some(program);
        }
        if let Some(id) = registration_id {
            match &self.registration_id {
                None => self.registration_id = Some(id),
                Some(existing) if *existing == id => {}
                Some(existing) => {
                    tracing::warn!(
                        existing = %existing,
                        ignored = %id,
                        "registration id already set; ignoring conflicting id from step update"
                    );
                }
            }
        }
    }

    pub(crate) fn mark_completed(&mut self, index: StepIndex) {
        self.completed.insert(index);
    }
}

/// Partial update contributed by a step.
///
/// Every field is optional; absent fields leave the state alone. There is
/// deliberately no way to express completion or removal of a field.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FlowPatch {
    pub form_data: FormData,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fee_calculation: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payment_intent: Option<PaymentIntent>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub registration_id: Option<RegistrationId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub program: Option<ProgramSummary>,
}

impl FlowPatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn field(mut self, key: impl Into<String>, value: Value) -> Self {
        self.form_data.insert(key, value);
        self
    }

    pub fn fields(mut self, data: FormData) -> Self {
        self.form_data.merge(data);
        self
    }

    pub fn fee_calculation(mut self, fees: Value) -> Self {
        self.fee_calculation = Some(fees);
        self
    }

    pub fn payment_intent(mut self, intent: PaymentIntent) -> Self {
        self.payment_intent = Some(intent);
        self
    }

    pub fn registration_id(mut self, id: RegistrationId) -> Self {
        self.registration_id = Some(id);
        self
    }

    pub fn program(mut self, program: ProgramSummary) -> Self {
        self.program = Some(program);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn rid(s: &str) -> RegistrationId {
        RegistrationId::new(s).unwrap()
    }

    fn start() -> FlowState {
        FlowState::fresh(crate::registry::StepRegistry::standard().first())
    }

    #[test]
    fn apply_merges_form_data_shallowly() {
        let mut state = start();
        state.apply(FlowPatch::new().field("a", json!(1)).field("b", json!(2)));
        state.apply(FlowPatch::new().field("b", json!(3)));
        assert_eq!(state.form_data().get("a"), Some(&json!(1)));
        assert_eq!(state.form_data().get("b"), Some(&json!(3)));
        assert_eq!(state.form_data().len(), 2);
    }

    #[test]
    fn apply_leaves_absent_secondary_results() {
        let mut state = start();
        state.apply(FlowPatch::new().fee_calculation(json!({"total": "50.00"})));
        state.apply(FlowPatch::new().field("x", json!(true)));
        assert_eq!(
            state.secondary().fee_calculation,
            Some(json!({"total": "50.00"}))
        );
    }

    #[test]
    fn registration_id_is_set_once() {
        let mut state = start();
        state.apply(FlowPatch::new().registration_id(rid("R1")));
        state.apply(FlowPatch::new().registration_id(rid("R2")));
        assert_eq!(state.registration_id().map(|r| r.as_str()), Some("R1"));
    }

    #[test]
    fn apply_never_marks_completion() {
        let mut state = start();
        state.apply(FlowPatch::new().field("k", json!("v")));
        assert!(state.completed().is_empty());
    }

    #[test]
    fn patch_deserializes_from_camel_case() {
        let patch: FlowPatch = serde_json::from_value(json!({
            "formData": {"firstName": "Ada"},
            "registrationId": "R9",
            "program": {"name": "Camp"}
        }))
        .unwrap();
        assert_eq!(patch.registration_id, Some(rid("R9")));
        assert_eq!(patch.program.unwrap().name, "Camp");
        assert!(patch.form_data.contains_key("firstName"));
    }

    #[test]
    fn empty_patch_deserializes_from_empty_object() {
        let patch: FlowPatch = serde_json::from_value(json!({})).unwrap();
        assert_eq!(patch, FlowPatch::default());
    }
}

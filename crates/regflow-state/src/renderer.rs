//! # Step Renderer Contract
//!
//! A renderer draws one kind of step. It sees a read-only snapshot of the
//! flow and reports back through a [`StepContext`]: any number of
//! `update` calls, then at most one exit (`next` or `back`).
//!
//! Renderers are bound to registry steps by [`StepKind`] once, up front.
//! A registry step with no renderer is a construction error, so dispatch
//! at render time cannot miss.

use std::collections::HashMap;

use thiserror::Error;

use regflow_core::StepId;

use crate::controller::{FlowController, NavOutcome};
use crate::payment::PaymentSubflow;
use crate::registry::{Step, StepKind, StepRegistry};
use crate::resume::ResumeChannel;
use crate::state::{FlowPatch, FlowState};

/// How a renderer leaves its step.
#[derive(Debug, Clone, PartialEq)]
pub enum StepExit {
    Next(Option<FlowPatch>),
    Back,
}

/// What a renderer may see and do while its step is active.
#[derive(Debug)]
pub struct StepContext<'a> {
    state: &'a FlowState,
    payment: &'a PaymentSubflow,
    updates: Vec<FlowPatch>,
}

impl<'a> StepContext<'a> {
    pub(crate) fn new(state: &'a FlowState, payment: &'a PaymentSubflow) -> Self {
        Self {
            state,
            payment,
            updates: Vec::new(),
        }
    }

    pub fn state(&self) -> &FlowState {
        self.state
    }

    /// The payment subflow. Only meaningful on the payment step.
    pub fn payment(&self) -> &PaymentSubflow {
        self.payment
    }

    /// Live-save a partial update without leaving the step.
    pub fn update(&mut self, patch: FlowPatch) {
        self.updates.push(patch);
    }

    pub fn next(&self, patch: Option<FlowPatch>) -> StepExit {
        StepExit::Next(patch)
    }

    pub fn back(&self) -> StepExit {
        StepExit::Back
    }

    pub(crate) fn into_updates(self) -> Vec<FlowPatch> {
        self.updates
    }
}

pub trait StepRenderer {
    /// Render `step`. Returning `None` keeps the user on the step.
    fn render(&mut self, step: &Step, cx: &mut StepContext<'_>) -> Option<StepExit>;
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RendererError {
    #[error("no renderer for step {id} of kind {kind}")]
    Missing { id: StepId, kind: StepKind },

    #[error("more than one renderer registered for kind {0}")]
    Duplicate(StepKind),
}

/// Renderers keyed by the step kind they draw.
pub struct RendererSet {
    renderers: HashMap<StepKind, Box<dyn StepRenderer>>,
}

impl std::fmt::Debug for RendererSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RendererSet")
            .field("kinds", &self.renderers.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl RendererSet {
    /// Bind renderers for every step kind `registry` uses.
    pub fn new(
        registry: &StepRegistry,
        renderers: Vec<(StepKind, Box<dyn StepRenderer>)>,
    ) -> Result<Self, RendererError> {
        let mut map = HashMap::with_capacity(renderers.len());
        for (kind, renderer) in renderers {
            if map.insert(kind, renderer).is_some() {
                return Err(RendererError::Duplicate(kind));
            }
        }
        for (_, step) in registry.iter() {
            if !map.contains_key(&step.kind) {
                return Err(RendererError::Missing {
                    id: step.id.clone(),
                    kind: step.kind,
                });
            }
        }
        Ok(Self { renderers: map })
    }

    fn get_mut(&mut self, kind: StepKind) -> Option<&mut Box<dyn StepRenderer>> {
        self.renderers.get_mut(&kind)
    }
}

impl<C: ResumeChannel> FlowController<C> {
    /// Render the active step once, apply its updates, then act on its exit.
    ///
    /// Returns the navigation outcome when the renderer left the step.
    pub fn render_current(
        &mut self,
        renderers: &mut RendererSet,
    ) -> Result<Option<NavOutcome>, RendererError> {
        let step = self.current_step().clone();
        let renderer = renderers
            .get_mut(step.kind)
            .ok_or_else(|| RendererError::Missing {
                id: step.id.clone(),
                kind: step.kind,
            })?;

        let mut cx = StepContext::new(self.state(), self.payment());
        let exit = renderer.render(&step, &mut cx);
        let updates = cx.into_updates();

        for patch in updates {
            self.update_flow_state(patch);
        }
        Ok(exit.map(|exit| match exit {
            StepExit::Next(patch) => self.advance(patch),
            StepExit::Back => self.retreat(),
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resume::MemoryChannel;
    use serde_json::json;

    struct Scripted(Vec<Option<StepExit>>);

    impl StepRenderer for Scripted {
        fn render(&mut self, step: &Step, cx: &mut StepContext<'_>) -> Option<StepExit> {
            cx.update(FlowPatch::new().field(format!("seen-{}", step.id), json!(true)));
            if self.0.is_empty() {
                None
            } else {
                self.0.remove(0)
            }
        }
    }

    fn boxed(script: Vec<Option<StepExit>>) -> Box<dyn StepRenderer> {
        Box::new(Scripted(script))
    }

    fn all_kinds(script: Vec<Option<StepExit>>) -> Vec<(StepKind, Box<dyn StepRenderer>)> {
        vec![
            (StepKind::ProgramSelection, boxed(script)),
            (StepKind::ParticipantDetails, boxed(vec![])),
            (StepKind::FeeSummary, boxed(vec![])),
            (StepKind::Payment, boxed(vec![])),
            (StepKind::Confirmation, boxed(vec![])),
        ]
    }

    #[test]
    fn missing_renderer_is_rejected() {
        let registry = StepRegistry::standard();
        let mut renderers = all_kinds(vec![]);
        renderers.retain(|(k, _)| *k != StepKind::FeeSummary);
        let err = RendererSet::new(&registry, renderers).unwrap_err();
        assert_eq!(
            err,
            RendererError::Missing {
                id: StepId::from_static("fee-summary"),
                kind: StepKind::FeeSummary
            }
        );
    }

    #[test]
    fn legacy_registry_needs_no_fee_renderer() {
        let registry = StepRegistry::legacy();
        let mut renderers = all_kinds(vec![]);
        renderers.retain(|(k, _)| *k != StepKind::FeeSummary);
        assert!(RendererSet::new(&registry, renderers).is_ok());
    }

    #[test]
    fn duplicate_renderer_is_rejected() {
        let registry = StepRegistry::standard();
        let mut renderers = all_kinds(vec![]);
        renderers.push((StepKind::Payment, boxed(vec![])));
        assert_eq!(
            RendererSet::new(&registry, renderers).unwrap_err(),
            RendererError::Duplicate(StepKind::Payment)
        );
    }

    #[test]
    fn updates_apply_and_exit_drives_navigation() {
        let registry = StepRegistry::standard();
        let script = vec![
            None,
            Some(StepExit::Next(Some(
                FlowPatch::new().field("program", json!("p1")),
            ))),
        ];
        let mut renderers = RendererSet::new(&registry, all_kinds(script)).unwrap();
        let mut ctl = FlowController::open(registry, MemoryChannel::new());

        assert_eq!(ctl.render_current(&mut renderers).unwrap(), None);
        assert_eq!(ctl.state().current().get(), 0);
        assert!(ctl.state().form_data().contains_key("seen-program"));
        assert!(ctl.state().completed().is_empty());

        let outcome = ctl.render_current(&mut renderers).unwrap();
        assert!(matches!(outcome, Some(NavOutcome::Moved { .. })));
        assert_eq!(ctl.state().form_data().get("program"), Some(&json!("p1")));
        assert_eq!(ctl.state().current().get(), 1);
    }
}

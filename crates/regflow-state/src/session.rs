//! # Flow Session
//!
//! Async driver that pairs a [`FlowController`] with live collaborators.
//! After every operation it drains the controller's pending requests, one at
//! a time, so the controller never has more than one ticket outstanding.

use std::sync::Arc;

use regflow_core::{PaymentGateway, RegistrationId, RegistrationStatusSource};

use crate::controller::{FlowController, NavOutcome, Request};
use crate::payment::PaymentError;
use crate::registry::StepRegistry;
use crate::renderer::{RendererError, RendererSet};
use crate::resume::ResumeChannel;
use crate::state::FlowPatch;

pub struct FlowSession<C> {
    controller: FlowController<C>,
    status: Arc<dyn RegistrationStatusSource>,
    payments: Arc<dyn PaymentGateway>,
}

impl<C: std::fmt::Debug> std::fmt::Debug for FlowSession<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FlowSession")
            .field("controller", &self.controller)
            .finish_non_exhaustive()
    }
}

impl<C: ResumeChannel> FlowSession<C> {
    /// Open a session from the resumability channel and run any restore it
    /// asks for.
    pub async fn open(
        registry: StepRegistry,
        channel: C,
        status: Arc<dyn RegistrationStatusSource>,
        payments: Arc<dyn PaymentGateway>,
    ) -> Self {
        let mut session = Self {
            controller: FlowController::open(registry, channel),
            status,
            payments,
        };
        session.pump().await;
        session
    }

    pub fn controller(&self) -> &FlowController<C> {
        &self.controller
    }

    pub fn into_controller(self) -> FlowController<C> {
        self.controller
    }

    /// Perform requests until the controller has none left.
    pub async fn pump(&mut self) {
        while let Some(request) = self.controller.poll_request() {
            match request {
                Request::Restore {
                    ticket,
                    registration_id,
                } => {
                    let result = self.status.fetch_status(&registration_id).await;
                    self.controller.complete_restore(ticket, result);
                }
                Request::PaymentStatus {
                    ticket,
                    registration_id,
                } => {
                    let result = self.status.fetch_status(&registration_id).await;
                    self.controller.complete_payment_status(ticket, result);
                }
            }
        }
    }

    pub async fn advance(&mut self, patch: Option<FlowPatch>) -> NavOutcome {
        let outcome = self.controller.advance(patch);
        self.pump().await;
        outcome
    }

    pub async fn retreat(&mut self) -> NavOutcome {
        let outcome = self.controller.retreat();
        self.pump().await;
        outcome
    }

    pub async fn jump_to(&mut self, target: usize) -> NavOutcome {
        let outcome = self.controller.jump_to(target);
        self.pump().await;
        outcome
    }

    pub fn update(&mut self, patch: FlowPatch) {
        self.controller.update_flow_state(patch);
    }

    pub async fn start_new_registration(&mut self) -> NavOutcome {
        let outcome = self.controller.start_new_registration();
        self.pump().await;
        outcome
    }

    pub async fn restore_from_identifier(&mut self, id: RegistrationId) -> bool {
        let queued = self.controller.restore_from_identifier(id);
        self.pump().await;
        queued
    }

    pub async fn retry_restore(&mut self) -> bool {
        let queued = self.controller.retry_restore();
        self.pump().await;
        queued
    }

    /// Submit the balance due and wait for the outcome. A declined charge is
    /// not an error here; it routes the subflow to `ERROR`.
    pub async fn pay(&mut self) -> Result<(), PaymentError> {
        let (ticket, request) = self.controller.begin_payment()?;
        let result = self.payments.submit_payment(&request).await;
        self.controller.complete_payment(ticket, result);
        Ok(())
    }

    pub async fn retry_payment(&mut self) -> Result<(), PaymentError> {
        self.controller.retry_payment()?;
        self.pump().await;
        Ok(())
    }

    pub async fn proceed_from_payment(&mut self) -> Result<NavOutcome, PaymentError> {
        let outcome = self.controller.proceed_from_payment()?;
        self.pump().await;
        Ok(outcome)
    }

    pub async fn render_current(
        &mut self,
        renderers: &mut RendererSet,
    ) -> Result<Option<NavOutcome>, RendererError> {
        let outcome = self.controller.render_current(renderers)?;
        self.pump().await;
        Ok(outcome)
    }
}

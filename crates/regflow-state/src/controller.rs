//! # Flow Controller
//!
//! Single authority over step sequencing and [`FlowState`] mutation.
//!
//! ## Gating
//!
//! A target index `t` is reachable when `t <= current`, or when every index
//! in `[0, t)` has been completed. Completion is only ever granted by
//! `advance`, so jumping ahead can never complete a step.
//!
//! ## Requests
//!
//! The controller never performs I/O. When it needs a collaborator it hands
//! out a [`Request`] carrying a [`RequestTicket`]; the host performs the call
//! and reports the result back with the same ticket. Only the ticket
//! currently in flight is accepted; anything else is [`Completion::Stale`].
//!
//! ```text
//! poll_request ──▶ Request{ticket} ──host I/O──▶ complete_*(ticket, result)
//!                                                  │
//!                          ticket == in_flight ? ──┴─▶ Applied | Stale
//! ```
//!
//! While a request is in flight (or a restore is queued) forward navigation
//! is refused. Moving back abandons a payment status fetch but not a
//! restore, and nothing moves while a charge is being processed.

use chrono::{DateTime, Utc};
use serde::Serialize;

use regflow_core::{
    AdapterError, PaymentReceipt, PaymentRequest, RegistrationId, RegistrationStatus,
};

use crate::payment::{PaymentError, PaymentStage, PaymentSubflow};
use crate::registry::{Step, StepIndex, StepRegistry};
use crate::resume::ResumeChannel;
use crate::state::{FlowPatch, FlowState};

const NO_REGISTRATION_MESSAGE: &str = "no registration to pay for";

// ─── Requests ────────────────────────────────────────────────────────

/// What an outstanding request is for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum RequestKind {
    /// Session-scoped reload of durable registration state.
    Restore,
    /// Balance due, fetched by the payment step.
    PaymentStatus,
    /// A charge handed to the payment collaborator.
    PaymentSubmit,
}

impl std::fmt::Display for RequestKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Restore => "RESTORE",
            Self::PaymentStatus => "PAYMENT_STATUS",
            Self::PaymentSubmit => "PAYMENT_SUBMIT",
        };
        f.write_str(s)
    }
}

/// Handle for one outstanding collaborator request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct RequestTicket {
    pub kind: RequestKind,
    /// Step current when the ticket was issued.
    pub step: StepIndex,
    /// Monotonic per controller; never reused.
    pub generation: u64,
}

/// A fetch the host must perform.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Request {
    Restore {
        ticket: RequestTicket,
        registration_id: RegistrationId,
    },
    PaymentStatus {
        ticket: RequestTicket,
        registration_id: RegistrationId,
    },
}

impl Request {
    pub fn ticket(&self) -> RequestTicket {
        match self {
            Self::Restore { ticket, .. } | Self::PaymentStatus { ticket, .. } => *ticket,
        }
    }
}

/// Whether a reported result was taken.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Completion {
    Applied,
    /// Superseded or abandoned; the result was dropped.
    Stale,
}

/// Progress of restoring from a durable identifier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum RestoreStatus {
    Idle,
    Loading,
    Loaded,
    Failed { message: String },
}

// ─── Navigation ──────────────────────────────────────────────────────

/// Why a navigation request was not carried out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Refusal {
    /// The gate forbids the target (or it is out of range).
    Unreachable,
    /// A request is outstanding.
    Busy,
    /// The payment step is left forward only through a successful payment.
    PaymentIncomplete,
}

/// Result of a navigation request. Refusal is a value, not an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum NavOutcome {
    Moved { from: StepIndex, to: StepIndex },
    /// Position unchanged; any merge and completion were still applied.
    Stayed,
    Refused(Refusal),
}

impl NavOutcome {
    pub fn is_refused(&self) -> bool {
        matches!(self, Self::Refused(_))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum TransitionKind {
    Advance,
    Retreat,
    Jump,
    Reset,
}

impl std::fmt::Display for TransitionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Advance => "ADVANCE",
            Self::Retreat => "RETREAT",
            Self::Jump => "JUMP",
            Self::Reset => "RESET",
        };
        f.write_str(s)
    }
}

/// Record of an applied step transition.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StepTransitionRecord {
    pub from: StepIndex,
    pub to: StepIndex,
    pub kind: TransitionKind,
    pub at: DateTime<Utc>,
}

// ─── Controller ──────────────────────────────────────────────────────

#[derive(Debug)]
pub struct FlowController<C> {
    registry: StepRegistry,
    state: FlowState,
    channel: C,
    payment: PaymentSubflow,
    restore: RestoreStatus,
    pending_restore: Option<RegistrationId>,
    in_flight: Option<RequestTicket>,
    next_generation: u64,
    transitions: Vec<StepTransitionRecord>,
}

impl<C: ResumeChannel> FlowController<C> {
    /// Open a session, reading the resumability channel once.
    ///
    /// An absent or unknown `step` starts at the first step. A present
    /// `registration_id` is adopted and a single restore is queued.
    pub fn open(registry: StepRegistry, channel: C) -> Self {
        let params = channel.read();
        let start = match params.step.as_deref() {
            Some(id) => registry.index_of(id).unwrap_or_else(|| {
                tracing::warn!(step = id, "unknown step in resume channel; starting at the first step");
                registry.first()
            }),
            None => registry.first(),
        };

        let mut controller = Self {
            state: FlowState::fresh(start),
            registry,
            channel,
            payment: PaymentSubflow::new(),
            restore: RestoreStatus::Idle,
            pending_restore: None,
            in_flight: None,
            next_generation: 0,
            transitions: Vec::new(),
        };

        if let Some(id) = params.registration_id {
            controller.state.registration_id = Some(id.clone());
            controller.queue_restore(id);
        }
        if controller.on_payment_step() {
            controller.payment.enter();
        }

        tracing::info!(
            registry = controller.registry.name(),
            step = %controller.current_step().id,
            registration_id = ?controller.state.registration_id().map(RegistrationId::as_str),
            "registration flow opened"
        );
        controller
    }

    // ── accessors ──

    pub fn registry(&self) -> &StepRegistry {
        &self.registry
    }

    pub fn state(&self) -> &FlowState {
        &self.state
    }

    pub fn channel(&self) -> &C {
        &self.channel
    }

    pub fn payment(&self) -> &PaymentSubflow {
        &self.payment
    }

    pub fn restore_status(&self) -> &RestoreStatus {
        &self.restore
    }

    pub fn in_flight(&self) -> Option<RequestTicket> {
        self.in_flight
    }

    pub fn transitions(&self) -> &[StepTransitionRecord] {
        &self.transitions
    }

    pub fn current_step(&self) -> &Step {
        self.registry.step_at(self.state.current)
    }

    /// Whether forward navigation is currently refused.
    pub fn is_busy(&self) -> bool {
        self.in_flight.is_some() || self.pending_restore.is_some()
    }

    fn on_payment_step(&self) -> bool {
        self.registry.payment_index() == Some(self.state.current)
    }

    fn submitting(&self) -> bool {
        matches!(
            self.in_flight,
            Some(RequestTicket {
                kind: RequestKind::PaymentSubmit,
                ..
            })
        )
    }

    // ── gating ──

    /// Whether `target` may be jumped to. Out-of-range targets are never
    /// reachable.
    pub fn can_reach(&self, target: usize) -> bool {
        match self.registry.index(target) {
            Some(t) => {
                t <= self.state.current
                    || self.registry.before(t).all(|i| self.state.is_completed(i))
            }
            None => false,
        }
    }

    // ── navigation ──

    /// Merge `patch`, complete the current step and move forward one step.
    /// On the last step the position stays put but the merge, completion
    /// and channel write still happen. The payment step is only left
    /// forward once the subflow reached SUCCESS.
    pub fn advance(&mut self, patch: Option<FlowPatch>) -> NavOutcome {
        if self.is_busy() {
            return self.refuse(Refusal::Busy, "advance");
        }
        if self.on_payment_step() && self.payment.stage() != PaymentStage::Success {
            return self.refuse(Refusal::PaymentIncomplete, "advance");
        }
        if let Some(patch) = patch {
            self.state.apply(patch);
        }
        let from = self.state.current;
        self.state.mark_completed(from);

        match self.registry.next(from) {
            Some(to) => self.move_to(to, TransitionKind::Advance),
            None => {
                self.write_channel();
                NavOutcome::Stayed
            }
        }
    }

    /// Move back one step. Completion is kept.
    pub fn retreat(&mut self) -> NavOutcome {
        if self.submitting() {
            return self.refuse(Refusal::Busy, "retreat");
        }
        match self.registry.prev(self.state.current) {
            Some(to) => {
                self.abandon_step_request();
                self.move_to(to, TransitionKind::Retreat)
            }
            None => {
                self.write_channel();
                NavOutcome::Stayed
            }
        }
    }

    /// Jump to `target` if the gate allows it.
    pub fn jump_to(&mut self, target: usize) -> NavOutcome {
        let to = match self.registry.index(target) {
            Some(to) if self.can_reach(target) => to,
            _ => return self.refuse(Refusal::Unreachable, "jump"),
        };
        let from = self.state.current;
        if to == from {
            return NavOutcome::Stayed;
        }
        if to > from && self.is_busy() {
            return self.refuse(Refusal::Busy, "jump");
        }
        if to < from {
            if self.submitting() {
                return self.refuse(Refusal::Busy, "jump");
            }
            self.abandon_step_request();
        }
        self.move_to(to, TransitionKind::Jump)
    }

    /// Live-save: merge without leaving the step or completing it.
    pub fn update_flow_state(&mut self, patch: FlowPatch) {
        self.state.apply(patch);
    }

    /// Discard the session and start over at the first step.
    pub fn start_new_registration(&mut self) -> NavOutcome {
        if self.submitting() {
            return self.refuse(Refusal::Busy, "reset");
        }
        let from = self.state.current;
        let to = self.registry.first();

        if let Some(ticket) = self.in_flight.take() {
            tracing::debug!(kind = %ticket.kind, generation = ticket.generation, "abandoning request on reset");
        }
        self.pending_restore = None;
        self.restore = RestoreStatus::Idle;
        self.payment = PaymentSubflow::new();
        self.state = FlowState::fresh(to);

        self.record(from, to, TransitionKind::Reset);
        self.write_channel();
        tracing::info!(%from, "started a new registration");
        NavOutcome::Moved { from, to }
    }

    fn move_to(&mut self, to: StepIndex, kind: TransitionKind) -> NavOutcome {
        let from = self.state.current;
        if self.on_payment_step() {
            self.payment.leave();
        }
        self.state.current = to;
        if self.on_payment_step() {
            self.payment.enter();
        }

        self.record(from, to, kind);
        self.write_channel();
        tracing::info!(
            %kind,
            from = %self.registry.step_at(from).id,
            to = %self.registry.step_at(to).id,
            "step transition"
        );
        NavOutcome::Moved { from, to }
    }

    fn record(&mut self, from: StepIndex, to: StepIndex, kind: TransitionKind) {
        self.transitions.push(StepTransitionRecord {
            from,
            to,
            kind,
            at: Utc::now(),
        });
    }

    fn write_channel(&mut self) {
        let step = &self.registry.step_at(self.state.current).id;
        self.channel.write(step, self.state.registration_id.as_ref());
    }

    fn refuse(&self, reason: Refusal, action: &'static str) -> NavOutcome {
        tracing::warn!(
            action,
            ?reason,
            step = %self.current_step().id,
            "navigation refused"
        );
        NavOutcome::Refused(reason)
    }

    fn abandon_step_request(&mut self) {
        if let Some(ticket) = self.in_flight {
            if ticket.kind == RequestKind::PaymentStatus {
                tracing::debug!(generation = ticket.generation, "abandoning payment status fetch");
                self.in_flight = None;
            }
        }
    }

    // ── requests ──

    /// The next fetch the host should perform, if any. Issues at most one
    /// request at a time.
    pub fn poll_request(&mut self) -> Option<Request> {
        if self.in_flight.is_some() {
            return None;
        }
        if let Some(registration_id) = self.pending_restore.take() {
            let ticket = self.issue(RequestKind::Restore);
            return Some(Request::Restore {
                ticket,
                registration_id,
            });
        }
        if matches!(self.restore, RestoreStatus::Failed { .. }) {
            return None;
        }
        if self.on_payment_step() && self.payment.stage() == PaymentStage::Loading {
            match self.state.registration_id.clone() {
                Some(registration_id) => {
                    let ticket = self.issue(RequestKind::PaymentStatus);
                    return Some(Request::PaymentStatus {
                        ticket,
                        registration_id,
                    });
                }
                None => {
                    tracing::warn!("payment step reached without a registration id");
                    log_payment_error(self.payment.status_failed(NO_REGISTRATION_MESSAGE.into()));
                }
            }
        }
        None
    }

    fn issue(&mut self, kind: RequestKind) -> RequestTicket {
        let ticket = RequestTicket {
            kind,
            step: self.state.current,
            generation: self.next_generation,
        };
        self.next_generation += 1;
        self.in_flight = Some(ticket);
        tracing::debug!(%kind, generation = ticket.generation, step = %ticket.step, "request issued");
        ticket
    }

    fn accept(&mut self, ticket: RequestTicket, kind: RequestKind) -> bool {
        if ticket.kind != kind || self.in_flight != Some(ticket) {
            tracing::warn!(
                kind = %ticket.kind,
                generation = ticket.generation,
                "discarding stale response"
            );
            return false;
        }
        self.in_flight = None;
        tracing::debug!(%kind, generation = ticket.generation, "request completed");
        true
    }

    fn queue_restore(&mut self, id: RegistrationId) {
        if let Some(ticket) = self.in_flight {
            if ticket.kind == RequestKind::Restore {
                tracing::debug!(generation = ticket.generation, "superseding restore");
                self.in_flight = None;
            }
        }
        self.pending_restore = Some(id);
        self.restore = RestoreStatus::Loading;
    }

    /// Reload durable state for `id`. Returns `false` when a different
    /// registration is already bound to this session.
    pub fn restore_from_identifier(&mut self, id: RegistrationId) -> bool {
        if let Some(existing) = &self.state.registration_id {
            if *existing != id {
                tracing::warn!(existing = %existing, requested = %id, "restore refused for a different registration");
                return false;
            }
        }
        self.state.registration_id = Some(id.clone());
        self.queue_restore(id);
        true
    }

    /// Re-issue a failed restore. Returns whether one was queued.
    pub fn retry_restore(&mut self) -> bool {
        if !matches!(self.restore, RestoreStatus::Failed { .. }) {
            return false;
        }
        match self.state.registration_id.clone() {
            Some(id) => {
                self.queue_restore(id);
                true
            }
            None => false,
        }
    }

    /// Report the outcome of a restore fetch.
    pub fn complete_restore(
        &mut self,
        ticket: RequestTicket,
        result: Result<RegistrationStatus, AdapterError>,
    ) -> Completion {
        if !self.accept(ticket, RequestKind::Restore) {
            return Completion::Stale;
        }
        match result {
            Ok(status) => {
                self.state.apply(FlowPatch {
                    form_data: status.form_data.clone(),
                    fee_calculation: status.financial_summary.clone(),
                    program: status.program.clone(),
                    ..FlowPatch::default()
                });
                self.restore = RestoreStatus::Loaded;
                tracing::info!(fields = self.state.form_data.len(), "registration restored");

                // The restore already carries the balance; reuse it rather
                // than fetching the same resource again.
                if self.on_payment_step() && self.payment.stage() == PaymentStage::Loading {
                    log_payment_error(self.payment.status_loaded(&status));
                }
            }
            Err(e) => {
                tracing::warn!(error = %e, "restore failed");
                self.restore = RestoreStatus::Failed {
                    message: e.to_string(),
                };
            }
        }
        Completion::Applied
    }

    /// Report the outcome of a payment status fetch.
    pub fn complete_payment_status(
        &mut self,
        ticket: RequestTicket,
        result: Result<RegistrationStatus, AdapterError>,
    ) -> Completion {
        if !self.accept(ticket, RequestKind::PaymentStatus) {
            return Completion::Stale;
        }
        match result {
            Ok(status) => log_payment_error(self.payment.status_loaded(&status)),
            Err(e) => {
                tracing::warn!(error = %e, "payment status fetch failed");
                log_payment_error(self.payment.status_failed(e.to_string()));
            }
        }
        Completion::Applied
    }

    // ── payment ──

    /// READY → PROCESSING. Returns the charge the host must submit.
    pub fn begin_payment(&mut self) -> Result<(RequestTicket, PaymentRequest), PaymentError> {
        if !self.on_payment_step() {
            return Err(PaymentError::NotOnPaymentStep);
        }
        if self.is_busy() {
            return Err(PaymentError::Busy);
        }
        let registration_id = self
            .state
            .registration_id
            .clone()
            .ok_or(PaymentError::MissingRegistration)?;
        let amount = self.payment.begin_processing()?;
        let program_name = self
            .state
            .program
            .as_ref()
            .map(|p| p.name.clone())
            .unwrap_or_default();

        let ticket = self.issue(RequestKind::PaymentSubmit);
        tracing::info!(%amount, registration_id = %registration_id, "submitting payment");
        Ok((
            ticket,
            PaymentRequest {
                amount,
                registration_id,
                program_name,
            },
        ))
    }

    /// Report the outcome of a charge.
    pub fn complete_payment(
        &mut self,
        ticket: RequestTicket,
        result: Result<PaymentReceipt, AdapterError>,
    ) -> Completion {
        if !self.accept(ticket, RequestKind::PaymentSubmit) {
            return Completion::Stale;
        }
        match result {
            Ok(receipt) => {
                tracing::info!(payment_intent = %receipt.payment_intent.id, "payment succeeded");
                self.state
                    .apply(FlowPatch::new().payment_intent(receipt.payment_intent.clone()));
                log_payment_error(self.payment.payment_succeeded(receipt));
            }
            Err(e) => {
                tracing::warn!(error = %e, "payment failed");
                log_payment_error(self.payment.payment_failed(e.to_string()));
            }
        }
        Completion::Applied
    }

    /// ERROR → LOADING. The status is fetched again on the next poll.
    pub fn retry_payment(&mut self) -> Result<(), PaymentError> {
        if !self.on_payment_step() {
            return Err(PaymentError::NotOnPaymentStep);
        }
        self.payment.retry()
    }

    /// Leave the payment step through SUCCESS, merging the stored receipt.
    pub fn proceed_from_payment(&mut self) -> Result<NavOutcome, PaymentError> {
        if !self.on_payment_step() {
            return Err(PaymentError::NotOnPaymentStep);
        }
        let patch = self.payment.proceed_patch()?;
        Ok(self.advance(Some(patch)))
    }
}

fn log_payment_error(result: Result<(), PaymentError>) {
    if let Err(e) = result {
        tracing::warn!(error = %e, "payment event ignored");
    }
}

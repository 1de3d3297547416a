//! # regflow-state — Registration Flow Orchestrator
//!
//! Sequences the steps of a registration, gates forward progress on
//! completed prerequisites, keeps flow position in a resumability channel,
//! and hosts the nested payment state machine.
//!
//! ## Layers
//!
//! - [`StepRegistry`]: ordered, immutable step catalog. Mints [`StepIndex`].
//! - [`FlowState`]: accumulated progress; read-only outside this crate.
//! - [`FlowController`]: the only writer of `FlowState`. Synchronous; asks
//!   for I/O through ticketed [`Request`]s.
//! - [`PaymentSubflow`]: `IDLE → LOADING → READY → PROCESSING → SUCCESS`,
//!   with `ERROR` and a zero-balance shortcut.
//! - [`FlowSession`]: async driver binding a controller to the collaborator
//!   traits from `regflow-core`.
//!
//! ## Example
//!
//! ```
//! use regflow_state::{FlowController, MemoryChannel, NavOutcome, Refusal, StepRegistry};
//!
//! let mut flow = FlowController::open(StepRegistry::standard(), MemoryChannel::new());
//! assert_eq!(flow.jump_to(3), NavOutcome::Refused(Refusal::Unreachable));
//! flow.advance(None);
//! assert_eq!(flow.current_step().id.as_str(), "player-info");
//! ```

pub mod controller;
pub mod payment;
pub mod registry;
pub mod renderer;
pub mod resume;
pub mod session;
pub mod state;

pub use controller::{
    Completion, FlowController, NavOutcome, Refusal, Request, RequestKind, RequestTicket,
    RestoreStatus, StepTransitionRecord, TransitionKind,
};
pub use payment::{
    PaymentError, PaymentPhase, PaymentStage, PaymentSubflow, PaymentTransitionRecord,
    PAYMENT_COMPLETED_FIELD, PAYMENT_RESULT_FIELD,
};
pub use registry::{RegistryError, Step, StepIndex, StepKind, StepRegistry};
pub use renderer::{RendererError, RendererSet, StepContext, StepExit, StepRenderer};
pub use resume::{MemoryChannel, ResumeChannel, ResumeError, ResumeParams, UrlChannel};
pub use session::FlowSession;
pub use state::{FlowPatch, FlowState, SecondaryResults};

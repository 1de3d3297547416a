//! # regflow-core — Foundational Types for the Registration Flow
//!
//! Leaf crate of the workspace. Defines the typed primitives every other
//! crate builds on, and the contracts of the two external collaborators the
//! orchestrator depends on (registration status, payment).
//!
//! ## Key Design Principles
//!
//! 1. **Newtype identifiers.** `RegistrationId` and `StepId` are validated at
//!    construction and on deserialization. No bare strings cross crate
//!    boundaries as identifiers.
//!
//! 2. **Integer money.** `Amount` stores minor units. Wire values are parsed
//!    from their decimal text; no float arithmetic touches an amount.
//!
//! 3. **Additive form data.** `FormData` exposes merge and insert but no
//!    removal, so a key contributed by any step survives for the session.
//!
//! 4. **Collaborators are traits.** `RegistrationStatusSource` and
//!    `PaymentGateway` are object-safe async traits. Transport lives in
//!    `regflow-client`; tests substitute in-memory fakes.
//!
//! ## Crate Policy
//!
//! - No dependencies on other `regflow-*` crates.
//! - No `unsafe` code.
//! - No `panic!()` or `.unwrap()` outside tests.

pub mod adapter;
pub mod amount;
pub mod data;
pub mod error;
pub mod identity;

pub use adapter::{
    AdapterError, PaymentGateway, PaymentIntent, PaymentReceipt, PaymentRecord, PaymentRequest,
    RegistrationStatus, RegistrationStatusSource,
};
pub use amount::Amount;
pub use data::{FormData, ProgramSummary};
pub use error::ValidationError;
pub use identity::{RegistrationId, StepId};

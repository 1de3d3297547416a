//! # Validation Errors
//!
//! Construction-time failures for the core newtypes.

use thiserror::Error;

/// A value failed validation when constructing a core type.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// Registration identifier was empty or whitespace-only.
    #[error("registration identifier must not be empty")]
    EmptyRegistrationId,

    /// Step identifier was empty or contained characters outside `[a-z0-9_-]`.
    #[error("invalid step identifier {0:?}: expected lowercase letters, digits, '-' or '_'")]
    InvalidStepId(String),

    /// Amount text could not be parsed as a decimal with at most two fraction digits.
    #[error("invalid amount {0:?}: expected a decimal with at most two fraction digits")]
    InvalidAmount(String),

    /// Amount does not fit in the minor-unit representation.
    #[error("amount {0:?} is out of range")]
    AmountOutOfRange(String),
}

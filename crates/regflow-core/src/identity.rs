//! # Identifier Newtypes
//!
//! `RegistrationId` is the durable handle the backend issues once a
//! registration record exists. The orchestrator treats it as opaque: the only
//! rule is that it is non-empty. `StepId` names a step in a registry and is
//! what the resumability channel carries in its `step` parameter.

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// Implements `Deserialize` by routing the raw string through `Self::new`,
/// so invalid identifiers are rejected at the serde boundary too.
macro_rules! impl_validating_deserialize {
    ($ty:ident) => {
        impl<'de> Deserialize<'de> for $ty {
            fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
            where
                D: serde::Deserializer<'de>,
            {
                let raw = String::deserialize(deserializer)?;
                Self::new(raw).map_err(serde::de::Error::custom)
            }
        }
    };
}

/// Durable, opaque registration identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct RegistrationId(String);

impl_validating_deserialize!(RegistrationId);

impl RegistrationId {
    /// Create a registration identifier, trimming surrounding whitespace.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::EmptyRegistrationId`] if nothing is left
    /// after trimming.
    pub fn new(value: impl Into<String>) -> Result<Self, ValidationError> {
        let trimmed = value.into().trim().to_string();
        if trimmed.is_empty() {
            return Err(ValidationError::EmptyRegistrationId);
        }
        Ok(Self(trimmed))
    }

    /// Access the identifier string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for RegistrationId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Identifier of a step within a registry (e.g. `"player-info"`).
///
/// # Validation
///
/// Non-empty, lowercase ASCII letters, digits, `-` and `_` only. The value
/// travels in a URL query string, so the alphabet is kept URL-safe.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct StepId(String);

impl_validating_deserialize!(StepId);

impl StepId {
    /// Create a step identifier, validating its alphabet.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::InvalidStepId`] for empty input or any
    /// character outside `[a-z0-9_-]`.
    pub fn new(value: impl Into<String>) -> Result<Self, ValidationError> {
        let s = value.into();
        let valid = !s.is_empty()
            && s
                .chars()
                .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-' || c == '_');
        if !valid {
            return Err(ValidationError::InvalidStepId(s));
        }
        Ok(Self(s))
    }

    /// Build a step identifier from a literal that is valid by inspection.
    ///
    /// Intended for built-in registries. Debug builds assert the alphabet.
    pub fn from_static(value: &'static str) -> Self {
        debug_assert!(Self::new(value).is_ok(), "invalid static step id {value:?}");
        Self(value.to_string())
    }

    /// Access the identifier string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for StepId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl PartialEq<str> for StepId {
    fn eq(&self, other: &str) -> bool {
        self.0 == other
    }
}

//! # Accumulated Flow Data
//!
//! `FormData` is the cumulative field map every step contributes to. It
//! supports insert-or-overwrite and merge, never removal: a multi-step form
//! keeps fields from earlier steps even when a later step does not repeat
//! them.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Field name to arbitrary JSON value, ordered by key.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FormData(BTreeMap<String, Value>);

impl FormData {
    /// An empty map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or overwrite a single field.
    pub fn insert(&mut self, key: impl Into<String>, value: Value) {
        self.0.insert(key.into(), value);
    }

    /// Builder form of [`FormData::insert`].
    pub fn with(mut self, key: impl Into<String>, value: Value) -> Self {
        self.insert(key, value);
        self
    }

    /// Shallow merge: every field of `other` overwrites the same key here.
    /// Keys absent from `other` are left untouched.
    pub fn merge(&mut self, other: FormData) {
        self.0.extend(other.0);
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.0.iter()
    }
}

impl FromIterator<(String, Value)> for FormData {
    fn from_iter<I: IntoIterator<Item = (String, Value)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl TryFrom<Value> for FormData {
    type Error = serde_json::Error;

    /// Convert a JSON object into form data. Non-object values are rejected.
    fn try_from(value: Value) -> Result<Self, Self::Error> {
        serde_json::from_value(value)
    }
}

/// The program a participant is being registered for.
///
/// Only `name` is interpreted by the orchestrator (it is handed to the
/// payment collaborator). Everything else the backend returns rides along in
/// `details` untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgramSummary {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub name: String,
    #[serde(flatten)]
    pub details: serde_json::Map<String, Value>,
}

impl ProgramSummary {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            id: None,
            name: name.into(),
            details: serde_json::Map::new(),
        }
    }
}

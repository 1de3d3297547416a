//! # Resumability Channel
//!
//! Flow position survives a reload through two query parameters:
//!
//! | parameter | value |
//! |---|---|
//! | `step` | id of the current step |
//! | `registration_id` | durable registration handle, once one exists |
//!
//! The channel is read once when a session opens and rewritten on every step
//! transition. Query parameters that belong to someone else are preserved.

use thiserror::Error;
use url::form_urlencoded;
use url::Url;

use regflow_core::{RegistrationId, StepId};

/// Query parameter carrying the step id.
pub const STEP_PARAM: &str = "step";

/// Query parameter carrying the registration id.
pub const REGISTRATION_PARAM: &str = "registration_id";

/// A resume URL could not be used.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ResumeError {
    #[error("invalid resume URL \"{input}\": {reason}")]
    InvalidUrl { input: String, reason: String },
}

/// What a resumability channel carried at session start.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResumeParams {
    /// Raw step id; resolution against a registry happens in the controller.
    pub step: Option<String>,
    pub registration_id: Option<RegistrationId>,
}

impl ResumeParams {
    /// Parse a query string (without the leading `?`).
    ///
    /// Blank values are treated as absent. When a parameter repeats, the
    /// first occurrence wins.
    pub fn from_query(query: &str) -> Self {
        let mut params = Self::default();
        for (key, value) in form_urlencoded::parse(query.as_bytes()) {
            match key.as_ref() {
                STEP_PARAM if params.step.is_none() && !value.trim().is_empty() => {
                    params.step = Some(value.trim().to_string());
                }
                REGISTRATION_PARAM if params.registration_id.is_none() => {
                    params.registration_id = RegistrationId::new(value.into_owned()).ok();
                }
                _ => {}
            }
        }
        params
    }

    /// Render as a query string containing only the flow parameters.
    pub fn to_query(&self) -> String {
        let mut out = form_urlencoded::Serializer::new(String::new());
        if let Some(step) = &self.step {
            out.append_pair(STEP_PARAM, step);
        }
        if let Some(id) = &self.registration_id {
            out.append_pair(REGISTRATION_PARAM, id.as_str());
        }
        out.finish()
    }
}

/// Where flow position is persisted between page loads.
pub trait ResumeChannel {
    /// Read the current parameters.
    fn read(&self) -> ResumeParams;

    /// Replace the flow parameters with the given position.
    fn write(&mut self, step: &StepId, registration_id: Option<&RegistrationId>);
}

/// A channel backed by an address-bar URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UrlChannel {
    url: Url,
}

impl UrlChannel {
    pub fn new(url: Url) -> Self {
        Self { url }
    }

    /// Parse an absolute URL.
    pub fn parse(input: &str) -> Result<Self, ResumeError> {
        Url::parse(input)
            .map(Self::new)
            .map_err(|e| ResumeError::InvalidUrl {
                input: input.to_string(),
                reason: e.to_string(),
            })
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    pub fn into_url(self) -> Url {
        self.url
    }
}

impl ResumeChannel for UrlChannel {
    fn read(&self) -> ResumeParams {
        ResumeParams::from_query(self.url.query().unwrap_or(""))
    }

    fn write(&mut self, step: &StepId, registration_id: Option<&RegistrationId>) {
        let foreign: Vec<(String, String)> = self
            .url
            .query_pairs()
            .filter(|(k, _)| k != STEP_PARAM && k != REGISTRATION_PARAM)
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect();

        let mut pairs = self.url.query_pairs_mut();
        pairs.clear();
        for (k, v) in &foreign {
            pairs.append_pair(k, v);
        }
        pairs.append_pair(STEP_PARAM, step.as_str());
        if let Some(id) = registration_id {
            pairs.append_pair(REGISTRATION_PARAM, id.as_str());
        }
    }
}

/// An in-memory channel that keeps every write, for tests and headless
/// drivers.
#[derive(Debug, Clone, Default)]
pub struct MemoryChannel {
    current: ResumeParams,
    writes: Vec<ResumeParams>,
}

impl MemoryChannel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed from a query string, as if the page had loaded with it.
    pub fn with_query(query: &str) -> Self {
        Self {
            current: ResumeParams::from_query(query),
            writes: Vec::new(),
        }
    }

    pub fn current(&self) -> &ResumeParams {
        &self.current
    }

    /// Every write in order.
    pub fn writes(&self) -> &[ResumeParams] {
        &self.writes
    }
}

impl ResumeChannel for MemoryChannel {
    fn read(&self) -> ResumeParams {
        self.current.clone()
    }

    fn write(&mut self, step: &StepId, registration_id: Option<&RegistrationId>) {
        self.current = ResumeParams {
            step: Some(step.as_str().to_string()),
            registration_id: registration_id.cloned(),
        };
        self.writes.push(self.current.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sid(s: &str) -> StepId {
        StepId::new(s).unwrap()
    }

    #[test]
    fn parses_both_parameters() {
        let p = ResumeParams::from_query("step=payment&registration_id=R123");
        assert_eq!(p.step.as_deref(), Some("payment"));
        assert_eq!(p.registration_id.unwrap().as_str(), "R123");
    }

    #[test]
    fn blank_values_are_absent() {
        let p = ResumeParams::from_query("step=&registration_id=%20");
        assert_eq!(p, ResumeParams::default());
    }

    #[test]
    fn first_occurrence_wins() {
        let p = ResumeParams::from_query("step=a&step=b");
        assert_eq!(p.step.as_deref(), Some("a"));
    }

    #[test]
    fn decodes_percent_encoding() {
        let p = ResumeParams::from_query("registration_id=R%2F1");
        assert_eq!(p.registration_id.unwrap().as_str(), "R/1");
    }

    #[test]
    fn to_query_orders_step_first() {
        let p = ResumeParams {
            step: Some("payment".into()),
            registration_id: Some(RegistrationId::new("R 1").unwrap()),
        };
        assert_eq!(p.to_query(), "step=payment&registration_id=R+1");
    }

    #[test]
    fn url_channel_preserves_foreign_params() {
        let mut ch = UrlChannel::parse("https://example.com/register?utm=x&step=program").unwrap();
        ch.write(&sid("player-info"), Some(&RegistrationId::new("R1").unwrap()));
        assert_eq!(
            ch.url().as_str(),
            "https://example.com/register?utm=x&step=player-info&registration_id=R1"
        );
        let read = ch.read();
        assert_eq!(read.step.as_deref(), Some("player-info"));
    }

    #[test]
    fn url_channel_drops_registration_when_absent() {
        let mut ch =
            UrlChannel::parse("https://example.com/r?step=payment&registration_id=R1").unwrap();
        ch.write(&sid("program"), None);
        assert_eq!(ch.url().query(), Some("step=program"));
    }

    #[test]
    fn relative_url_is_rejected() {
        assert!(matches!(
            UrlChannel::parse("/register?step=payment"),
            Err(ResumeError::InvalidUrl { .. })
        ));
    }

    #[test]
    fn memory_channel_records_writes() {
        let mut ch = MemoryChannel::with_query("step=fee-summary");
        assert_eq!(ch.read().step.as_deref(), Some("fee-summary"));
        ch.write(&sid("payment"), None);
        ch.write(&sid("confirmation"), None);
        assert_eq!(ch.writes().len(), 2);
        assert_eq!(ch.current().step.as_deref(), Some("confirmation"));
    }
}

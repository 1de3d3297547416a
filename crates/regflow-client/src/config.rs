//! Registration API client configuration.
//!
//! One base URL serves both the registration status and payment
//! endpoints. Override via environment variables or explicit construction
//! for staging/testing.

use url::Url;
use zeroize::Zeroizing;

/// Default base URL when `REGFLOW_API_URL` is unset.
pub const DEFAULT_API_URL: &str = "http://127.0.0.1:8080";

/// Default request timeout in seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Configuration for connecting to the registration API.
///
/// Custom `Debug` implementation redacts the `api_token` field
/// to prevent credential leakage in log output.
#[derive(Clone)]
pub struct RegistrationApiConfig {
    /// Base URL of the registration API.
    pub base_url: Url,
    /// Bearer token for API authentication. Zeroed on drop.
    pub api_token: Zeroizing<String>,
    /// Request timeout in seconds.
    pub timeout_secs: u64,
}

impl std::fmt::Debug for RegistrationApiConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RegistrationApiConfig")
            .field("base_url", &self.base_url)
            .field("api_token", &"[REDACTED]")
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

impl RegistrationApiConfig {
    /// Load configuration from environment variables.
    ///
    /// Variables:
    /// - `REGFLOW_API_URL` (default: `http://127.0.0.1:8080`)
    /// - `REGFLOW_API_TOKEN` (required)
    /// - `REGFLOW_TIMEOUT_SECS` (default: 30)
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Same as [`from_env`](Self::from_env), reading variables through
    /// `lookup`. A blank token counts as missing.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let api_token = lookup("REGFLOW_API_TOKEN")
            .filter(|token| !token.trim().is_empty())
            .ok_or(ConfigError::MissingToken)?;

        Ok(Self {
            base_url: lookup_url(&lookup, "REGFLOW_API_URL", DEFAULT_API_URL)?,
            api_token: Zeroizing::new(api_token),
            timeout_secs: lookup("REGFLOW_TIMEOUT_SECS")
                .and_then(|s| s.parse().ok())
                .unwrap_or(DEFAULT_TIMEOUT_SECS),
        })
    }

    /// Build a configuration from explicit values.
    pub fn new(base_url: &str, token: &str) -> Result<Self, ConfigError> {
        let base_url = Url::parse(base_url)
            .map_err(|e| ConfigError::InvalidUrl(base_url.to_string(), e.to_string()))?;
        if token.trim().is_empty() {
            return Err(ConfigError::MissingToken);
        }
        Ok(Self {
            base_url,
            api_token: Zeroizing::new(token.to_string()),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        })
    }

    /// Create a configuration pointing to a local mock server (for testing).
    pub fn local_mock(port: u16, token: &str) -> Result<Self, ConfigError> {
        let mut config = Self::new(&format!("http://127.0.0.1:{port}"), token)?;
        config.timeout_secs = 5;
        Ok(config)
    }
}

fn lookup_url(
    lookup: &impl Fn(&str) -> Option<String>,
    var: &str,
    default: &str,
) -> Result<Url, ConfigError> {
    let raw = lookup(var).unwrap_or_else(|| default.to_string());
    Url::parse(&raw).map_err(|e| ConfigError::InvalidUrl(var.to_string(), e.to_string()))
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("REGFLOW_API_TOKEN is required")]
    MissingToken,
    #[error("invalid URL for {0}: {1}")]
    InvalidUrl(String, String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn local_mock_builds_valid_config() {
        let cfg = RegistrationApiConfig::local_mock(9000, "test-token").unwrap();
        assert_eq!(cfg.api_token.as_str(), "test-token");
        assert_eq!(cfg.timeout_secs, 5);
        assert_eq!(cfg.base_url.as_str(), "http://127.0.0.1:9000/");
    }

    #[test]
    fn debug_redacts_token() {
        let cfg = RegistrationApiConfig::local_mock(9000, "s3cret").unwrap();
        let rendered = format!("{cfg:?}");
        assert!(rendered.contains("[REDACTED]"));
        assert!(!rendered.contains("s3cret"));
    }

    #[test]
    fn blank_token_is_rejected() {
        assert!(matches!(
            RegistrationApiConfig::new("http://localhost", "  "),
            Err(ConfigError::MissingToken)
        ));
    }

    fn vars(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: std::collections::HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |var| map.get(var).cloned()
    }

    #[test]
    fn lookup_uses_defaults_when_only_token_is_set() {
        let cfg = RegistrationApiConfig::from_lookup(vars(&[("REGFLOW_API_TOKEN", "t")])).unwrap();
        assert_eq!(cfg.base_url.as_str(), "http://127.0.0.1:8080/");
        assert_eq!(cfg.timeout_secs, DEFAULT_TIMEOUT_SECS);
    }

    #[test]
    fn lookup_reads_every_variable() {
        let cfg = RegistrationApiConfig::from_lookup(vars(&[
            ("REGFLOW_API_TOKEN", "t"),
            ("REGFLOW_API_URL", "https://staging.example.org"),
            ("REGFLOW_TIMEOUT_SECS", "12"),
        ]))
        .unwrap();
        assert_eq!(cfg.base_url.as_str(), "https://staging.example.org/");
        assert_eq!(cfg.timeout_secs, 12);
    }

    #[test]
    fn lookup_rejects_missing_or_blank_token() {
        assert!(matches!(
            RegistrationApiConfig::from_lookup(vars(&[])),
            Err(ConfigError::MissingToken)
        ));
        assert!(matches!(
            RegistrationApiConfig::from_lookup(vars(&[("REGFLOW_API_TOKEN", " \t")])),
            Err(ConfigError::MissingToken)
        ));
    }

    #[test]
    fn lookup_rejects_invalid_url() {
        let result = RegistrationApiConfig::from_lookup(vars(&[
            ("REGFLOW_API_TOKEN", "t"),
            ("REGFLOW_API_URL", "not a url"),
        ]));
        assert!(matches!(result, Err(ConfigError::InvalidUrl(var, _)) if var == "REGFLOW_API_URL"));
    }
}

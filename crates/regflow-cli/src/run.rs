//! # Run CLI — drive a scripted session against the registration API.
//!
//! Opens a session from a resume URL (restoring if it carries a
//! `registration_id`), applies the action script, and prints the final URL
//! and flow state as JSON.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Args;
use serde::Serialize;

use regflow_client::{RegistrationApiClient, RegistrationApiConfig};
use regflow_state::{
    FlowSession, FlowState, PaymentPhase, RestoreStatus, StepRegistry, StepTransitionRecord,
    UrlChannel,
};

use crate::script::{self, ActionReport};

/// Resume URL used when `--url` is not given.
pub const DEFAULT_RESUME_URL: &str = "http://localhost/register";

/// Run subcommand arguments.
#[derive(Args, Debug)]
pub struct RunArgs {
    /// JSON file holding the action script.
    #[arg(long)]
    pub script: PathBuf,

    /// Resume URL the session opens from.
    #[arg(long, default_value = DEFAULT_RESUME_URL)]
    pub url: String,

    /// Registration API base URL (overrides REGFLOW_API_URL).
    #[arg(long)]
    pub api_url: Option<String>,

    /// API bearer token (overrides REGFLOW_API_TOKEN).
    #[arg(long)]
    pub token: Option<String>,
}

/// Final state of a scripted session.
#[derive(Debug, Serialize)]
pub struct SessionReport<'a> {
    pub url: String,
    pub step: String,
    pub state: &'a FlowState,
    pub payment: &'a PaymentPhase,
    pub restore: &'a RestoreStatus,
    pub transitions: &'a [StepTransitionRecord],
    pub actions: Vec<ActionReport>,
}

/// Resolve API configuration from the environment. Each flag replaces only
/// its own variable.
pub fn api_config(args: &RunArgs) -> Result<RegistrationApiConfig> {
    api_config_with(args, |var| std::env::var(var).ok())
}

fn api_config_with(
    args: &RunArgs,
    env: impl Fn(&str) -> Option<String>,
) -> Result<RegistrationApiConfig> {
    let config = RegistrationApiConfig::from_lookup(|var| match var {
        "REGFLOW_API_URL" if args.api_url.is_some() => args.api_url.clone(),
        "REGFLOW_API_TOKEN" if args.token.is_some() => args.token.clone(),
        _ => env(var),
    })
    .context("invalid registration API configuration")?;
    tracing::debug!(?config, "registration API configuration");
    Ok(config)
}

/// Execute the run subcommand.
pub fn run_run(args: &RunArgs, registry: StepRegistry) -> Result<u8> {
    let text = std::fs::read_to_string(&args.script)
        .with_context(|| format!("cannot read script {}", args.script.display()))?;
    let actions = script::parse_script(&text)?;
    let channel = UrlChannel::parse(&args.url).context("invalid --url")?;
    let client = RegistrationApiClient::new(api_config(args)?)?;

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("failed to start async runtime")?;

    runtime.block_on(async move {
        let mut session = FlowSession::open(
            registry,
            channel,
            Arc::new(client.status().clone()),
            Arc::new(client.payments().clone()),
        )
        .await;
        let reports = script::apply(&mut session, actions).await?;

        let controller = session.controller();
        let report = SessionReport {
            url: controller.channel().url().to_string(),
            step: controller.current_step().id.to_string(),
            state: controller.state(),
            payment: controller.payment().phase(),
            restore: controller.restore_status(),
            transitions: controller.transitions(),
            actions: reports,
        };
        println!("{}", serde_json::to_string_pretty(&report)?);
        Ok::<_, anyhow::Error>(0)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(api_url: Option<&str>, token: Option<&str>) -> RunArgs {
        RunArgs {
            script: PathBuf::from("script.json"),
            url: DEFAULT_RESUME_URL.into(),
            api_url: api_url.map(String::from),
            token: token.map(String::from),
        }
    }

    fn env(pairs: &'static [(&'static str, &'static str)]) -> impl Fn(&str) -> Option<String> {
        move |var| {
            pairs
                .iter()
                .find(|(k, _)| *k == var)
                .map(|(_, v)| v.to_string())
        }
    }

    const STAGING: &[(&str, &str)] = &[
        ("REGFLOW_API_URL", "https://staging.example.org"),
        ("REGFLOW_API_TOKEN", "env-token"),
        ("REGFLOW_TIMEOUT_SECS", "9"),
    ];

    #[test]
    fn flags_override_environment() {
        let config = api_config_with(
            &args(Some("https://api.example.org"), Some("flag-token")),
            env(STAGING),
        )
        .unwrap();
        assert_eq!(config.base_url.as_str(), "https://api.example.org/");
        assert_eq!(config.api_token.as_str(), "flag-token");
        assert_eq!(config.timeout_secs, 9);
    }

    #[test]
    fn token_flag_keeps_environment_url_and_timeout() {
        let config = api_config_with(&args(None, Some("t")), env(STAGING)).unwrap();
        assert_eq!(config.base_url.as_str(), "https://staging.example.org/");
        assert_eq!(config.api_token.as_str(), "t");
        assert_eq!(config.timeout_secs, 9);
    }

    #[test]
    fn url_flag_keeps_environment_token() {
        let config =
            api_config_with(&args(Some("http://localhost:9000"), None), env(STAGING)).unwrap();
        assert_eq!(config.base_url.as_str(), "http://localhost:9000/");
        assert_eq!(config.api_token.as_str(), "env-token");
    }

    #[test]
    fn token_flag_alone_falls_back_to_default_url() {
        let config = api_config_with(&args(None, Some("t")), env(&[])).unwrap();
        assert_eq!(config.base_url.as_str(), "http://127.0.0.1:8080/");
    }

    #[test]
    fn missing_token_is_reported() {
        assert!(api_config_with(&args(None, None), env(&[])).is_err());
        assert!(api_config_with(&args(None, Some("  ")), env(STAGING)).is_err());
    }

    #[test]
    fn invalid_api_url_is_reported() {
        assert!(api_config_with(&args(Some("not a url"), Some("t")), env(&[])).is_err());
    }
}

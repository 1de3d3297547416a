//! # Resolve CLI — show where a resume URL lands.
//!
//! Reads the resumability parameters out of a URL exactly as a session
//! would on load, without contacting the registration API.

use anyhow::{Context, Result};
use clap::Args;
use serde::Serialize;

use regflow_state::{FlowController, ResumeChannel, StepRegistry, UrlChannel};

/// Resolve subcommand arguments.
#[derive(Args, Debug)]
pub struct ResolveArgs {
    /// Absolute URL carrying `step` and/or `registration_id`.
    pub url: String,
}

/// Where a resume URL lands.
#[derive(Debug, Serialize, PartialEq, Eq)]
pub struct Resolution {
    /// Raw `step` parameter, if present.
    pub requested_step: Option<String>,
    pub index: usize,
    pub step: String,
    pub registration_id: Option<String>,
    /// Whether opening this URL triggers a restore.
    pub restores: bool,
}

/// Resolve `url` against `registry`.
pub fn resolve(url: &str, registry: StepRegistry) -> Result<Resolution> {
    let channel = UrlChannel::parse(url).context("cannot resolve resume URL")?;
    let requested_step = channel.read().step;
    let controller = FlowController::open(registry, channel);
    let state = controller.state();

    Ok(Resolution {
        requested_step,
        index: state.current().get(),
        step: controller.current_step().id.to_string(),
        registration_id: state.registration_id().map(|r| r.to_string()),
        restores: controller.is_busy(),
    })
}

/// Execute the resolve subcommand.
pub fn run_resolve(args: &ResolveArgs, registry: StepRegistry) -> Result<u8> {
    let resolution = resolve(&args.url, registry)?;
    println!("{}", serde_json::to_string_pretty(&resolution)?);
    Ok(0)
}

//! # regflow CLI entry point
//!
//! Parses command-line arguments and dispatches to subcommand handlers.

use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use regflow_cli::resolve::{run_resolve, ResolveArgs};
use regflow_cli::run::{run_run, RunArgs};
use regflow_cli::steps::{run_steps, StepsArgs};
use regflow_cli::{registry_for, DEFAULT_VARIANT};

/// Registration flow driver.
///
/// Inspects step registries, resolves resume URLs, and runs scripted
/// registration sessions against the registration API.
#[derive(Parser, Debug)]
#[command(name = "regflow", version, about, long_about = None)]
struct Cli {
    /// Enable verbose output. Repeat for more verbosity (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Flow variant: standard or legacy.
    #[arg(long, global = true, default_value = DEFAULT_VARIANT)]
    variant: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Print the steps of the selected flow variant.
    Steps(StepsArgs),

    /// Show the step and registration a resume URL lands on.
    Resolve(ResolveArgs),

    /// Open a session and apply a JSON action script.
    Run(RunArgs),
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let filter = match cli.verbose {
        0 => EnvFilter::new("warn"),
        1 => EnvFilter::new("info"),
        2 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    tracing::debug!(variant = %cli.variant, "regflow CLI starting");

    let result = registry_for(&cli.variant).and_then(|registry| match &cli.command {
        Commands::Steps(args) => run_steps(args, &registry),
        Commands::Resolve(args) => run_resolve(args, registry),
        Commands::Run(args) => run_run(args, registry),
    });

    match result {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            tracing::error!("{e:#}");
            ExitCode::from(1)
        }
    }
}

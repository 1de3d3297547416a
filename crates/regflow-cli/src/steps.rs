//! # Steps CLI — print a flow variant's step registry.

use anyhow::Result;
use clap::Args;

use regflow_state::StepRegistry;

/// Steps subcommand arguments.
#[derive(Args, Debug)]
pub struct StepsArgs {
    /// Print the registry as JSON instead of a table.
    #[arg(long)]
    pub json: bool,
}

/// Execute the steps subcommand.
pub fn run_steps(args: &StepsArgs, registry: &StepRegistry) -> Result<u8> {
    if args.json {
        let steps: Vec<_> = registry.iter().map(|(_, step)| step).collect();
        println!("{}", serde_json::to_string_pretty(&steps)?);
        return Ok(0);
    }

    println!("Flow '{}':", registry.name());
    println!();
    for line in table(registry) {
        println!("{line}");
    }
    println!();
    println!("Total: {} steps", registry.count());
    Ok(0)
}

fn table(registry: &StepRegistry) -> Vec<String> {
    registry
        .iter()
        .map(|(index, step)| {
            format!(
                "  {:>2}  {:<14} {:<20} {}",
                index.get(),
                step.id.as_str(),
                step.kind.as_str(),
                step.title
            )
        })
        .collect()
}

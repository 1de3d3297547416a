//! # regflow-cli — Command-Line Driver for the Registration Flow
//!
//! Provides the `regflow` binary.
//!
//! ## Subcommands
//!
//! - `regflow steps` — Print the step registry of a flow variant.
//! - `regflow resolve` — Show where a resume URL would land.
//! - `regflow run` — Open a session against the registration API and apply
//!   a JSON action script.
//!
//! ```bash
//! regflow --variant legacy steps
//! regflow resolve 'https://example.org/register?step=payment&registration_id=R123'
//! regflow -v run --script actions.json --url 'https://example.org/register?registration_id=R123'
//! ```

pub mod resolve;
pub mod run;
pub mod script;
pub mod steps;

use anyhow::Result;

use regflow_state::StepRegistry;

/// Flow variant used when `--variant` is not given.
pub const DEFAULT_VARIANT: &str = "standard";

/// Look up a built-in registry by variant name.
pub fn registry_for(variant: &str) -> Result<StepRegistry> {
    StepRegistry::variant(variant).ok_or_else(|| {
        anyhow::anyhow!("unknown flow variant '{variant}'. Available: standard, legacy")
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registry_for_known_variants() {
        assert_eq!(registry_for("standard").unwrap().count(), 5);
        assert_eq!(registry_for("legacy").unwrap().count(), 4);
    }

    #[test]
    fn registry_for_unknown_variant_lists_choices() {
        let err = registry_for("v2").unwrap_err().to_string();
        assert!(err.contains("standard, legacy"));
    }
}

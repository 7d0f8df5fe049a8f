//! Exhaustive exploration of a scenario file

use anyhow::{Context, Result};
use clap::Args;
use std::path::PathBuf;
use tracing::info;

use replog_checker::{Explorer, Scenario};
use replog_core::TomlConfig;

/// Arguments of `replog check`
#[derive(Args)]
pub struct CheckArgs {
    /// Scenario file (TOML)
    #[arg(long)]
    pub scenario: PathBuf,

    /// Override the scenario's state bound
    #[arg(long)]
    pub max_states: Option<usize>,

    /// Skip the eventual-leadership check
    #[arg(long)]
    pub safety_only: bool,
}

/// Handle `replog check`; fails when a property is violated
pub fn run(args: &CheckArgs) -> Result<()> {
    let mut scenario = Scenario::load_from_file(&args.scenario)
        .with_context(|| format!("loading scenario {}", args.scenario.display()))?;
    if let Some(max_states) = args.max_states {
        scenario.exploration.max_states = max_states;
    }
    if args.safety_only {
        scenario.exploration.check_liveness = false;
    }

    info!(scenario = %scenario.name, "Checking scenario");
    let report = Explorer::new(scenario.exploration.clone()).explore(scenario.initial_state());
    println!("{report}");

    match report.counterexample {
        Some(counterexample) => anyhow::bail!(
            "scenario {} violates {}",
            scenario.name,
            counterexample.violation.property()
        ),
        None => Ok(()),
    }
}

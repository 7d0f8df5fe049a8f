//! Replay events through the supervisor control cycle

use anyhow::{Context, Result};
use clap::Args;
use std::path::PathBuf;

use replog_core::SupervisionConfig;
use replog_supervision::{
    AgencyStore, CycleOutcome, InMemoryAgency, SupervisionEvent, Supervisor,
};

/// Arguments of `replog replay`
#[derive(Args)]
pub struct ReplayArgs {
    /// Initial agency document (JSON)
    #[arg(long)]
    pub state: PathBuf,

    /// JSON array of events, one decision cycle each
    #[arg(long)]
    pub events: Option<PathBuf>,

    /// Event-free cycles to run after the events, stopping early once converged
    #[arg(long, default_value = "8")]
    pub settle: usize,
}

/// Handle `replog replay`
pub async fn run(args: &ReplayArgs, config: SupervisionConfig) -> Result<()> {
    let state = super::load_state(&args.state)?;
    let events: Vec<SupervisionEvent> = match &args.events {
        Some(path) => {
            let document = std::fs::read_to_string(path)
                .with_context(|| format!("reading events {}", path.display()))?;
            serde_json::from_str(&document)
                .with_context(|| format!("parsing events {}", path.display()))?
        }
        None => Vec::new(),
    };

    let log = state.log_id();
    let supervisor = Supervisor::new(InMemoryAgency::new(), config);
    supervisor.store().create(state).await?;

    for event in &events {
        let outcome = supervisor.run_cycle(log, Some(event)).await?;
        print_outcome(&event.to_string(), &outcome);
    }

    for _ in 0..args.settle {
        let outcome = supervisor.run_cycle(log, None).await?;
        print_outcome("tick", &outcome);
        if matches!(outcome, CycleOutcome::Converged { .. }) {
            break;
        }
    }

    let last = supervisor.store().read(log).await?;
    println!("{}", last.value.to_json()?);
    Ok(())
}

fn print_outcome(trigger: &str, outcome: &CycleOutcome) {
    match outcome {
        CycleOutcome::Converged { version } => println!("{trigger}: converged at {version}"),
        CycleOutcome::Applied { actions, version } => {
            let actions: Vec<String> = actions.iter().map(ToString::to_string).collect();
            println!("{trigger}: {} -> {version}", actions.join(", "));
        }
        CycleOutcome::Blocked { rejection } => {
            println!("{trigger}: blocked [{}]: {rejection}", rejection.code());
        }
    }
}

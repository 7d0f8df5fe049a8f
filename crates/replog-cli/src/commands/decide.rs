//! Single decision cycle on an agency document

use anyhow::Result;
use clap::Args;
use std::path::PathBuf;

use replog_supervision::{plan_cycle, SupervisionError};

/// Arguments of `replog decide`
#[derive(Args)]
pub struct DecideArgs {
    /// Agency document (JSON)
    #[arg(long)]
    pub state: PathBuf,

    /// Pending kill request for a participant
    #[arg(long)]
    pub kill: Option<String>,

    /// Pending event as JSON, e.g. {"type":"report_term","participant":"B","term":4}
    #[arg(long)]
    pub event: Option<String>,

    /// Print the resulting agency document instead of the actions
    #[arg(long)]
    pub print_state: bool,
}

/// Handle `replog decide`
pub fn run(args: &DecideArgs) -> Result<()> {
    let state = super::load_state(&args.state)?;
    let event = super::parse_event(args.kill.as_deref(), args.event.as_deref())?;

    match plan_cycle(&state, event.as_ref()) {
        Ok(plan) if args.print_state => println!("{}", plan.next.to_json()?),
        Ok(plan) if plan.is_empty() => println!("converged: no action"),
        Ok(plan) => {
            for action in &plan.actions {
                println!("{action}");
            }
        }
        Err(SupervisionError::Rejected(rejection)) => {
            println!("blocked [{}]: {rejection}", rejection.code());
        }
        Err(err) => return Err(err.into()),
    }
    Ok(())
}

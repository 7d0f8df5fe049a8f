//! Subcommand implementations

pub mod check;
pub mod decide;
pub mod replay;

use anyhow::{Context, Result};
use std::path::Path;

use replog_core::{AgencyState, SupervisionConfig, TomlConfig};
use replog_supervision::SupervisionEvent;

/// Load the supervision config, or the defaults when no file is given
pub fn load_supervision_config(path: Option<&Path>) -> Result<SupervisionConfig> {
    match path {
        Some(path) => SupervisionConfig::load_from_file(path)
            .with_context(|| format!("loading supervision config {}", path.display())),
        None => Ok(SupervisionConfig::default()),
    }
}

/// Read an agency document from a JSON file
pub fn load_state(path: &Path) -> Result<AgencyState> {
    let document = std::fs::read_to_string(path)
        .with_context(|| format!("reading agency document {}", path.display()))?;
    AgencyState::from_json(&document)
        .with_context(|| format!("parsing agency document {}", path.display()))
}

/// Resolve the event given on the command line
pub fn parse_event(kill: Option<&str>, event: Option<&str>) -> Result<Option<SupervisionEvent>> {
    match (kill, event) {
        (Some(_), Some(_)) => anyhow::bail!("--kill and --event are mutually exclusive"),
        (Some(participant), None) => Ok(Some(SupervisionEvent::KillServer {
            participant: participant.into(),
        })),
        (None, Some(json)) => {
            let event = serde_json::from_str(json).context("parsing --event")?;
            Ok(Some(event))
        }
        (None, None) => Ok(None),
    }
}

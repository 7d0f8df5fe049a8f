//! Exploration bounds and scenario files

use serde::{Deserialize, Serialize};

use replog_core::{
    AgencyState, AgencyStateBuilder, ConfigValidation, HealthRecord, LogTerm, ParticipantId,
    RebootId, ReplogError, Result,
};

/// Bounds of one exhaustive exploration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExplorationConfig {
    /// Stop discovering states beyond this many
    pub max_states: usize,
    /// Do not expand states deeper than this many transitions
    pub max_depth: usize,
    /// Highest reboot id the environment may drive a server to
    pub max_reboot_id: u64,
    /// Operators may only add participants while the target generation is
    /// below this bound
    pub max_generation: u64,
    /// Servers an operator may add to the log
    pub spare_participants: Vec<ParticipantId>,
    /// Whether kill requests are enumerated as supervision triggers
    pub kill_requests: bool,
    /// Whether to run the eventual-leadership check after safety passes
    pub check_liveness: bool,
}

impl Default for ExplorationConfig {
    fn default() -> Self {
        Self {
            max_states: 200_000,
            max_depth: 64,
            max_reboot_id: 2,
            max_generation: 3,
            spare_participants: Vec::new(),
            kill_requests: true,
            check_liveness: true,
        }
    }
}

impl ConfigValidation for ExplorationConfig {
    fn validate(&self) -> Result<()> {
        if self.max_states == 0 {
            return Err(ReplogError::invalid("max_states must be greater than 0"));
        }
        if self.max_depth == 0 {
            return Err(ReplogError::invalid("max_depth must be greater than 0"));
        }
        if self.max_reboot_id == 0 {
            return Err(ReplogError::invalid("max_reboot_id must be greater than 0"));
        }
        Ok(())
    }
}

/// A starting state plus exploration bounds, as loaded from a scenario file.
///
/// ```toml
/// name = "three servers, leader down"
/// participants = ["A", "B", "C"]
/// min_replication_factor = 2
/// term = 5
/// leader = "A"
/// failed = ["A"]
///
/// [exploration]
/// max_reboot_id = 2
/// spare_participants = ["D"]
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Scenario {
    /// Label used in reports
    pub name: String,
    /// Initial plan participants
    pub participants: Vec<ParticipantId>,
    /// Replication floor of the log
    pub min_replication_factor: usize,
    /// Initial plan term
    pub term: u64,
    /// Initial leader, installed under its reboot id
    pub leader: Option<ParticipantId>,
    /// Servers failed at the start
    pub failed: Vec<ParticipantId>,
    /// Exploration bounds
    pub exploration: ExplorationConfig,
}

impl Default for Scenario {
    fn default() -> Self {
        Self {
            name: "unnamed".to_string(),
            participants: Vec::new(),
            min_replication_factor: 1,
            term: 0,
            leader: None,
            failed: Vec::new(),
            exploration: ExplorationConfig::default(),
        }
    }
}

impl Scenario {
    /// Build the starting state.
    ///
    /// Every participant and spare starts healthy with reboot id 1, except
    /// those listed in `failed`.
    pub fn initial_state(&self) -> AgencyState {
        let mut builder = AgencyStateBuilder::new(self.participants.iter().cloned())
            .term(LogTerm::new(self.term))
            .min_replication_factor(self.min_replication_factor);

        for spare in &self.exploration.spare_participants {
            builder = builder.health(spare.clone(), HealthRecord::healthy(RebootId::new(1)));
        }
        if let Some(leader) = &self.leader {
            builder = builder.leader(leader.clone());
        }
        for participant in &self.failed {
            builder = builder.failed(participant.clone());
        }
        builder.build()
    }
}

impl ConfigValidation for Scenario {
    fn validate(&self) -> Result<()> {
        if self.participants.is_empty() {
            return Err(ReplogError::invalid("scenario needs at least one participant"));
        }
        if self.min_replication_factor == 0 || self.min_replication_factor > self.participants.len()
        {
            return Err(ReplogError::invalid(format!(
                "min_replication_factor must be between 1 and {}",
                self.participants.len()
            )));
        }
        if let Some(leader) = &self.leader {
            if !self.participants.contains(leader) {
                return Err(ReplogError::invalid(format!(
                    "leader {leader} is not a participant"
                )));
            }
            if self.term == 0 {
                return Err(ReplogError::invalid("a leader needs a term greater than 0"));
            }
        }
        let known = |p: &ParticipantId| {
            self.participants.contains(p) || self.exploration.spare_participants.contains(p)
        };
        if let Some(unknown) = self.failed.iter().find(|p| !known(p)) {
            return Err(ReplogError::invalid(format!(
                "failed server {unknown} is neither a participant nor a spare"
            )));
        }
        if let Some(spare) = self
            .exploration
            .spare_participants
            .iter()
            .find(|p| self.participants.contains(p))
        {
            return Err(ReplogError::invalid(format!(
                "spare {spare} is already a participant"
            )));
        }
        self.exploration.validate()
    }
}

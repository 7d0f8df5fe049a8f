//! The composite document observed and mutated by supervision

use serde::{Deserialize, Serialize};

use super::current::{ConfigCommit, LogCurrent, StateCurrent};
use super::plan::{LogPlan, StatePlan};
use crate::health::ParticipantsHealth;
use crate::types::{LogId, ParticipantClaim, ParticipantId, StateGeneration};

/// Plan, Current and Health of one replicated log and its state machine.
///
/// Supervision never edits this ad hoc; every change goes through an action
/// so the result can be reproduced from the same starting state.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AgencyState {
    /// Desired log configuration
    pub plan: LogPlan,
    /// Reported log status
    pub current: LogCurrent,
    /// Desired state machine generation
    pub state_plan: StatePlan,
    /// Reported state machine progress
    pub state_current: StateCurrent,
    /// Liveness facts from the health subsystem
    pub health: ParticipantsHealth,
}

impl AgencyState {
    /// Log this state belongs to
    pub fn log_id(&self) -> LogId {
        self.plan.id
    }

    /// Designated leader of the current term
    pub fn leader(&self) -> Option<&ParticipantClaim> {
        self.plan.leader.as_ref()
    }

    /// Plan participants that acknowledged `generation` under the current
    /// term
    pub fn acknowledged(&self, generation: StateGeneration) -> Vec<&ParticipantId> {
        let commit = ConfigCommit {
            generation,
            term: self.plan.term,
        };
        self.state_current
            .committed(commit)
            .filter(|p| self.plan.contains(p))
            .collect()
    }

    /// Participants that acknowledged the pending generation under the
    /// current term. Empty when nothing is pending.
    pub fn pending_commits(&self) -> Vec<&ParticipantId> {
        match self.state_plan.pending_generation() {
            Some(generation) => self.acknowledged(generation),
            None => Vec::new(),
        }
    }

    /// Whether the pending generation has a strict majority of
    /// acknowledgments under the current term
    pub fn pending_quorum_met(&self) -> bool {
        self.state_plan.pending_generation().is_some()
            && self.pending_commits().len() >= self.plan.quorum_size()
    }

    /// Encode as a JSON agency document
    pub fn to_json(&self) -> crate::Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Decode a JSON agency document
    pub fn from_json(document: &str) -> crate::Result<Self> {
        Ok(serde_json::from_str(document)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::AgencyStateBuilder;
    use crate::types::{LogTerm, StateGeneration};

    #[test]
    fn test_pending_quorum_counts_only_current_term() {
        let state = AgencyStateBuilder::new(["A", "B", "C"])
            .term(LogTerm::new(5))
            .generations(StateGeneration::new(6), StateGeneration::new(7))
            .commit("A", StateGeneration::new(7), LogTerm::new(5))
            .commit("B", StateGeneration::new(7), LogTerm::new(4))
            .build();

        assert_eq!(state.pending_commits().len(), 1);
        assert!(!state.pending_quorum_met());
    }

    #[test]
    fn test_no_quorum_without_pending_generation() {
        let state = AgencyStateBuilder::new(["A"])
            .generations(StateGeneration::new(3), StateGeneration::new(3))
            .commit("A", StateGeneration::new(3), LogTerm::new(0))
            .build();

        assert!(!state.pending_quorum_met());
        assert!(state.pending_commits().is_empty());
        assert_eq!(
            state.acknowledged(StateGeneration::new(3)),
            vec![&ParticipantId::from("A")]
        );
    }

    #[test]
    fn test_json_document_roundtrip() {
        let state = AgencyStateBuilder::new(["A", "B", "C"])
            .term(LogTerm::new(2))
            .leader("A")
            .build();

        let decoded = AgencyState::from_json(&state.to_json().unwrap()).unwrap();
        assert_eq!(decoded, state);
    }
}

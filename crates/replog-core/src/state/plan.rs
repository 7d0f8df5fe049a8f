//! Desired configuration written by supervision actions

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::types::{LogId, LogTerm, ParticipantClaim, ParticipantId, StateGeneration};

/// Target configuration of one replicated log.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LogPlan {
    /// Log this plan belongs to
    pub id: LogId,
    /// Servers configured to take part in the log
    pub participants: BTreeSet<ParticipantId>,
    /// Current leadership epoch
    pub term: LogTerm,
    /// Designated leader for `term`, if one has been assigned
    pub leader: Option<ParticipantClaim>,
    /// Eviction never shrinks the participant set below this size
    pub min_replication_factor: usize,
}

impl LogPlan {
    /// Create a leaderless plan at term 0
    pub fn new(
        id: LogId,
        participants: impl IntoIterator<Item = ParticipantId>,
        min_replication_factor: usize,
    ) -> Self {
        Self {
            id,
            participants: participants.into_iter().collect(),
            term: LogTerm::default(),
            leader: None,
            min_replication_factor,
        }
    }

    /// Whether `participant` is configured for this log
    pub fn contains(&self, participant: &ParticipantId) -> bool {
        self.participants.contains(participant)
    }

    /// Whether `participant` is the designated leader, regardless of reboot id
    pub fn is_leader(&self, participant: &ParticipantId) -> bool {
        self.leader
            .as_ref()
            .is_some_and(|leader| leader.participant == *participant)
    }

    /// Size of a strict majority of the configured participants
    pub fn quorum_size(&self) -> usize {
        quorum_size(self.participants.len())
    }
}

/// Strict majority of `participants`: `n / 2 + 1`.
pub fn quorum_size(participants: usize) -> usize {
    participants / 2 + 1
}

/// Generation tracking of the state machine layered on the log.
///
/// A generation is pending while `target_generation` is ahead of
/// `active_generation`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StatePlan {
    /// Generation the state machine currently runs
    pub active_generation: StateGeneration,
    /// Generation the latest reconfiguration asks for
    pub target_generation: StateGeneration,
}

impl StatePlan {
    /// A converged plan running `generation`
    pub fn converged(generation: StateGeneration) -> Self {
        Self {
            active_generation: generation,
            target_generation: generation,
        }
    }

    /// The generation awaiting commitment, if any
    pub fn pending_generation(&self) -> Option<StateGeneration> {
        (self.target_generation > self.active_generation).then_some(self.target_generation)
    }

    /// Request one more generation on top of the current target.
    ///
    /// Returns `None` and leaves the plan untouched once the target
    /// generation is exhausted.
    pub fn bump_target(&mut self) -> Option<StateGeneration> {
        self.target_generation = self.target_generation.checked_next()?;
        Some(self.target_generation)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quorum_is_strict_majority() {
        assert_eq!(quorum_size(1), 1);
        assert_eq!(quorum_size(2), 2);
        assert_eq!(quorum_size(3), 2);
        assert_eq!(quorum_size(4), 3);
        assert_eq!(quorum_size(5), 3);
    }

    #[test]
    fn test_pending_generation() {
        let mut plan = StatePlan::converged(StateGeneration::new(6));
        assert_eq!(plan.pending_generation(), None);

        assert_eq!(plan.bump_target(), Some(StateGeneration::new(7)));
        assert_eq!(plan.pending_generation(), Some(StateGeneration::new(7)));

        let mut exhausted = StatePlan::converged(StateGeneration::new(u64::MAX));
        assert_eq!(exhausted.bump_target(), None);
        assert_eq!(exhausted, StatePlan::converged(StateGeneration::new(u64::MAX)));
    }

    #[test]
    fn test_is_leader_ignores_reboot_id() {
        let mut plan = LogPlan::new(LogId::new(1), ["A".into(), "B".into()], 1);
        plan.leader = Some(ParticipantClaim::new("A", crate::types::RebootId::new(4)));
        assert!(plan.is_leader(&"A".into()));
        assert!(!plan.is_leader(&"B".into()));
    }
}

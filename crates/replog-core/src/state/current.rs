//! Self-reported participant status

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::types::{LogTerm, ParticipantId, StateGeneration};

/// Terms the participants report as active.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LogCurrent {
    /// Highest term each participant has reported
    pub reported_terms: BTreeMap<ParticipantId, LogTerm>,
}

impl LogCurrent {
    /// Highest term reported by `participant`
    pub fn reported_term(&self, participant: &ParticipantId) -> Option<LogTerm> {
        self.reported_terms.get(participant).copied()
    }

    /// Keep the maximum of the stored and the reported term
    pub fn record_term(&mut self, participant: ParticipantId, term: LogTerm) {
        let entry = self.reported_terms.entry(participant).or_insert(term);
        *entry = (*entry).max(term);
    }
}

/// A participant's acknowledgment of a state configuration.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct ConfigCommit {
    /// Generation being acknowledged
    pub generation: StateGeneration,
    /// Log term the acknowledgment was made under
    pub term: LogTerm,
}

/// Snapshot and configuration progress of the state machine participants.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StateCurrent {
    /// Highest generation each participant finished a snapshot for
    pub snapshots: BTreeMap<ParticipantId, StateGeneration>,
    /// Latest configuration acknowledgment of each participant
    pub commits: BTreeMap<ParticipantId, ConfigCommit>,
}

impl StateCurrent {
    /// Highest snapshot generation confirmed by `participant`
    pub fn snapshot_generation(&self, participant: &ParticipantId) -> Option<StateGeneration> {
        self.snapshots.get(participant).copied()
    }

    /// Keep the maximum of the stored and the reported snapshot generation
    pub fn record_snapshot(&mut self, participant: ParticipantId, generation: StateGeneration) {
        let entry = self.snapshots.entry(participant).or_insert(generation);
        *entry = (*entry).max(generation);
    }

    /// Participants that acknowledged exactly `commit`
    pub fn committed(&self, commit: ConfigCommit) -> impl Iterator<Item = &ParticipantId> {
        self.commits
            .iter()
            .filter(move |(_, c)| **c == commit)
            .map(|(p, _)| p)
    }

    /// Drop all progress tracked for `participant`
    pub fn forget(&mut self, participant: &ParticipantId) {
        self.snapshots.remove(participant);
        self.commits.remove(participant);
    }
}

//! Participant health as reported by the health subsystem
//!
//! Health records are owned by an external reporter. The supervision engine
//! only reads them; the exploration harness mutates them to model crashes and
//! restarts.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::types::{ParticipantId, RebootId};

/// Last known liveness facts for one participant.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct HealthRecord {
    /// Reboot id of the currently running process
    pub reboot_id: RebootId,
    /// Whether the health subsystem considers the server failed
    pub failed: bool,
}

impl HealthRecord {
    /// A live server running as `reboot_id`
    pub fn healthy(reboot_id: RebootId) -> Self {
        Self {
            reboot_id,
            failed: false,
        }
    }

    /// A server running as `reboot_id` that is considered failed
    pub fn failed(reboot_id: RebootId) -> Self {
        Self {
            reboot_id,
            failed: true,
        }
    }
}

/// Health records for every known server.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ParticipantsHealth {
    records: BTreeMap<ParticipantId, HealthRecord>,
}

impl ParticipantsHealth {
    /// Create an empty health table
    pub fn new() -> Self {
        Self::default()
    }

    /// Record for `participant`, if the health subsystem has seen it
    pub fn record(&self, participant: &ParticipantId) -> Option<&HealthRecord> {
        self.records.get(participant)
    }

    /// Replace the record for `participant`
    pub fn update(&mut self, participant: ParticipantId, record: HealthRecord) {
        self.records.insert(participant, record);
    }

    /// Mark `participant` failed, keeping its reboot id.
    ///
    /// Returns false when no record exists.
    pub fn mark_failed(&mut self, participant: &ParticipantId) -> bool {
        match self.records.get_mut(participant) {
            Some(record) => {
                record.failed = true;
                true
            }
            None => false,
        }
    }

    /// Restart `participant`: bump its reboot id and clear the failed flag.
    ///
    /// Returns the new reboot id, or `None` when no record exists or the
    /// reboot id is exhausted. The record is left untouched in both cases.
    pub fn reboot(&mut self, participant: &ParticipantId) -> Option<RebootId> {
        let record = self.records.get_mut(participant)?;
        record.reboot_id = record.reboot_id.checked_next()?;
        record.failed = false;
        Some(record.reboot_id)
    }

    /// Iterate over all records in participant order
    pub fn iter(&self) -> impl Iterator<Item = (&ParticipantId, &HealthRecord)> {
        self.records.iter()
    }

    /// Number of known servers
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether no server is known
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

impl FromIterator<(ParticipantId, HealthRecord)> for ParticipantsHealth {
    fn from_iter<I: IntoIterator<Item = (ParticipantId, HealthRecord)>>(iter: I) -> Self {
        Self {
            records: iter.into_iter().collect(),
        }
    }
}

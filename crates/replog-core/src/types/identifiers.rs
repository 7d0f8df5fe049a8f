//! Identifier and counter types for replicated-log supervision
//!
//! Participants are named by a stable [`ParticipantId`]. Every other type in
//! this module is a monotone counter: a process restart bumps the
//! [`RebootId`], a leadership change bumps the [`LogTerm`] and a
//! reconfiguration of the dependent state machine bumps the
//! [`StateGeneration`]. None of them ever move backwards.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifier of a server taking part in a replicated log.
///
/// Stable for the lifetime of the server and never reused for a different
/// physical or logical server.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ParticipantId(String);

impl ParticipantId {
    /// Create a participant identifier
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Borrow the identifier as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ParticipantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ParticipantId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for ParticipantId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl AsRef<str> for ParticipantId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Per-participant restart counter.
///
/// Incremented exactly once each time a participant process (re)starts. Two
/// claims with the same [`ParticipantId`] but different reboot ids describe
/// different process instances.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct RebootId(pub u64);

impl RebootId {
    /// Create a reboot id
    pub fn new(value: u64) -> Self {
        Self(value)
    }

    /// Get the raw counter value
    pub fn value(self) -> u64 {
        self.0
    }

    /// The reboot id the process presents after its next restart, or
    /// `None` once the counter is exhausted
    pub fn checked_next(self) -> Option<Self> {
        self.0.checked_add(1).map(Self)
    }
}

impl fmt::Display for RebootId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Leadership epoch of one replicated log.
///
/// At most one leader is ever valid for a given term, and a new leader is only
/// installed under a term strictly greater than every previous one.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct LogTerm(pub u64);

impl LogTerm {
    /// Create a log term
    pub fn new(value: u64) -> Self {
        Self(value)
    }

    /// Get the raw term value
    pub fn value(self) -> u64 {
        self.0
    }

    /// The term following this one, or `None` at `u64::MAX`
    pub fn checked_next(self) -> Option<Self> {
        self.0.checked_add(1).map(Self)
    }
}

impl fmt::Display for LogTerm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Configuration epoch of a state machine layered on a log.
///
/// Independent of [`LogTerm`]: it advances on reconfiguration and snapshot
/// milestones, not on leadership changes.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct StateGeneration(pub u64);

impl StateGeneration {
    /// Create a state generation
    pub fn new(value: u64) -> Self {
        Self(value)
    }

    /// Get the raw generation value
    pub fn value(self) -> u64 {
        self.0
    }

    /// The generation following this one, or `None` at `u64::MAX`
    pub fn checked_next(self) -> Option<Self> {
        self.0.checked_add(1).map(Self)
    }
}

impl fmt::Display for StateGeneration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifier of a replicated log within the agency.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct LogId(pub u64);

impl LogId {
    /// Create a log identifier
    pub fn new(value: u64) -> Self {
        Self(value)
    }
}

impl fmt::Display for LogId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "log-{}", self.0)
    }
}

/// A participant identity as claimed by the holder of a role.
///
/// Equality covers the reboot id, so a restarted server never matches a claim
/// made by its previous incarnation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ParticipantClaim {
    /// Server holding the role
    pub participant: ParticipantId,
    /// Process instance of that server when the role was granted
    pub reboot_id: RebootId,
}

impl ParticipantClaim {
    /// Create a claim for `participant` running as `reboot_id`
    pub fn new(participant: impl Into<ParticipantId>, reboot_id: RebootId) -> Self {
        Self {
            participant: participant.into(),
            reboot_id,
        }
    }
}

impl fmt::Display for ParticipantClaim {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.participant, self.reboot_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counters_advance_by_one() {
        assert_eq!(LogTerm::new(5).checked_next(), Some(LogTerm::new(6)));
        assert_eq!(RebootId::new(0).checked_next(), Some(RebootId::new(1)));
        assert_eq!(StateGeneration::new(6).checked_next().map(|g| g.value()), Some(7));
    }

    #[test]
    fn test_counters_never_wrap() {
        assert_eq!(LogTerm::new(u64::MAX).checked_next(), None);
        assert_eq!(RebootId::new(u64::MAX).checked_next(), None);
        assert_eq!(StateGeneration::new(u64::MAX).checked_next(), None);
    }

    #[test]
    fn test_participant_ordering_is_lexical() {
        let a = ParticipantId::from("A");
        let b = ParticipantId::from("B");
        assert!(a < b);
        assert_eq!(a.as_str(), "A");
    }

    #[test]
    fn test_claim_equality_includes_reboot_id() {
        let first = ParticipantClaim::new("A", RebootId::new(1));
        let restarted = ParticipantClaim::new("A", RebootId::new(2));
        assert_ne!(first, restarted);
        assert_eq!(first.to_string(), "A@1");
    }

    #[test]
    fn test_identifiers_serialize_transparently() {
        let json = serde_json::to_string(&LogTerm::new(3)).unwrap();
        assert_eq!(json, "3");
        let id: ParticipantId = serde_json::from_str("\"PRMR-1\"").unwrap();
        assert_eq!(id, ParticipantId::from("PRMR-1"));
    }
}

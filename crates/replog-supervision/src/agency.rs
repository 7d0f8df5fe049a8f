//! Agency store contract
//!
//! The agency serializes every read and write of a log's [`AgencyState`].
//! Writes are conditional on the version that was read, so two decision
//! cycles working on the same log can never both apply conflicting actions.

use async_trait::async_trait;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use replog_core::{AgencyState, LogId};

/// Version of a stored agency document. Bumped by every successful write.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct AgencyVersion(pub u64);

impl AgencyVersion {
    /// Version of a freshly created document
    pub const INITIAL: AgencyVersion = AgencyVersion(1);

    /// Version following this one, or `None` at `u64::MAX`
    pub fn checked_next(self) -> Option<Self> {
        self.0.checked_add(1).map(Self)
    }
}

impl fmt::Display for AgencyVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "v{}", self.0)
    }
}

/// A value together with the version it was read at.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Versioned<T> {
    /// Version the value was read at
    pub version: AgencyVersion,
    /// The value
    pub value: T,
}

/// Store failures
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    /// The document changed since it was read
    #[error("conflicting write on {log}: expected {expected}, found {actual}")]
    Conflict {
        /// Log being written
        log: LogId,
        /// Version the writer read
        expected: AgencyVersion,
        /// Version currently stored
        actual: AgencyVersion,
    },

    /// No document for the log
    #[error("{0} not found")]
    NotFound(LogId),

    /// The document version cannot be bumped any further
    #[error("{0} has exhausted its document versions")]
    VersionExhausted(LogId),

    /// A document for the log already exists
    #[error("{0} already exists")]
    AlreadyExists(LogId),

    /// The stored document could not be encoded or decoded
    #[error("serialization error: {message}")]
    Serialization {
        /// Error message describing the serialization failure
        message: String,
    },
}

impl StoreError {
    /// Whether re-reading and recomputing can succeed
    pub fn is_conflict(&self) -> bool {
        matches!(self, StoreError::Conflict { .. })
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(err: serde_json::Error) -> Self {
        StoreError::Serialization {
            message: err.to_string(),
        }
    }
}

/// Conditional document store holding one [`AgencyState`] per log.
#[async_trait]
pub trait AgencyStore: Send + Sync {
    /// Store the initial state of a newly established log
    async fn create(&self, state: AgencyState) -> Result<AgencyVersion, StoreError>;

    /// Read the current state of `log`
    async fn read(&self, log: LogId) -> Result<Versioned<AgencyState>, StoreError>;

    /// Replace the state of `state.log_id()` if it is still at `expected`
    async fn compare_and_swap(
        &self,
        expected: AgencyVersion,
        state: AgencyState,
    ) -> Result<AgencyVersion, StoreError>;

    /// Remove a decommissioned log
    async fn decommission(&self, log: LogId) -> Result<(), StoreError>;

    /// All stored logs
    async fn logs(&self) -> Vec<LogId>;
}

/// In-process agency keeping JSON documents behind a mutex.
#[derive(Debug, Default)]
pub struct InMemoryAgency {
    documents: Mutex<BTreeMap<LogId, Versioned<String>>>,
}

impl InMemoryAgency {
    /// Create an empty agency
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl AgencyStore for InMemoryAgency {
    async fn create(&self, state: AgencyState) -> Result<AgencyVersion, StoreError> {
        let log = state.log_id();
        let document = serde_json::to_string(&state)?;
        let mut documents = self.documents.lock();
        if documents.contains_key(&log) {
            return Err(StoreError::AlreadyExists(log));
        }
        let version = AgencyVersion::INITIAL;
        documents.insert(
            log,
            Versioned {
                version,
                value: document,
            },
        );
        Ok(version)
    }

    async fn read(&self, log: LogId) -> Result<Versioned<AgencyState>, StoreError> {
        let stored = self
            .documents
            .lock()
            .get(&log)
            .cloned()
            .ok_or(StoreError::NotFound(log))?;
        Ok(Versioned {
            version: stored.version,
            value: serde_json::from_str(&stored.value)?,
        })
    }

    async fn compare_and_swap(
        &self,
        expected: AgencyVersion,
        state: AgencyState,
    ) -> Result<AgencyVersion, StoreError> {
        let log = state.log_id();
        let document = serde_json::to_string(&state)?;
        let mut documents = self.documents.lock();
        let stored = documents.get_mut(&log).ok_or(StoreError::NotFound(log))?;
        if stored.version != expected {
            return Err(StoreError::Conflict {
                log,
                expected,
                actual: stored.version,
            });
        }
        stored.version = stored
            .version
            .checked_next()
            .ok_or(StoreError::VersionExhausted(log))?;
        stored.value = document;
        Ok(stored.version)
    }

    async fn decommission(&self, log: LogId) -> Result<(), StoreError> {
        self.documents
            .lock()
            .remove(&log)
            .map(|_| ())
            .ok_or(StoreError::NotFound(log))
    }

    async fn logs(&self) -> Vec<LogId> {
        self.documents.lock().keys().copied().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use replog_core::{AgencyStateBuilder, LogTerm};

    #[tokio::test]
    async fn test_create_and_read() {
        let agency = InMemoryAgency::new();
        let state = AgencyStateBuilder::new(["A", "B"]).build();

        let version = agency.create(state.clone()).await.unwrap();
        let read = agency.read(state.log_id()).await.unwrap();
        assert_eq!(read.version, version);
        assert_eq!(read.value, state);

        assert_eq!(
            agency.create(state.clone()).await,
            Err(StoreError::AlreadyExists(state.log_id()))
        );
    }

    #[tokio::test]
    async fn test_compare_and_swap_conflict() {
        let agency = InMemoryAgency::new();
        let state = AgencyStateBuilder::new(["A"]).build();
        let v1 = agency.create(state.clone()).await.unwrap();

        let mut changed = state.clone();
        changed.plan.term = LogTerm::new(1);
        let v2 = agency.compare_and_swap(v1, changed.clone()).await.unwrap();
        assert_eq!(Some(v2), v1.checked_next());

        let err = agency.compare_and_swap(v1, state).await.unwrap_err();
        assert!(err.is_conflict());
        assert_eq!(agency.read(changed.log_id()).await.unwrap().value, changed);
    }

    #[tokio::test]
    async fn test_exhausted_version_refuses_writes() {
        let agency = InMemoryAgency::new();
        let state = AgencyStateBuilder::new(["A"]).build();
        let log = state.log_id();
        agency.create(state.clone()).await.unwrap();
        let last = AgencyVersion(u64::MAX);
        if let Some(stored) = agency.documents.lock().get_mut(&log) {
            stored.version = last;
        }

        assert_eq!(
            agency.compare_and_swap(last, state.clone()).await,
            Err(StoreError::VersionExhausted(log))
        );
        assert_eq!(agency.read(log).await.unwrap().version, last);
    }

    #[tokio::test]
    async fn test_decommission() {
        let agency = InMemoryAgency::new();
        let state = AgencyStateBuilder::new(["A"]).build();
        agency.create(state.clone()).await.unwrap();
        assert_eq!(agency.logs().await, vec![state.log_id()]);

        agency.decommission(state.log_id()).await.unwrap();
        assert!(agency.logs().await.is_empty());
        assert_eq!(
            agency.read(state.log_id()).await,
            Err(StoreError::NotFound(state.log_id()))
        );
    }
}

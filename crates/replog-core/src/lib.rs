//! # Replog Core - Agency State Model
//!
//! Value types shared by the replicated-log supervision engine and the
//! exploration harness.
//!
//! ## Architecture
//!
//! - **types**: participant identifiers and the monotone counters
//!   (`RebootId`, `LogTerm`, `StateGeneration`)
//! - **health**: per-participant liveness facts owned by the health subsystem
//! - **state**: `LogPlan`/`LogCurrent`, `StatePlan`/`StateCurrent` and the
//!   composite `AgencyState`
//! - **config**: TOML-loaded, validated configuration
//! - **errors**: unified error type for configuration and documents
//!
//! Nothing in this crate performs I/O except explicit file loading in
//! `config`.

pub mod config;
pub mod errors;
pub mod health;
pub mod state;
pub mod types;

pub use config::{ConfigValidation, SupervisionConfig, TomlConfig};
pub use errors::{ReplogError, Result};
pub use health::{HealthRecord, ParticipantsHealth};
pub use state::{
    quorum_size, AgencyState, AgencyStateBuilder, ConfigCommit, LogCurrent, LogPlan,
    StateCurrent, StatePlan,
};
pub use types::{LogId, LogTerm, ParticipantClaim, ParticipantId, RebootId, StateGeneration};

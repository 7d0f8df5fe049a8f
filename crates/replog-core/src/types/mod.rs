//! Core identifier types

pub mod identifiers;

pub use identifiers::{
    LogId, LogTerm, ParticipantClaim, ParticipantId, RebootId, StateGeneration,
};

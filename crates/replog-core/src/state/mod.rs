//! Agency state model
//!
//! Immutable value types describing the desired ([`LogPlan`], [`StatePlan`])
//! and observed ([`LogCurrent`], [`StateCurrent`]) configuration of one
//! replicated log, combined with participant health into an [`AgencyState`].
//!
//! All collections are ordered so that hashing, iteration and serialization
//! are deterministic across runs.

pub mod agency;
pub mod builder;
pub mod current;
pub mod plan;

pub use agency::AgencyState;
pub use builder::AgencyStateBuilder;
pub use current::{ConfigCommit, LogCurrent, StateCurrent};
pub use plan::{quorum_size, LogPlan, StatePlan};

//! # Replog Supervision - Replicated-Log Supervision Engine
//!
//! Decision logic that keeps a replicated log (one leader, several followers)
//! and the state machine layered on it converging toward a single, safe,
//! available configuration, driven only by externally observed health and
//! progress reports.
//!
//! ## Architecture
//!
//! - **core::validation**: health validator and state well-formedness
//! - **core::actions**: closed catalog of agency mutations with pure `apply`
//! - **core::transitions**: log-level and state-level decision steps
//! - **agency**: conditional (compare-and-swap) store contract
//! - **supervisor**: read / decide / write control cycle
//!
//! ## Safety
//!
//! - A leader is only installed under a strictly greater term, fencing any
//!   previous leader.
//! - A leader claim is bound to a reboot id; a restarted process is never
//!   promoted under a stale identity.
//! - A generation only activates with a strict majority of acknowledgments
//!   under the current term.

pub mod agency;
pub mod core;
pub mod errors;
pub mod supervisor;

pub use agency::{AgencyStore, AgencyVersion, InMemoryAgency, StoreError, Versioned};
pub use core::{
    log_step, select_leader_candidate, state_step, Decision, SupervisionAction,
    SupervisionEvent,
};
pub use errors::{MalformedInput, Rejection, SupervisionError, SupervisionResult};
pub use supervisor::{plan_cycle, CycleOutcome, CyclePlan, Supervisor, SupervisorError};

//! # Replog Checker - Exhaustive Exploration Harness
//!
//! Drives the supervision engine, participant reports and an adversarial
//! environment over every reachable agency state within configured bounds,
//! and checks the convergence predicates on the way:
//!
//! - **Term monotonicity**: the plan term never decreases and moves exactly
//!   when the leader identity changes
//! - **Generation monotonicity**: the active generation never decreases and
//!   only advances with a strict majority of acknowledgments
//! - **Valid leader assignment**: every assigned leader is health-valid at
//!   the moment of assignment
//! - **Eventual leadership**: from every reachable state some path leads to a
//!   health-valid leader
//!
//! Violations come with the shortest trace reaching them, rendered one
//! transition per line.

pub mod config;
pub mod explorer;
pub mod predicates;
pub mod trace;
pub mod transitions;

pub use config::{ExplorationConfig, Scenario};
pub use explorer::{ExplorationReport, Explorer};
pub use predicates::{is_leader_healthy, server_is_leader, Violation};
pub use trace::{CounterExample, StateSummary, Trace, TraceStep};
pub use transitions::{enumerate_transitions, AgencyTransition};

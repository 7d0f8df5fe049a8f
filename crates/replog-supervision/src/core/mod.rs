//! Pure supervision core
//!
//! Effect-free health validation, action catalog and decision steps. Nothing
//! in here performs I/O, reads a clock or draws randomness, which is what
//! makes the engine exhaustively explorable.

pub mod actions;
pub mod transitions;
pub mod validation;

pub use actions::SupervisionAction;
pub use transitions::{log_step, select_leader_candidate, state_step, Decision, SupervisionEvent};
pub use validation::{
    check_well_formed, healthy_claim, is_claim_valid, is_valid, leader_is_healthy,
};

//! Convergence predicates
//!
//! State predicates, and safety properties checked on every explored state
//! and every explored edge. The temporal eventual-leadership property is
//! checked by the explorer over the whole reachable graph.

use serde::{Deserialize, Serialize};

use replog_core::{
    quorum_size, AgencyState, LogTerm, ParticipantClaim, ParticipantId, StateGeneration,
};
use replog_supervision::core::{check_well_formed, is_claim_valid, leader_is_healthy};
use replog_supervision::{MalformedInput, SupervisionAction};

use crate::transitions::AgencyTransition;

/// A violated property
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
pub enum Violation {
    /// A reachable state is not well formed
    #[error("malformed state: {0}")]
    MalformedState(MalformedInput),

    /// The plan term went backwards
    #[error("term decreased from {before} to {after}")]
    TermDecreased {
        /// Term before the step
        before: LogTerm,
        /// Term after the step
        after: LogTerm,
    },

    /// The leader identity changed under the same term
    #[error("leader changed from {before:?} to {after:?} without a term bump")]
    LeaderChangedWithoutTermBump {
        /// Leader before the step
        before: Option<ParticipantClaim>,
        /// Leader after the step
        after: Option<ParticipantClaim>,
    },

    /// The term moved without a new leader
    #[error("term bumped to {term} without a leader change")]
    TermBumpedWithoutLeaderChange {
        /// New term
        term: LogTerm,
    },

    /// A leader was assigned whose claim health did not back
    #[error("assigned leader {claim} is not health-valid")]
    InvalidLeaderAssigned {
        /// Assigned claim
        claim: ParticipantClaim,
    },

    /// The active generation went backwards
    #[error("active generation decreased from {before} to {after}")]
    GenerationDecreased {
        /// Active generation before the step
        before: StateGeneration,
        /// Active generation after the step
        after: StateGeneration,
    },

    /// A generation activated without a strict majority of acknowledgments
    #[error("generation {generation} activated with {acknowledgments} of {required} acknowledgments")]
    GenerationWithoutQuorum {
        /// Activated generation
        generation: StateGeneration,
        /// Acknowledgments under the current term
        acknowledgments: usize,
        /// Strict majority of the plan
        required: usize,
    },

    /// A reachable state can never reach a health-valid leader
    #[error("no health-valid leader is reachable")]
    NoEventualLeader,
}

impl Violation {
    /// Name of the violated property
    pub fn property(&self) -> &'static str {
        match self {
            Violation::MalformedState(_) => "well_formed",
            Violation::TermDecreased { .. }
            | Violation::LeaderChangedWithoutTermBump { .. }
            | Violation::TermBumpedWithoutLeaderChange { .. } => "term_monotonicity",
            Violation::InvalidLeaderAssigned { .. } => "valid_leader_assignment",
            Violation::GenerationDecreased { .. } | Violation::GenerationWithoutQuorum { .. } => {
                "generation_monotonicity"
            }
            Violation::NoEventualLeader => "eventual_leadership",
        }
    }
}

/// Whether the plan has a leader health currently backs
pub fn is_leader_healthy(state: &AgencyState) -> bool {
    leader_is_healthy(state)
}

/// Whether `participant` is the plan leader, regardless of health
pub fn server_is_leader(state: &AgencyState, participant: &ParticipantId) -> bool {
    state.plan.is_leader(participant)
}

/// Participants that acknowledged `generation` under the current plan term
pub fn acknowledgments(state: &AgencyState, generation: StateGeneration) -> usize {
    state.acknowledged(generation).len()
}

/// Safety properties of a single state
pub fn check_state(state: &AgencyState) -> Result<(), Violation> {
    check_well_formed(state).map_err(Violation::MalformedState)
}

/// Safety properties of one step from `before` to `after`
pub fn check_edge(
    before: &AgencyState,
    transition: &AgencyTransition,
    after: &AgencyState,
) -> Result<(), Violation> {
    check_term_monotonic(before, after)?;
    check_generation_monotonic(before, after)?;

    if let Some(SupervisionAction::AssignLeader {
        participant,
        reboot_id,
        ..
    }) = transition.action()
    {
        let claim = ParticipantClaim::new(participant.clone(), *reboot_id);
        if !is_claim_valid(&claim, &before.health) {
            return Err(Violation::InvalidLeaderAssigned { claim });
        }
    }

    Ok(())
}

/// The term never decreases and moves exactly when the leader changes.
pub fn check_term_monotonic(before: &AgencyState, after: &AgencyState) -> Result<(), Violation> {
    let (old, new) = (before.plan.term, after.plan.term);
    if new < old {
        return Err(Violation::TermDecreased {
            before: old,
            after: new,
        });
    }

    let leader_changed = before.plan.leader != after.plan.leader;
    if leader_changed && new == old {
        return Err(Violation::LeaderChangedWithoutTermBump {
            before: before.plan.leader.clone(),
            after: after.plan.leader.clone(),
        });
    }
    if !leader_changed && new > old {
        return Err(Violation::TermBumpedWithoutLeaderChange { term: new });
    }
    Ok(())
}

/// The active generation never decreases and only moves with a quorum.
pub fn check_generation_monotonic(
    before: &AgencyState,
    after: &AgencyState,
) -> Result<(), Violation> {
    let (old, new) = (
        before.state_plan.active_generation,
        after.state_plan.active_generation,
    );
    if new < old {
        return Err(Violation::GenerationDecreased {
            before: old,
            after: new,
        });
    }
    if new > old {
        let required = quorum_size(after.plan.participants.len());
        let acknowledgments = acknowledgments(after, new);
        if acknowledgments < required {
            return Err(Violation::GenerationWithoutQuorum {
                generation: new,
                acknowledgments,
                required,
            });
        }
    }
    Ok(())
}

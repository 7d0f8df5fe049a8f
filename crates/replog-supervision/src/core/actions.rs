//! Supervision action catalog
//!
//! Every legal mutation of an [`AgencyState`] is one variant of
//! [`SupervisionAction`], applied by a single exhaustive dispatcher. Each
//! apply function is pure: it either returns the successor state or an
//! explicit error, and never partially mutates its input.
//!
//! Report-style actions (`ReportTerm`, `ReportSnapshotComplete`,
//! `CommitConfig`) are idempotent. Term and generation bumping actions never
//! move a counter backwards.

use serde::{Deserialize, Serialize};
use std::fmt;

use replog_core::{
    AgencyState, ConfigCommit, LogTerm, ParticipantClaim, ParticipantId, RebootId,
    StateGeneration,
};

use super::validation::{is_claim_valid, require_participant};
use crate::errors::{Rejection, SupervisionResult};

/// A single mutation of the agency state.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SupervisionAction {
    /// Install `participant` running as `reboot_id` as leader of `term`
    AssignLeader {
        /// New leader
        participant: ParticipantId,
        /// Process instance the leadership is bound to
        reboot_id: RebootId,
        /// New term, strictly greater than the plan term
        term: LogTerm,
    },
    /// Add a server to the plan
    AddParticipant {
        /// Server to add
        participant: ParticipantId,
    },
    /// Remove a non-leading server from the plan
    EvictParticipant {
        /// Server to remove
        participant: ParticipantId,
    },
    /// Record the term a participant reports as active
    ReportTerm {
        /// Reporting participant
        participant: ParticipantId,
        /// Reported term
        term: LogTerm,
    },
    /// Record a finished snapshot transfer
    ReportSnapshotComplete {
        /// Reporting participant
        participant: ParticipantId,
        /// Generation the snapshot was taken for
        generation: StateGeneration,
    },
    /// Record a participant's acknowledgment of the pending configuration
    CommitConfig {
        /// Acknowledging participant
        participant: ParticipantId,
        /// Acknowledged generation
        generation: StateGeneration,
        /// Term the acknowledgment was made under
        term: LogTerm,
    },
    /// Activate the pending generation
    AdvanceGeneration {
        /// Generation to activate
        generation: StateGeneration,
    },
}

impl SupervisionAction {
    /// Apply this action to `state`, producing the successor state.
    pub fn apply(&self, state: &AgencyState) -> SupervisionResult<AgencyState> {
        match self {
            SupervisionAction::AssignLeader {
                participant,
                reboot_id,
                term,
            } => assign_leader(state, participant, *reboot_id, *term),
            SupervisionAction::AddParticipant { participant } => {
                add_participant(state, participant)
            }
            SupervisionAction::EvictParticipant { participant } => {
                evict_participant(state, participant)
            }
            SupervisionAction::ReportTerm { participant, term } => {
                report_term(state, participant, *term)
            }
            SupervisionAction::ReportSnapshotComplete {
                participant,
                generation,
            } => report_snapshot_complete(state, participant, *generation),
            SupervisionAction::CommitConfig {
                participant,
                generation,
                term,
            } => commit_config(state, participant, *generation, *term),
            SupervisionAction::AdvanceGeneration { generation } => {
                advance_generation(state, *generation)
            }
        }
    }

    /// Short name of the action kind
    pub fn name(&self) -> &'static str {
        match self {
            SupervisionAction::AssignLeader { .. } => "AssignLeader",
            SupervisionAction::AddParticipant { .. } => "AddParticipant",
            SupervisionAction::EvictParticipant { .. } => "EvictParticipant",
            SupervisionAction::ReportTerm { .. } => "ReportTerm",
            SupervisionAction::ReportSnapshotComplete { .. } => "ReportSnapshotComplete",
            SupervisionAction::CommitConfig { .. } => "CommitConfig",
            SupervisionAction::AdvanceGeneration { .. } => "AdvanceGeneration",
        }
    }

    /// Whether this action records an externally observed fact rather than
    /// a supervision decision
    pub fn is_report(&self) -> bool {
        matches!(
            self,
            SupervisionAction::ReportTerm { .. }
                | SupervisionAction::ReportSnapshotComplete { .. }
                | SupervisionAction::CommitConfig { .. }
        )
    }

    /// Participant the action is about, if any
    pub fn participant(&self) -> Option<&ParticipantId> {
        match self {
            SupervisionAction::AssignLeader { participant, .. }
            | SupervisionAction::AddParticipant { participant }
            | SupervisionAction::EvictParticipant { participant }
            | SupervisionAction::ReportTerm { participant, .. }
            | SupervisionAction::ReportSnapshotComplete { participant, .. }
            | SupervisionAction::CommitConfig { participant, .. } => Some(participant),
            SupervisionAction::AdvanceGeneration { .. } => None,
        }
    }
}

impl fmt::Display for SupervisionAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SupervisionAction::AssignLeader {
                participant,
                reboot_id,
                term,
            } => write!(f, "AssignLeader({participant}@{reboot_id}, term {term})"),
            SupervisionAction::AddParticipant { participant } => {
                write!(f, "AddParticipant({participant})")
            }
            SupervisionAction::EvictParticipant { participant } => {
                write!(f, "EvictParticipant({participant})")
            }
            SupervisionAction::ReportTerm { participant, term } => {
                write!(f, "ReportTerm({participant}, term {term})")
            }
            SupervisionAction::ReportSnapshotComplete {
                participant,
                generation,
            } => write!(
                f,
                "ReportSnapshotComplete({participant}, generation {generation})"
            ),
            SupervisionAction::CommitConfig {
                participant,
                generation,
                term,
            } => write!(
                f,
                "CommitConfig({participant}, generation {generation}, term {term})"
            ),
            SupervisionAction::AdvanceGeneration { generation } => {
                write!(f, "AdvanceGeneration({generation})")
            }
        }
    }
}

/// Install a new leader under a strictly greater term.
///
/// Preconditions:
/// - `participant` is in the plan
/// - `term > plan.term`
/// - the claim `(participant, reboot_id)` is health-valid
pub fn assign_leader(
    state: &AgencyState,
    participant: &ParticipantId,
    reboot_id: RebootId,
    term: LogTerm,
) -> SupervisionResult<AgencyState> {
    require_participant(state, participant)?;

    if term <= state.plan.term {
        return Err(Rejection::TermNotIncreasing {
            current: state.plan.term,
            proposed: term,
        }
        .into());
    }

    let claim = ParticipantClaim::new(participant.clone(), reboot_id);
    if !is_claim_valid(&claim, &state.health) {
        return Err(Rejection::InvalidLeaderClaim { claim }.into());
    }

    let mut new_state = state.clone();
    new_state.plan.term = term;
    new_state.plan.leader = Some(claim);
    Ok(new_state)
}

/// Add `participant` to the plan. A no-op when it is already present.
///
/// A new participant needs the state machine to be reconfigured, so the
/// target generation moves one ahead.
pub fn add_participant(
    state: &AgencyState,
    participant: &ParticipantId,
) -> SupervisionResult<AgencyState> {
    if state.plan.contains(participant) {
        return Ok(state.clone());
    }

    let mut new_state = state.clone();
    bump_target(&mut new_state)?;
    new_state.plan.participants.insert(participant.clone());
    Ok(new_state)
}

/// Remove `participant` from the plan and drop everything tracked for it.
///
/// Preconditions:
/// - `participant` is in the plan and not the leader
/// - the remaining participants still meet the replication floor
pub fn evict_participant(
    state: &AgencyState,
    participant: &ParticipantId,
) -> SupervisionResult<AgencyState> {
    require_participant(state, participant)?;

    if state.plan.is_leader(participant) {
        return Err(Rejection::ParticipantIsLeader {
            participant: participant.clone(),
        }
        .into());
    }

    let remaining = state.plan.participants.len() - 1;
    if remaining < state.plan.min_replication_factor {
        return Err(Rejection::BelowReplicationFactor {
            remaining,
            minimum: state.plan.min_replication_factor,
        }
        .into());
    }

    let mut new_state = state.clone();
    bump_target(&mut new_state)?;
    new_state.plan.participants.remove(participant);
    new_state.current.reported_terms.remove(participant);
    new_state.state_current.forget(participant);
    Ok(new_state)
}

fn bump_target(state: &mut AgencyState) -> SupervisionResult<StateGeneration> {
    let generation = state.state_plan.target_generation;
    state
        .state_plan
        .bump_target()
        .ok_or_else(|| Rejection::GenerationExhausted { generation }.into())
}

/// Record `term` as the highest term `participant` has seen.
pub fn report_term(
    state: &AgencyState,
    participant: &ParticipantId,
    term: LogTerm,
) -> SupervisionResult<AgencyState> {
    require_participant(state, participant)?;

    if term > state.plan.term {
        return Err(Rejection::FutureTerm {
            participant: participant.clone(),
            reported: term,
            plan: state.plan.term,
        }
        .into());
    }

    let mut new_state = state.clone();
    new_state.current.record_term(participant.clone(), term);
    Ok(new_state)
}

/// Record a finished snapshot. Lower generations than already recorded are
/// accepted and change nothing.
pub fn report_snapshot_complete(
    state: &AgencyState,
    participant: &ParticipantId,
    generation: StateGeneration,
) -> SupervisionResult<AgencyState> {
    require_participant(state, participant)?;

    let target = state.state_plan.target_generation;
    if generation > target {
        return Err(Rejection::FutureGeneration {
            participant: participant.clone(),
            reported: generation,
            target,
        }
        .into());
    }

    let mut new_state = state.clone();
    new_state
        .state_current
        .record_snapshot(participant.clone(), generation);
    Ok(new_state)
}

/// Record an acknowledgment of the pending generation under the current term.
pub fn commit_config(
    state: &AgencyState,
    participant: &ParticipantId,
    generation: StateGeneration,
    term: LogTerm,
) -> SupervisionResult<AgencyState> {
    require_participant(state, participant)?;

    let commit = ConfigCommit { generation, term };
    let tracked = state.state_plan.pending_generation() == Some(generation)
        && term == state.plan.term;
    if !tracked {
        return Err(Rejection::StaleConfigCommit {
            participant: participant.clone(),
            commit,
        }
        .into());
    }

    let mut new_state = state.clone();
    new_state
        .state_current
        .commits
        .insert(participant.clone(), commit);
    Ok(new_state)
}

/// Activate the pending generation once a strict majority acknowledged it
/// under the current term.
pub fn advance_generation(
    state: &AgencyState,
    generation: StateGeneration,
) -> SupervisionResult<AgencyState> {
    let Some(pending) = state.state_plan.pending_generation() else {
        return Err(Rejection::NoPendingGeneration {
            active: state.state_plan.active_generation,
        }
        .into());
    };

    if generation != pending {
        return Err(Rejection::GenerationMismatch {
            proposed: generation,
            pending,
        }
        .into());
    }

    let required = state.plan.quorum_size();
    let actual = state.pending_commits().len();
    if actual < required {
        return Err(Rejection::QuorumNotMet { required, actual }.into());
    }

    let mut new_state = state.clone();
    new_state.state_plan.active_generation = generation;
    Ok(new_state)
}

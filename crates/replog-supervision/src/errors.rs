//! Decision errors of the supervision engine
//!
//! A [`Rejection`] means a precondition did not hold against the facts at
//! hand: nothing was changed and the caller retries with refreshed facts on
//! its next cycle. A [`MalformedInput`] means the state or event itself is
//! inconsistent, which points at a bug in the caller or in data migration.

use serde::{Deserialize, Serialize};

use replog_core::{
    ConfigCommit, LogTerm, ParticipantClaim, ParticipantId, StateGeneration,
};

/// A precondition that did not hold. Recoverable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
pub enum Rejection {
    /// A leader may only be installed under a strictly greater term
    #[error("term {proposed} does not advance plan term {current}")]
    TermNotIncreasing {
        /// Term in the plan
        current: LogTerm,
        /// Term the action asked for
        proposed: LogTerm,
    },

    /// The claimed identity fails health validation
    #[error("leader claim {claim} is not valid against health")]
    InvalidLeaderClaim {
        /// Rejected claim
        claim: ParticipantClaim,
    },

    /// The leader cannot be evicted before leadership moved elsewhere
    #[error("participant {participant} is the current leader")]
    ParticipantIsLeader {
        /// Leader that was asked to leave
        participant: ParticipantId,
    },

    /// Eviction would shrink the log below its replication floor
    #[error("evicting would leave {remaining} participants, minimum is {minimum}")]
    BelowReplicationFactor {
        /// Participants left after the eviction
        remaining: usize,
        /// Configured floor
        minimum: usize,
    },

    /// A participant reported a term that was never planned
    #[error("participant {participant} reported term {reported} ahead of plan term {plan}")]
    FutureTerm {
        /// Reporting participant
        participant: ParticipantId,
        /// Reported term
        reported: LogTerm,
        /// Plan term
        plan: LogTerm,
    },

    /// A participant reported a snapshot for a generation that was never planned
    #[error(
        "participant {participant} reported snapshot generation {reported} ahead of target {target}"
    )]
    FutureGeneration {
        /// Reporting participant
        participant: ParticipantId,
        /// Reported generation
        reported: StateGeneration,
        /// Target generation
        target: StateGeneration,
    },

    /// A configuration acknowledgment for something other than the pending
    /// generation under the current term
    #[error(
        "commit of generation {} in term {} by {participant} is not for the pending configuration",
        .commit.generation,
        .commit.term
    )]
    StaleConfigCommit {
        /// Acknowledging participant
        participant: ParticipantId,
        /// The acknowledgment
        commit: ConfigCommit,
    },

    /// The plan term cannot be bumped any further
    #[error("plan term {term} is exhausted")]
    TermExhausted {
        /// Plan term
        term: LogTerm,
    },

    /// The target generation cannot be bumped any further
    #[error("target generation {generation} is exhausted")]
    GenerationExhausted {
        /// Target generation
        generation: StateGeneration,
    },

    /// The leader was asked to leave but no other participant is healthy
    #[error("no healthy participant can take over from killed leader {killed}")]
    NoHealthyCandidate {
        /// Leader named by the kill request
        killed: ParticipantId,
    },

    /// Nothing is waiting to be activated
    #[error("no generation is pending, active generation is {active}")]
    NoPendingGeneration {
        /// Active generation
        active: StateGeneration,
    },

    /// The proposed generation is not the pending one
    #[error("generation {proposed} is not the pending generation {pending}")]
    GenerationMismatch {
        /// Generation the action asked for
        proposed: StateGeneration,
        /// Pending generation
        pending: StateGeneration,
    },

    /// Not enough acknowledgments to advance
    #[error("quorum not met: required {required}, got {actual}")]
    QuorumNotMet {
        /// Strict majority of plan participants
        required: usize,
        /// Distinct acknowledgments under the current term
        actual: usize,
    },
}

impl Rejection {
    /// Stable diagnostic code
    pub fn code(&self) -> &'static str {
        match self {
            Rejection::TermNotIncreasing { .. } => "supervision_term_not_increasing",
            Rejection::InvalidLeaderClaim { .. } => "supervision_invalid_leader_claim",
            Rejection::ParticipantIsLeader { .. } => "supervision_participant_is_leader",
            Rejection::BelowReplicationFactor { .. } => "supervision_below_replication_factor",
            Rejection::FutureTerm { .. } => "supervision_future_term",
            Rejection::FutureGeneration { .. } => "supervision_future_generation",
            Rejection::StaleConfigCommit { .. } => "supervision_stale_config_commit",
            Rejection::TermExhausted { .. } => "supervision_term_exhausted",
            Rejection::GenerationExhausted { .. } => "supervision_generation_exhausted",
            Rejection::NoHealthyCandidate { .. } => "supervision_no_healthy_candidate",
            Rejection::NoPendingGeneration { .. } => "supervision_no_pending_generation",
            Rejection::GenerationMismatch { .. } => "supervision_generation_mismatch",
            Rejection::QuorumNotMet { .. } => "supervision_quorum_not_met",
        }
    }
}

/// Inconsistent state or event. Not recoverable by retrying.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
pub enum MalformedInput {
    /// An event or action names a server the plan does not know
    #[error("unknown participant {participant}")]
    UnknownParticipant {
        /// The unknown server
        participant: ParticipantId,
    },

    /// The plan leader is not one of the plan participants
    #[error("leader {leader} is not a plan participant")]
    LeaderNotInPlan {
        /// Recorded leader
        leader: ParticipantClaim,
    },

    /// Current or state progress tracks a server the plan does not know
    #[error("progress is tracked for unknown participant {participant}")]
    ReportForUnknownParticipant {
        /// The unknown server
        participant: ParticipantId,
    },

    /// Current holds a term the plan never installed
    #[error("participant {participant} holds term {reported} ahead of plan term {plan}")]
    TermReportAhead {
        /// Reporting participant
        participant: ParticipantId,
        /// Recorded term
        reported: LogTerm,
        /// Plan term
        plan: LogTerm,
    },

    /// Active generation ahead of target generation
    #[error("active generation {active} is ahead of target generation {target}")]
    GenerationInverted {
        /// Active generation
        active: StateGeneration,
        /// Target generation
        target: StateGeneration,
    },

    /// The replication floor must be at least one
    #[error("minimum replication factor must be at least 1, got {factor}")]
    InvalidReplicationFactor {
        /// Configured floor
        factor: usize,
    },
}

impl MalformedInput {
    /// Stable diagnostic code
    pub fn code(&self) -> &'static str {
        match self {
            MalformedInput::UnknownParticipant { .. } => "supervision_unknown_participant",
            MalformedInput::LeaderNotInPlan { .. } => "supervision_leader_not_in_plan",
            MalformedInput::ReportForUnknownParticipant { .. } => {
                "supervision_report_for_unknown_participant"
            }
            MalformedInput::TermReportAhead { .. } => "supervision_term_report_ahead",
            MalformedInput::GenerationInverted { .. } => "supervision_generation_inverted",
            MalformedInput::InvalidReplicationFactor { .. } => {
                "supervision_invalid_replication_factor"
            }
        }
    }
}

/// Error returned by actions and decision steps
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
pub enum SupervisionError {
    /// Precondition failed, nothing changed
    #[error("rejected: {0}")]
    Rejected(#[from] Rejection),

    /// Inconsistent input
    #[error("malformed input: {0}")]
    Malformed(#[from] MalformedInput),
}

impl SupervisionError {
    /// Whether retrying with refreshed facts can succeed
    pub fn is_recoverable(&self) -> bool {
        matches!(self, SupervisionError::Rejected(_))
    }

    /// Stable diagnostic code
    pub fn code(&self) -> &'static str {
        match self {
            SupervisionError::Rejected(rejection) => rejection.code(),
            SupervisionError::Malformed(malformed) => malformed.code(),
        }
    }

    /// The rejection, if this is one
    pub fn rejection(&self) -> Option<&Rejection> {
        match self {
            SupervisionError::Rejected(rejection) => Some(rejection),
            SupervisionError::Malformed(_) => None,
        }
    }
}

/// Result type of the supervision engine
pub type SupervisionResult<T> = std::result::Result<T, SupervisionError>;

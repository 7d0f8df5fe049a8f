//! Supervision decision steps
//!
//! Two cooperating decision functions, one per layer:
//!
//! - [`log_step`] keeps a health-valid leader installed. Replacing a leader
//!   always bumps the term, which fences the previous leader.
//! - [`state_step`] activates the pending state generation once a strict
//!   majority of plan participants acknowledged it under the current term.
//!
//! ## Design Principles
//! 1. Pure functions: `fn(state, event) -> Decision`
//! 2. No side effects: all I/O happens in the calling layer
//! 3. Deterministic: same inputs always produce same outputs
//! 4. At most one corrective action per step

use serde::{Deserialize, Serialize};
use std::fmt;

use replog_core::{AgencyState, LogTerm, ParticipantClaim, ParticipantId, StateGeneration};

use super::actions::{evict_participant, SupervisionAction};
use super::validation::{check_well_formed, healthy_claim, is_claim_valid, require_participant};
use crate::errors::{Rejection, SupervisionResult};

/// An externally observed fact handed to a decision step.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SupervisionEvent {
    /// An operator asked for `participant` to be taken out of the log
    KillServer {
        /// Server to remove
        participant: ParticipantId,
    },
    /// A participant reported the term it considers active
    ReportTerm {
        /// Reporting participant
        participant: ParticipantId,
        /// Reported term
        term: LogTerm,
    },
    /// A participant finished a snapshot transfer
    SnapshotComplete {
        /// Reporting participant
        participant: ParticipantId,
        /// Generation of the snapshot
        generation: StateGeneration,
    },
    /// A participant acknowledged a configuration
    CommitConfig {
        /// Acknowledging participant
        participant: ParticipantId,
        /// Acknowledged generation
        generation: StateGeneration,
        /// Term of the acknowledgment
        term: LogTerm,
    },
}

impl SupervisionEvent {
    /// The catalog action recording this event, for report-style events
    pub fn report_action(&self) -> Option<SupervisionAction> {
        match self {
            SupervisionEvent::KillServer { .. } => None,
            SupervisionEvent::ReportTerm { participant, term } => {
                Some(SupervisionAction::ReportTerm {
                    participant: participant.clone(),
                    term: *term,
                })
            }
            SupervisionEvent::SnapshotComplete {
                participant,
                generation,
            } => Some(SupervisionAction::ReportSnapshotComplete {
                participant: participant.clone(),
                generation: *generation,
            }),
            SupervisionEvent::CommitConfig {
                participant,
                generation,
                term,
            } => Some(SupervisionAction::CommitConfig {
                participant: participant.clone(),
                generation: *generation,
                term: *term,
            }),
        }
    }

    /// Whether the log-level step consumes this event
    pub fn is_log_event(&self) -> bool {
        matches!(
            self,
            SupervisionEvent::KillServer { .. } | SupervisionEvent::ReportTerm { .. }
        )
    }

    /// Whether the state-level step consumes this event
    pub fn is_state_event(&self) -> bool {
        !self.is_log_event()
    }

    /// Participant the event is about
    pub fn participant(&self) -> &ParticipantId {
        match self {
            SupervisionEvent::KillServer { participant }
            | SupervisionEvent::ReportTerm { participant, .. }
            | SupervisionEvent::SnapshotComplete { participant, .. }
            | SupervisionEvent::CommitConfig { participant, .. } => participant,
        }
    }
}

impl fmt::Display for SupervisionEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SupervisionEvent::KillServer { participant } => write!(f, "KillServer({participant})"),
            other => match other.report_action() {
                Some(action) => write!(f, "{action}"),
                None => write!(f, "{other:?}"),
            },
        }
    }
}

/// Result of one decision step.
///
/// `report` records the incoming fact and is applied first; `action` is the
/// corrective decision taken on the state after the report. Both are applied
/// together by the caller in a single conditional write.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Decision {
    /// Recorded fact, if the event was a report
    pub report: Option<SupervisionAction>,
    /// Corrective action, if the layer has not converged
    pub action: Option<SupervisionAction>,
}

impl Decision {
    /// Nothing to record and nothing to do
    pub fn none() -> Self {
        Self::default()
    }

    /// Whether the step produced no corrective action
    pub fn is_converged(&self) -> bool {
        self.action.is_none()
    }

    /// Report and action, in application order
    pub fn actions(&self) -> impl Iterator<Item = &SupervisionAction> {
        self.report.iter().chain(self.action.iter())
    }

    /// Apply report and action to `state`
    pub fn apply(&self, state: &AgencyState) -> SupervisionResult<AgencyState> {
        let mut next = state.clone();
        for action in self.actions() {
            next = action.apply(&next)?;
        }
        Ok(next)
    }
}

/// Pick the participant to promote.
///
/// Among health-valid plan participants other than `excluded`, choose the one
/// with the highest reported term; participants that never reported rank
/// lowest. Ties go to the lexicographically smallest participant id.
pub fn select_leader_candidate(
    state: &AgencyState,
    excluded: Option<&ParticipantId>,
) -> Option<ParticipantClaim> {
    state
        .plan
        .participants
        .iter()
        .filter(|participant| Some(*participant) != excluded)
        .filter_map(|participant| healthy_claim(participant, &state.health))
        .max_by(|a, b| {
            let term_a = state.current.reported_term(&a.participant);
            let term_b = state.current.reported_term(&b.participant);
            term_a
                .cmp(&term_b)
                .then_with(|| b.participant.cmp(&a.participant))
        })
}

/// Record `event` if it is a report this layer consumes.
fn record(
    state: &AgencyState,
    event: Option<&SupervisionEvent>,
    consumes: fn(&SupervisionEvent) -> bool,
) -> SupervisionResult<(Option<SupervisionAction>, AgencyState)> {
    match event.filter(|e| consumes(e)).and_then(SupervisionEvent::report_action) {
        Some(report) => {
            let observed = report.apply(state)?;
            Ok((Some(report), observed))
        }
        None => Ok((None, state.clone())),
    }
}

/// Log-level decision.
///
/// 1. If the leader is killed or fails health validation, or no leader is
///    assigned, promote the best candidate under `term + 1`.
/// 2. Otherwise, if a non-leader is killed, evict it.
/// 3. Otherwise the log has converged.
///
/// When no participant is healthy the step returns no action; the log stays
/// blocked until health recovers. A kill request for the leader is rejected
/// with [`Rejection::NoHealthyCandidate`] in that case so the caller keeps it.
pub fn log_step(
    state: &AgencyState,
    event: Option<&SupervisionEvent>,
) -> SupervisionResult<Decision> {
    check_well_formed(state)?;

    let (report, observed) = record(state, event, SupervisionEvent::is_log_event)?;

    let killed = match event {
        Some(SupervisionEvent::KillServer { participant }) => {
            require_participant(&observed, participant)?;
            Some(participant)
        }
        _ => None,
    };

    let leader_usable = observed.plan.leader.as_ref().is_some_and(|leader| {
        is_claim_valid(leader, &observed.health) && Some(&leader.participant) != killed
    });

    if !leader_usable {
        let Some(candidate) = select_leader_candidate(&observed, killed) else {
            // A kill request for the leader stays pending until someone can
            // take over
            if let Some(participant) = killed.filter(|p| observed.plan.is_leader(p)) {
                return Err(Rejection::NoHealthyCandidate {
                    killed: participant.clone(),
                }
                .into());
            }
            return Ok(Decision {
                report,
                action: None,
            });
        };
        let term = observed
            .plan
            .term
            .checked_next()
            .ok_or(Rejection::TermExhausted {
                term: observed.plan.term,
            })?;
        return Ok(Decision {
            report,
            action: Some(SupervisionAction::AssignLeader {
                participant: candidate.participant,
                reboot_id: candidate.reboot_id,
                term,
            }),
        });
    }

    if let Some(participant) = killed {
        // Surface replication-floor rejections to the caller
        evict_participant(&observed, participant)?;
        return Ok(Decision {
            report,
            action: Some(SupervisionAction::EvictParticipant {
                participant: participant.clone(),
            }),
        });
    }

    Ok(Decision {
        report,
        action: None,
    })
}

/// State-level decision.
///
/// Records a snapshot or commit report, then activates the pending
/// generation if a strict majority of plan participants acknowledged it under
/// the current term.
pub fn state_step(
    state: &AgencyState,
    event: Option<&SupervisionEvent>,
) -> SupervisionResult<Decision> {
    check_well_formed(state)?;

    let (report, observed) = record(state, event, SupervisionEvent::is_state_event)?;

    let action = observed
        .state_plan
        .pending_generation()
        .filter(|_| observed.pending_quorum_met())
        .map(|generation| SupervisionAction::AdvanceGeneration { generation });

    Ok(Decision { report, action })
}

//! Transitions of the explored system
//!
//! A state of the explored system is one [`AgencyState`]. It changes through
//! supervision decisions (the engine under test), participant reports, and
//! the environment: failures, reboots and operator reconfiguration.

use serde::{Deserialize, Serialize};
use std::fmt;

use replog_core::{AgencyState, ParticipantId};
use replog_supervision::core::actions::add_participant;
use replog_supervision::{
    log_step, state_step, SupervisionAction, SupervisionEvent, SupervisionResult,
};

use crate::config::ExplorationConfig;

/// One step of the explored system.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AgencyTransition {
    /// The log-level step acted, optionally on a kill request
    SupervisionLog {
        /// Server a kill request was pending for
        kill: Option<ParticipantId>,
        /// Decided action
        action: SupervisionAction,
    },
    /// The state-level step advanced the generation
    SupervisionState {
        /// Decided action
        action: SupervisionAction,
    },
    /// A participant reported progress
    ParticipantReport {
        /// Recorded report
        report: SupervisionAction,
    },
    /// Health marks a server failed
    FailServer {
        /// Failed server
        participant: ParticipantId,
    },
    /// A server restarted under a new reboot id
    RebootServer {
        /// Restarted server
        participant: ParticipantId,
    },
    /// An operator added a spare server to the log
    OperatorAdd {
        /// Added server
        participant: ParticipantId,
    },
}

impl AgencyTransition {
    /// Apply the transition to `state`
    pub fn apply(&self, state: &AgencyState) -> SupervisionResult<AgencyState> {
        match self {
            AgencyTransition::SupervisionLog { action, .. }
            | AgencyTransition::SupervisionState { action }
            | AgencyTransition::ParticipantReport { report: action } => action.apply(state),
            AgencyTransition::FailServer { participant } => {
                let mut next = state.clone();
                next.health.mark_failed(participant);
                Ok(next)
            }
            AgencyTransition::RebootServer { participant } => {
                let mut next = state.clone();
                next.health.reboot(participant);
                Ok(next)
            }
            AgencyTransition::OperatorAdd { participant } => add_participant(state, participant),
        }
    }

    /// The supervision action taken, if this is a supervision or report step
    pub fn action(&self) -> Option<&SupervisionAction> {
        match self {
            AgencyTransition::SupervisionLog { action, .. }
            | AgencyTransition::SupervisionState { action }
            | AgencyTransition::ParticipantReport { report: action } => Some(action),
            _ => None,
        }
    }

    /// Whether the engine under test chose this transition
    pub fn is_supervision(&self) -> bool {
        matches!(
            self,
            AgencyTransition::SupervisionLog { .. } | AgencyTransition::SupervisionState { .. }
        )
    }
}

impl fmt::Display for AgencyTransition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AgencyTransition::SupervisionLog { kill: None, action } => {
                write!(f, "Supervision: {action}")
            }
            AgencyTransition::SupervisionLog {
                kill: Some(killed),
                action,
            } => write!(f, "Supervision on KillServer({killed}): {action}"),
            AgencyTransition::SupervisionState { action } => write!(f, "Supervision: {action}"),
            AgencyTransition::ParticipantReport { report } => write!(f, "Report: {report}"),
            AgencyTransition::FailServer { participant } => write!(f, "FailServer({participant})"),
            AgencyTransition::RebootServer { participant } => {
                write!(f, "RebootServer({participant})")
            }
            AgencyTransition::OperatorAdd { participant } => write!(f, "OperatorAdd({participant})"),
        }
    }
}

/// All transitions enabled at `state`, in a deterministic order.
///
/// Participant reports are only enabled for healthy servers and only carry
/// facts a participant could actually observe: it reports the plan term once
/// a leader is installed, finishes the snapshot of the target generation, and
/// acknowledges that generation after both. Failures are only enabled while
/// the server can still reboot within `max_reboot_id`, so every failure is
/// recoverable.
pub fn enumerate_transitions(
    state: &AgencyState,
    config: &ExplorationConfig,
) -> Vec<AgencyTransition> {
    let mut transitions = Vec::new();
    supervision_transitions(state, config, &mut transitions);
    report_transitions(state, &mut transitions);
    environment_transitions(state, config, &mut transitions);
    transitions
}

fn supervision_transitions(
    state: &AgencyState,
    config: &ExplorationConfig,
    out: &mut Vec<AgencyTransition>,
) {
    if let Ok(decision) = log_step(state, None) {
        if let Some(action) = decision.action {
            out.push(AgencyTransition::SupervisionLog { kill: None, action });
        }
    }

    if config.kill_requests {
        for participant in &state.plan.participants {
            let event = SupervisionEvent::KillServer {
                participant: participant.clone(),
            };
            // Rejected kills leave the log unchanged
            if let Ok(decision) = log_step(state, Some(&event)) {
                if let Some(action) = decision.action {
                    let transition = AgencyTransition::SupervisionLog {
                        kill: Some(participant.clone()),
                        action,
                    };
                    if !out.contains(&transition) {
                        out.push(transition);
                    }
                }
            }
        }
    }

    if let Ok(decision) = state_step(state, None) {
        if let Some(action) = decision.action {
            out.push(AgencyTransition::SupervisionState { action });
        }
    }
}

fn report_transitions(state: &AgencyState, out: &mut Vec<AgencyTransition>) {
    let term = state.plan.term;
    let has_leader = state.plan.leader.is_some();
    let pending = state.state_plan.pending_generation();

    for participant in &state.plan.participants {
        let healthy = state
            .health
            .record(participant)
            .is_some_and(|record| !record.failed);
        if !healthy {
            continue;
        }

        let reported = state.current.reported_term(participant);
        if has_leader && reported < Some(term) {
            out.push(AgencyTransition::ParticipantReport {
                report: SupervisionAction::ReportTerm {
                    participant: participant.clone(),
                    term,
                },
            });
        }

        let Some(generation) = pending else {
            continue;
        };
        let snapshot = state.state_current.snapshot_generation(participant);
        if snapshot < Some(generation) {
            out.push(AgencyTransition::ParticipantReport {
                report: SupervisionAction::ReportSnapshotComplete {
                    participant: participant.clone(),
                    generation,
                },
            });
        } else if has_leader && reported == Some(term) {
            let acknowledged = state
                .state_current
                .commits
                .get(participant)
                .is_some_and(|commit| commit.generation == generation && commit.term == term);
            if !acknowledged {
                out.push(AgencyTransition::ParticipantReport {
                    report: SupervisionAction::CommitConfig {
                        participant: participant.clone(),
                        generation,
                        term,
                    },
                });
            }
        }
    }
}

fn environment_transitions(
    state: &AgencyState,
    config: &ExplorationConfig,
    out: &mut Vec<AgencyTransition>,
) {
    for (participant, record) in state.health.iter() {
        let can_reboot = record.reboot_id.value() < config.max_reboot_id;
        if record.failed {
            if can_reboot {
                out.push(AgencyTransition::RebootServer {
                    participant: participant.clone(),
                });
            }
        } else if can_reboot {
            out.push(AgencyTransition::FailServer {
                participant: participant.clone(),
            });
        }
    }

    if state.state_plan.target_generation.value() < config.max_generation {
        for spare in &config.spare_participants {
            if !state.plan.contains(spare) && state.health.record(spare).is_some() {
                out.push(AgencyTransition::OperatorAdd {
                    participant: spare.clone(),
                });
            }
        }
    }
}

//! Builder for agency states
//!
//! Used by tests and by the exploration harness to set up arbitrary, including
//! adversarial, combinations of plan, reports and health.

use super::{AgencyState, ConfigCommit, LogCurrent, LogPlan, StateCurrent, StatePlan};
use crate::health::{HealthRecord, ParticipantsHealth};
use crate::types::{
    LogId, LogTerm, ParticipantClaim, ParticipantId, RebootId, StateGeneration,
};

#[derive(Debug, Clone)]
enum LeaderChoice {
    /// Resolve the reboot id from health when building
    Named(ParticipantId),
    /// Use exactly this claim
    Claim(ParticipantClaim),
}

/// Fluent constructor for [`AgencyState`].
///
/// Every participant starts healthy with reboot id 1. The log starts at
/// term 0 without a leader and with generation 1 active.
#[derive(Debug, Clone)]
pub struct AgencyStateBuilder {
    plan: LogPlan,
    current: LogCurrent,
    state_plan: StatePlan,
    state_current: StateCurrent,
    health: ParticipantsHealth,
    leader: Option<LeaderChoice>,
}

impl AgencyStateBuilder {
    /// Start from a set of healthy participants
    pub fn new<I, P>(participants: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<ParticipantId>,
    {
        let participants: Vec<ParticipantId> = participants.into_iter().map(Into::into).collect();
        let health = participants
            .iter()
            .map(|p| (p.clone(), HealthRecord::healthy(RebootId::new(1))))
            .collect();

        Self {
            plan: LogPlan::new(LogId::new(1), participants, 1),
            current: LogCurrent::default(),
            state_plan: StatePlan::converged(StateGeneration::new(1)),
            state_current: StateCurrent::default(),
            health,
            leader: None,
        }
    }

    /// Continue from an existing state
    pub fn from_state(state: &AgencyState) -> Self {
        Self {
            plan: state.plan.clone(),
            current: state.current.clone(),
            state_plan: state.state_plan,
            state_current: state.state_current.clone(),
            health: state.health.clone(),
            leader: state.plan.leader.clone().map(LeaderChoice::Claim),
        }
    }

    /// Set the log identifier
    pub fn log_id(mut self, id: LogId) -> Self {
        self.plan.id = id;
        self
    }

    /// Set the plan term
    pub fn term(mut self, term: LogTerm) -> Self {
        self.plan.term = term;
        self
    }

    /// Designate `participant` as leader under its current reboot id
    pub fn leader(mut self, participant: impl Into<ParticipantId>) -> Self {
        self.leader = Some(LeaderChoice::Named(participant.into()));
        self
    }

    /// Designate an explicit leader claim, which may be stale
    pub fn leader_claim(mut self, claim: ParticipantClaim) -> Self {
        self.leader = Some(LeaderChoice::Claim(claim));
        self
    }

    /// Set the minimum replication factor
    pub fn min_replication_factor(mut self, factor: usize) -> Self {
        self.plan.min_replication_factor = factor;
        self
    }

    /// Mark `participant` failed in health
    pub fn failed(mut self, participant: impl Into<ParticipantId>) -> Self {
        let participant = participant.into();
        let reboot_id = self.reboot_id_of(&participant);
        self.health.update(participant, HealthRecord::failed(reboot_id));
        self
    }

    /// Set the reboot id health reports for `participant`
    pub fn reboot_id(mut self, participant: impl Into<ParticipantId>, reboot_id: RebootId) -> Self {
        let participant = participant.into();
        let failed = self
            .health
            .record(&participant)
            .is_some_and(|record| record.failed);
        self.health
            .update(participant, HealthRecord { reboot_id, failed });
        self
    }

    /// Add or replace a raw health record, e.g. for a spare server
    pub fn health(mut self, participant: impl Into<ParticipantId>, record: HealthRecord) -> Self {
        self.health.update(participant.into(), record);
        self
    }

    /// Remove every health record for `participant`
    pub fn without_health(mut self, participant: impl Into<ParticipantId>) -> Self {
        let participant = participant.into();
        self.health = self
            .health
            .iter()
            .filter(|(p, _)| **p != participant)
            .map(|(p, r)| (p.clone(), *r))
            .collect();
        self
    }

    /// Record a term report from `participant`
    pub fn reported_term(mut self, participant: impl Into<ParticipantId>, term: LogTerm) -> Self {
        self.current.record_term(participant.into(), term);
        self
    }

    /// Set the active and target generations
    pub fn generations(mut self, active: StateGeneration, target: StateGeneration) -> Self {
        self.state_plan = StatePlan {
            active_generation: active,
            target_generation: target,
        };
        self
    }

    /// Record a completed snapshot of `participant`
    pub fn snapshot(
        mut self,
        participant: impl Into<ParticipantId>,
        generation: StateGeneration,
    ) -> Self {
        self.state_current
            .record_snapshot(participant.into(), generation);
        self
    }

    /// Record a configuration acknowledgment of `participant`
    pub fn commit(
        mut self,
        participant: impl Into<ParticipantId>,
        generation: StateGeneration,
        term: LogTerm,
    ) -> Self {
        self.state_current
            .commits
            .insert(participant.into(), ConfigCommit { generation, term });
        self
    }

    /// Finish building
    pub fn build(self) -> AgencyState {
        let leader = match &self.leader {
            Some(LeaderChoice::Named(participant)) => Some(ParticipantClaim::new(
                participant.clone(),
                self.reboot_id_of(participant),
            )),
            Some(LeaderChoice::Claim(claim)) => Some(claim.clone()),
            None => None,
        };

        AgencyState {
            plan: LogPlan {
                leader,
                ..self.plan
            },
            current: self.current,
            state_plan: self.state_plan,
            state_current: self.state_current,
            health: self.health,
        }
    }

    fn reboot_id_of(&self, participant: &ParticipantId) -> RebootId {
        self.health
            .record(participant)
            .map(|record| record.reboot_id)
            .unwrap_or_default()
    }
}

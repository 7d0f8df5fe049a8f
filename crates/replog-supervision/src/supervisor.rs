//! Supervisor control cycle
//!
//! One cycle reads a log's agency state, runs the log-level and state-level
//! decision steps, and writes the result back conditioned on the version it
//! read. A conflicting write means another cycle got there first; the cycle
//! then re-reads and recomputes, which is safe because the decision steps are
//! pure.
//!
//! Cycles hold no state between calls, so many logs can be supervised in
//! parallel without locking inside the engine.

use tracing::{debug, info, warn};

use replog_core::{
    AgencyState, LogCurrent, LogId, LogPlan, ParticipantId, ParticipantsHealth, StateCurrent,
    StateGeneration, StatePlan, SupervisionConfig,
};

use crate::agency::{AgencyStore, AgencyVersion, StoreError};
use crate::core::{log_step, state_step, SupervisionAction, SupervisionEvent};
use crate::errors::{Rejection, SupervisionError, SupervisionResult};

/// Errors surfaced by a control cycle
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SupervisorError {
    /// The engine found the state or event malformed
    #[error(transparent)]
    Supervision(#[from] SupervisionError),

    /// The agency store failed
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Actions chosen by one cycle and the state they lead to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CyclePlan {
    /// Actions in application order
    pub actions: Vec<SupervisionAction>,
    /// State after applying every action
    pub next: AgencyState,
}

impl CyclePlan {
    /// Whether the cycle has nothing to write
    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }
}

/// What a control cycle did
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CycleOutcome {
    /// Nothing to do at `version`
    Converged {
        /// Version that was read
        version: AgencyVersion,
    },
    /// Actions written, producing `version`
    Applied {
        /// Applied actions in order
        actions: Vec<SupervisionAction>,
        /// Version after the write
        version: AgencyVersion,
    },
    /// A precondition failed; retry on a later cycle with fresh facts
    Blocked {
        /// Why no action was taken
        rejection: Rejection,
    },
}

/// Run both decision steps on `state` and collect the resulting actions.
///
/// The log step runs first; the state step then decides on the state the
/// log step leads to, so a leadership change in the same cycle invalidates
/// acknowledgments made under the old term.
pub fn plan_cycle(
    state: &AgencyState,
    event: Option<&SupervisionEvent>,
) -> SupervisionResult<CyclePlan> {
    let log_decision = log_step(state, event)?;
    let after_log = log_decision.apply(state)?;

    let state_decision = state_step(&after_log, event)?;
    let next = state_decision.apply(&after_log)?;

    let actions = log_decision
        .actions()
        .chain(state_decision.actions())
        .cloned()
        .collect();

    Ok(CyclePlan { actions, next })
}

/// Drives decision cycles against an agency store.
#[derive(Debug)]
pub struct Supervisor<S> {
    store: S,
    config: SupervisionConfig,
}

impl<S: AgencyStore> Supervisor<S> {
    /// Create a supervisor over `store`
    pub fn new(store: S, config: SupervisionConfig) -> Self {
        Self { store, config }
    }

    /// The underlying store
    pub fn store(&self) -> &S {
        &self.store
    }

    /// The active configuration
    pub fn config(&self) -> &SupervisionConfig {
        &self.config
    }

    /// Establish a new log with the configured replication floor.
    ///
    /// The log starts leaderless at term 0 with generation 1 active; the
    /// first cycle installs a leader.
    pub async fn establish(
        &self,
        id: LogId,
        participants: impl IntoIterator<Item = ParticipantId> + Send,
        health: ParticipantsHealth,
    ) -> Result<AgencyVersion, SupervisorError> {
        let state = AgencyState {
            plan: LogPlan::new(id, participants, self.config.default_min_replication_factor),
            current: LogCurrent::default(),
            state_plan: StatePlan::converged(StateGeneration::new(1)),
            state_current: StateCurrent::default(),
            health,
        };
        crate::core::check_well_formed(&state).map_err(SupervisionError::from)?;

        let version = self.store.create(state).await?;
        info!(log_id = %id, version = %version, "Established replicated log");
        Ok(version)
    }

    /// Remove a decommissioned log from the agency
    pub async fn decommission(&self, id: LogId) -> Result<(), SupervisorError> {
        self.store.decommission(id).await?;
        info!(log_id = %id, "Decommissioned replicated log");
        Ok(())
    }

    /// Write `plan` if the log is still at `expected`.
    pub async fn commit(
        &self,
        expected: AgencyVersion,
        plan: CyclePlan,
    ) -> Result<AgencyVersion, StoreError> {
        let log_id = plan.next.log_id();
        let version = self.store.compare_and_swap(expected, plan.next).await?;
        for action in &plan.actions {
            match action {
                SupervisionAction::AssignLeader { .. }
                | SupervisionAction::EvictParticipant { .. }
                | SupervisionAction::AddParticipant { .. }
                | SupervisionAction::AdvanceGeneration { .. } => {
                    info!(log_id = %log_id, version = %version, action = %action, "Applied supervision action");
                }
                _ => {
                    debug!(log_id = %log_id, version = %version, action = %action, "Recorded report");
                }
            }
        }
        Ok(version)
    }

    /// Run one decision cycle for `log`, optionally with a pending event.
    pub async fn run_cycle(
        &self,
        log: LogId,
        event: Option<&SupervisionEvent>,
    ) -> Result<CycleOutcome, SupervisorError> {
        let mut conflicts = 0u32;

        loop {
            let snapshot = self.store.read(log).await?;

            let plan = match plan_cycle(&snapshot.value, event) {
                Ok(plan) => plan,
                Err(SupervisionError::Rejected(rejection)) => {
                    warn!(
                        log_id = %log,
                        code = rejection.code(),
                        reason = %rejection,
                        "Supervision decision rejected"
                    );
                    return Ok(CycleOutcome::Blocked { rejection });
                }
                Err(err) => return Err(err.into()),
            };

            if plan.is_empty() {
                debug!(log_id = %log, version = %snapshot.version, "Log converged");
                return Ok(CycleOutcome::Converged {
                    version: snapshot.version,
                });
            }

            let actions = plan.actions.clone();
            match self.commit(snapshot.version, plan).await {
                Ok(version) => return Ok(CycleOutcome::Applied { actions, version }),
                Err(err) if err.is_conflict() && conflicts < self.config.max_conflict_retries => {
                    conflicts += 1;
                    warn!(
                        log_id = %log,
                        attempt = conflicts,
                        error = %err,
                        "Agency changed during cycle, recomputing"
                    );
                }
                Err(err) => return Err(err.into()),
            }
        }
    }
}

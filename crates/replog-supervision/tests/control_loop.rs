//! Control-cycle tests against the in-memory agency
//!
//! Cover the read / decide / conditional-write loop, including concurrent
//! cycles racing on the same log.

use std::sync::atomic::{AtomicBool, Ordering};

use assert_matches::assert_matches;
use async_trait::async_trait;

use replog_core::{
    AgencyState, AgencyStateBuilder, LogId, LogTerm, ParticipantId, ParticipantsHealth, RebootId,
    StateGeneration, SupervisionConfig,
};
use replog_supervision::{
    plan_cycle, AgencyStore, AgencyVersion, CycleOutcome, InMemoryAgency, Rejection, StoreError,
    SupervisionAction, SupervisionEvent, Supervisor, SupervisorError, Versioned,
};

fn participants(names: &[&str]) -> Vec<ParticipantId> {
    names.iter().map(|n| ParticipantId::from(*n)).collect()
}

fn healthy(names: &[&str]) -> ParticipantsHealth {
    names
        .iter()
        .map(|n| {
            (
                ParticipantId::from(*n),
                replog_core::HealthRecord::healthy(RebootId::new(1)),
            )
        })
        .collect()
}

fn kill(participant: &str) -> SupervisionEvent {
    SupervisionEvent::KillServer {
        participant: participant.into(),
    }
}

async fn established(names: &[&str]) -> Supervisor<InMemoryAgency> {
    let supervisor = Supervisor::new(InMemoryAgency::new(), SupervisionConfig::default());
    supervisor
        .establish(LogId::new(1), participants(names), healthy(names))
        .await
        .unwrap();
    supervisor
}

#[tokio::test]
async fn test_first_cycle_installs_leader_then_converges() {
    let supervisor = established(&["A", "B", "C"]).await;

    let outcome = supervisor.run_cycle(LogId::new(1), None).await.unwrap();
    assert_matches!(outcome, CycleOutcome::Applied { ref actions, version } => {
        assert_eq!(version, AgencyVersion(2));
        assert_eq!(actions, &vec![SupervisionAction::AssignLeader {
            participant: "A".into(),
            reboot_id: RebootId::new(1),
            term: LogTerm::new(1),
        }]);
    });

    let outcome = supervisor.run_cycle(LogId::new(1), None).await.unwrap();
    assert_eq!(
        outcome,
        CycleOutcome::Converged {
            version: AgencyVersion(2)
        }
    );
}

#[tokio::test]
async fn test_stale_writer_must_recompute() {
    let supervisor = established(&["A", "B", "C"]).await;
    let log = LogId::new(1);

    // Both cycles read the same version
    let stale = supervisor.store().read(log).await.unwrap();
    let fresh = supervisor.store().read(log).await.unwrap();
    assert_eq!(stale.version, fresh.version);

    let fresh_plan = plan_cycle(&fresh.value, None).unwrap();
    let stale_plan = plan_cycle(&stale.value, Some(&kill("A"))).unwrap();

    supervisor.commit(fresh.version, fresh_plan).await.unwrap();
    let err = supervisor
        .commit(stale.version, stale_plan)
        .await
        .unwrap_err();
    assert_matches!(err, StoreError::Conflict { expected, actual, .. } => {
        assert_eq!(expected, AgencyVersion(1));
        assert_eq!(actual, AgencyVersion(2));
    });

    // Recomputing from the fresh state sees A as leader and replaces it
    let outcome = supervisor.run_cycle(log, Some(&kill("A"))).await.unwrap();
    assert_matches!(outcome, CycleOutcome::Applied { ref actions, .. } => {
        assert_eq!(actions, &vec![SupervisionAction::AssignLeader {
            participant: "B".into(),
            reboot_id: RebootId::new(1),
            term: LogTerm::new(2),
        }]);
    });
}

#[tokio::test]
async fn test_kill_leader_then_evict() {
    let supervisor = established(&["A", "B", "C"]).await;
    let log = LogId::new(1);
    supervisor.run_cycle(log, None).await.unwrap();

    supervisor.run_cycle(log, Some(&kill("A"))).await.unwrap();
    let outcome = supervisor.run_cycle(log, Some(&kill("A"))).await.unwrap();
    assert_matches!(outcome, CycleOutcome::Applied { ref actions, .. } => {
        assert_eq!(actions, &vec![SupervisionAction::EvictParticipant {
            participant: "A".into(),
        }]);
    });

    let state = supervisor.store().read(log).await.unwrap().value;
    assert!(!state.plan.contains(&"A".into()));
    assert_eq!(state.plan.leader.map(|l| l.participant), Some("B".into()));
    assert_eq!(state.plan.term, LogTerm::new(2));
    assert_eq!(state.state_plan.target_generation, StateGeneration::new(2));
}

#[tokio::test]
async fn test_eviction_below_floor_blocks() {
    let supervisor = established(&["A", "B"]).await;
    let log = LogId::new(1);
    supervisor.run_cycle(log, None).await.unwrap();

    let outcome = supervisor.run_cycle(log, Some(&kill("B"))).await.unwrap();
    assert_matches!(
        outcome,
        CycleOutcome::Blocked {
            rejection: Rejection::BelowReplicationFactor { .. }
        }
    );
}

#[tokio::test]
async fn test_kill_leader_without_successor_stays_pending() {
    let supervisor = established(&["A", "B", "C"]).await;
    let log = LogId::new(1);
    supervisor.run_cycle(log, None).await.unwrap();

    let current = supervisor.store().read(log).await.unwrap();
    let followers_down = AgencyStateBuilder::from_state(&current.value)
        .failed("B")
        .failed("C")
        .build();
    let version = supervisor
        .store()
        .compare_and_swap(current.version, followers_down)
        .await
        .unwrap();

    let outcome = supervisor.run_cycle(log, Some(&kill("A"))).await.unwrap();
    assert_eq!(
        outcome,
        CycleOutcome::Blocked {
            rejection: Rejection::NoHealthyCandidate {
                killed: "A".into()
            }
        }
    );
    let blocked = supervisor.store().read(log).await.unwrap();
    assert_eq!(blocked.version, version);
    assert_eq!(
        blocked.value.plan.leader.as_ref().map(|l| l.participant.clone()),
        Some("A".into())
    );

    // Once B is back the same kill request moves leadership
    let mut recovered = blocked.value.clone();
    recovered.health.reboot(&"B".into());
    supervisor
        .store()
        .compare_and_swap(blocked.version, recovered)
        .await
        .unwrap();

    let outcome = supervisor.run_cycle(log, Some(&kill("A"))).await.unwrap();
    assert_matches!(outcome, CycleOutcome::Applied { ref actions, .. } => {
        assert_eq!(actions, &vec![SupervisionAction::AssignLeader {
            participant: "B".into(),
            reboot_id: RebootId::new(2),
            term: LogTerm::new(2),
        }]);
    });
}

#[tokio::test]
async fn test_malformed_event_is_an_error() {
    let supervisor = established(&["A", "B", "C"]).await;
    let err = supervisor
        .run_cycle(LogId::new(1), Some(&kill("Z")))
        .await
        .unwrap_err();
    assert_matches!(err, SupervisorError::Supervision(ref e) if !e.is_recoverable());
}

#[tokio::test]
async fn test_unknown_log() {
    let supervisor = Supervisor::new(InMemoryAgency::new(), SupervisionConfig::default());
    let err = supervisor.run_cycle(LogId::new(9), None).await.unwrap_err();
    assert_eq!(err, SupervisorError::Store(StoreError::NotFound(LogId::new(9))));
}

/// Agency where another writer bumps the log right before our first write.
#[derive(Default)]
struct RacingAgency {
    inner: InMemoryAgency,
    raced: AtomicBool,
}

#[async_trait]
impl AgencyStore for RacingAgency {
    async fn create(&self, state: AgencyState) -> Result<AgencyVersion, StoreError> {
        self.inner.create(state).await
    }

    async fn read(&self, log: LogId) -> Result<Versioned<AgencyState>, StoreError> {
        self.inner.read(log).await
    }

    async fn compare_and_swap(
        &self,
        expected: AgencyVersion,
        state: AgencyState,
    ) -> Result<AgencyVersion, StoreError> {
        if !self.raced.swap(true, Ordering::SeqCst) {
            let current = self.inner.read(state.log_id()).await?;
            let competing = AgencyStateBuilder::from_state(&current.value)
                .failed("A")
                .build();
            self.inner
                .compare_and_swap(current.version, competing)
                .await?;
        }
        self.inner.compare_and_swap(expected, state).await
    }

    async fn decommission(&self, log: LogId) -> Result<(), StoreError> {
        self.inner.decommission(log).await
    }

    async fn logs(&self) -> Vec<LogId> {
        self.inner.logs().await
    }
}

#[tokio::test]
async fn test_conflict_is_retried_on_fresh_state() {
    let supervisor = Supervisor::new(RacingAgency::default(), SupervisionConfig::default());
    let names = ["A", "B", "C"];
    supervisor
        .establish(LogId::new(1), participants(&names), healthy(&names))
        .await
        .unwrap();

    // First attempt would install A; the competing write fails A first
    let outcome = supervisor.run_cycle(LogId::new(1), None).await.unwrap();
    assert_matches!(outcome, CycleOutcome::Applied { ref actions, version } => {
        assert_eq!(version, AgencyVersion(3));
        assert_eq!(actions, &vec![SupervisionAction::AssignLeader {
            participant: "B".into(),
            reboot_id: RebootId::new(1),
            term: LogTerm::new(1),
        }]);
    });
}

#[tokio::test]
async fn test_conflicts_beyond_retry_budget_surface() {
    let config = SupervisionConfig {
        max_conflict_retries: 0,
        ..SupervisionConfig::default()
    };
    let supervisor = Supervisor::new(RacingAgency::default(), config);
    let names = ["A", "B", "C"];
    supervisor
        .establish(LogId::new(1), participants(&names), healthy(&names))
        .await
        .unwrap();

    let err = supervisor.run_cycle(LogId::new(1), None).await.unwrap_err();
    assert_matches!(err, SupervisorError::Store(ref e) if e.is_conflict());
}

#[tokio::test]
async fn test_decommission_removes_log() {
    let supervisor = established(&["A", "B"]).await;
    supervisor.decommission(LogId::new(1)).await.unwrap();
    assert!(supervisor.store().logs().await.is_empty());
}

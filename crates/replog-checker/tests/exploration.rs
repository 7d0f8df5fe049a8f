//! End-to-end explorations from scenario files

use replog_checker::{AgencyTransition, ExplorationConfig, Explorer, Scenario, Violation};
use replog_core::{AgencyStateBuilder, LogTerm, ParticipantId, RebootId, TomlConfig};
use replog_supervision::SupervisionAction;

fn bounded() -> ExplorationConfig {
    ExplorationConfig {
        max_states: 50_000,
        max_reboot_id: 2,
        max_generation: 2,
        ..ExplorationConfig::default()
    }
}

#[test]
fn test_failed_leader_scenario_holds() {
    let scenario = Scenario::from_toml_str(
        r#"
        name = "leader down"
        participants = ["A", "B", "C"]
        min_replication_factor = 2
        term = 5
        leader = "A"
        failed = ["A"]

        [exploration]
        max_states = 50000
        max_reboot_id = 2
        max_generation = 2
        "#,
    )
    .unwrap();

    let report = Explorer::new(scenario.exploration.clone()).explore(scenario.initial_state());
    assert!(report.is_ok(), "{report}");
}

#[test]
fn test_spare_can_join_and_generation_converges() {
    let scenario = Scenario {
        participants: vec!["A".into(), "B".into()],
        exploration: ExplorationConfig {
            spare_participants: vec![ParticipantId::from("C")],
            max_generation: 2,
            kill_requests: false,
            ..bounded()
        },
        ..Scenario::default()
    };

    let report = Explorer::new(scenario.exploration.clone()).explore(scenario.initial_state());
    assert!(report.is_ok(), "{report}");
}

#[test]
fn test_blocked_cluster_is_flagged_with_trace() {
    // Every server is failed and already used its reboot budget
    let initial = AgencyStateBuilder::new(["A", "B"])
        .term(LogTerm::new(5))
        .leader("A")
        .reboot_id("A", RebootId::new(2))
        .reboot_id("B", RebootId::new(2))
        .failed("A")
        .failed("B")
        .build();

    let report = Explorer::new(bounded()).explore(initial);
    let counterexample = report.counterexample.expect("liveness violation");
    assert_eq!(counterexample.violation, Violation::NoEventualLeader);
    assert!(counterexample.to_string().contains("eventual_leadership"));
}

#[test]
fn test_liveness_check_can_be_disabled() {
    let initial = AgencyStateBuilder::new(["A"])
        .reboot_id("A", RebootId::new(2))
        .failed("A")
        .build();
    let config = ExplorationConfig {
        check_liveness: false,
        ..bounded()
    };
    assert!(Explorer::new(config).explore(initial).is_ok());
}

#[test]
fn test_kill_then_evict_is_reachable() {
    let initial = AgencyStateBuilder::new(["A", "B", "C"])
        .term(LogTerm::new(1))
        .leader("A")
        .min_replication_factor(2)
        .build();

    let transitions = replog_checker::enumerate_transitions(&initial, &bounded());
    assert!(transitions.contains(&AgencyTransition::SupervisionLog {
        kill: Some("A".into()),
        action: SupervisionAction::AssignLeader {
            participant: "B".into(),
            reboot_id: RebootId::new(1),
            term: LogTerm::new(2),
        },
    }));
    assert!(transitions.contains(&AgencyTransition::SupervisionLog {
        kill: Some("C".into()),
        action: SupervisionAction::EvictParticipant {
            participant: "C".into(),
        },
    }));
}

fn scenario_path(name: &str) -> std::path::PathBuf {
    std::path::Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("../../scenarios")
        .join(name)
}

#[test]
fn test_bundled_scenarios_load() {
    let healthy = Scenario::load_from_file(&scenario_path("three-servers.toml")).unwrap();
    assert_eq!(healthy.participants.len(), 3);
    assert_eq!(healthy.exploration.spare_participants, vec![ParticipantId::from("D")]);

    let exhausted = Scenario::load_from_file(&scenario_path("single-server-exhausted.toml")).unwrap();
    let report = Explorer::new(exhausted.exploration.clone()).explore(exhausted.initial_state());
    assert_eq!(
        report.counterexample.map(|c| c.violation),
        Some(Violation::NoEventualLeader)
    );

    let document = std::fs::read_to_string(scenario_path("leader-down.json")).unwrap();
    let state = replog_core::AgencyState::from_json(&document).unwrap();
    assert_eq!(state.plan.term, LogTerm::new(5));
}

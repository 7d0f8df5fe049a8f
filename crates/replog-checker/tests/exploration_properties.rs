//! Property tests over random starting clusters
//!
//! - Every enumerated transition is enabled and leads to a well-formed state
//! - Clusters whose failures are all recoverable satisfy every property

use proptest::prelude::*;

use replog_checker::predicates::check_state;
use replog_checker::{enumerate_transitions, ExplorationConfig, Explorer, Scenario};
use replog_core::{AgencyState, ParticipantId};

const SERVERS: [&str; 3] = ["A", "B", "C"];

/// Small clusters with an optional leader and any subset of failed servers.
/// Failed servers start at reboot id 1 and can still restart.
fn scenario() -> impl Strategy<Value = Scenario> {
    (
        1..=SERVERS.len(),
        prop::option::of(0..SERVERS.len()),
        1u64..4,
        prop::collection::vec(any::<bool>(), SERVERS.len()),
    )
        .prop_map(|(size, leader, term, failed)| {
            let participants: Vec<ParticipantId> =
                SERVERS[..size].iter().map(|s| ParticipantId::from(*s)).collect();
            Scenario {
                name: "random".to_string(),
                leader: leader.map(|i| participants[i % size].clone()),
                failed: participants
                    .iter()
                    .zip(&failed)
                    .filter(|(_, failed)| **failed)
                    .map(|(p, _)| p.clone())
                    .collect(),
                participants,
                term,
                exploration: ExplorationConfig {
                    max_states: 3_000,
                    max_generation: 2,
                    ..ExplorationConfig::default()
                },
                ..Scenario::default()
            }
        })
}

fn successors(state: &AgencyState, config: &ExplorationConfig) -> Vec<AgencyState> {
    enumerate_transitions(state, config)
        .iter()
        .map(|transition| {
            transition
                .apply(state)
                .unwrap_or_else(|err| panic!("{transition} not enabled: {err}"))
        })
        .collect()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(24))]

    /// Enumeration only offers transitions that apply cleanly
    #[test]
    fn enumerated_transitions_are_enabled(scenario in scenario()) {
        let initial = scenario.initial_state();
        prop_assert!(check_state(&initial).is_ok());

        for next in successors(&initial, &scenario.exploration) {
            prop_assert!(check_state(&next).is_ok());
            for after in successors(&next, &scenario.exploration) {
                prop_assert!(check_state(&after).is_ok());
            }
        }
    }

    /// Recoverable clusters keep every safety property and always regain a
    /// healthy leader
    #[test]
    fn recoverable_clusters_hold(scenario in scenario()) {
        let report = Explorer::new(scenario.exploration.clone()).explore(scenario.initial_state());
        prop_assert!(report.is_ok(), "{}", report);
    }
}

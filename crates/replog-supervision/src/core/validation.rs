//! Health validation and state well-formedness
//!
//! ## Health validation
//!
//! A claim `(participant, reboot_id)` is valid iff health knows the
//! participant, reports exactly that reboot id, and does not mark it failed.
//! A restarted process presents a new reboot id and is therefore a different,
//! not yet revalidated instance. A participant without a health record is
//! invalid.
//!
//! ## Well-formedness
//!
//! [`check_well_formed`] rejects states that no sequence of actions can
//! produce. Those are surfaced as [`MalformedInput`] rather than repaired.

use replog_core::{AgencyState, HealthRecord, ParticipantClaim, ParticipantId, ParticipantsHealth};

use crate::errors::MalformedInput;

/// Whether `claim` is still the live, non-failed process health knows.
pub fn is_valid(claim: &ParticipantClaim, health: Option<&HealthRecord>) -> bool {
    match health {
        Some(record) => record.reboot_id == claim.reboot_id && !record.failed,
        None => false,
    }
}

/// [`is_valid`] with the record looked up in `health`.
pub fn is_claim_valid(claim: &ParticipantClaim, health: &ParticipantsHealth) -> bool {
    is_valid(claim, health.record(&claim.participant))
}

/// The claim under which `participant` could be promoted right now.
///
/// Returns `None` when health has no record or marks it failed.
pub fn healthy_claim(
    participant: &ParticipantId,
    health: &ParticipantsHealth,
) -> Option<ParticipantClaim> {
    let record = health.record(participant)?;
    let claim = ParticipantClaim::new(participant.clone(), record.reboot_id);
    is_valid(&claim, Some(record)).then_some(claim)
}

/// Whether the plan leader exists and is health-valid.
pub fn leader_is_healthy(state: &AgencyState) -> bool {
    state
        .plan
        .leader
        .as_ref()
        .is_some_and(|leader| is_claim_valid(leader, &state.health))
}

/// Check that `state` is internally consistent.
///
/// This validates:
/// - the replication floor is at least one
/// - the leader, if any, is a plan participant
/// - reports and progress only exist for plan participants
/// - no participant holds a term the plan never installed
/// - the active generation is not ahead of the target
pub fn check_well_formed(state: &AgencyState) -> Result<(), MalformedInput> {
    let plan = &state.plan;

    if plan.min_replication_factor == 0 {
        return Err(MalformedInput::InvalidReplicationFactor {
            factor: plan.min_replication_factor,
        });
    }

    if let Some(leader) = &plan.leader {
        if !plan.contains(&leader.participant) {
            return Err(MalformedInput::LeaderNotInPlan {
                leader: leader.clone(),
            });
        }
    }

    for (participant, reported) in &state.current.reported_terms {
        if !plan.contains(participant) {
            return Err(MalformedInput::ReportForUnknownParticipant {
                participant: participant.clone(),
            });
        }
        if *reported > plan.term {
            return Err(MalformedInput::TermReportAhead {
                participant: participant.clone(),
                reported: *reported,
                plan: plan.term,
            });
        }
    }

    let tracked = state
        .state_current
        .snapshots
        .keys()
        .chain(state.state_current.commits.keys());
    for participant in tracked {
        if !plan.contains(participant) {
            return Err(MalformedInput::ReportForUnknownParticipant {
                participant: participant.clone(),
            });
        }
    }

    let generations = &state.state_plan;
    if generations.active_generation > generations.target_generation {
        return Err(MalformedInput::GenerationInverted {
            active: generations.active_generation,
            target: generations.target_generation,
        });
    }

    Ok(())
}

/// Fail with [`MalformedInput::UnknownParticipant`] unless `participant` is
/// in the plan.
pub fn require_participant(
    state: &AgencyState,
    participant: &ParticipantId,
) -> Result<(), MalformedInput> {
    if state.plan.contains(participant) {
        Ok(())
    } else {
        Err(MalformedInput::UnknownParticipant {
            participant: participant.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use replog_core::{AgencyStateBuilder, LogTerm, RebootId, StateGeneration};

    #[test]
    fn test_valid_claim() {
        let claim = ParticipantClaim::new("A", RebootId::new(1));
        assert!(is_valid(&claim, Some(&HealthRecord::healthy(RebootId::new(1)))));
    }

    #[test]
    fn test_failed_participant_is_invalid() {
        let claim = ParticipantClaim::new("A", RebootId::new(1));
        assert!(!is_valid(&claim, Some(&HealthRecord::failed(RebootId::new(1)))));
    }

    #[test]
    fn test_restarted_participant_is_invalid() {
        let claim = ParticipantClaim::new("A", RebootId::new(1));
        assert!(!is_valid(&claim, Some(&HealthRecord::healthy(RebootId::new(2)))));
    }

    #[test]
    fn test_missing_record_fails_closed() {
        let claim = ParticipantClaim::new("A", RebootId::new(0));
        assert!(!is_valid(&claim, None));

        let state = AgencyStateBuilder::new(["A", "B"]).without_health("A").build();
        assert!(healthy_claim(&"A".into(), &state.health).is_none());
        assert_eq!(
            healthy_claim(&"B".into(), &state.health),
            Some(ParticipantClaim::new("B", RebootId::new(1)))
        );
    }

    #[test]
    fn test_leader_is_healthy() {
        let healthy = AgencyStateBuilder::new(["A", "B"]).leader("A").build();
        assert!(leader_is_healthy(&healthy));

        let stale = AgencyStateBuilder::new(["A", "B"])
            .leader_claim(ParticipantClaim::new("A", RebootId::new(1)))
            .reboot_id("A", RebootId::new(2))
            .build();
        assert!(!leader_is_healthy(&stale));

        let leaderless = AgencyStateBuilder::new(["A"]).build();
        assert!(!leader_is_healthy(&leaderless));
    }

    #[test]
    fn test_well_formed_state() {
        let state = AgencyStateBuilder::new(["A", "B", "C"])
            .term(LogTerm::new(3))
            .leader("A")
            .reported_term("B", LogTerm::new(3))
            .build();
        assert_eq!(check_well_formed(&state), Ok(()));
    }

    #[test]
    fn test_leader_outside_plan_is_malformed() {
        let state = AgencyStateBuilder::new(["A", "B"])
            .leader_claim(ParticipantClaim::new("Z", RebootId::new(1)))
            .build();
        assert!(matches!(
            check_well_formed(&state),
            Err(MalformedInput::LeaderNotInPlan { .. })
        ));
    }

    #[test]
    fn test_term_report_ahead_is_malformed() {
        let state = AgencyStateBuilder::new(["A"])
            .term(LogTerm::new(2))
            .reported_term("A", LogTerm::new(3))
            .build();
        assert!(matches!(
            check_well_formed(&state),
            Err(MalformedInput::TermReportAhead { .. })
        ));
    }

    #[test]
    fn test_progress_for_unknown_participant_is_malformed() {
        let state = AgencyStateBuilder::new(["A"])
            .snapshot("Z", StateGeneration::new(1))
            .build();
        assert!(matches!(
            check_well_formed(&state),
            Err(MalformedInput::ReportForUnknownParticipant { .. })
        ));
    }

    #[test]
    fn test_inverted_generations_are_malformed() {
        let state = AgencyStateBuilder::new(["A"])
            .generations(StateGeneration::new(4), StateGeneration::new(3))
            .build();
        assert!(matches!(
            check_well_formed(&state),
            Err(MalformedInput::GenerationInverted { .. })
        ));
    }
}

//! Counterexample traces

use serde::{Deserialize, Serialize};
use std::fmt;

use replog_core::AgencyState;

use crate::predicates::Violation;
use crate::transitions::AgencyTransition;

/// Individual step in an execution trace.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TraceStep {
    /// Transition taken
    pub transition: AgencyTransition,
    /// State after the transition
    pub state: AgencyState,
}

/// Execution from the initial state to a violation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Trace {
    /// Where the execution starts
    pub initial: AgencyState,
    /// Steps in order
    pub steps: Vec<TraceStep>,
}

impl Trace {
    /// Number of transitions
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    /// Whether the trace has no transitions
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Last state of the trace
    pub fn last_state(&self) -> &AgencyState {
        self.steps
            .last()
            .map(|step| &step.state)
            .unwrap_or(&self.initial)
    }
}

/// Summary line for a state
pub struct StateSummary<'a>(pub &'a AgencyState);

impl fmt::Display for StateSummary<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.0;
        write!(f, "term {}, leader ", state.plan.term)?;
        match &state.plan.leader {
            Some(claim) => write!(f, "{claim}")?,
            None => f.write_str("none")?,
        }

        f.write_str(", participants [")?;
        for (i, participant) in state.plan.participants.iter().enumerate() {
            if i > 0 {
                f.write_str(" ")?;
            }
            write!(f, "{participant}")?;
            match state.health.record(participant) {
                Some(record) if record.failed => write!(f, "@{}!", record.reboot_id)?,
                Some(record) => write!(f, "@{}", record.reboot_id)?,
                None => f.write_str("@?")?,
            }
        }
        write!(
            f,
            "], generation {}/{}",
            state.state_plan.active_generation, state.state_plan.target_generation
        )
    }
}

impl fmt::Display for Trace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "   0. initial          {}", StateSummary(&self.initial))?;
        for (i, step) in self.steps.iter().enumerate() {
            writeln!(f, "{:>4}. {}", i + 1, step.transition)?;
            writeln!(f, "                      {}", StateSummary(&step.state))?;
        }
        Ok(())
    }
}

/// A violated property together with the shortest trace reaching it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CounterExample {
    /// What went wrong
    pub violation: Violation,
    /// How to get there
    pub trace: Trace,
}

impl fmt::Display for CounterExample {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "property {} violated: {}",
            self.violation.property(),
            self.violation
        )?;
        write!(f, "{}", self.trace)
    }
}

//! Bounded exhaustive exploration
//!
//! Breadth-first search over every state reachable from an initial
//! [`AgencyState`] through [`enumerate_transitions`]. Safety properties are
//! checked on every discovered state and every explored edge; because the
//! search is breadth-first the first violation found has a shortest trace.
//!
//! Eventual leadership is checked afterwards by backward reachability: every
//! explored state must be able to reach a state with a health-valid leader.
//! States left unexpanded by the bounds are assumed able to, so truncated
//! explorations never report spurious liveness violations.

use serde::{Deserialize, Serialize};
use std::collections::{HashMap, VecDeque};
use std::fmt;
use tracing::{debug, info, warn};

use replog_core::AgencyState;

use crate::config::ExplorationConfig;
use crate::predicates::{check_edge, check_state, is_leader_healthy, Violation};
use crate::trace::{CounterExample, Trace, TraceStep};
use crate::transitions::{enumerate_transitions, AgencyTransition};

/// Summary of one exploration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExplorationReport {
    /// Distinct states discovered
    pub states: usize,
    /// Edges explored
    pub transitions: usize,
    /// Deepest level expanded
    pub max_depth_reached: usize,
    /// Whether a bound cut the search short
    pub truncated: bool,
    /// First violation found, if any
    pub counterexample: Option<CounterExample>,
}

impl ExplorationReport {
    /// Whether every checked property held
    pub fn is_ok(&self) -> bool {
        self.counterexample.is_none()
    }
}

impl fmt::Display for ExplorationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "explored {} states and {} transitions up to depth {}{}",
            self.states,
            self.transitions,
            self.max_depth_reached,
            if self.truncated { " (truncated)" } else { "" }
        )?;
        match &self.counterexample {
            Some(counterexample) => write!(f, "{counterexample}"),
            None => write!(f, "all properties hold"),
        }
    }
}

/// Discovered state with the edge it was first reached by.
///
/// `expanded` is only set once every successor was recorded.
struct Node {
    state: AgencyState,
    parent: Option<(usize, AgencyTransition)>,
    depth: usize,
    expanded: bool,
}

/// Exhaustive explorer over the supervision engine and its environment.
#[derive(Debug, Clone)]
pub struct Explorer {
    config: ExplorationConfig,
}

impl Explorer {
    /// Create an explorer with `config` bounds
    pub fn new(config: ExplorationConfig) -> Self {
        Self { config }
    }

    /// The exploration bounds
    pub fn config(&self) -> &ExplorationConfig {
        &self.config
    }

    /// Explore everything reachable from `initial`.
    pub fn explore(&self, initial: AgencyState) -> ExplorationReport {
        info!(
            max_states = self.config.max_states,
            max_depth = self.config.max_depth,
            "Starting exploration"
        );

        let mut nodes = vec![Node {
            state: initial.clone(),
            parent: None,
            depth: 0,
            expanded: false,
        }];
        let mut index: HashMap<AgencyState, usize> = HashMap::from([(initial, 0)]);
        let mut successors: Vec<Vec<usize>> = vec![Vec::new()];
        let mut queue = VecDeque::from([0usize]);
        let mut report = ExplorationReport {
            states: 1,
            transitions: 0,
            max_depth_reached: 0,
            truncated: false,
            counterexample: None,
        };

        if let Err(violation) = check_state(&nodes[0].state) {
            report.counterexample = Some(counterexample(&nodes, 0, None, violation));
            return finish(report, nodes.len());
        }

        while let Some(current) = queue.pop_front() {
            let depth = nodes[current].depth;
            if depth >= self.config.max_depth {
                report.truncated = true;
                continue;
            }
            if depth > report.max_depth_reached {
                debug!(depth, states = nodes.len(), "Exploring next level");
                report.max_depth_reached = depth;
            }

            let state = nodes[current].state.clone();
            let mut complete = true;
            for transition in enumerate_transitions(&state, &self.config) {
                let next = match transition.apply(&state) {
                    Ok(next) => next,
                    // Enumerated transitions are enabled by construction
                    Err(err) => {
                        warn!(transition = %transition, error = %err, "Enabled transition failed");
                        continue;
                    }
                };
                report.transitions += 1;

                if let Err(violation) = check_edge(&state, &transition, &next) {
                    report.counterexample = Some(counterexample(
                        &nodes,
                        current,
                        Some(TraceStep {
                            transition,
                            state: next,
                        }),
                        violation,
                    ));
                    return finish(report, nodes.len());
                }

                if let Some(&known) = index.get(&next) {
                    successors[current].push(known);
                    continue;
                }
                if nodes.len() >= self.config.max_states {
                    report.truncated = true;
                    complete = false;
                    continue;
                }

                if let Err(violation) = check_state(&next) {
                    report.counterexample = Some(counterexample(
                        &nodes,
                        current,
                        Some(TraceStep {
                            transition,
                            state: next,
                        }),
                        violation,
                    ));
                    return finish(report, nodes.len());
                }

                let id = nodes.len();
                index.insert(next.clone(), id);
                nodes.push(Node {
                    state: next,
                    parent: Some((current, transition)),
                    depth: depth + 1,
                    expanded: false,
                });
                successors.push(Vec::new());
                successors[current].push(id);
                queue.push_back(id);
            }
            nodes[current].expanded = complete;
        }

        if self.config.check_liveness {
            if let Some(stuck) = first_without_leader_path(&nodes, &successors) {
                report.counterexample = Some(counterexample(
                    &nodes,
                    stuck,
                    None,
                    Violation::NoEventualLeader,
                ));
            }
        }
        finish(report, nodes.len())
    }
}

fn finish(mut report: ExplorationReport, states: usize) -> ExplorationReport {
    report.states = states;
    match &report.counterexample {
        Some(counterexample) => warn!(
            property = counterexample.violation.property(),
            states = report.states,
            trace_len = counterexample.trace.len(),
            "Property violated"
        ),
        None => info!(
            states = report.states,
            transitions = report.transitions,
            truncated = report.truncated,
            "Exploration finished"
        ),
    }
    report
}

/// Rebuild the path from the initial state to `target`, plus an optional
/// final step that was not recorded as a node.
fn counterexample(
    nodes: &[Node],
    target: usize,
    last: Option<TraceStep>,
    violation: Violation,
) -> CounterExample {
    let mut steps = Vec::new();
    let mut cursor = target;
    while let Some((parent, transition)) = &nodes[cursor].parent {
        steps.push(TraceStep {
            transition: transition.clone(),
            state: nodes[cursor].state.clone(),
        });
        cursor = *parent;
    }
    steps.reverse();
    steps.extend(last);

    CounterExample {
        violation,
        trace: Trace {
            initial: nodes[0].state.clone(),
            steps,
        },
    }
}

/// Smallest node id from which no healthy-leader state is reachable.
fn first_without_leader_path(nodes: &[Node], successors: &[Vec<usize>]) -> Option<usize> {
    let mut predecessors = vec![Vec::new(); nodes.len()];
    for (from, targets) in successors.iter().enumerate() {
        for &to in targets {
            predecessors[to].push(from);
        }
    }

    let mut can_reach = vec![false; nodes.len()];
    let mut queue = VecDeque::new();
    for (id, node) in nodes.iter().enumerate() {
        if !node.expanded || is_leader_healthy(&node.state) {
            can_reach[id] = true;
            queue.push_back(id);
        }
    }
    while let Some(id) = queue.pop_front() {
        for &pred in &predecessors[id] {
            if !can_reach[pred] {
                can_reach[pred] = true;
                queue.push_back(pred);
            }
        }
    }

    can_reach.iter().position(|reached| !reached)
}

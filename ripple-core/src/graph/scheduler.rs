//! Evaluation Scheduler
//!
//! The scheduler turns a dependency mapping into the order in which its nodes
//! are evaluated. It ensures that inputs are always evaluated before the
//! functions that read them.
//!
//! # Algorithm
//!
//! We use Kahn's algorithm over the mapping's own nodes:
//!
//! 1. Count, for each node, how many of its inputs are themselves in the
//!    mapping. Inputs outside the mapping are already up to date.
//! 2. Nodes with no pending input are ready.
//! 3. Repeatedly emit the ready node that was discovered first, and release
//!    the nodes that read it.
//! 4. If nodes remain but none is ready, they sit on or behind a cycle. The
//!    [`CyclePolicy`] decides what happens next.
//!
//! Picking the earliest-discovered ready node, rather than the first one
//! queued, makes the order a pure function of the mapping.
//!
//! # Cycles
//!
//! With [`CyclePolicy::Break`], we walk backwards from the earliest stuck node
//! along its pending inputs until a node repeats. That node is on a cycle.
//! It is emitted as if its pending inputs were satisfied, and ordering
//! resumes. Nodes merely downstream of a cycle are never forced.
//!
//! With [`CyclePolicy::Drop`], every stuck node is left out.
//!
//! Either way each node is emitted at most once and the loop terminates.

use std::collections::BTreeSet;

use smallvec::SmallVec;
use tracing::warn;

use crate::config::CyclePolicy;
use crate::error::Error;

use super::builder::DependencyMapping;
use super::node::ComputationNode;

/// The result of scheduling a mapping.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EvaluationOrder {
    /// Nodes in evaluation order.
    pub queue: Vec<ComputationNode>,

    /// Nodes that could not be ordered cleanly: forced past a cycle under
    /// [`CyclePolicy::Break`], or left out under [`CyclePolicy::Drop`].
    pub cycles: Vec<ComputationNode>,
}

/// Orders dependency mappings.
#[derive(Debug, Clone, Copy, Default)]
pub struct EvaluationScheduler {
    policy: CyclePolicy,
}

impl EvaluationScheduler {
    /// Create a scheduler with the given cycle policy.
    pub fn new(policy: CyclePolicy) -> Self {
        Self { policy }
    }

    /// Compute the evaluation order of `mapping`.
    pub fn schedule(&self, mapping: &DependencyMapping) -> EvaluationOrder {
        let nodes: Vec<&ComputationNode> = mapping.nodes().collect();
        let count = nodes.len();

        // Pending inputs per node and reverse edges, by discovery position.
        let mut requires: Vec<SmallVec<[usize; 4]>> = vec![SmallVec::new(); count];
        let mut readers: Vec<Vec<usize>> = vec![Vec::new(); count];
        for (position, (_, entry)) in mapping.iter().enumerate() {
            for input in &entry.requires {
                if let Some(input_position) = mapping.position(input) {
                    if !requires[position].contains(&input_position) {
                        requires[position].push(input_position);
                        readers[input_position].push(position);
                    }
                }
            }
        }

        let mut pending: Vec<usize> = requires.iter().map(|r| r.len()).collect();
        let mut emitted = vec![false; count];
        let mut ready: BTreeSet<usize> = (0..count).filter(|&i| pending[i] == 0).collect();
        let mut order = EvaluationOrder {
            queue: Vec::with_capacity(count),
            cycles: Vec::new(),
        };

        loop {
            while let Some(position) = ready.pop_first() {
                emitted[position] = true;
                order.queue.push(nodes[position].clone());

                for &reader in &readers[position] {
                    if !emitted[reader] {
                        pending[reader] = pending[reader].saturating_sub(1);
                        if pending[reader] == 0 {
                            ready.insert(reader);
                        }
                    }
                }
            }

            let Some(stuck) = (0..count).find(|&i| !emitted[i]) else {
                break;
            };

            match self.policy {
                CyclePolicy::Break => {
                    let forced = on_cycle(stuck, &requires, &emitted);
                    let error = Error::CyclicDependency {
                        node: nodes[forced].clone(),
                    };
                    warn!(%error, "evaluating before its inputs");

                    order.cycles.push(nodes[forced].clone());
                    pending[forced] = 0;
                    ready.insert(forced);
                }
                CyclePolicy::Drop => {
                    for position in (0..count).filter(|&i| !emitted[i]) {
                        let error = Error::CyclicDependency {
                            node: nodes[position].clone(),
                        };
                        warn!(%error, "leaving node out of the chain");
                        order.cycles.push(nodes[position].clone());
                    }
                    break;
                }
            }
        }

        order
    }
}

/// Walk pending inputs from `start` until a position repeats.
fn on_cycle(start: usize, requires: &[SmallVec<[usize; 4]>], emitted: &[bool]) -> usize {
    let mut visited = vec![false; requires.len()];
    let mut current = start;

    while !visited[current] {
        visited[current] = true;
        match requires[current].iter().copied().filter(|&i| !emitted[i]).min() {
            Some(next) => current = next,
            None => break,
        }
    }

    current
}

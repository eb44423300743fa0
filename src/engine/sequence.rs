// SPDX-License-Identifier: MIT

//! Sequence builder
//!
//! Turns a graph snapshot into the ordered list of steps the player walks
//! through. Traversal is breadth-first from a single root. A node reached
//! again through a longer path, before it has been expanded, takes the
//! larger level, so convergence nodes sit after every branch feeding them.

use serde::Serialize;
use std::collections::{HashMap, HashSet, VecDeque};

use super::graph::{end_candidates_in, select_start_in, Graph};

/// One entry of an execution sequence
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SequenceStep {
    pub node_id: String,
    pub level: usize,
    pub is_end_node: bool,
}

/// Ordered steps plus the end nodes reached by the traversal
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionSequence {
    steps: Vec<SequenceStep>,
    end_nodes: Vec<String>,
}

impl ExecutionSequence {
    pub fn steps(&self) -> &[SequenceStep] {
        &self.steps
    }

    /// Node ids in execution order
    pub fn order(&self) -> Vec<&str> {
        self.steps.iter().map(|s| s.node_id.as_str()).collect()
    }

    pub fn end_nodes(&self) -> &[String] {
        &self.end_nodes
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&SequenceStep> {
        self.steps.get(index)
    }

    pub fn last(&self) -> Option<&SequenceStep> {
        self.steps.last()
    }

    pub fn is_end_node(&self, node_id: &str) -> bool {
        self.end_nodes.iter().any(|e| e == node_id)
    }

    pub fn level_of(&self, node_id: &str) -> Option<usize> {
        self.steps
            .iter()
            .find(|s| s.node_id == node_id)
            .map(|s| s.level)
    }
}

/// Build the execution sequence for a graph.
///
/// Returns an empty sequence when no start node can be found; callers treat
/// that as "no workflow" rather than an error.
pub fn build_sequence(graph: &Graph) -> ExecutionSequence {
    let index = graph.index();
    let Some(root) = select_start_in(&index) else {
        log::debug!("No start node among {} nodes", graph.nodes.len());
        return ExecutionSequence::default();
    };

    let mut levels: HashMap<&str, usize> = HashMap::new();
    let mut visited: HashSet<&str> = HashSet::new();
    let mut discovered: Vec<&str> = Vec::new();
    let mut queue: VecDeque<&str> = VecDeque::new();

    levels.insert(root.id.as_str(), 0);
    queue.push_back(root.id.as_str());

    while let Some(current) = queue.pop_front() {
        // A node may sit in the queue more than once after a level bump.
        if !visited.insert(current) {
            continue;
        }
        discovered.push(current);

        let level = levels[current];
        for &edge in index.outgoing(current) {
            let next = edge.target.as_str();
            if visited.contains(next) {
                continue;
            }
            let candidate = level + 1;
            let longer = levels
                .get(next)
                .map_or(true, |&recorded| candidate > recorded);
            if longer {
                levels.insert(next, candidate);
                queue.push_back(next);
            }
        }
    }

    // Stable: nodes sharing a level keep their discovery order.
    discovered.sort_by_key(|id| levels[id]);

    let end_nodes: Vec<String> = {
        let candidates: HashSet<&str> = end_candidates_in(&index)
            .into_iter()
            .map(|n| n.id.as_str())
            .collect();
        discovered
            .iter()
            .filter(|id| candidates.contains(*id))
            .map(|id| id.to_string())
            .collect()
    };

    let steps = discovered
        .iter()
        .map(|id| SequenceStep {
            node_id: id.to_string(),
            level: levels[id],
            is_end_node: end_nodes.iter().any(|e| e == id),
        })
        .collect();

    ExecutionSequence { steps, end_nodes }
}

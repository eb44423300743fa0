// SPDX-License-Identifier: MIT

//! Start and end node selection
//!
//! Candidates are found with three strategies evaluated in a fixed priority:
//! the explicit kind tag, then graph structure (no incoming / no outgoing
//! edge), then a case-insensitive label match. The structural and label
//! strategies only consider nodes whose kind is unset.

use super::types::{Graph, GraphIndex, Node, NodeKind};

/// Which end of the workflow is being selected
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Terminal {
    Start,
    End,
}

impl Terminal {
    fn kind(self) -> NodeKind {
        match self {
            Terminal::Start => NodeKind::Start,
            Terminal::End => NodeKind::End,
        }
    }

    fn keyword(self) -> &'static str {
        match self {
            Terminal::Start => "start",
            Terminal::End => "end",
        }
    }
}

/// A single rule for recognising a start or end node
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectionStrategy {
    /// `kind` is `start` / `end`
    KindTag,
    /// Unset kind and no incoming (start) or outgoing (end) edge
    Structural,
    /// Unset kind and label contains "start" / "end"
    Label,
}

/// Strategies in priority order
pub const STRATEGY_PRIORITY: [SelectionStrategy; 3] = [
    SelectionStrategy::KindTag,
    SelectionStrategy::Structural,
    SelectionStrategy::Label,
];

impl SelectionStrategy {
    pub fn matches(self, index: &GraphIndex<'_>, node: &Node, terminal: Terminal) -> bool {
        match self {
            SelectionStrategy::KindTag => node.kind == Some(terminal.kind()),
            SelectionStrategy::Structural => {
                node.kind.is_none()
                    && match terminal {
                        Terminal::Start => !index.has_incoming(&node.id),
                        Terminal::End => !index.has_outgoing(&node.id),
                    }
            }
            SelectionStrategy::Label => {
                node.kind.is_none() && node.label.to_lowercase().contains(terminal.keyword())
            }
        }
    }
}

/// Pick the traversal root.
///
/// Returns the first node, in array order, accepted by the highest-priority
/// strategy that accepts any node at all. Strategy priority wins over array
/// order: an untagged root listed before a `start`-tagged node loses to it.
pub fn select_start(graph: &Graph) -> Option<&Node> {
    select_start_in(&graph.index())
}

/// `select_start` over a prebuilt index
pub fn select_start_in<'a>(index: &GraphIndex<'a>) -> Option<&'a Node> {
    let nodes = &index.graph().nodes;
    STRATEGY_PRIORITY.iter().find_map(|strategy| {
        nodes
            .iter()
            .find(|n| strategy.matches(index, n, Terminal::Start))
    })
}

/// All nodes accepted by any end strategy, in array order
pub fn end_candidates(graph: &Graph) -> Vec<&Node> {
    end_candidates_in(&graph.index())
}

/// `end_candidates` over a prebuilt index
pub fn end_candidates_in<'a>(index: &GraphIndex<'a>) -> Vec<&'a Node> {
    index
        .graph()
        .nodes
        .iter()
        .filter(|n| {
            STRATEGY_PRIORITY
                .iter()
                .any(|s| s.matches(index, n, Terminal::End))
        })
        .collect()
}

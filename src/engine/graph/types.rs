//! Graph model type definitions
//!
//! Passive data structures for the node/edge diagram handed to the engine.
//! Edges may reference node ids that do not exist; every lookup here skips
//! such dangling edges instead of failing.

use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

/// Kind tag of a node as set by the editor
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum NodeKind {
    Start,
    Process,
    Decision,
    Condition,
    Action,
    End,
    Custom,
}

/// A node in the workflow diagram
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct Node {
    /// Unique identifier for this node
    pub id: String,
    /// Kind tag, unset for free-form nodes
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<NodeKind>,
    /// Display label
    #[serde(default)]
    pub label: String,
}

impl Node {
    pub fn new(id: impl Into<String>, kind: Option<NodeKind>, label: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            kind,
            label: label.into(),
        }
    }
}

/// A directed edge between two nodes
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct Edge {
    /// Edge identifier; conventionally but not reliably `source->target`
    pub id: String,
    pub source: String,
    pub target: String,
}

impl Edge {
    pub fn new(id: impl Into<String>, source: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            source: source.into(),
            target: target.into(),
        }
    }
}

/// A snapshot of the workflow diagram
#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq)]
pub struct Graph {
    #[serde(default)]
    pub nodes: Vec<Node>,
    #[serde(default)]
    pub edges: Vec<Edge>,
}

impl Graph {
    pub fn new(nodes: Vec<Node>, edges: Vec<Edge>) -> Self {
        Self { nodes, edges }
    }

    /// Look up a node by id
    pub fn node(&self, id: &str) -> Option<&Node> {
        self.nodes.iter().find(|n| n.id == id)
    }

    /// Check whether a node with this id exists
    pub fn contains(&self, id: &str) -> bool {
        self.node(id).is_some()
    }

    /// Build the lookup tables used for traversal
    pub fn index(&self) -> GraphIndex<'_> {
        GraphIndex::new(self)
    }

    /// Find the edge leading from `from` to `to`.
    ///
    /// Tries an edge id of `from->to`, then `from-to`, then any edge with
    /// matching endpoints. Edge ids are not guaranteed to follow either
    /// naming convention.
    pub fn find_edge(&self, from: &str, to: &str) -> Option<&Edge> {
        let arrow = format!("{}->{}", from, to);
        let dash = format!("{}-{}", from, to);

        self.edges
            .iter()
            .find(|e| e.id == arrow)
            .or_else(|| self.edges.iter().find(|e| e.id == dash))
            .or_else(|| {
                self.edges
                    .iter()
                    .find(|e| e.source == from && e.target == to)
            })
    }
}

/// Node-id set and adjacency built once per graph snapshot.
///
/// Only edges whose endpoints both exist are indexed. Outgoing edges keep
/// their array order.
pub struct GraphIndex<'a> {
    graph: &'a Graph,
    ids: HashSet<&'a str>,
    outgoing: HashMap<&'a str, Vec<&'a Edge>>,
    incoming: HashSet<&'a str>,
}

impl<'a> GraphIndex<'a> {
    pub fn new(graph: &'a Graph) -> Self {
        let ids: HashSet<&str> = graph.nodes.iter().map(|n| n.id.as_str()).collect();
        let mut outgoing: HashMap<&str, Vec<&Edge>> = HashMap::new();
        let mut incoming = HashSet::new();

        for edge in &graph.edges {
            if !ids.contains(edge.source.as_str()) || !ids.contains(edge.target.as_str()) {
                continue;
            }
            outgoing.entry(edge.source.as_str()).or_default().push(edge);
            incoming.insert(edge.target.as_str());
        }

        Self {
            graph,
            ids,
            outgoing,
            incoming,
        }
    }

    pub fn graph(&self) -> &'a Graph {
        self.graph
    }

    pub fn contains(&self, id: &str) -> bool {
        self.ids.contains(id)
    }

    /// Outgoing edges of a node, in array order, skipping dangling targets
    pub fn outgoing(&self, id: &str) -> &[&'a Edge] {
        self.outgoing.get(id).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn has_incoming(&self, id: &str) -> bool {
        self.incoming.contains(id)
    }

    pub fn has_outgoing(&self, id: &str) -> bool {
        self.outgoing.contains_key(id)
    }
}

// SPDX-License-Identifier: MIT

use parking_lot::RwLock;
use std::sync::Arc;

use super::types::Graph;

/// Supplies the current graph whenever playback starts
pub trait GraphSource: Send + Sync {
    fn snapshot(&self) -> Graph;
}

impl GraphSource for Graph {
    fn snapshot(&self) -> Graph {
        self.clone()
    }
}

/// A graph that the editor can replace while the player keeps a handle to it
#[derive(Clone, Default)]
pub struct SharedGraph {
    graph: Arc<RwLock<Graph>>,
}

impl SharedGraph {
    pub fn new(graph: Graph) -> Self {
        Self {
            graph: Arc::new(RwLock::new(graph)),
        }
    }

    pub fn replace(&self, graph: Graph) {
        *self.graph.write() = graph;
    }
}

impl GraphSource for SharedGraph {
    fn snapshot(&self) -> Graph {
        self.graph.read().clone()
    }
}

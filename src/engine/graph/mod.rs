// SPDX-License-Identifier: MIT

//! Workflow graph model
//!
//! This module provides the node/edge snapshot supplied by the editor and
//! the rules used to pick its start and end nodes.

mod selector;
mod source;
pub mod types;

pub use selector::{
    end_candidates, end_candidates_in, select_start, select_start_in, SelectionStrategy,
    Terminal, STRATEGY_PRIORITY,
};
pub use source::{GraphSource, SharedGraph};
pub use types::{Edge, Graph, GraphIndex, Node, NodeKind};

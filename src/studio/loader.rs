//! Graph loader - JSON/YAML file loading and parsing
//!
//! This module reads the diagrams saved by the editor into a `Graph`.

use std::collections::HashSet;
use std::fs;
use std::path::Path;

use crate::engine::error::LoadError;
use crate::engine::graph::Graph;

/// Loads graph snapshots from JSON or YAML files
pub struct GraphLoader;

impl GraphLoader {
    pub fn new() -> Self {
        Self
    }

    /// Load a graph, choosing the format from the file extension
    pub fn load<P: AsRef<Path>>(&self, path: P) -> Result<Graph, LoadError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(LoadError::FileNotFound(path.display().to_string()));
        }

        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase)
            .unwrap_or_default();
        let content = fs::read_to_string(path)?;

        match extension.as_str() {
            "json" => Self::parse_json(&content),
            "yaml" | "yml" => Self::parse_yaml(&content),
            _ => Err(LoadError::UnsupportedFormat(path.display().to_string())),
        }
    }

    /// Parse a graph from a YAML string
    pub fn parse_yaml(content: &str) -> Result<Graph, LoadError> {
        let graph: Graph = serde_yaml::from_str(content)?;
        Self::validate(&graph)?;
        Ok(graph)
    }

    /// Parse a graph from a JSON string
    pub fn parse_json(content: &str) -> Result<Graph, LoadError> {
        let graph: Graph = serde_json::from_str(content)?;
        Self::validate(&graph)?;
        Ok(graph)
    }

    /// Node ids must be unique. Dangling edges are allowed.
    pub fn validate(graph: &Graph) -> Result<(), LoadError> {
        let mut seen = HashSet::new();
        for node in &graph.nodes {
            if !seen.insert(node.id.as_str()) {
                return Err(LoadError::DuplicateNode(node.id.clone()));
            }
        }
        Ok(())
    }
}

impl Default for GraphLoader {
    fn default() -> Self {
        Self::new()
    }
}

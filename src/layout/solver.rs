//! The layered-graph solver seam and the graph shape it speaks.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, thiserror::Error)]
pub enum SolverError {
    #[error("Solver rejected the graph: {0}")]
    Rejected(String),
    #[error("Invalid solver graph JSON: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SolverNode {
    pub id: String,
    pub width: f64,
    pub height: f64,
    #[serde(default)]
    pub x: f64,
    #[serde(default)]
    pub y: f64,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub layout_options: BTreeMap<String, String>,
}

/// Hyperedge form used by the solver; the editor only ever produces one source and one target.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SolverEdge {
    pub id: String,
    pub sources: Vec<String>,
    pub targets: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SolverGraph {
    pub id: String,
    #[serde(default)]
    pub layout_options: BTreeMap<String, String>,
    #[serde(default)]
    pub children: Vec<SolverNode>,
    #[serde(default)]
    pub edges: Vec<SolverEdge>,
}

impl SolverGraph {
    pub fn child(&self, id: &str) -> Option<&SolverNode> {
        self.children.iter().find(|c| c.id == id)
    }
}

/// A generic layered layout solver.
///
/// Single-threaded: implementations may hold non-`Send` handles such as JS callbacks.
#[async_trait(?Send)]
pub trait LayeredSolver {
    async fn solve(&self, graph: SolverGraph) -> Result<SolverGraph, SolverError>;
}

//! Node/edge records exchanged with the diagram editor.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashMap;

/// Handle suffix the editor puts on the right-hand source handle.
/// An edge leaving through it asks for its endpoints to share a rank.
pub const SAME_RANK_HANDLE_SUFFIX: &str = "-source-right";

/// `data` field holding a Property node's exact string list when it is not
/// just its content. Cleared whenever the content is edited.
pub const PROPERTY_LIST_FIELD: &str = "properties";

#[derive(Debug, thiserror::Error)]
pub enum GraphError {
    #[error("Invalid graph JSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// Node role. `Zone` is the root scope, the other nine form the fixed chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Role {
    Zone,
    Task,
    Function,
    Realization,
    Property,
    GuideWord,
    Deviation,
    Cause,
    Consequence,
    Requirement,
}

impl Role {
    /// Role a child of this role is expected to have.
    pub fn child(self) -> Option<Role> {
        match self {
            Role::Zone => Some(Role::Task),
            Role::Task => Some(Role::Function),
            Role::Function => Some(Role::Realization),
            Role::Realization => Some(Role::Property),
            Role::Property => Some(Role::GuideWord),
            Role::GuideWord => Some(Role::Deviation),
            Role::Deviation => Some(Role::Cause),
            Role::Cause => Some(Role::Consequence),
            Role::Consequence => Some(Role::Requirement),
            Role::Requirement => None,
        }
    }

    /// Distance from `Zone` along the chain.
    pub fn depth(self) -> usize {
        match self {
            Role::Zone => 0,
            Role::Task => 1,
            Role::Function => 2,
            Role::Realization => 3,
            Role::Property => 4,
            Role::GuideWord => 5,
            Role::Deviation => 6,
            Role::Cause => 7,
            Role::Consequence => 8,
            Role::Requirement => 9,
        }
    }

    /// Deviation, Cause, Consequence and Requirement: the flat lists of an interpretation.
    pub fn is_evidence(self) -> bool {
        matches!(
            self,
            Role::Deviation | Role::Cause | Role::Consequence | Role::Requirement
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Role::Zone => "zone",
            Role::Task => "task",
            Role::Function => "function",
            Role::Realization => "realization",
            Role::Property => "property",
            Role::GuideWord => "guideWord",
            Role::Deviation => "deviation",
            Role::Cause => "cause",
            Role::Consequence => "consequence",
            Role::Requirement => "requirement",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Size {
    pub width: f64,
    pub height: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NodeData {
    #[serde(default)]
    pub content: String,
    /// Role-specific fields (e.g. `isoMatches` on guide words), kept verbatim.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    pub id: String,
    #[serde(rename = "type")]
    pub role: Role,
    #[serde(default)]
    pub data: NodeData,
    #[serde(default)]
    pub position: Position,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub measured: Option<Size>,
}

impl Node {
    pub fn new(id: impl Into<String>, role: Role, content: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            role,
            data: NodeData {
                content: content.into(),
                extra: Map::new(),
            },
            position: Position::default(),
            measured: None,
        }
    }

    pub fn content(&self) -> &str {
        &self.data.content
    }

    /// Strings listed under [`PROPERTY_LIST_FIELD`], if present and well formed.
    pub fn property_list(&self) -> Option<Vec<String>> {
        self.data
            .extra
            .get(PROPERTY_LIST_FIELD)?
            .as_array()?
            .iter()
            .map(|v| v.as_str().map(str::to_string))
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Edge {
    pub id: String,
    pub source: String,
    pub target: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_handle: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_handle: Option<String>,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    /// Source and target must land on the same layout rank.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub same_rank: bool,
}

impl Edge {
    pub fn new(id: impl Into<String>, source: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            source: source.into(),
            target: target.into(),
            source_handle: None,
            target_handle: None,
            kind: None,
            same_rank: false,
        }
    }

    /// Edge id used for a generated parent/child link.
    pub fn link_id(source: &str, target: &str) -> String {
        format!("e-{source}-{target}")
    }

    /// Lift the handle-name convention into the typed `same_rank` flag.
    pub fn with_wire_hints(mut self) -> Self {
        if self
            .source_handle
            .as_deref()
            .is_some_and(|h| h.ends_with(SAME_RANK_HANDLE_SUFFIX))
        {
            self.same_rank = true;
        }
        self
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
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

    /// Parse editor JSON and normalize edge hints.
    pub fn from_json(source: &str) -> Result<Self, GraphError> {
        let mut graph: Graph = serde_json::from_str(source)?;
        graph.edges = graph.edges.into_iter().map(Edge::with_wire_hints).collect();
        Ok(graph)
    }

    pub fn to_json(&self) -> Result<String, GraphError> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn node(&self, id: &str) -> Option<&Node> {
        self.nodes.iter().find(|n| n.id == id)
    }

    /// Copy positions from a laid-out snapshot; nothing else is touched.
    pub fn apply_positions(&mut self, laid_out: &Graph) {
        let positions: HashMap<&str, Position> = laid_out
            .nodes
            .iter()
            .map(|n| (n.id.as_str(), n.position))
            .collect();
        for node in &mut self.nodes {
            if let Some(&p) = positions.get(node.id.as_str()) {
                node.position = p;
            }
        }
    }

    /// Leaf content patch coming back from the table view.
    pub fn update_content(&mut self, node_id: &str, content: impl Into<String>) -> bool {
        match self.nodes.iter_mut().find(|n| n.id == node_id) {
            Some(node) => {
                node.data.content = content.into();
                node.data.extra.remove(PROPERTY_LIST_FIELD);
                true
            }
            None => false,
        }
    }
}

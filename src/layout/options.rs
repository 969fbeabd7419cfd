//! Layout configuration and the solver option keys it maps onto.

use serde_json::Value;
use std::collections::BTreeMap;

use super::LayoutError;
use crate::graph::Position;

/// Option keys understood by the layered solver (ELK naming).
pub mod keys {
    pub const ALGORITHM: &str = "elk.algorithm";
    pub const DIRECTION: &str = "elk.direction";
    pub const LAYER_SPACING: &str = "elk.layered.spacing.nodeNodeBetweenLayers";
    pub const NODE_SPACING: &str = "elk.spacing.nodeNode";
    pub const EDGE_ROUTING: &str = "elk.edgeRouting";
    pub const CROSSING_MINIMIZATION: &str = "elk.layered.crossingMinimization.strategy";
    pub const NODE_PLACEMENT: &str = "elk.layered.nodePlacement.strategy";
    pub const LAYERING_STRATEGY: &str = "elk.layered.layering.strategy";
    pub const SEMI_INTERACTIVE: &str = "elk.layered.crossingMinimization.semiInteractive";
    pub const INTERACTIVE_LAYOUT: &str = "elk.interactiveLayout";
    pub const PARTITIONING: &str = "elk.partitioning.activate";

    // Per-node options
    pub const PARTITION: &str = "elk.partitioning.partition";
    pub const LAYER_CHOICE: &str = "elk.layered.layering.layerChoiceConstraint";
    pub const IN_LAYER_SUCC_OF: &str = "elk.layered.crossingMinimization.inLayerSuccOf";
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Direction {
    #[default]
    Down,
    Right,
}

impl Direction {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_ascii_uppercase().as_str() {
            "DOWN" => Some(Self::Down),
            "RIGHT" => Some(Self::Right),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Down => "DOWN",
            Self::Right => "RIGHT",
        }
    }

    /// Coordinate along the layering axis.
    pub fn axis(self, x: f64, y: f64) -> f64 {
        match self {
            Self::Down => y,
            Self::Right => x,
        }
    }

    /// Coordinate across the layering axis.
    pub fn cross(self, x: f64, y: f64) -> f64 {
        match self {
            Self::Down => x,
            Self::Right => y,
        }
    }

    /// Build (x, y) from axis and cross coordinates.
    pub fn point(self, axis: f64, cross: f64) -> Position {
        match self {
            Self::Down => Position { x: cross, y: axis },
            Self::Right => Position { x: axis, y: cross },
        }
    }
}

/// Layout knobs. Recognized keys are typed, everything else reaches the solver verbatim.
#[derive(Debug, Clone, PartialEq)]
pub struct LayoutOptions {
    pub direction: Direction,
    pub layer_spacing: f64,
    pub node_spacing: f64,
    pub edge_routing: String,
    pub crossing_minimization: String,
    pub node_placement: String,
    /// Pixel tolerance when clustering first-pass coordinates into layers.
    pub band_tolerance: f64,
    /// Force same-rank targets onto their source's axis coordinate after solving.
    pub snap_same_rank: bool,
    /// Size used for nodes the editor has not measured yet.
    pub node_width: f64,
    pub node_height: f64,
    pub passthrough: BTreeMap<String, String>,
}

impl Default for LayoutOptions {
    fn default() -> Self {
        Self {
            direction: Direction::Down,
            layer_spacing: 80.0,
            node_spacing: 40.0,
            edge_routing: "ORTHOGONAL".to_string(),
            crossing_minimization: "LAYER_SWEEP".to_string(),
            node_placement: "NETWORK_SIMPLEX".to_string(),
            band_tolerance: 10.0,
            snap_same_rank: false,
            node_width: 150.0,
            node_height: 50.0,
            passthrough: BTreeMap::new(),
        }
    }
}

fn parse_number(key: &str, value: &str) -> Result<f64, LayoutError> {
    value
        .trim()
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite() && *v >= 0.0)
        .ok_or_else(|| LayoutError::InvalidOption {
            key: key.to_string(),
            value: value.to_string(),
        })
}

fn parse_flag(key: &str, value: &str) -> Result<bool, LayoutError> {
    match value.trim() {
        "true" => Ok(true),
        "false" => Ok(false),
        _ => Err(LayoutError::InvalidOption {
            key: key.to_string(),
            value: value.to_string(),
        }),
    }
}

impl LayoutOptions {
    /// Load from a flat string-keyed map on top of the defaults.
    pub fn from_map<I>(entries: I) -> Result<Self, LayoutError>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let mut options = Self::default();
        for (key, value) in entries {
            match key.as_str() {
                "direction" => {
                    options.direction =
                        Direction::from_str(&value).ok_or_else(|| LayoutError::InvalidOption {
                            key: key.clone(),
                            value: value.clone(),
                        })?
                }
                "layerSpacing" => options.layer_spacing = parse_number(&key, &value)?,
                "nodeSpacing" => options.node_spacing = parse_number(&key, &value)?,
                "edgeRouting" => options.edge_routing = value,
                "crossingMinimization" => options.crossing_minimization = value,
                "nodePlacement" => options.node_placement = value,
                "bandTolerance" => options.band_tolerance = parse_number(&key, &value)?,
                "snapSameRank" => options.snap_same_rank = parse_flag(&key, &value)?,
                "nodeWidth" => options.node_width = parse_number(&key, &value)?,
                "nodeHeight" => options.node_height = parse_number(&key, &value)?,
                _ => {
                    options.passthrough.insert(key, value);
                }
            }
        }
        Ok(options)
    }

    /// JSON object form; non-string values are taken by their JSON text.
    pub fn from_json(source: &str) -> Result<Self, LayoutError> {
        let map: BTreeMap<String, Value> = serde_json::from_str(source)?;
        Self::from_map(map.into_iter().map(|(k, v)| {
            let v = match v {
                Value::String(s) => s,
                other => other.to_string(),
            };
            (k, v)
        }))
    }

    /// Graph-level solver options for one pass.
    pub fn solver_options(&self, interactive: bool, partitioned: bool) -> BTreeMap<String, String> {
        let mut map = BTreeMap::new();
        map.insert(keys::ALGORITHM.to_string(), "layered".to_string());
        map.insert(keys::DIRECTION.to_string(), self.direction.as_str().to_string());
        map.insert(keys::LAYER_SPACING.to_string(), self.layer_spacing.to_string());
        map.insert(keys::NODE_SPACING.to_string(), self.node_spacing.to_string());
        map.insert(keys::EDGE_ROUTING.to_string(), self.edge_routing.clone());
        map.insert(
            keys::CROSSING_MINIMIZATION.to_string(),
            self.crossing_minimization.clone(),
        );
        map.insert(keys::NODE_PLACEMENT.to_string(), self.node_placement.clone());
        if partitioned {
            map.insert(keys::PARTITIONING.to_string(), "true".to_string());
        }
        if interactive {
            map.insert(keys::INTERACTIVE_LAYOUT.to_string(), "true".to_string());
            map.insert(keys::LAYERING_STRATEGY.to_string(), "INTERACTIVE".to_string());
            map.insert(keys::SEMI_INTERACTIVE.to_string(), "true".to_string());
        }
        map.extend(self.passthrough.clone());
        map
    }
}

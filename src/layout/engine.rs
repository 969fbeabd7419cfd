//! Two-pass layout engine over a generic layered solver.

use std::collections::{BTreeMap, HashMap, HashSet};

use crate::graph::{Graph, Position};

use super::bands::assign_bands;
use super::grouping::SameRankGroups;
use super::options::{Direction, LayoutOptions, keys};
use super::solver::{LayeredSolver, SolverEdge, SolverGraph, SolverNode};
use super::LayoutError;

/// Layout engine configuration and computation.
pub struct LayoutEngine<S> {
    pub solver: S,
    pub options: LayoutOptions,
}

impl<S: Default> Default for LayoutEngine<S> {
    fn default() -> Self {
        Self {
            solver: S::default(),
            options: LayoutOptions::default(),
        }
    }
}

impl<S: LayeredSolver> LayoutEngine<S> {
    pub fn new(solver: S, options: LayoutOptions) -> Self {
        Self { solver, options }
    }

    /// Lay out `graph`, returning a copy with positions set.
    ///
    /// Nodes connected by same-rank edges end up on one layer. Solver errors
    /// propagate unchanged and leave `graph` untouched.
    pub async fn layout(&self, graph: &Graph) -> Result<Graph, LayoutError> {
        let direction = self.options.direction;

        // Phase 1: Same-rank grouping
        let groups = SameRankGroups::build(&graph.edges);
        let partitioned = !groups.is_empty();

        // Phase 2: Unconstrained solve
        let first = self
            .solver
            .solve(self.request(graph, &groups, None, &HashMap::new()))
            .await?;

        // Phase 3: Bands and exact layer constraints
        let bands = assign_bands(
            first
                .children
                .iter()
                .map(|c| (c.id.as_str(), direction.axis(c.x, c.y))),
            self.options.band_tolerance,
        );
        let required = groups.required_layers(&bands);

        // Phase 4: Interactive solve honouring the constraints
        let mut request = self.request(graph, &groups, Some(&first), &required);
        request.layout_options = self.options.solver_options(true, partitioned);
        let mut second = self.solver.solve(request).await?;

        // Phase 5: Optional snap onto the source's axis coordinate
        if self.options.snap_same_rank {
            snap_same_rank(&mut second, &groups.hints, direction);
        }

        // Phase 6: Write back
        let laid_out = write_back(graph, &second);
        tracing::debug!(
            nodes = laid_out.nodes.len(),
            edges = laid_out.edges.len(),
            constrained = required.len(),
            "layout finished"
        );
        Ok(laid_out)
    }

    fn request(
        &self,
        graph: &Graph,
        groups: &SameRankGroups,
        seed: Option<&SolverGraph>,
        required: &HashMap<String, usize>,
    ) -> SolverGraph {
        let ids: HashSet<&str> = graph.nodes.iter().map(|n| n.id.as_str()).collect();

        let mut successor_of: HashMap<&str, &str> = HashMap::new();
        for (source, target) in &groups.hints {
            successor_of.entry(target.as_str()).or_insert(source.as_str());
        }

        let children = graph
            .nodes
            .iter()
            .map(|node| {
                let (width, height) = node
                    .measured
                    .map(|m| (m.width, m.height))
                    .unwrap_or((self.options.node_width, self.options.node_height));
                let (x, y) = seed
                    .and_then(|s| s.child(&node.id))
                    .map(|c| (c.x, c.y))
                    .unwrap_or((node.position.x, node.position.y));

                let mut layout_options = BTreeMap::new();
                if let Some(partition) = groups.partitions.get(&node.id) {
                    layout_options.insert(keys::PARTITION.to_string(), partition.to_string());
                }
                if let Some(source) = successor_of.get(node.id.as_str()) {
                    layout_options.insert(keys::IN_LAYER_SUCC_OF.to_string(), source.to_string());
                }
                if let Some(layer) = required.get(&node.id) {
                    layout_options.insert(keys::LAYER_CHOICE.to_string(), layer.to_string());
                }

                SolverNode {
                    id: node.id.clone(),
                    width,
                    height,
                    x,
                    y,
                    layout_options,
                }
            })
            .collect();

        let edges = graph
            .edges
            .iter()
            .filter(|edge| {
                let known = ids.contains(edge.source.as_str()) && ids.contains(edge.target.as_str());
                if !known && seed.is_none() {
                    tracing::warn!(edge = %edge.id, "dropping edge with unknown endpoint");
                }
                known
            })
            .map(|edge| SolverEdge {
                id: edge.id.clone(),
                sources: vec![edge.source.clone()],
                targets: vec![edge.target.clone()],
            })
            .collect();

        SolverGraph {
            id: "root".to_string(),
            layout_options: self.options.solver_options(false, !groups.is_empty()),
            children,
            edges,
        }
    }
}

fn snap_same_rank(graph: &mut SolverGraph, hints: &[(String, String)], direction: Direction) {
    let index: HashMap<String, usize> = graph
        .children
        .iter()
        .enumerate()
        .map(|(i, c)| (c.id.clone(), i))
        .collect();

    // Repeat so chains settle onto the head's coordinate
    for _ in 0..=hints.len() {
        let mut changed = false;
        for (source, target) in hints {
            let (Some(&s), Some(&t)) = (index.get(source), index.get(target)) else {
                continue;
            };
            let axis = direction.axis(graph.children[s].x, graph.children[s].y);
            let node = &mut graph.children[t];
            if direction.axis(node.x, node.y) != axis {
                let cross = direction.cross(node.x, node.y);
                let Position { x, y } = direction.point(axis, cross);
                node.x = x;
                node.y = y;
                changed = true;
            }
        }
        if !changed {
            break;
        }
    }
}

fn write_back(graph: &Graph, solved: &SolverGraph) -> Graph {
    let mut laid_out = graph.clone();

    for node in &mut laid_out.nodes {
        if let Some(child) = solved.child(&node.id) {
            node.position = Position {
                x: child.x,
                y: child.y,
            };
        }
    }

    let solved_edges: HashMap<&str, &SolverEdge> =
        solved.edges.iter().map(|e| (e.id.as_str(), e)).collect();
    for edge in &mut laid_out.edges {
        let Some(solved) = solved_edges.get(edge.id.as_str()) else {
            continue;
        };
        if let Some(source) = solved.sources.first() {
            edge.source = source.clone();
        }
        if let Some(target) = solved.targets.first() {
            edge.target = target.clone();
        }
    }

    laid_out
}

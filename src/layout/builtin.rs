//! In-crate layered solver.
//!
//! Phases:
//!   1. Layer assignment (longest path, or first-pass bands in interactive mode),
//!      with exact layer choices pinned
//!   2. In-layer ordering (barycenter sweeps, or position order in interactive mode)
//!      followed by in-layer successor hints
//!   3. Coordinate assignment, one shared axis coordinate per layer
//!
//! Partitions and edge routing options are accepted and ignored.

use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap};

use crate::graph::Position;

use super::bands::assign_bands;
use super::options::{Direction, keys};
use super::solver::{LayeredSolver, SolverError, SolverGraph, SolverNode};

const PADDING: f64 = 12.0;

struct Settings {
    direction: Direction,
    layer_spacing: f64,
    node_spacing: f64,
    interactive: bool,
}

impl Settings {
    fn from_options(options: &BTreeMap<String, String>) -> Self {
        let number = |key: &str, default: f64| {
            options
                .get(key)
                .and_then(|v| v.parse::<f64>().ok())
                .unwrap_or(default)
        };
        let flag = |key: &str| options.get(key).is_some_and(|v| v == "true");
        Self {
            direction: options
                .get(keys::DIRECTION)
                .and_then(|v| Direction::from_str(v))
                .unwrap_or_default(),
            layer_spacing: number(keys::LAYER_SPACING, 80.0),
            node_spacing: number(keys::NODE_SPACING, 40.0),
            interactive: flag(keys::INTERACTIVE_LAYOUT)
                || flag(keys::SEMI_INTERACTIVE)
                || options
                    .get(keys::LAYERING_STRATEGY)
                    .is_some_and(|v| v == "INTERACTIVE"),
        }
    }

    fn axis_size(&self, node: &SolverNode) -> f64 {
        match self.direction {
            Direction::Down => node.height,
            Direction::Right => node.width,
        }
    }

    fn cross_size(&self, node: &SolverNode) -> f64 {
        match self.direction {
            Direction::Down => node.width,
            Direction::Right => node.height,
        }
    }
}

#[derive(Debug, Clone)]
pub struct BuiltinLayeredSolver {
    /// Upper bound on barycenter sweep rounds.
    pub sweeps: usize,
}

impl Default for BuiltinLayeredSolver {
    fn default() -> Self {
        Self { sweeps: 8 }
    }
}

#[async_trait(?Send)]
impl LayeredSolver for BuiltinLayeredSolver {
    async fn solve(&self, graph: SolverGraph) -> Result<SolverGraph, SolverError> {
        self.solve_now(graph)
    }
}

impl BuiltinLayeredSolver {
    /// Synchronous form of [`LayeredSolver::solve`].
    pub fn solve_now(&self, mut graph: SolverGraph) -> Result<SolverGraph, SolverError> {
        let settings = Settings::from_options(&graph.layout_options);
        let index: HashMap<&str, usize> = graph
            .children
            .iter()
            .enumerate()
            .map(|(i, c)| (c.id.as_str(), i))
            .collect();

        let mut edges: Vec<(usize, usize)> = Vec::new();
        for edge in &graph.edges {
            for source in &edge.sources {
                for target in &edge.targets {
                    let (Some(&s), Some(&t)) = (index.get(source.as_str()), index.get(target.as_str()))
                    else {
                        return Err(SolverError::Rejected(format!(
                            "edge {} references unknown node {source} or {target}",
                            edge.id
                        )));
                    };
                    if s != t {
                        edges.push((s, t));
                    }
                }
            }
        }

        let successor_hints: Vec<(usize, usize)> = graph
            .children
            .iter()
            .enumerate()
            .filter_map(|(t, c)| {
                let source = c.layout_options.get(keys::IN_LAYER_SUCC_OF)?;
                index.get(source.as_str()).map(|&s| (s, t))
            })
            .collect();

        let layers = assign_layers(&graph.children, &edges, &settings);
        let order = self.order_layers(&graph.children, &edges, &layers, &successor_hints, &settings);
        let positions = place(&graph.children, &order, &settings);

        for (node, position) in graph.children.iter_mut().zip(positions) {
            node.x = position.x;
            node.y = position.y;
        }
        Ok(graph)
    }

    fn order_layers(
        &self,
        children: &[SolverNode],
        edges: &[(usize, usize)],
        layers: &[usize],
        successor_hints: &[(usize, usize)],
        settings: &Settings,
    ) -> Vec<Vec<usize>> {
        let layer_count = layers.iter().max().map_or(0, |m| m + 1);
        let mut order: Vec<Vec<usize>> = vec![Vec::new(); layer_count];

        let mut initial: Vec<usize> = (0..children.len()).collect();
        if settings.interactive {
            initial.sort_by(|&a, &b| {
                let ca = settings.direction.cross(children[a].x, children[a].y);
                let cb = settings.direction.cross(children[b].x, children[b].y);
                ca.total_cmp(&cb)
            });
        }
        for i in initial {
            order[layers[i]].push(i);
        }

        // Neighbours one layer up / down, whatever the edge direction
        let mut upper: Vec<Vec<usize>> = vec![Vec::new(); children.len()];
        let mut lower: Vec<Vec<usize>> = vec![Vec::new(); children.len()];
        for &(s, t) in edges {
            let (top, bottom) = if layers[s] < layers[t] { (s, t) } else { (t, s) };
            if layers[bottom] == layers[top] + 1 {
                upper[bottom].push(top);
                lower[top].push(bottom);
            }
        }

        if !settings.interactive {
            let mut best = order.clone();
            let mut best_crossings = count_crossings(&order, &lower, children.len());
            for _ in 0..self.sweeps {
                for l in 1..layer_count {
                    sort_by_barycenter(&mut order, l, l - 1, &upper, children.len());
                }
                for l in (0..layer_count.saturating_sub(1)).rev() {
                    sort_by_barycenter(&mut order, l, l + 1, &lower, children.len());
                }
                let crossings = count_crossings(&order, &lower, children.len());
                if crossings >= best_crossings {
                    break;
                }
                best = order.clone();
                best_crossings = crossings;
            }
            order = best;
        }

        for &(source, target) in successor_hints {
            if layers[source] != layers[target] {
                continue;
            }
            let row = &mut order[layers[target]];
            row.retain(|&n| n != target);
            let at = row.iter().position(|&n| n == source).map_or(row.len(), |p| p + 1);
            row.insert(at, target);
        }

        order
    }
}

fn assign_layers(children: &[SolverNode], edges: &[(usize, usize)], settings: &Settings) -> Vec<usize> {
    let fixed: Vec<Option<usize>> = children
        .iter()
        .map(|c| {
            c.layout_options
                .get(keys::LAYER_CHOICE)
                .and_then(|v| v.parse().ok())
        })
        .collect();

    let mut layers: Vec<usize> = if settings.interactive {
        let bands = assign_bands(
            children
                .iter()
                .map(|c| (c.id.as_str(), settings.direction.axis(c.x, c.y))),
            settings.layer_spacing / 2.0,
        );
        children
            .iter()
            .map(|c| bands.get(&c.id).copied().unwrap_or(0))
            .collect()
    } else {
        vec![0; children.len()]
    };
    for (layer, pinned) in layers.iter_mut().zip(&fixed) {
        if let Some(pinned) = pinned {
            *layer = *pinned;
        }
    }

    // Longest path, bounded so a stray cycle cannot spin forever
    for _ in 0..children.len().max(1) {
        let mut changed = false;
        for &(s, t) in edges {
            if fixed[t].is_none() && layers[t] < layers[s] + 1 {
                layers[t] = layers[s] + 1;
                changed = true;
            }
        }
        if !changed {
            break;
        }
    }

    // Drop empty layers, keeping relative order
    let mut used: Vec<usize> = layers.clone();
    used.sort_unstable();
    used.dedup();
    let rank: HashMap<usize, usize> = used.into_iter().enumerate().map(|(i, l)| (l, i)).collect();
    layers.iter().map(|l| rank[l]).collect()
}

fn positions_in(order: &[Vec<usize>], node_count: usize) -> Vec<usize> {
    let mut position = vec![0; node_count];
    for row in order {
        for (i, &n) in row.iter().enumerate() {
            position[n] = i;
        }
    }
    position
}

fn sort_by_barycenter(
    order: &mut [Vec<usize>],
    layer: usize,
    reference: usize,
    neighbours: &[Vec<usize>],
    node_count: usize,
) {
    let position = positions_in(order, node_count);
    let key = |n: usize| -> f64 {
        let adjacent: Vec<f64> = neighbours[n]
            .iter()
            .filter(|&&m| order[reference].contains(&m))
            .map(|&m| position[m] as f64)
            .collect();
        if adjacent.is_empty() {
            position[n] as f64
        } else {
            adjacent.iter().sum::<f64>() / adjacent.len() as f64
        }
    };
    let mut keyed: Vec<(usize, f64)> = order[layer].iter().map(|&n| (n, key(n))).collect();
    keyed.sort_by(|a, b| a.1.total_cmp(&b.1));
    order[layer] = keyed.into_iter().map(|(n, _)| n).collect();
}

fn count_crossings(order: &[Vec<usize>], lower: &[Vec<usize>], node_count: usize) -> usize {
    let position = positions_in(order, node_count);
    let mut total = 0;
    for row in order {
        let segments: Vec<(usize, usize)> = row
            .iter()
            .flat_map(|&n| lower[n].iter().map(move |&m| (n, m)))
            .map(|(n, m)| (position[n], position[m]))
            .collect();
        for i in 0..segments.len() {
            for j in (i + 1)..segments.len() {
                let (a0, a1) = segments[i];
                let (b0, b1) = segments[j];
                if (a0 < b0 && a1 > b1) || (a0 > b0 && a1 < b1) {
                    total += 1;
                }
            }
        }
    }
    total
}

fn place(children: &[SolverNode], order: &[Vec<usize>], settings: &Settings) -> Vec<Position> {
    let mut positions = vec![Position::default(); children.len()];

    let cross_extent = |row: &Vec<usize>| -> f64 {
        let sizes: f64 = row.iter().map(|&n| settings.cross_size(&children[n])).sum();
        sizes + settings.node_spacing * row.len().saturating_sub(1) as f64
    };
    let widest = order.iter().map(cross_extent).fold(0.0, f64::max);

    let mut axis = PADDING;
    for row in order {
        let mut cross = PADDING + (widest - cross_extent(row)) / 2.0;
        let mut depth: f64 = 0.0;
        for &n in row {
            positions[n] = settings.direction.point(axis, cross);
            cross += settings.cross_size(&children[n]) + settings.node_spacing;
            depth = depth.max(settings.axis_size(&children[n]));
        }
        axis += depth + settings.layer_spacing;
    }

    positions
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::solver::SolverEdge;

    fn node(id: &str) -> SolverNode {
        SolverNode {
            id: id.to_string(),
            width: 100.0,
            height: 40.0,
            x: 0.0,
            y: 0.0,
            layout_options: BTreeMap::new(),
        }
    }

    fn edge(source: &str, target: &str) -> SolverEdge {
        SolverEdge {
            id: format!("{source}-{target}"),
            sources: vec![source.to_string()],
            targets: vec![target.to_string()],
        }
    }

    fn graph(children: Vec<SolverNode>, edges: Vec<SolverEdge>) -> SolverGraph {
        SolverGraph {
            id: "root".to_string(),
            layout_options: BTreeMap::new(),
            children,
            edges,
        }
    }

    #[test]
    fn test_longest_path_layers() {
        let solved = BuiltinLayeredSolver::default()
            .solve_now(graph(
                vec![node("a"), node("b"), node("c")],
                vec![edge("a", "b"), edge("b", "c"), edge("a", "c")],
            ))
            .unwrap();

        let y = |id: &str| solved.child(id).unwrap().y;
        assert_eq!(y("a"), PADDING);
        assert_eq!(y("b"), PADDING + 40.0 + 80.0);
        assert_eq!(y("c"), PADDING + 2.0 * (40.0 + 80.0));
    }

    #[test]
    fn test_right_direction_uses_x() {
        let mut g = graph(vec![node("a"), node("b")], vec![edge("a", "b")]);
        g.layout_options
            .insert(keys::DIRECTION.to_string(), "RIGHT".to_string());
        let solved = BuiltinLayeredSolver::default().solve_now(g).unwrap();

        assert_eq!(solved.child("a").unwrap().x, PADDING);
        assert_eq!(solved.child("b").unwrap().x, PADDING + 100.0 + 80.0);
        assert_eq!(solved.child("a").unwrap().y, solved.child("b").unwrap().y);
    }

    #[test]
    fn test_layer_choice_pins_node() {
        let mut b = node("b");
        b.layout_options
            .insert(keys::LAYER_CHOICE.to_string(), "0".to_string());
        b.layout_options
            .insert(keys::IN_LAYER_SUCC_OF.to_string(), "a".to_string());
        let solved = BuiltinLayeredSolver::default()
            .solve_now(graph(
                vec![b, node("a"), node("c")],
                vec![edge("a", "b"), edge("b", "c")],
            ))
            .unwrap();

        let a = solved.child("a").unwrap();
        let b = solved.child("b").unwrap();
        let c = solved.child("c").unwrap();
        assert_eq!(a.y, b.y);
        assert!(b.x > a.x);
        assert!(c.y > b.y);
    }

    #[test]
    fn test_barycenter_removes_crossing() {
        // a->d and b->c cross when c and d keep input order
        let solved = BuiltinLayeredSolver::default()
            .solve_now(graph(
                vec![node("a"), node("b"), node("c"), node("d")],
                vec![edge("a", "d"), edge("b", "c")],
            ))
            .unwrap();

        let x = |id: &str| solved.child(id).unwrap().x;
        assert_eq!(x("a") < x("b"), x("d") < x("c"));
    }

    #[test]
    fn test_interactive_keeps_bands_and_order() {
        let mut a = node("a");
        a.x = 300.0;
        let mut b = node("b");
        b.x = 10.0;
        b.y = 3.0;
        let mut c = node("c");
        c.y = 200.0;
        let mut g = graph(vec![a, b, c], vec![edge("a", "c")]);
        g.layout_options
            .insert(keys::INTERACTIVE_LAYOUT.to_string(), "true".to_string());
        let solved = BuiltinLayeredSolver::default().solve_now(g).unwrap();

        let a = solved.child("a").unwrap();
        let b = solved.child("b").unwrap();
        assert_eq!(a.y, b.y);
        assert!(b.x < a.x);
        assert!(solved.child("c").unwrap().y > a.y);
    }

    #[test]
    fn test_unknown_endpoint_rejected() {
        let result = BuiltinLayeredSolver::default().solve_now(graph(vec![node("a")], vec![edge("a", "ghost")]));
        assert!(matches!(result, Err(SolverError::Rejected(_))));
    }

    #[test]
    fn test_cycle_terminates() {
        let solved = BuiltinLayeredSolver::default()
            .solve_now(graph(vec![node("a"), node("b")], vec![edge("a", "b"), edge("b", "a")]))
            .unwrap();
        assert_eq!(solved.children.len(), 2);
    }
}

//! Same-rank grouping: components of same-rank edges and the in-layer hints they imply.

use std::collections::{HashMap, HashSet, VecDeque};

use crate::graph::Edge;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SameRankGroups {
    /// Node id -> component index, only for nodes touching a same-rank edge.
    pub partitions: HashMap<String, usize>,
    /// (source, target): target must follow source inside its layer.
    pub hints: Vec<(String, String)>,
}

impl SameRankGroups {
    pub fn build(edges: &[Edge]) -> Self {
        let mut order: Vec<&str> = Vec::new();
        let mut adjacency: HashMap<&str, Vec<&str>> = HashMap::new();
        let mut hints = Vec::new();

        for edge in edges.iter().filter(|e| e.same_rank && e.source != e.target) {
            let (s, t) = (edge.source.as_str(), edge.target.as_str());
            for id in [s, t] {
                if !adjacency.contains_key(id) {
                    order.push(id);
                    adjacency.insert(id, Vec::new());
                }
            }
            adjacency.entry(s).or_default().push(t);
            adjacency.entry(t).or_default().push(s);
            hints.push((s.to_string(), t.to_string()));
        }

        // Breadth-first over the undirected same-rank graph
        let mut partitions = HashMap::new();
        let mut visited: HashSet<&str> = HashSet::new();
        let mut component = 0;
        for &start in &order {
            if !visited.insert(start) {
                continue;
            }
            let mut queue = VecDeque::from([start]);
            while let Some(id) = queue.pop_front() {
                partitions.insert(id.to_string(), component);
                for &next in adjacency.get(id).map(|v| v.as_slice()).unwrap_or(&[]) {
                    if visited.insert(next) {
                        queue.push_back(next);
                    }
                }
            }
            component += 1;
        }

        Self { partitions, hints }
    }

    pub fn is_empty(&self) -> bool {
        self.hints.is_empty()
    }

    /// Exact layer each hinted target must occupy, given first-pass bands.
    ///
    /// A target takes its source's required layer when the source is itself
    /// constrained, otherwise the source's band, so chains collapse onto one layer.
    pub fn required_layers(&self, bands: &HashMap<String, usize>) -> HashMap<String, usize> {
        let mut required: HashMap<String, usize> = HashMap::new();
        for _ in 0..=self.hints.len() {
            let mut changed = false;
            for (source, target) in &self.hints {
                let Some(layer) = required
                    .get(source)
                    .or_else(|| bands.get(source))
                    .copied()
                else {
                    continue;
                };
                if required.get(target) != Some(&layer) {
                    required.insert(target.clone(), layer);
                    changed = true;
                }
            }
            if !changed {
                break;
            }
        }
        required
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn same_rank(source: &str, target: &str) -> Edge {
        let mut edge = Edge::new(format!("{source}-{target}"), source, target);
        edge.same_rank = true;
        edge
    }

    #[test]
    fn test_components_and_hints() {
        let edges = vec![
            same_rank("a", "b"),
            Edge::new("plain", "b", "x"),
            same_rank("c", "d"),
            same_rank("d", "b"),
            same_rank("e", "f"),
            same_rank("g", "g"),
        ];
        let groups = SameRankGroups::build(&edges);

        assert_eq!(groups.partitions["a"], groups.partitions["b"]);
        assert_eq!(groups.partitions["c"], groups.partitions["b"]);
        assert_eq!(groups.partitions["d"], groups.partitions["a"]);
        assert_ne!(groups.partitions["e"], groups.partitions["a"]);
        assert_eq!(groups.partitions["e"], groups.partitions["f"]);
        assert!(!groups.partitions.contains_key("x"));
        assert!(!groups.partitions.contains_key("g"));
        assert_eq!(groups.hints.len(), 4);
    }

    #[test]
    fn test_required_layers_follow_source_band() {
        let groups = SameRankGroups::build(&[same_rank("a", "b")]);
        let bands = HashMap::from([("a".to_string(), 0), ("b".to_string(), 1)]);
        assert_eq!(groups.required_layers(&bands)["b"], 0);
        assert!(!groups.required_layers(&bands).contains_key("a"));
    }

    #[test]
    fn test_required_layers_collapse_chains() {
        // listed out of order on purpose
        let groups = SameRankGroups::build(&[same_rank("b", "c"), same_rank("a", "b")]);
        let bands = HashMap::from([
            ("a".to_string(), 0),
            ("b".to_string(), 1),
            ("c".to_string(), 2),
        ]);
        let required = groups.required_layers(&bands);
        assert_eq!(required["b"], 0);
        assert_eq!(required["c"], 0);
    }

    #[test]
    fn test_no_same_rank_edges() {
        let groups = SameRankGroups::build(&[Edge::new("e", "a", "b")]);
        assert!(groups.is_empty());
        assert!(groups.partitions.is_empty());
    }
}

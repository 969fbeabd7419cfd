//! Conversion between the free-form graph and the strict IR tree.

use crate::graph::{Edge, Graph, Node, PROPERTY_LIST_FIELD, Role};
use crate::ir::{Func, GuideWord, Interpretation, Ir, IrError, Property, Realization, Task, TextItem};
use std::collections::{HashMap, HashSet};

/// Source of fresh node ids for IR elements that carry none.
pub trait IdGenerator {
    fn next_id(&mut self, role: Role) -> String;
}

impl<F> IdGenerator for F
where
    F: FnMut(Role) -> String,
{
    fn next_id(&mut self, role: Role) -> String {
        self(role)
    }
}

/// `<prefix><role>-<n>` with `n` counting up from 1 per generator.
#[derive(Debug, Clone, Default)]
pub struct SequentialIds {
    prefix: String,
    next: u64,
}

impl SequentialIds {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            next: 0,
        }
    }
}

impl IdGenerator for SequentialIds {
    fn next_id(&mut self, role: Role) -> String {
        self.next += 1;
        format!("{}{}-{}", self.prefix, role.as_str(), self.next)
    }
}

/// Children index over a graph snapshot.
/// Edges with a missing endpoint are dropped and repeated links collapse to one.
struct Adjacency<'a> {
    children: HashMap<&'a str, Vec<&'a Node>>,
    dropped: usize,
}

impl<'a> Adjacency<'a> {
    fn build(graph: &'a Graph) -> Self {
        let nodes: HashMap<&str, &Node> = graph.nodes.iter().map(|n| (n.id.as_str(), n)).collect();
        let mut children: HashMap<&str, Vec<&Node>> = HashMap::new();
        let mut links: HashSet<(&str, &str)> = HashSet::new();
        let mut dropped = 0;

        for edge in &graph.edges {
            let (Some(_), Some(&target)) = (
                nodes.get(edge.source.as_str()),
                nodes.get(edge.target.as_str()),
            ) else {
                dropped += 1;
                continue;
            };
            if !links.insert((edge.source.as_str(), edge.target.as_str())) {
                continue;
            }
            children.entry(edge.source.as_str()).or_default().push(target);
        }

        Self { children, dropped }
    }

    fn children(&self, id: &str) -> &[&'a Node] {
        self.children.get(id).map(|v| v.as_slice()).unwrap_or(&[])
    }

    /// Children of `id` playing `role`; anything else is a miswired edge and is skipped.
    fn children_with_role(&self, id: &str, role: Role) -> impl Iterator<Item = &'a Node> + '_ {
        self.children(id).iter().copied().filter(move |n| n.role == role)
    }

    /// Tasks under zones first, then tasks no zone claims.
    fn task_roots(&self, graph: &'a Graph) -> Vec<&'a Node> {
        let mut seen: HashSet<&str> = HashSet::new();
        let mut roots = Vec::new();

        for zone in graph.nodes.iter().filter(|n| n.role == Role::Zone) {
            for task in self.children_with_role(&zone.id, Role::Task) {
                if seen.insert(task.id.as_str()) {
                    roots.push(task);
                }
            }
        }
        for task in graph.nodes.iter().filter(|n| n.role == Role::Task) {
            if seen.insert(task.id.as_str()) {
                roots.push(task);
            }
        }
        roots
    }

    fn task(&self, node: &Node) -> Task {
        Task {
            id: Some(node.id.clone()),
            task_name: node.content().to_string(),
            functions: self
                .children_with_role(&node.id, Role::Function)
                .map(|n| self.func(n))
                .collect(),
        }
    }

    fn func(&self, node: &Node) -> Func {
        Func {
            id: Some(node.id.clone()),
            function_name: node.content().to_string(),
            realizations: self
                .children_with_role(&node.id, Role::Realization)
                .map(|n| self.realization(n))
                .collect(),
        }
    }

    fn realization(&self, node: &Node) -> Realization {
        Realization {
            id: Some(node.id.clone()),
            realization_name: node.content().to_string(),
            properties: self
                .children_with_role(&node.id, Role::Property)
                .map(|n| self.property(n))
                .collect(),
        }
    }

    fn property(&self, node: &Node) -> Property {
        Property {
            id: Some(node.id.clone()),
            properties: node
                .property_list()
                .unwrap_or_else(|| vec![node.content().to_string()]),
            interpretations: self
                .children_with_role(&node.id, Role::GuideWord)
                .map(|n| self.interpretation(n))
                .collect(),
        }
    }

    fn interpretation(&self, node: &Node) -> Interpretation {
        let mut interp = Interpretation {
            guide_word_id: Some(node.id.clone()),
            guide_word: GuideWord::normalize(node.content()),
            ..Default::default()
        };
        self.collect_evidence(node, &mut interp);
        interp
    }

    /// Walk forward through the evidence chain, one entry per path.
    fn collect_evidence(&self, from: &Node, interp: &mut Interpretation) {
        for &child in self.children(&from.id) {
            if !child.role.is_evidence() || child.role.depth() <= from.role.depth() {
                continue;
            }
            if let Some(list) = evidence_list(interp, child.role) {
                list.push(TextItem::new(child.id.clone(), child.content()));
            }
            self.collect_evidence(child, interp);
        }
    }
}

fn evidence_list(interp: &mut Interpretation, role: Role) -> Option<&mut Vec<TextItem>> {
    match role {
        Role::Deviation => Some(&mut interp.deviations),
        Role::Cause => Some(&mut interp.causes),
        Role::Consequence => Some(&mut interp.consequences),
        Role::Requirement => Some(&mut interp.requirements),
        Role::Zone
        | Role::Task
        | Role::Function
        | Role::Realization
        | Role::Property
        | Role::GuideWord => None,
    }
}

/// Build the validated IR tree from a (possibly incomplete) graph.
pub fn graph_to_ir(graph: &Graph) -> Result<Ir, IrError> {
    let adjacency = Adjacency::build(graph);
    let ir = Ir {
        tasks: adjacency
            .task_roots(graph)
            .into_iter()
            .map(|n| adjacency.task(n))
            .collect(),
    };
    ir.validate()?;

    tracing::debug!(
        tasks = ir.tasks.len(),
        dropped_edges = adjacency.dropped,
        "graph converted to IR"
    );
    Ok(ir)
}

struct GraphBuilder<'g, G: IdGenerator> {
    ids: &'g mut G,
    nodes: Vec<Node>,
    edges: Vec<Edge>,
    emitted: HashSet<String>,
    linked: HashSet<String>,
}

impl<'g, G: IdGenerator> GraphBuilder<'g, G> {
    fn emit(&mut self, id: Option<&str>, role: Role, content: &str, parent: Option<&str>) -> String {
        let id = match id {
            Some(id) => id.to_string(),
            None => self.ids.next_id(role),
        };
        if self.emitted.insert(id.clone()) {
            self.nodes.push(Node::new(id.clone(), role, content));
        }
        if let Some(parent) = parent {
            let edge_id = Edge::link_id(parent, &id);
            if self.linked.insert(edge_id.clone()) {
                self.edges.push(Edge::new(edge_id, parent, id.clone()));
            }
        }
        id
    }

    fn task(&mut self, task: &Task) {
        let id = self.emit(task.id.as_deref(), Role::Task, &task.task_name, None);
        for func in &task.functions {
            let fid = self.emit(
                func.id.as_deref(),
                Role::Function,
                &func.function_name,
                Some(id.as_str()),
            );
            for realization in &func.realizations {
                let rid = self.emit(
                    realization.id.as_deref(),
                    Role::Realization,
                    &realization.realization_name,
                    Some(fid.as_str()),
                );
                for property in &realization.properties {
                    self.property(property, &rid);
                }
            }
        }
    }

    fn property(&mut self, property: &Property, parent: &str) {
        let content = property.properties.join("\n");
        let pid = self.emit(property.id.as_deref(), Role::Property, &content, Some(parent));
        // A lone string is the content itself; anything else keeps the exact list
        if property.properties.len() != 1 {
            if let Some(node) = self.nodes.iter_mut().find(|n| n.id == pid) {
                node.data
                    .extra
                    .insert(PROPERTY_LIST_FIELD.to_string(), property.properties.clone().into());
            }
        }
        for interp in &property.interpretations {
            let gid = self.emit(
                interp.guide_word_id.as_deref(),
                Role::GuideWord,
                interp.guide_word.label(),
                Some(pid.as_str()),
            );
            // Each level hangs off the first item of the nearest non-empty level above it.
            let mut anchor = gid;
            for (role, items) in [
                (Role::Deviation, &interp.deviations),
                (Role::Cause, &interp.causes),
                (Role::Consequence, &interp.consequences),
                (Role::Requirement, &interp.requirements),
            ] {
                let mut first = None;
                for item in items {
                    let id = self.emit(item.id.as_deref(), role, &item.text, Some(anchor.as_str()));
                    first.get_or_insert(id);
                }
                if let Some(first) = first {
                    anchor = first;
                }
            }
        }
    }
}

/// Emit one node per IR element and one edge per parent/child pair.
pub fn ir_to_graph<G: IdGenerator>(ir: &Ir, ids: &mut G) -> Graph {
    let mut builder = GraphBuilder {
        ids,
        nodes: Vec::new(),
        edges: Vec::new(),
        emitted: HashSet::new(),
        linked: HashSet::new(),
    };
    for task in &ir.tasks {
        builder.task(task);
    }

    tracing::debug!(
        nodes = builder.nodes.len(),
        edges = builder.edges.len(),
        "IR converted to graph"
    );
    Graph::new(builder.nodes, builder.edges)
}

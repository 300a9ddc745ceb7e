use std::cmp::Ordering;
use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::geo::LatLng;

/// Identifier for a location node in the road graph.
pub type NodeId = String;

/// Minimum Jaro-Winkler similarity for a name to be offered as a suggestion.
const SUGGESTION_THRESHOLD: f64 = 0.8;

/// Category tag attached to a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeKind {
    #[default]
    Intersection,
    Pickup,
    Destination,
    Driver,
}

/// Two-dimensional position of a node, either abstract canvas coordinates or
/// a geographic point.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Position {
    Planar { x: f64, y: f64 },
    Geographic(LatLng),
}

/// Location vertex in the road graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    pub id: NodeId,
    pub name: String,
    pub position: Position,
    #[serde(default)]
    pub kind: NodeKind,
}

impl Node {
    /// Convenience constructor for an intersection on the abstract canvas.
    pub fn intersection(id: impl Into<String>, name: impl Into<String>, x: f64, y: f64) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            position: Position::Planar { x, y },
            kind: NodeKind::Intersection,
        }
    }
}

/// Directed road segment. Inserting one into a [`Graph`] also inserts its
/// reverse.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Edge {
    pub from: NodeId,
    pub to: NodeId,
    /// Traversal cost used by the path searches.
    pub weight: f64,
    pub distance: f64,
}

impl Edge {
    pub fn new(from: impl Into<String>, to: impl Into<String>, weight: f64, distance: f64) -> Self {
        Self {
            from: from.into(),
            to: to.into(),
            weight,
            distance,
        }
    }

    fn reversed(&self) -> Self {
        Self {
            from: self.to.clone(),
            to: self.from.clone(),
            weight: self.weight,
            distance: self.distance,
        }
    }
}

/// Weighted undirected road graph used by the dispatch searches.
#[derive(Debug, Clone, Default)]
pub struct Graph {
    nodes: HashMap<NodeId, Node>,
    adjacency: HashMap<NodeId, Vec<Edge>>,
}

impl Graph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or overwrite a node, ensuring it has an adjacency entry.
    pub fn add_node(&mut self, node: Node) {
        self.adjacency.entry(node.id.clone()).or_default();
        self.nodes.insert(node.id.clone(), node);
    }

    /// Append `edge` and its reverse. Endpoints are not required to exist, and
    /// parallel edges between the same pair are kept.
    pub fn add_edge(&mut self, edge: Edge) {
        let reverse = edge.reversed();
        self.adjacency
            .entry(edge.from.clone())
            .or_default()
            .push(edge);
        self.adjacency
            .entry(reverse.from.clone())
            .or_default()
            .push(reverse);
    }

    /// Return the outgoing edges for a node, including synthesized reverse
    /// edges. Unknown nodes have no neighbours.
    pub fn neighbours(&self, node: &str) -> &[Edge] {
        self.adjacency
            .get(node)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn node(&self, id: &str) -> Option<&Node> {
        self.nodes.get(id)
    }

    pub fn contains_node(&self, id: &str) -> bool {
        self.nodes.contains_key(id)
    }

    /// Display name of a node, if it exists.
    pub fn node_name(&self, id: &str) -> Option<&str> {
        self.nodes.get(id).map(|node| node.name.as_str())
    }

    /// All nodes ordered by id.
    pub fn nodes(&self) -> Vec<&Node> {
        let mut nodes: Vec<&Node> = self.nodes.values().collect();
        nodes.sort_by(|a, b| a.id.cmp(&b.id));
        nodes
    }

    /// Every stored edge, reverse edges included.
    pub fn edges(&self) -> impl Iterator<Item = &Edge> {
        self.adjacency.values().flatten()
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Reassign the category tag of an existing node.
    pub fn set_node_kind(&mut self, id: &str, kind: NodeKind) -> Result<()> {
        let Some(node) = self.nodes.get_mut(id) else {
            return Err(self.unknown_node(id));
        };
        node.kind = kind;
        Ok(())
    }

    /// Resolve a node by id or (case-insensitive) display name.
    pub fn resolve_node(&self, query: &str) -> Result<NodeId> {
        if self.nodes.contains_key(query) {
            return Ok(query.to_string());
        }
        self.nodes
            .values()
            .find(|node| node.name.eq_ignore_ascii_case(query))
            .map(|node| node.id.clone())
            .ok_or_else(|| self.unknown_node(query))
    }

    /// Return up to `limit` node names similar to `query`, best match first.
    pub fn fuzzy_node_matches(&self, query: &str, limit: usize) -> Vec<String> {
        let needle = query.to_lowercase();
        let mut scored: Vec<(f64, &str)> = self
            .nodes
            .values()
            .map(|node| {
                let score = strsim::jaro_winkler(&needle, &node.name.to_lowercase());
                (score, node.name.as_str())
            })
            .filter(|(score, _)| *score >= SUGGESTION_THRESHOLD)
            .collect();

        scored.sort_by(|a, b| {
            b.0.partial_cmp(&a.0)
                .unwrap_or(Ordering::Equal)
                .then_with(|| a.1.cmp(b.1))
        });
        scored
            .into_iter()
            .take(limit)
            .map(|(_, name)| name.to_string())
            .collect()
    }

    pub(crate) fn unknown_node(&self, id: &str) -> Error {
        Error::UnknownNode {
            id: id.to_string(),
            suggestions: self.fuzzy_node_matches(id, 3),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn add_node_overwrites_and_keeps_edges() {
        let mut graph = Graph::new();
        graph.add_node(Node::intersection("A", "Downtown", 0.0, 0.0));
        graph.add_edge(Edge::new("A", "B", 5.0, 5.0));
        graph.add_node(Node::intersection("A", "Old Town", 1.0, 1.0));

        assert_eq!(graph.node_name("A"), Some("Old Town"));
        assert_eq!(graph.neighbours("A").len(), 1);
        assert_eq!(graph.node_count(), 1);
    }

    #[test]
    fn parallel_edges_are_not_deduplicated() {
        let mut graph = Graph::new();
        graph.add_edge(Edge::new("A", "B", 5.0, 5.0));
        graph.add_edge(Edge::new("A", "B", 2.0, 3.0));

        assert_eq!(graph.neighbours("A").len(), 2);
        assert_eq!(graph.neighbours("B").len(), 2);
        assert_eq!(graph.edges().count(), 4);
    }

    #[test]
    fn resolve_node_accepts_id_or_name() {
        let mut graph = Graph::new();
        graph.add_node(Node::intersection("A", "Downtown", 0.0, 0.0));

        assert_eq!(graph.resolve_node("A").unwrap(), "A");
        assert_eq!(graph.resolve_node("downtown").unwrap(), "A");

        let err = graph.resolve_node("Dowtown").unwrap_err();
        assert!(err.to_string().contains("Did you mean 'Downtown'?"));
    }

    #[test]
    fn set_node_kind_rejects_unknown_node() {
        let mut graph = Graph::new();
        graph.add_node(Node::intersection("A", "Downtown", 0.0, 0.0));

        graph.set_node_kind("A", NodeKind::Pickup).unwrap();
        assert_eq!(graph.node("A").unwrap().kind, NodeKind::Pickup);
        assert!(graph.set_node_kind("Z", NodeKind::Pickup).is_err());
    }
}

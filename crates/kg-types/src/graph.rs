//! Graph model: nodes, edges, paths, subgraphs, and statistics.

use crate::{Cardinality, JoinKind, RelationKind};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, HashSet};

/// Category of a graph node. The builder only emits `Table`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeKind {
    #[default]
    Table,
    Column,
    View,
    Database,
}

impl NodeKind {
    pub fn as_str(self) -> &'static str {
        match self {
            NodeKind::Table => "table",
            NodeKind::Column => "column",
            NodeKind::View => "view",
            NodeKind::Database => "database",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "table" => Some(NodeKind::Table),
            "column" => Some(NodeKind::Column),
            "view" => Some(NodeKind::View),
            "database" => Some(NodeKind::Database),
            _ => None,
        }
    }
}

/// Presentation hints for a node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeStyle {
    pub size: u32,
    pub color: String,
    pub shape: String,
}

impl Default for NodeStyle {
    fn default() -> Self {
        Self {
            size: 30,
            color: "#3498db".to_string(),
            shape: "ellipse".to_string(),
        }
    }
}

/// A node in the schema graph (one per table).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphNode {
    pub id: String,
    pub label: String,
    pub kind: NodeKind,
    #[serde(default)]
    pub properties: HashMap<String, serde_json::Value>,
    #[serde(default)]
    pub style: NodeStyle,
}

impl GraphNode {
    /// Semantic labels stored under the `semantic_labels` property.
    pub fn semantic_labels(&self) -> Vec<String> {
        self.properties
            .get("semantic_labels")
            .and_then(|v| v.as_array())
            .map(|a| {
                a.iter()
                    .filter_map(|v| v.as_str().map(str::to_string))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Append labels not already present; returns how many were added.
    pub fn append_semantic_labels(&mut self, labels: &[String]) -> usize {
        let mut current = self.semantic_labels();
        let before = current.len();
        for label in labels {
            if !current.contains(label) {
                current.push(label.clone());
            }
        }
        let added = current.len() - before;
        if added > 0 {
            self.properties
                .insert("semantic_labels".to_string(), serde_json::json!(current));
        }
        added
    }
}

/// Solid or dashed edge rendering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LineStyle {
    #[default]
    Solid,
    Dashed,
}

/// Presentation hints for an edge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EdgeStyle {
    pub width: u32,
    pub color: String,
    pub line: LineStyle,
}

impl Default for EdgeStyle {
    fn default() -> Self {
        Self {
            width: 2,
            color: "#95a5a6".to_string(),
            line: LineStyle::Solid,
        }
    }
}

/// Relation fields carried on an edge.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EdgeProperties {
    pub from_table: String,
    pub from_column: String,
    pub to_table: String,
    pub to_column: String,
    #[serde(default, rename = "join_type")]
    pub join_kind: JoinKind,
    #[serde(default)]
    pub cardinality: Cardinality,
    pub confidence: f64,
    #[serde(default)]
    pub inferred: bool,
    /// Source and target are the same table.
    #[serde(default)]
    pub hierarchical: bool,
}

/// A directed edge from the owning table to the referenced table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphEdge {
    pub id: String,
    pub source: String,
    pub target: String,
    pub kind: RelationKind,
    pub label: String,
    pub properties: EdgeProperties,
    pub weight: f64,
    #[serde(default)]
    pub style: EdgeStyle,
}

impl GraphEdge {
    /// Endpoint opposite to `node_id`, if the edge touches it.
    pub fn other_end(&self, node_id: &str) -> Option<&str> {
        if self.source == node_id {
            Some(&self.target)
        } else if self.target == node_id {
            Some(&self.source)
        } else {
            None
        }
    }
}

/// A path through the graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphPath {
    pub nodes: Vec<String>,
    /// Table names for `nodes`, same order.
    pub labels: Vec<String>,
    pub edges: Vec<GraphEdge>,
    pub length: usize,
    pub total_weight: f64,
    #[serde(default)]
    pub explanation: String,
    #[serde(default)]
    pub sql_join_hint: String,
}

impl GraphPath {
    pub fn new(nodes: Vec<String>, labels: Vec<String>, edges: Vec<GraphEdge>) -> Self {
        let total_weight = edges.iter().map(|e| e.weight).sum();
        Self {
            length: edges.len(),
            nodes,
            labels,
            edges,
            total_weight,
            explanation: String::new(),
            sql_join_hint: String::new(),
        }
    }
}

/// Nodes and edges around a center node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Subgraph {
    pub nodes: Vec<GraphNode>,
    pub edges: Vec<GraphEdge>,
    pub center_node: String,
    pub depth: usize,
}

/// Aggregate counts over the stored graph.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct GraphStatistics {
    pub node_count: usize,
    pub edge_count: usize,
    pub table_count: usize,
    pub column_count: usize,
    pub relation_kind_counts: BTreeMap<String, usize>,
    pub is_connected: bool,
    pub density: f64,
    pub avg_degree: f64,
}

impl GraphStatistics {
    /// Compute statistics from a full node/edge listing.
    pub fn from_graph(nodes: &[GraphNode], edges: &[GraphEdge]) -> Self {
        let node_count = nodes.len();
        let edge_count = edges.len();
        let mut relation_kind_counts = BTreeMap::new();
        for edge in edges {
            *relation_kind_counts
                .entry(edge.kind.as_str().to_string())
                .or_insert(0) += 1;
        }
        let density = if node_count > 1 {
            edge_count as f64 / (node_count * (node_count - 1)) as f64
        } else {
            0.0
        };
        let avg_degree = if node_count > 0 {
            2.0 * edge_count as f64 / node_count as f64
        } else {
            0.0
        };
        Self {
            node_count,
            edge_count,
            table_count: nodes.iter().filter(|n| n.kind == NodeKind::Table).count(),
            column_count: nodes.iter().filter(|n| n.kind == NodeKind::Column).count(),
            relation_kind_counts,
            is_connected: is_connected(nodes, edges),
            density,
            avg_degree,
        }
    }
}

fn is_connected(nodes: &[GraphNode], edges: &[GraphEdge]) -> bool {
    let Some(first) = nodes.first() else {
        return true;
    };
    let mut adjacency: HashMap<&str, Vec<&str>> = HashMap::new();
    for edge in edges {
        adjacency.entry(&edge.source).or_default().push(&edge.target);
        adjacency.entry(&edge.target).or_default().push(&edge.source);
    }
    let mut seen: HashSet<&str> = HashSet::new();
    let mut stack = vec![first.id.as_str()];
    while let Some(id) = stack.pop() {
        if !seen.insert(id) {
            continue;
        }
        if let Some(next) = adjacency.get(id) {
            stack.extend(next.iter().copied().filter(|n| !seen.contains(n)));
        }
    }
    nodes.iter().all(|n| seen.contains(n.id.as_str()))
}

/// Outcome of a batch write, for build-time auditing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct WriteSummary {
    /// Records that did not exist before.
    pub created: usize,
    /// Records that replaced an existing id.
    pub updated: usize,
    /// Records rejected (edges whose endpoints are missing).
    pub skipped: usize,
}

impl WriteSummary {
    pub fn written(&self) -> usize {
        self.created + self.updated
    }

    pub fn absorb(&mut self, other: WriteSummary) {
        self.created += other.created;
        self.updated += other.updated;
        self.skipped += other.skipped;
    }
}

/// Edge direction relative to a table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    In,
    Out,
    #[default]
    Both,
}

impl Direction {
    pub fn as_str(self) -> &'static str {
        match self {
            Direction::In => "in",
            Direction::Out => "out",
            Direction::Both => "both",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "in" => Some(Direction::In),
            "out" => Some(Direction::Out),
            "both" => Some(Direction::Both),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn node(id: &str) -> GraphNode {
        GraphNode {
            id: id.to_string(),
            label: id.to_string(),
            kind: NodeKind::Table,
            properties: HashMap::new(),
            style: NodeStyle::default(),
        }
    }

    fn edge(from: &str, to: &str, kind: RelationKind) -> GraphEdge {
        GraphEdge {
            id: format!("{}->{}", from, to),
            source: from.to_string(),
            target: to.to_string(),
            kind,
            label: String::new(),
            properties: EdgeProperties {
                from_table: from.to_string(),
                from_column: "x_id".to_string(),
                to_table: to.to_string(),
                to_column: "id".to_string(),
                join_kind: JoinKind::Inner,
                cardinality: Cardinality::ManyToOne,
                confidence: 1.0,
                inferred: false,
                hierarchical: false,
            },
            weight: 1.0,
            style: EdgeStyle::default(),
        }
    }

    #[test]
    fn statistics_count_kinds_and_connectivity() {
        let nodes = vec![node("a"), node("b"), node("c")];
        let edges = vec![
            edge("a", "b", RelationKind::ForeignKey),
            edge("b", "c", RelationKind::Semantic),
        ];
        let stats = GraphStatistics::from_graph(&nodes, &edges);
        assert_eq!(stats.node_count, 3);
        assert_eq!(stats.edge_count, 2);
        assert_eq!(stats.table_count, 3);
        assert_eq!(stats.relation_kind_counts.get("foreign_key"), Some(&1));
        assert_eq!(stats.relation_kind_counts.get("semantic"), Some(&1));
        assert!(stats.is_connected);

        let split = GraphStatistics::from_graph(&nodes, &edges[..1]);
        assert!(!split.is_connected);
    }

    #[test]
    fn append_semantic_labels_skips_duplicates() {
        let mut n = node("a");
        assert_eq!(n.append_semantic_labels(&["销售域".to_string()]), 1);
        assert_eq!(
            n.append_semantic_labels(&["销售域".to_string(), "大规模".to_string()]),
            1
        );
        assert_eq!(n.semantic_labels(), vec!["销售域", "大规模"]);
    }
}

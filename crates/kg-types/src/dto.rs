//! Build and query result DTOs.

use crate::{Cardinality, Direction, EdgeProperties, GraphPath, GraphStatistics, JoinKind, RelationKind};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Outcome of one `build_graph` call. Failures are reported here, not raised.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BuildResult {
    pub success: bool,
    pub nodes_created: usize,
    pub edges_created: usize,
    pub labels_added: usize,
    pub tables_processed: usize,
    pub relations_processed: usize,
    /// Relations dropped because an endpoint table was not in the node set.
    pub relations_skipped: usize,
    pub build_time_ms: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

/// Counts reported by the enricher.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnrichmentStats {
    pub nodes_added: usize,
    pub edges_added: usize,
    pub labels_added: usize,
}

/// One edge of a returned path.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PathEdgeView {
    pub source: String,
    pub target: String,
    pub label: String,
    pub relation_type: RelationKind,
    pub properties: EdgeProperties,
}

/// Path payload of a path query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PathView {
    pub nodes: Vec<String>,
    pub length: usize,
    pub total_weight: f64,
    pub edges: Vec<PathEdgeView>,
}

impl From<&GraphPath> for PathView {
    fn from(path: &GraphPath) -> Self {
        Self {
            nodes: path.nodes.clone(),
            length: path.length,
            total_weight: path.total_weight,
            edges: path
                .edges
                .iter()
                .map(|e| PathEdgeView {
                    source: e.source.clone(),
                    target: e.target.clone(),
                    label: e.label.clone(),
                    relation_type: e.kind,
                    properties: e.properties.clone(),
                })
                .collect(),
        }
    }
}

/// Result of a shortest-path query. `found = false` is a normal outcome.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PathQueryResponse {
    pub found: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<PathView>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub explanation: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sql_hint: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub execution_time_ms: f64,
}

/// A neighboring table with the relation that links it to the center.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NeighborEntry {
    pub related_table: String,
    pub relation: String,
    pub relation_kind: String,
    pub direction: Direction,
    pub from_column: String,
    pub to_column: String,
    pub cardinality: Cardinality,
    pub join_kind: JoinKind,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NeighborQueryResponse {
    pub center_table: String,
    pub neighbors: Vec<NeighborEntry>,
    pub depth: usize,
    pub total_count: usize,
    pub execution_time_ms: f64,
}

/// One relation touching a table, from that table's point of view.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RelationEntry {
    pub related_table: String,
    pub from_column: String,
    pub to_column: String,
    pub relation_kind: RelationKind,
    pub direction: Direction,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatisticsResponse {
    pub node_count: usize,
    pub edge_count: usize,
    pub table_count: usize,
    pub column_count: usize,
    pub relation_kind_counts: BTreeMap<String, usize>,
    pub is_connected: bool,
    pub density: f64,
    pub avg_degree: f64,
    pub execution_time_ms: f64,
}

impl StatisticsResponse {
    pub fn new(stats: GraphStatistics, execution_time_ms: f64) -> Self {
        Self {
            node_count: stats.node_count,
            edge_count: stats.edge_count,
            table_count: stats.table_count,
            column_count: stats.column_count,
            relation_kind_counts: stats.relation_kind_counts,
            is_connected: stats.is_connected,
            density: stats.density,
            avg_degree: stats.avg_degree,
            execution_time_ms,
        }
    }
}

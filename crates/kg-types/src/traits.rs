//! Traits for graph storage backends and schema extractors.

use crate::{
    GraphEdge, GraphNode, GraphPath, GraphStatistics, RelationKind, Subgraph, TableModel,
    TableRelationModel, WriteSummary,
};
use async_trait::async_trait;

/// Upper bound on nodes returned by a neighbor query.
pub const NEIGHBOR_RESULT_LIMIT: usize = 100;

/// Graph store abstraction. Writes are upserts by id.
///
/// Traversals treat edges as undirected. `Ok(None)` means "not found"; `Err` means the
/// store itself failed.
#[async_trait]
pub trait GraphStore: Send + Sync {
    /// Create schema, constraints and indexes. Idempotent.
    async fn initialize(&self) -> Result<(), GraphStoreError> {
        Ok(())
    }

    /// Add or replace a single node.
    async fn add_node(&self, node: &GraphNode) -> Result<(), GraphStoreError>;

    /// Add or replace multiple nodes.
    async fn add_nodes_batch(&self, nodes: &[GraphNode]) -> Result<WriteSummary, GraphStoreError>;

    /// Get one node by id.
    async fn get_node(&self, id: &str) -> Result<Option<GraphNode>, GraphStoreError>;

    /// All nodes, ordered by id.
    async fn get_all_nodes(&self) -> Result<Vec<GraphNode>, GraphStoreError>;

    /// Add or replace a single edge. Fails when either endpoint is missing.
    async fn add_edge(&self, edge: &GraphEdge) -> Result<(), GraphStoreError>;

    /// Add or replace multiple edges. Edges with a missing endpoint are skipped and counted.
    async fn add_edges_batch(&self, edges: &[GraphEdge]) -> Result<WriteSummary, GraphStoreError>;

    /// All edges, ordered by id.
    async fn get_all_edges(&self) -> Result<Vec<GraphEdge>, GraphStoreError>;

    /// Delete every node and edge.
    async fn clear(&self) -> Result<(), GraphStoreError>;

    /// Fewest-hops path within `max_hops`, optionally restricted to relation kinds.
    async fn find_shortest_path(
        &self,
        start_id: &str,
        end_id: &str,
        max_hops: usize,
        kinds: Option<&[RelationKind]>,
    ) -> Result<Option<GraphPath>, GraphStoreError>;

    /// Distinct nodes within `depth` hops, excluding the center, capped at
    /// [`NEIGHBOR_RESULT_LIMIT`].
    async fn find_neighbors(
        &self,
        id: &str,
        depth: usize,
        kinds: Option<&[RelationKind]>,
    ) -> Result<Vec<GraphNode>, GraphStoreError>;

    /// Center node plus nodes and edges on paths of up to `depth` hops.
    async fn get_subgraph(&self, center_id: &str, depth: usize)
        -> Result<Subgraph, GraphStoreError>;

    /// Aggregate counts.
    async fn get_statistics(&self) -> Result<GraphStatistics, GraphStoreError>;
}

/// Tables and relations produced by one extractor.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExtractionOutput {
    pub tables: Vec<TableModel>,
    pub relations: Vec<TableRelationModel>,
    pub table_count: usize,
    pub relation_count: usize,
}

impl ExtractionOutput {
    pub fn new(tables: Vec<TableModel>, relations: Vec<TableRelationModel>) -> Self {
        Self {
            table_count: tables.len(),
            relation_count: relations.len(),
            tables,
            relations,
        }
    }
}

/// Contract for metadata sources (database catalogs, static schema definitions).
#[async_trait]
pub trait SchemaExtractor: Send + Sync {
    /// Name used in logs and failure reports.
    fn name(&self) -> &str;

    /// Open the source. A failure is returned, never swallowed.
    async fn connect(&mut self) -> Result<(), ExtractorError>;

    async fn disconnect(&mut self);

    /// Whether the source is reachable right now.
    async fn validate_connection(&self) -> bool;

    async fn extract_tables(&self) -> Result<Vec<TableModel>, ExtractorError>;

    async fn extract_relations(&self) -> Result<Vec<TableRelationModel>, ExtractorError>;

    /// Tables and relations in one call.
    async fn extract_all(&self) -> Result<ExtractionOutput, ExtractorError> {
        let tables = self.extract_tables().await?;
        let relations = self.extract_relations().await?;
        Ok(ExtractionOutput::new(tables, relations))
    }
}

#[derive(Debug, thiserror::Error)]
pub enum GraphStoreError {
    #[error("graph store error: {0}")]
    Backend(String),
    #[error("node not found: {0}")]
    NodeNotFound(String),
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

#[derive(Debug, thiserror::Error)]
pub enum ExtractorError {
    #[error("connection to {source_name} failed: {reason}")]
    Connection { source_name: String, reason: String },
    #[error("extraction from {source_name} failed: {reason}")]
    Extraction { source_name: String, reason: String },
}

#[derive(Debug, thiserror::Error)]
pub enum SchemaError {
    #[error("table {table}: primary key {column} is not a column")]
    UnknownPrimaryKey { table: String, column: String },
}

#[derive(Debug, thiserror::Error)]
pub enum QueryError {
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    #[error("graph: {0}")]
    Store(#[from] GraphStoreError),
}

#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("no schema source configured")]
    NoSources,
    #[error("every configured schema source failed: {}", .0.join(", "))]
    AllSourcesFailed(Vec<String>),
    #[error("extractor: {0}")]
    Extractor(#[from] ExtractorError),
    #[error("unknown merge policy: {0}")]
    UnknownPolicy(String),
    #[error("graph build failed: {0}")]
    Build(String),
    #[error("graph: {0}")]
    Store(#[from] GraphStoreError),
}

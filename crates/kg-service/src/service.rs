//! Table-level queries over a graph store.

use crate::explain::{explain_path, sql_join_hint};
use kg_types::{
    Direction, GraphNode, GraphEdge, GraphStore, NeighborEntry, NeighborQueryResponse,
    PathQueryResponse, PathView, QueryConfig, QueryError, RelationEntry, RelationKind,
    StatisticsResponse,
};
use std::sync::Arc;
use std::time::Instant;

fn elapsed_ms(started: Instant) -> f64 {
    started.elapsed().as_secs_f64() * 1000.0
}

/// Translates table names to node ids and shapes store results for callers.
///
/// Read-only; any number of queries may run at once.
pub struct GraphQueryService {
    store: Arc<dyn GraphStore>,
    config: QueryConfig,
}

impl GraphQueryService {
    pub fn new(store: Arc<dyn GraphStore>, config: QueryConfig) -> Self {
        Self { store, config }
    }

    pub fn config(&self) -> &QueryConfig {
        &self.config
    }

    /// Node for a table name: `table:{name}` first, then `name` as an id, then the first
    /// node (by id) whose label is `name`.
    pub async fn get_node(&self, table: &str) -> Result<Option<GraphNode>, QueryError> {
        let table = table.trim();
        if table.is_empty() {
            return Err(QueryError::InvalidArgument(
                "table name must not be empty".to_string(),
            ));
        }
        if let Some(node) = self.store.get_node(&format!("table:{}", table)).await? {
            return Ok(Some(node));
        }
        if let Some(node) = self.store.get_node(table).await? {
            return Ok(Some(node));
        }
        let nodes = self.store.get_all_nodes().await?;
        Ok(nodes.into_iter().find(|n| n.label == table))
    }

    pub async fn node_exists(&self, table: &str) -> Result<bool, QueryError> {
        Ok(self.get_node(table).await?.is_some())
    }

    async fn resolve(&self, table: &str) -> Result<Option<String>, QueryError> {
        Ok(self.get_node(table).await?.map(|n| n.id))
    }

    /// Shortest path between two tables. `found = false` when either table is unknown or no
    /// path exists within `max_hops` (default from config).
    pub async fn find_shortest_path(
        &self,
        start_table: &str,
        end_table: &str,
        max_hops: Option<usize>,
        kinds: Option<&[RelationKind]>,
    ) -> Result<PathQueryResponse, QueryError> {
        let started = Instant::now();
        let max_hops = max_hops.unwrap_or(self.config.default_max_hops);

        let not_found = |message: String| PathQueryResponse {
            found: false,
            path: None,
            explanation: None,
            sql_hint: None,
            message: Some(message),
            execution_time_ms: elapsed_ms(started),
        };

        let Some(start_id) = self.resolve(start_table).await? else {
            return Ok(not_found(format!("Table '{}' not found", start_table)));
        };
        let Some(end_id) = self.resolve(end_table).await? else {
            return Ok(not_found(format!("Table '{}' not found", end_table)));
        };

        let path = self
            .store
            .find_shortest_path(&start_id, &end_id, max_hops, kinds)
            .await?;
        let Some(mut path) = path else {
            tracing::debug!(start = start_table, end = end_table, max_hops, "No path found");
            return Ok(not_found(format!(
                "No path found between '{}' and '{}' within {} hops",
                start_table, end_table, max_hops
            )));
        };

        path.explanation = explain_path(&path);
        path.sql_join_hint = sql_join_hint(&path);
        let execution_time_ms = elapsed_ms(started);
        tracing::debug!(
            start = start_table,
            end = end_table,
            length = path.length,
            execution_time_ms,
            "Path query"
        );
        Ok(PathQueryResponse {
            found: true,
            path: Some(PathView::from(&path)),
            explanation: Some(path.explanation),
            sql_hint: Some(path.sql_join_hint),
            message: None,
            execution_time_ms,
        })
    }

    /// Neighbor tables within `depth` hops as nodes, capped by the store.
    pub async fn find_neighbor_nodes(
        &self,
        table: &str,
        depth: usize,
        kinds: Option<&[RelationKind]>,
    ) -> Result<Vec<GraphNode>, QueryError> {
        let Some(id) = self.resolve(table).await? else {
            return Ok(Vec::new());
        };
        Ok(self.store.find_neighbors(&id, depth, kinds).await?)
    }

    /// Relations touching the table within the subgraph of `depth`, one entry per edge.
    pub async fn find_neighbors(
        &self,
        table: &str,
        depth: usize,
        kinds: Option<&[RelationKind]>,
        max_results: Option<usize>,
    ) -> Result<NeighborQueryResponse, QueryError> {
        let started = Instant::now();
        let max_results = max_results.unwrap_or(self.config.max_results);
        let mut neighbors = Vec::new();

        if let Some(center) = self.get_node(table).await? {
            let sub = self.store.get_subgraph(&center.id, depth).await?;
            let label_of = |id: &str| {
                sub.nodes
                    .iter()
                    .find(|n| n.id == id)
                    .map(|n| n.label.clone())
                    .unwrap_or_else(|| id.to_string())
            };
            for edge in &sub.edges {
                if kinds.is_some_and(|ks| !ks.contains(&edge.kind)) {
                    continue;
                }
                let (related, direction) = if edge.source == center.id {
                    (&edge.target, Direction::Out)
                } else if edge.target == center.id {
                    (&edge.source, Direction::In)
                } else {
                    continue;
                };
                neighbors.push(neighbor_entry(edge, label_of(related), direction));
                if neighbors.len() >= max_results {
                    break;
                }
            }
        }

        Ok(NeighborQueryResponse {
            center_table: table.to_string(),
            total_count: neighbors.len(),
            neighbors,
            depth,
            execution_time_ms: elapsed_ms(started),
        })
    }

    /// Every edge touching the table, scanned from the full edge list.
    pub async fn get_relations_for_table(
        &self,
        table: &str,
        direction: Direction,
    ) -> Result<Vec<RelationEntry>, QueryError> {
        let Some(center) = self.get_node(table).await? else {
            return Ok(Vec::new());
        };
        let nodes = self.store.get_all_nodes().await?;
        let label_of = |id: &str| {
            nodes
                .iter()
                .find(|n| n.id == id)
                .map(|n| n.label.clone())
                .unwrap_or_else(|| id.to_string())
        };
        let mut out = Vec::new();
        for edge in self.store.get_all_edges().await? {
            let entry = |related: &str, dir: Direction| RelationEntry {
                related_table: label_of(related),
                from_column: edge.properties.from_column.clone(),
                to_column: edge.properties.to_column.clone(),
                relation_kind: edge.kind,
                direction: dir,
            };
            if matches!(direction, Direction::In | Direction::Both) && edge.target == center.id {
                out.push(entry(&edge.source, Direction::In));
            }
            if matches!(direction, Direction::Out | Direction::Both) && edge.source == center.id {
                out.push(entry(&edge.target, Direction::Out));
            }
        }
        Ok(out)
    }

    pub async fn get_statistics(&self) -> Result<StatisticsResponse, QueryError> {
        let started = Instant::now();
        let stats = self.store.get_statistics().await?;
        Ok(StatisticsResponse::new(stats, elapsed_ms(started)))
    }

    pub async fn get_all_nodes(&self) -> Result<Vec<GraphNode>, QueryError> {
        Ok(self.store.get_all_nodes().await?)
    }

    pub async fn get_all_edges(&self) -> Result<Vec<GraphEdge>, QueryError> {
        Ok(self.store.get_all_edges().await?)
    }
}

fn neighbor_entry(edge: &GraphEdge, related_table: String, direction: Direction) -> NeighborEntry {
    NeighborEntry {
        related_table,
        relation: edge.label.clone(),
        relation_kind: edge.kind.as_str().to_string(),
        direction,
        from_column: edge.properties.from_column.clone(),
        to_column: edge.properties.to_column.clone(),
        cardinality: edge.properties.cardinality,
        join_kind: edge.properties.join_kind,
    }
}

//! In-memory graph store.

use crate::traversal::{self, Adjacency};
use kg_types::{
    GraphEdge, GraphNode, GraphPath, GraphStatistics, GraphStore, GraphStoreError, RelationKind,
    Subgraph, WriteSummary, NEIGHBOR_RESULT_LIMIT,
};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::RwLock;

type EdgeIndex = HashMap<String, Vec<String>>;

/// In-memory implementation of GraphStore.
/// Nodes and edges are keyed by id; edges are additionally indexed by both endpoints.
pub struct InMemoryGraphStore {
    /// node_id -> node.
    nodes: Arc<RwLock<HashMap<String, GraphNode>>>,
    /// edge_id -> edge.
    edges: Arc<RwLock<HashMap<String, GraphEdge>>>,
    /// source node_id -> edge_ids.
    out_index: Arc<RwLock<EdgeIndex>>,
    /// target node_id -> edge_ids.
    in_index: Arc<RwLock<EdgeIndex>>,
}

impl InMemoryGraphStore {
    pub fn new() -> Self {
        Self {
            nodes: Arc::new(RwLock::new(HashMap::new())),
            edges: Arc::new(RwLock::new(HashMap::new())),
            out_index: Arc::new(RwLock::new(HashMap::new())),
            in_index: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    fn add_edge_to_index(index: &mut EdgeIndex, node_id: &str, edge_id: &str) {
        let list = index.entry(node_id.to_string()).or_default();
        if !list.iter().any(|x| x == edge_id) {
            list.push(edge_id.to_string());
        }
    }

    fn remove_edge_from_index(index: &mut EdgeIndex, node_id: &str, edge_id: &str) {
        if let Some(list) = index.get_mut(node_id) {
            list.retain(|x| x != edge_id);
            if list.is_empty() {
                index.remove(node_id);
            }
        }
    }

    /// Insert or replace an edge, keeping both indexes in step. Returns true when new.
    fn upsert_edge(
        edge: &GraphEdge,
        edges: &mut HashMap<String, GraphEdge>,
        out_index: &mut EdgeIndex,
        in_index: &mut EdgeIndex,
    ) -> bool {
        let previous = edges.insert(edge.id.clone(), edge.clone());
        if let Some(old) = &previous {
            Self::remove_edge_from_index(out_index, &old.source, &old.id);
            Self::remove_edge_from_index(in_index, &old.target, &old.id);
        }
        Self::add_edge_to_index(out_index, &edge.source, &edge.id);
        Self::add_edge_to_index(in_index, &edge.target, &edge.id);
        previous.is_none()
    }
}

impl Default for InMemoryGraphStore {
    fn default() -> Self {
        Self::new()
    }
}

/// Borrowed view over the locked maps for traversal.
struct MemoryView<'a> {
    nodes: &'a HashMap<String, GraphNode>,
    edges: &'a HashMap<String, GraphEdge>,
    out_index: &'a EdgeIndex,
    in_index: &'a EdgeIndex,
}

impl Adjacency for MemoryView<'_> {
    fn node(&self, id: &str) -> Result<Option<GraphNode>, GraphStoreError> {
        Ok(self.nodes.get(id).cloned())
    }

    fn incident_edges(&self, id: &str) -> Result<Vec<GraphEdge>, GraphStoreError> {
        let mut dedup = HashSet::new();
        let mut out: Vec<GraphEdge> = self
            .out_index
            .get(id)
            .into_iter()
            .chain(self.in_index.get(id))
            .flatten()
            .filter(|edge_id| dedup.insert(edge_id.as_str()))
            .filter_map(|edge_id| self.edges.get(edge_id).cloned())
            .collect();
        out.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(out)
    }
}

#[async_trait::async_trait]
impl GraphStore for InMemoryGraphStore {
    async fn add_node(&self, node: &GraphNode) -> Result<(), GraphStoreError> {
        let mut nodes = self.nodes.write().await;
        nodes.insert(node.id.clone(), node.clone());
        Ok(())
    }

    async fn add_nodes_batch(&self, nodes: &[GraphNode]) -> Result<WriteSummary, GraphStoreError> {
        let mut guard = self.nodes.write().await;
        let mut summary = WriteSummary::default();
        for node in nodes {
            if guard.insert(node.id.clone(), node.clone()).is_some() {
                summary.updated += 1;
            } else {
                summary.created += 1;
            }
        }
        Ok(summary)
    }

    async fn get_node(&self, id: &str) -> Result<Option<GraphNode>, GraphStoreError> {
        let nodes = self.nodes.read().await;
        Ok(nodes.get(id).cloned())
    }

    async fn get_all_nodes(&self) -> Result<Vec<GraphNode>, GraphStoreError> {
        let nodes = self.nodes.read().await;
        let mut all: Vec<GraphNode> = nodes.values().cloned().collect();
        all.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(all)
    }

    async fn add_edge(&self, edge: &GraphEdge) -> Result<(), GraphStoreError> {
        let nodes = self.nodes.read().await;
        for endpoint in [&edge.source, &edge.target] {
            if !nodes.contains_key(endpoint) {
                return Err(GraphStoreError::NodeNotFound(endpoint.clone()));
            }
        }
        let mut edge_guard = self.edges.write().await;
        let mut out_guard = self.out_index.write().await;
        let mut in_guard = self.in_index.write().await;
        Self::upsert_edge(edge, &mut edge_guard, &mut out_guard, &mut in_guard);
        Ok(())
    }

    async fn add_edges_batch(&self, edges: &[GraphEdge]) -> Result<WriteSummary, GraphStoreError> {
        let mut summary = WriteSummary::default();
        if edges.is_empty() {
            return Ok(summary);
        }
        let nodes = self.nodes.read().await;
        let mut edge_guard = self.edges.write().await;
        let mut out_guard = self.out_index.write().await;
        let mut in_guard = self.in_index.write().await;
        for edge in edges {
            if !nodes.contains_key(&edge.source) || !nodes.contains_key(&edge.target) {
                summary.skipped += 1;
                continue;
            }
            if Self::upsert_edge(edge, &mut edge_guard, &mut out_guard, &mut in_guard) {
                summary.created += 1;
            } else {
                summary.updated += 1;
            }
        }
        Ok(summary)
    }

    async fn get_all_edges(&self) -> Result<Vec<GraphEdge>, GraphStoreError> {
        let edges = self.edges.read().await;
        let mut all: Vec<GraphEdge> = edges.values().cloned().collect();
        all.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(all)
    }

    async fn clear(&self) -> Result<(), GraphStoreError> {
        let mut nodes = self.nodes.write().await;
        let mut edges = self.edges.write().await;
        let mut out_guard = self.out_index.write().await;
        let mut in_guard = self.in_index.write().await;
        nodes.clear();
        edges.clear();
        out_guard.clear();
        in_guard.clear();
        Ok(())
    }

    async fn find_shortest_path(
        &self,
        start_id: &str,
        end_id: &str,
        max_hops: usize,
        kinds: Option<&[RelationKind]>,
    ) -> Result<Option<GraphPath>, GraphStoreError> {
        let nodes = self.nodes.read().await;
        let edges = self.edges.read().await;
        let out_index = self.out_index.read().await;
        let in_index = self.in_index.read().await;
        let view = MemoryView {
            nodes: &nodes,
            edges: &edges,
            out_index: &out_index,
            in_index: &in_index,
        };
        traversal::shortest_path(&view, start_id, end_id, max_hops, kinds)
    }

    async fn find_neighbors(
        &self,
        id: &str,
        depth: usize,
        kinds: Option<&[RelationKind]>,
    ) -> Result<Vec<GraphNode>, GraphStoreError> {
        let nodes = self.nodes.read().await;
        let edges = self.edges.read().await;
        let out_index = self.out_index.read().await;
        let in_index = self.in_index.read().await;
        let view = MemoryView {
            nodes: &nodes,
            edges: &edges,
            out_index: &out_index,
            in_index: &in_index,
        };
        traversal::neighbors(&view, id, depth, kinds, NEIGHBOR_RESULT_LIMIT)
    }

    async fn get_subgraph(
        &self,
        center_id: &str,
        depth: usize,
    ) -> Result<Subgraph, GraphStoreError> {
        let nodes = self.nodes.read().await;
        let edges = self.edges.read().await;
        let out_index = self.out_index.read().await;
        let in_index = self.in_index.read().await;
        let view = MemoryView {
            nodes: &nodes,
            edges: &edges,
            out_index: &out_index,
            in_index: &in_index,
        };
        traversal::subgraph(&view, center_id, depth)
    }

    async fn get_statistics(&self) -> Result<GraphStatistics, GraphStoreError> {
        let nodes = self.get_all_nodes().await?;
        let edges = self.get_all_edges().await?;
        Ok(GraphStatistics::from_graph(&nodes, &edges))
    }
}

//! Graph construction from schema models.

use crate::classify::{relation_edge, table_node};
use crate::enricher::GraphEnricher;
use kg_types::{
    BuildResult, GraphConfig, GraphEdge, GraphStore, GraphStoreError, TableModel,
    TableRelationModel,
};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

/// Projects tables to nodes and relations to edges, then optionally enriches.
///
/// Callers must not run two builds against the same store at once; `clear` followed by
/// reconstruction is not atomic.
pub struct GraphBuilder {
    store: Arc<dyn GraphStore>,
    config: GraphConfig,
    enricher: GraphEnricher,
}

impl GraphBuilder {
    pub fn new(store: Arc<dyn GraphStore>, config: GraphConfig) -> Self {
        let enricher = GraphEnricher::new(config.enrichment.clone())
            .with_relation_inference(config.infer_relations);
        Self {
            store,
            config,
            enricher,
        }
    }

    pub fn store(&self) -> &Arc<dyn GraphStore> {
        &self.store
    }

    pub fn config(&self) -> &GraphConfig {
        &self.config
    }

    pub fn enricher(&self) -> &GraphEnricher {
        &self.enricher
    }

    /// Build the graph. Never fails: errors come back as `success = false` with the counts
    /// gathered so far.
    pub async fn build_graph(
        &self,
        tables: &[TableModel],
        relations: &[TableRelationModel],
        clear_existing: bool,
    ) -> BuildResult {
        let started = Instant::now();
        let mut result = BuildResult {
            tables_processed: tables.len(),
            relations_processed: relations.len(),
            ..BuildResult::default()
        };

        match self
            .build_inner(tables, relations, clear_existing, &mut result)
            .await
        {
            Ok(()) => {
                result.success = true;
                tracing::info!(
                    nodes = result.nodes_created,
                    edges = result.edges_created,
                    labels = result.labels_added,
                    skipped = result.relations_skipped,
                    "Graph built"
                );
            }
            Err(e) => {
                tracing::error!(error = %e, "Graph build failed");
                result.error_message = Some(e.to_string());
            }
        }
        result.build_time_ms = started.elapsed().as_secs_f64() * 1000.0;
        result
    }

    async fn build_inner(
        &self,
        tables: &[TableModel],
        relations: &[TableRelationModel],
        clear_existing: bool,
        result: &mut BuildResult,
    ) -> Result<(), GraphStoreError> {
        let batch_size = self.config.batch_size.max(1);

        self.store.initialize().await?;
        if clear_existing {
            self.store.clear().await?;
            tracing::info!("Cleared existing graph");
        }

        let mut node_ids: HashMap<String, String> = HashMap::new();
        let nodes: Vec<_> = tables
            .iter()
            .map(|t| {
                node_ids.entry(t.name.clone()).or_insert_with(|| t.node_id());
                table_node(&self.config.classification, t)
            })
            .collect();
        for batch in nodes.chunks(batch_size) {
            let summary = self.store.add_nodes_batch(batch).await?;
            result.nodes_created += summary.written();
            tracing::debug!(size = batch.len(), "Added node batch");
        }

        let edges = self.relation_edges(relations, &node_ids, result);
        for batch in edges.chunks(batch_size) {
            let summary = self.store.add_edges_batch(batch).await?;
            result.edges_created += summary.written();
            result.relations_skipped += summary.skipped;
            tracing::debug!(size = batch.len(), "Added edge batch");
        }

        if self.config.auto_enrich {
            let stats = self
                .enricher
                .enrich(self.store.as_ref(), tables, relations, &node_ids)
                .await?;
            result.nodes_created += stats.nodes_added;
            result.edges_created += stats.edges_added;
            result.labels_added += stats.labels_added;
        }
        Ok(())
    }

    /// Resolve endpoints by table name; relations that miss one are logged and counted.
    fn relation_edges(
        &self,
        relations: &[TableRelationModel],
        node_ids: &HashMap<String, String>,
        result: &mut BuildResult,
    ) -> Vec<GraphEdge> {
        let mut edges = Vec::with_capacity(relations.len());
        for relation in relations {
            let source = node_ids.get(&relation.from_table);
            let target = node_ids.get(&relation.to_table);
            match (source, target) {
                (Some(source), Some(target)) => {
                    edges.push(relation_edge(relation, source.clone(), target.clone(), false));
                }
                _ => {
                    tracing::warn!(
                        relation = %relation.key(),
                        from_found = source.is_some(),
                        to_found = target.is_some(),
                        "Skipping relation: endpoint table not in node set"
                    );
                    result.relations_skipped += 1;
                }
            }
        }
        edges
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use kg_graph::InMemoryGraphStore;
    use kg_types::{
        ColumnModel, GraphNode, GraphPath, GraphStatistics, LineStyle, RelationKind, Subgraph,
        WriteSummary,
    };

    fn shop() -> (Vec<TableModel>, Vec<TableRelationModel>) {
        let tables = vec![
            TableModel::new(
                "shop",
                "orders",
                vec![
                    ColumnModel::new("id", "int").primary(),
                    ColumnModel::new("customer_id", "int"),
                ],
            ),
            TableModel::new("shop", "customers", vec![ColumnModel::new("id", "int").primary()])
                .with_row_count(2_000_000),
            TableModel::new(
                "shop",
                "order_items",
                vec![
                    ColumnModel::new("id", "int").primary(),
                    ColumnModel::new("order_id", "int").references("orders", "id"),
                ],
            ),
        ];
        let relations = vec![
            TableRelationModel::new("order_items", "order_id", "orders", "id", RelationKind::ForeignKey),
            TableRelationModel::new("orders", "warehouse_id", "ghost_table", "id", RelationKind::ForeignKey),
        ];
        (tables, relations)
    }

    #[tokio::test]
    async fn build_skips_dangling_relations_and_enriches() {
        let store = Arc::new(InMemoryGraphStore::new());
        let builder = GraphBuilder::new(store.clone(), GraphConfig::default());
        let (tables, relations) = shop();

        let result = builder.build_graph(&tables, &relations, true).await;
        assert!(result.success, "{:?}", result.error_message);
        assert_eq!(result.tables_processed, 3);
        assert_eq!(result.relations_processed, 2);
        assert_eq!(result.relations_skipped, 1);
        assert_eq!(result.nodes_created, 3);
        // one declared edge plus orders.customer_id inferred
        assert_eq!(result.edges_created, 2);
        assert!(result.labels_added >= 1);

        let nodes = store.get_all_nodes().await.unwrap();
        let edges = store.get_all_edges().await.unwrap();
        for e in &edges {
            assert!(nodes.iter().any(|n| n.id == e.source));
            assert!(nodes.iter().any(|n| n.id == e.target));
        }
        let inferred = edges.iter().find(|e| e.properties.inferred).unwrap();
        assert_eq!(inferred.kind, RelationKind::Semantic);
        assert_eq!(inferred.style.line, LineStyle::Dashed);

        let customers = store.get_node("table:shop.customers").await.unwrap().unwrap();
        let labels = customers.semantic_labels();
        assert!(labels.contains(&"客户域".to_string()));
        assert!(labels.contains(&"大表".to_string()));
        assert!(labels.contains(&"大规模".to_string()));
    }

    #[tokio::test]
    async fn rebuild_with_clear_replaces_graph() {
        let store = Arc::new(InMemoryGraphStore::new());
        let builder = GraphBuilder::new(store.clone(), GraphConfig::default());
        let (tables, relations) = shop();
        builder.build_graph(&tables, &relations, true).await;
        let result = builder.build_graph(&tables[..1], &[], true).await;
        assert!(result.success);
        assert_eq!(store.get_all_nodes().await.unwrap().len(), 1);
        assert!(store.get_all_edges().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn small_batches_write_everything() {
        let store = Arc::new(InMemoryGraphStore::new());
        let config = GraphConfig {
            batch_size: 1,
            auto_enrich: false,
            ..GraphConfig::default()
        };
        let builder = GraphBuilder::new(store.clone(), config);
        let (tables, relations) = shop();
        let result = builder.build_graph(&tables, &relations, true).await;
        assert_eq!(result.nodes_created, 3);
        assert_eq!(result.edges_created, 1);
        assert_eq!(result.labels_added, 0);
    }

    #[tokio::test]
    async fn self_reference_is_flagged_hierarchical() {
        let store = Arc::new(InMemoryGraphStore::new());
        let builder = GraphBuilder::new(store.clone(), GraphConfig::default());
        let employees = TableModel::new(
            "hr",
            "employees",
            vec![
                ColumnModel::new("id", "int").primary(),
                ColumnModel::new("manager_id", "int").references("employees", "id"),
            ],
        );
        let rel = TableRelationModel::new("employees", "manager_id", "employees", "id", RelationKind::ForeignKey);
        let result = builder.build_graph(&[employees], &[rel], true).await;
        assert!(result.success);
        let edges = store.get_all_edges().await.unwrap();
        assert_eq!(edges.len(), 1);
        assert!(edges[0].properties.hierarchical);
        assert_eq!(edges[0].kind, RelationKind::ForeignKey);
    }

    /// Delegates to memory but fails every edge write.
    struct EdgeFailingStore(InMemoryGraphStore);

    #[async_trait]
    impl GraphStore for EdgeFailingStore {
        async fn add_node(&self, node: &GraphNode) -> Result<(), GraphStoreError> {
            self.0.add_node(node).await
        }
        async fn add_nodes_batch(&self, nodes: &[GraphNode]) -> Result<WriteSummary, GraphStoreError> {
            self.0.add_nodes_batch(nodes).await
        }
        async fn get_node(&self, id: &str) -> Result<Option<GraphNode>, GraphStoreError> {
            self.0.get_node(id).await
        }
        async fn get_all_nodes(&self) -> Result<Vec<GraphNode>, GraphStoreError> {
            self.0.get_all_nodes().await
        }
        async fn add_edge(&self, _edge: &GraphEdge) -> Result<(), GraphStoreError> {
            Err(GraphStoreError::Backend("edge write timed out".to_string()))
        }
        async fn add_edges_batch(&self, _edges: &[GraphEdge]) -> Result<WriteSummary, GraphStoreError> {
            Err(GraphStoreError::Backend("edge write timed out".to_string()))
        }
        async fn get_all_edges(&self) -> Result<Vec<GraphEdge>, GraphStoreError> {
            self.0.get_all_edges().await
        }
        async fn clear(&self) -> Result<(), GraphStoreError> {
            self.0.clear().await
        }
        async fn find_shortest_path(
            &self,
            start_id: &str,
            end_id: &str,
            max_hops: usize,
            kinds: Option<&[RelationKind]>,
        ) -> Result<Option<GraphPath>, GraphStoreError> {
            self.0.find_shortest_path(start_id, end_id, max_hops, kinds).await
        }
        async fn find_neighbors(
            &self,
            id: &str,
            depth: usize,
            kinds: Option<&[RelationKind]>,
        ) -> Result<Vec<GraphNode>, GraphStoreError> {
            self.0.find_neighbors(id, depth, kinds).await
        }
        async fn get_subgraph(&self, center_id: &str, depth: usize) -> Result<Subgraph, GraphStoreError> {
            self.0.get_subgraph(center_id, depth).await
        }
        async fn get_statistics(&self) -> Result<GraphStatistics, GraphStoreError> {
            self.0.get_statistics().await
        }
    }

    #[tokio::test]
    async fn store_failure_is_reported_not_raised() {
        let store = Arc::new(EdgeFailingStore(InMemoryGraphStore::new()));
        let builder = GraphBuilder::new(store.clone(), GraphConfig::default());
        let (tables, relations) = shop();
        let result = builder.build_graph(&tables, &relations, true).await;
        assert!(!result.success);
        assert_eq!(result.nodes_created, 3);
        assert_eq!(result.edges_created, 0);
        assert!(result
            .error_message
            .as_deref()
            .is_some_and(|m| m.contains("timed out")));
        assert!(result.build_time_ms >= 0.0);
    }
}

//! Shared handles for one graph: store, builder, query service, and the build lock.

use crate::service::GraphQueryService;
use kg_builder::{detect_table_communities, GraphBuilder};
use kg_graph::{InMemoryGraphStore, SqliteGraphStore};
use kg_source::{collect_sources, require_any_source, MergePolicy, SourceSet};
use kg_types::{
    BuildResult, GraphStore, GraphStoreError, KgConfig, PipelineError, StorageBackend,
    TableModel, TableRelationModel,
};
use std::sync::Arc;
use std::time::Duration;

/// Everything a caller needs to build and query one graph.
///
/// Builds are serialized through an internal lock; queries do not take it.
pub struct KgContext {
    store: Arc<dyn GraphStore>,
    builder: GraphBuilder,
    service: GraphQueryService,
    build_lock: tokio::sync::Mutex<()>,
}

impl KgContext {
    pub fn new(store: Arc<dyn GraphStore>, config: &KgConfig) -> Self {
        Self {
            builder: GraphBuilder::new(store.clone(), config.graph.clone()),
            service: GraphQueryService::new(store.clone(), config.query.clone()),
            store,
            build_lock: tokio::sync::Mutex::new(()),
        }
    }

    /// Open the store named by `config.storage`.
    pub fn from_config(config: &KgConfig) -> Result<Self, GraphStoreError> {
        let store: Arc<dyn GraphStore> = match config.storage.backend {
            StorageBackend::Memory => Arc::new(InMemoryGraphStore::new()),
            StorageBackend::Sqlite => {
                tracing::info!(path = %config.storage.path, "Opening SQLite graph store");
                Arc::new(SqliteGraphStore::with_busy_timeout(
                    &config.storage.path,
                    Duration::from_millis(config.storage.busy_timeout_ms),
                )?)
            }
        };
        Ok(Self::new(store, config))
    }

    pub fn store(&self) -> &Arc<dyn GraphStore> {
        &self.store
    }

    pub fn builder(&self) -> &GraphBuilder {
        &self.builder
    }

    pub fn service(&self) -> &GraphQueryService {
        &self.service
    }

    /// Build under the lock. A concurrent rebuild waits for this one to finish.
    pub async fn rebuild(
        &self,
        tables: &[TableModel],
        relations: &[TableRelationModel],
        clear_existing: bool,
    ) -> BuildResult {
        let _guard = self.build_lock.lock().await;
        self.builder
            .build_graph(tables, relations, clear_existing)
            .await
    }

    /// Collect every configured source, merge under `policy`, and rebuild from scratch.
    ///
    /// Fails only when no source is configured or every contacted source failed; a failed
    /// build comes back as `success = false`.
    pub async fn init_graph(
        &self,
        sources: &mut SourceSet,
        policy: MergePolicy,
    ) -> Result<BuildResult, PipelineError> {
        tracing::info!(policy = %policy, sources = sources.configured(), "Initializing graph");
        let collected = collect_sources(sources, policy).await;
        require_any_source(&collected)?;
        let merged = collected.merge(policy);
        tracing::info!(
            tables = merged.tables.len(),
            relations = merged.relations.len(),
            failed = collected.failed_sources.len(),
            "Merged schema sources"
        );

        for community in detect_table_communities(&merged.tables, &merged.relations) {
            tracing::debug!(
                community = %community.name,
                tables = ?community.tables,
                "Detected table community"
            );
        }

        Ok(self.rebuild(&merged.tables, &merged.relations, true).await)
    }
}

//! Semantic enrichment: labels on existing nodes and relations inferred from column naming.

use crate::classify::relation_edge;
use crate::inflection::name_candidates;
use kg_types::{
    all_matches, Cardinality, EnrichmentConfig, EnrichmentStats, GraphStore, GraphStoreError,
    JoinKind, RelationKey, RelationKind, TableModel, TableRelationModel,
};
use regex::Regex;
use std::collections::{HashMap, HashSet};
use std::sync::LazyLock;

static ID_COLUMN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(.+)_id$").expect("valid id column pattern"));

/// Fixed confidence of a relation inferred from a `{table}_id` column.
pub const INFERRED_CONFIDENCE: f64 = 0.5;
/// Inferred edges weigh `confidence * INFERRED_WEIGHT_FACTOR`.
pub const INFERRED_WEIGHT_FACTOR: f64 = 0.5;

/// A connected group of related tables.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableCommunity {
    pub name: String,
    pub tables: Vec<String>,
}

pub struct GraphEnricher {
    config: EnrichmentConfig,
    infer_relations: bool,
}

impl GraphEnricher {
    pub fn new(config: EnrichmentConfig) -> Self {
        Self {
            config,
            infer_relations: true,
        }
    }

    /// Disable relation inference; labeling still runs.
    pub fn with_relation_inference(mut self, enabled: bool) -> Self {
        self.infer_relations = enabled;
        self
    }

    /// Label existing nodes and add inferred semantic edges.
    ///
    /// `node_ids` maps table names to the node ids the builder wrote. Tables without a node
    /// get no labels, and inferred relations never point at a table outside the map.
    pub async fn enrich(
        &self,
        store: &dyn GraphStore,
        tables: &[TableModel],
        relations: &[TableRelationModel],
        node_ids: &HashMap<String, String>,
    ) -> Result<EnrichmentStats, GraphStoreError> {
        let mut stats = EnrichmentStats::default();

        for table in tables {
            let labels = self.infer_labels(table);
            if labels.is_empty() {
                continue;
            }
            let Some(id) = node_ids.get(&table.name) else {
                continue;
            };
            let Some(mut node) = store.get_node(id).await? else {
                continue;
            };
            let added = node.append_semantic_labels(&labels);
            if added > 0 {
                store.add_node(&node).await?;
                stats.labels_added += added;
            }
        }

        if self.infer_relations {
            let inferred = self.infer_semantic_relations(tables, relations);
            let edges: Vec<_> = inferred
                .iter()
                .filter_map(|r| {
                    let source = node_ids.get(&r.from_table)?;
                    let target = node_ids.get(&r.to_table)?;
                    Some(relation_edge(r, source.clone(), target.clone(), true))
                })
                .collect();
            if !edges.is_empty() {
                let summary = store.add_edges_batch(&edges).await?;
                stats.edges_added = summary.written();
            }
        }

        tracing::info!(
            labels_added = stats.labels_added,
            edges_added = stats.edges_added,
            "Graph enrichment complete"
        );
        Ok(stats)
    }

    /// Configured domain and type labels plus a size tier when the row count is known.
    pub fn infer_labels(&self, table: &TableModel) -> Vec<String> {
        let mut labels: Vec<String> = all_matches(&self.config.semantic_labels, &table.name)
            .into_iter()
            .map(str::to_string)
            .collect();
        labels.extend(
            all_matches(&self.config.table_types, &table.name)
                .into_iter()
                .map(|t| format!("type:{}", t)),
        );
        if let Some(rows) = table.row_count {
            let tier = match rows {
                r if r > 10_000_000 => "超大规模",
                r if r > 1_000_000 => "大规模",
                r if r > 100_000 => "中等规模",
                _ => "小规模",
            };
            labels.push(tier.to_string());
        }
        labels
    }

    /// Relations implied by `{table}_id` columns that carry no declared key.
    ///
    /// Only appends: a relation whose identity already exists in `existing`, or was inferred
    /// earlier in this pass, is not produced again.
    pub fn infer_semantic_relations(
        &self,
        tables: &[TableModel],
        existing: &[TableRelationModel],
    ) -> Vec<TableRelationModel> {
        let names: HashSet<&str> = tables.iter().map(|t| t.name.as_str()).collect();
        let mut known: HashSet<RelationKey> = existing.iter().map(|r| r.identity()).collect();
        let mut inferred = Vec::new();

        for table in tables {
            for column in &table.columns {
                if table.is_key_column(column) {
                    continue;
                }
                let lowered = column.name.to_lowercase();
                let Some(caps) = ID_COLUMN.captures(&lowered) else {
                    continue;
                };
                let prefix = &caps[1];
                let Some(target) = name_candidates(prefix)
                    .into_iter()
                    .find(|c| names.contains(c.as_str()))
                else {
                    continue;
                };
                if self
                    .config
                    .exclude_patterns
                    .iter()
                    .any(|p| lowered.contains(p.as_str()))
                {
                    continue;
                }

                let mut relation = TableRelationModel::new(
                    table.name.clone(),
                    column.name.clone(),
                    target,
                    "id",
                    RelationKind::Semantic,
                )
                .with_join(JoinKind::Left)
                .with_cardinality(Cardinality::ManyToOne)
                .with_confidence(INFERRED_CONFIDENCE);
                if !known.insert(relation.identity()) {
                    continue;
                }
                relation.weight = relation.confidence * INFERRED_WEIGHT_FACTOR;
                relation.graph_edge_id = Some(format!("semantic:{}", relation.key()));
                inferred.push(relation);
            }
        }

        if !inferred.is_empty() {
            tracing::info!(count = inferred.len(), "Inferred semantic relations");
        }
        inferred
    }
}

/// Connected components of the table graph with more than one table, named
/// `community_1`, `community_2`, ... in discovery order.
pub fn detect_table_communities(
    tables: &[TableModel],
    relations: &[TableRelationModel],
) -> Vec<TableCommunity> {
    let mut adjacency: HashMap<&str, Vec<&str>> = tables
        .iter()
        .map(|t| (t.name.as_str(), Vec::new()))
        .collect();
    for r in relations {
        if !adjacency.contains_key(r.from_table.as_str())
            || !adjacency.contains_key(r.to_table.as_str())
        {
            continue;
        }
        if let Some(list) = adjacency.get_mut(r.from_table.as_str()) {
            list.push(r.to_table.as_str());
        }
        if let Some(list) = adjacency.get_mut(r.to_table.as_str()) {
            list.push(r.from_table.as_str());
        }
    }

    let mut visited: HashSet<&str> = HashSet::new();
    let mut communities = Vec::new();
    for table in tables {
        let start = table.name.as_str();
        if visited.contains(start) {
            continue;
        }
        let mut component = Vec::new();
        let mut stack = vec![start];
        while let Some(name) = stack.pop() {
            if !visited.insert(name) {
                continue;
            }
            component.push(name.to_string());
            if let Some(next) = adjacency.get(name) {
                stack.extend(next.iter().copied().filter(|n| !visited.contains(n)));
            }
        }
        if component.len() > 1 {
            component.sort();
            communities.push(TableCommunity {
                name: format!("community_{}", communities.len() + 1),
                tables: component,
            });
        }
    }
    communities
}

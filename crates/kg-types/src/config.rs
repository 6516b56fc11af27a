//! Configuration for building and querying the graph.
//!
//! Every section deserializes with defaults, so an empty document is a valid config.

use crate::{ColumnModel, TableRelationModel};
use serde::{Deserialize, Serialize};

/// A tag plus the lower-case keywords that select it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeywordRule {
    pub tag: String,
    #[serde(default)]
    pub keywords: Vec<String>,
}

impl KeywordRule {
    pub fn new(tag: impl Into<String>, keywords: &[&str]) -> Self {
        Self {
            tag: tag.into(),
            keywords: keywords.iter().map(|k| k.to_string()).collect(),
        }
    }

    /// Substring match against an already lower-cased name.
    pub fn matches(&self, lowered: &str) -> bool {
        self.keywords.iter().any(|k| lowered.contains(k.as_str()))
    }
}

/// Tag of the first matching rule, if any.
pub fn first_match<'a>(rules: &'a [KeywordRule], name: &str) -> Option<&'a str> {
    let lowered = name.to_lowercase();
    rules
        .iter()
        .find(|r| r.matches(&lowered))
        .map(|r| r.tag.as_str())
}

/// Tags of every matching rule, in rule order.
pub fn all_matches<'a>(rules: &'a [KeywordRule], name: &str) -> Vec<&'a str> {
    let lowered = name.to_lowercase();
    rules
        .iter()
        .filter(|r| r.matches(&lowered))
        .map(|r| r.tag.as_str())
        .collect()
}

fn default_color_rules() -> Vec<KeywordRule> {
    vec![
        KeywordRule::new("#e74c3c", &["fact", "transaction", "log", "event", "order", "sale"]),
        KeywordRule::new("#2ecc71", &["dim", "lookup", "ref", "category", "customer"]),
        KeywordRule::new("#f39c12", &["bridge", "link", "mapping", "relation", "_has_"]),
    ]
}

fn default_node_color() -> String {
    "#3498db".to_string()
}

fn default_domain_rules() -> Vec<KeywordRule> {
    vec![
        KeywordRule::new("销售域", &["order", "purchase", "sale", "transaction"]),
        KeywordRule::new("客户域", &["customer", "user", "account", "client"]),
        KeywordRule::new("产品域", &["product", "item", "sku", "inventory"]),
        KeywordRule::new("财务域", &["payment", "invoice", "billing", "finance"]),
    ]
}

fn default_table_type_rules() -> Vec<KeywordRule> {
    vec![
        KeywordRule::new("事实表", &["fact", "log", "event"]),
        KeywordRule::new("维度表", &["dim", "lookup", "ref"]),
    ]
}

fn default_large_table_threshold() -> u64 {
    1_000_000
}

fn default_large_table_label() -> String {
    "大表".to_string()
}

/// Keyword tables the builder uses for node color and labels. Rules are ordered;
/// color and domain take the first match.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassificationConfig {
    #[serde(default = "default_color_rules")]
    pub color_rules: Vec<KeywordRule>,
    #[serde(default = "default_node_color")]
    pub default_color: String,
    #[serde(default = "default_domain_rules")]
    pub domain_rules: Vec<KeywordRule>,
    #[serde(default = "default_table_type_rules")]
    pub table_type_rules: Vec<KeywordRule>,
    #[serde(default = "default_large_table_threshold")]
    pub large_table_threshold: u64,
    #[serde(default = "default_large_table_label")]
    pub large_table_label: String,
}

impl Default for ClassificationConfig {
    fn default() -> Self {
        Self {
            color_rules: default_color_rules(),
            default_color: default_node_color(),
            domain_rules: default_domain_rules(),
            table_type_rules: default_table_type_rules(),
            large_table_threshold: default_large_table_threshold(),
            large_table_label: default_large_table_label(),
        }
    }
}

fn default_exclude_patterns() -> Vec<String> {
    ["created_by", "updated_by", "deleted_by"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

/// Enricher settings. Label rules are empty unless configured.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnrichmentConfig {
    /// Domain labels; every matching rule contributes its tag.
    #[serde(default)]
    pub semantic_labels: Vec<KeywordRule>,
    /// Table types; a match contributes `type:{tag}`.
    #[serde(default)]
    pub table_types: Vec<KeywordRule>,
    /// Column-name substrings that never yield an inferred relation.
    #[serde(default = "default_exclude_patterns")]
    pub exclude_patterns: Vec<String>,
}

impl Default for EnrichmentConfig {
    fn default() -> Self {
        Self {
            semantic_labels: Vec::new(),
            table_types: Vec::new(),
            exclude_patterns: default_exclude_patterns(),
        }
    }
}

fn default_batch_size() -> usize {
    100
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphConfig {
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    #[serde(default = "default_true")]
    pub auto_enrich: bool,
    /// When false, enrichment only adds labels.
    #[serde(default = "default_true")]
    pub infer_relations: bool,
    #[serde(default)]
    pub classification: ClassificationConfig,
    #[serde(default)]
    pub enrichment: EnrichmentConfig,
}

impl Default for GraphConfig {
    fn default() -> Self {
        Self {
            batch_size: default_batch_size(),
            auto_enrich: true,
            infer_relations: true,
            classification: ClassificationConfig::default(),
            enrichment: EnrichmentConfig::default(),
        }
    }
}

fn default_max_hops() -> usize {
    5
}

fn default_max_results() -> usize {
    100
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryConfig {
    #[serde(default = "default_max_hops")]
    pub default_max_hops: usize,
    #[serde(default = "default_max_results")]
    pub max_results: usize,
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self {
            default_max_hops: default_max_hops(),
            max_results: default_max_results(),
        }
    }
}

fn default_static_database() -> String {
    "unknown_db".to_string()
}

/// A table declared by hand.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StaticTable {
    pub name: String,
    /// Falls back to the schema-level database.
    #[serde(default)]
    pub database: Option<String>,
    #[serde(default)]
    pub columns: Vec<ColumnModel>,
    /// Overrides the primary keys collected from `columns` when non-empty.
    #[serde(default)]
    pub primary_keys: Vec<String>,
    #[serde(default)]
    pub row_count: Option<u64>,
    #[serde(default)]
    pub comment: String,
    #[serde(default)]
    pub graph_node_id: Option<String>,
}

/// Hand-written schema definition, typically loaded from the config file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StaticSchema {
    #[serde(default = "default_static_database")]
    pub database: String,
    #[serde(default)]
    pub tables: Vec<StaticTable>,
    #[serde(default)]
    pub relations: Vec<TableRelationModel>,
}

impl Default for StaticSchema {
    fn default() -> Self {
        Self {
            database: default_static_database(),
            tables: Vec::new(),
            relations: Vec::new(),
        }
    }
}

fn default_merge_policy() -> String {
    "merge".to_string()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourcesConfig {
    /// One of `static_only`, `merge`, `static_override`.
    #[serde(default = "default_merge_policy")]
    pub merge_policy: String,
    #[serde(default)]
    pub static_schema: Option<StaticSchema>,
}

impl Default for SourcesConfig {
    fn default() -> Self {
        Self {
            merge_policy: default_merge_policy(),
            static_schema: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    #[default]
    Memory,
    Sqlite,
}

fn default_storage_path() -> String {
    "kg.db".to_string()
}

fn default_busy_timeout_ms() -> u64 {
    5_000
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageConfig {
    #[serde(default)]
    pub backend: StorageBackend,
    /// SQLite database file.
    #[serde(default = "default_storage_path")]
    pub path: String,
    #[serde(default = "default_busy_timeout_ms")]
    pub busy_timeout_ms: u64,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: StorageBackend::Memory,
            path: default_storage_path(),
            busy_timeout_ms: default_busy_timeout_ms(),
        }
    }
}

/// Top-level configuration.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct KgConfig {
    #[serde(default)]
    pub graph: GraphConfig,
    #[serde(default)]
    pub query: QueryConfig,
    #[serde(default)]
    pub sources: SourcesConfig,
    #[serde(default)]
    pub storage: StorageConfig,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_document_yields_defaults() {
        let cfg: KgConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(cfg, KgConfig::default());
        assert_eq!(cfg.graph.batch_size, 100);
        assert_eq!(cfg.query.default_max_hops, 5);
        assert_eq!(cfg.storage.backend, StorageBackend::Memory);
        assert_eq!(cfg.graph.enrichment.exclude_patterns.len(), 3);
    }

    #[test]
    fn first_match_respects_rule_order() {
        let rules = default_color_rules();
        assert_eq!(first_match(&rules, "order_events"), Some("#e74c3c"));
        assert_eq!(first_match(&rules, "Customers"), Some("#2ecc71"));
        assert_eq!(first_match(&rules, "user_has_role"), Some("#f39c12"));
        assert_eq!(first_match(&rules, "warehouses"), None);
    }

    #[test]
    fn all_matches_collects_every_domain() {
        let rules = default_domain_rules();
        assert_eq!(all_matches(&rules, "customer_orders"), vec!["销售域", "客户域"]);
    }
}

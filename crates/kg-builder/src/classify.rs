//! Keyword classification of tables and presentation of relations.

use kg_types::{
    all_matches, first_match, ClassificationConfig, EdgeProperties, EdgeStyle, GraphEdge,
    GraphNode, LineStyle, NodeKind, NodeStyle, RelationKind, TableModel, TableRelationModel,
};
use std::collections::HashMap;

/// Confidence above which an edge is drawn solid.
const SOLID_CONFIDENCE: f64 = 0.8;

pub fn node_color(config: &ClassificationConfig, table_name: &str) -> String {
    first_match(&config.color_rules, table_name)
        .unwrap_or(&config.default_color)
        .to_string()
}

/// `30 + min(columns * 2, 30)`
pub fn node_size(column_count: usize) -> u32 {
    30 + (column_count.saturating_mul(2)).min(30) as u32
}

/// Domain (first match), large-table, and table-type labels.
pub fn node_labels(config: &ClassificationConfig, table: &TableModel) -> Vec<String> {
    let mut labels = Vec::new();
    if let Some(domain) = first_match(&config.domain_rules, &table.name) {
        labels.push(domain.to_string());
    }
    if table
        .row_count
        .is_some_and(|rows| rows > config.large_table_threshold)
    {
        labels.push(config.large_table_label.clone());
    }
    labels.extend(
        all_matches(&config.table_type_rules, &table.name)
            .into_iter()
            .map(str::to_string),
    );
    labels
}

pub fn table_node(config: &ClassificationConfig, table: &TableModel) -> GraphNode {
    let columns: Vec<serde_json::Value> = table
        .columns
        .iter()
        .map(|c| {
            serde_json::json!({
                "name": c.name,
                "type": c.data_type,
                "nullable": c.nullable,
                "primary_key": c.primary_key,
                "comment": c.comment,
                "max_length": c.max_length,
                "aliases": c.aliases,
            })
        })
        .collect();

    let mut properties: HashMap<String, serde_json::Value> = HashMap::from([
        ("database".to_string(), serde_json::json!(table.database)),
        ("row_count".to_string(), serde_json::json!(table.row_count.unwrap_or(0))),
        ("comment".to_string(), serde_json::json!(table.comment)),
        ("column_count".to_string(), serde_json::json!(table.columns.len())),
        ("primary_keys".to_string(), serde_json::json!(table.primary_keys)),
        (
            "foreign_key_count".to_string(),
            serde_json::json!(table.foreign_keys.len()),
        ),
        ("columns".to_string(), serde_json::Value::Array(columns)),
    ]);
    let labels = node_labels(config, table);
    if !labels.is_empty() {
        properties.insert("semantic_labels".to_string(), serde_json::json!(labels));
    }

    GraphNode {
        id: table.node_id(),
        label: table.name.clone(),
        kind: NodeKind::Table,
        properties,
        style: NodeStyle {
            size: node_size(table.columns.len()),
            color: node_color(config, &table.name),
            shape: "ellipse".to_string(),
        },
    }
}

pub fn edge_style(kind: RelationKind, confidence: f64) -> EdgeStyle {
    let (color, width) = match kind {
        RelationKind::ForeignKey => ("#e67e22", 3),
        RelationKind::Join => ("#3498db", 2),
        RelationKind::Semantic => ("#1abc9c", 1),
        RelationKind::Reference => ("#9b59b6", 2),
        RelationKind::Hierarchy => ("#95a5a6", 2),
    };
    EdgeStyle {
        width,
        color: color.to_string(),
        line: if confidence > SOLID_CONFIDENCE {
            LineStyle::Solid
        } else {
            LineStyle::Dashed
        },
    }
}

/// Project a relation onto an edge between two resolved node ids.
pub fn relation_edge(
    relation: &TableRelationModel,
    source: String,
    target: String,
    inferred: bool,
) -> GraphEdge {
    GraphEdge {
        id: relation.edge_id(),
        source,
        target,
        kind: relation.kind,
        label: format!("{} → {}", relation.from_column, relation.to_column),
        properties: EdgeProperties {
            from_table: relation.from_table.clone(),
            from_column: relation.from_column.clone(),
            to_table: relation.to_table.clone(),
            to_column: relation.to_column.clone(),
            join_kind: relation.join_kind,
            cardinality: relation.cardinality,
            confidence: relation.confidence,
            inferred,
            hierarchical: relation.is_self_referential(),
        },
        weight: relation.weight,
        style: edge_style(relation.kind, relation.confidence),
    }
}

//! Schema model: tables, columns, and relations as produced by extractors.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::SchemaError;

/// Kind of relation between two tables (also the kind of the projected edge).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RelationKind {
    ForeignKey,
    Join,
    Reference,
    Semantic,
    Hierarchy,
}

impl RelationKind {
    pub fn as_str(self) -> &'static str {
        match self {
            RelationKind::ForeignKey => "foreign_key",
            RelationKind::Join => "join",
            RelationKind::Reference => "reference",
            RelationKind::Semantic => "semantic",
            RelationKind::Hierarchy => "hierarchy",
        }
    }

    /// Parse from the snake_case wire name.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "foreign_key" => Some(RelationKind::ForeignKey),
            "join" => Some(RelationKind::Join),
            "reference" => Some(RelationKind::Reference),
            "semantic" => Some(RelationKind::Semantic),
            "hierarchy" => Some(RelationKind::Hierarchy),
            _ => None,
        }
    }
}

impl fmt::Display for RelationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// SQL join kind used when rendering join hints.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum JoinKind {
    #[default]
    Inner,
    Left,
    Right,
    Full,
}

impl JoinKind {
    pub fn as_str(self) -> &'static str {
        match self {
            JoinKind::Inner => "INNER",
            JoinKind::Left => "LEFT",
            JoinKind::Right => "RIGHT",
            JoinKind::Full => "FULL",
        }
    }
}

impl fmt::Display for JoinKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Declared multiplicity of a relation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Cardinality {
    #[serde(rename = "1:1")]
    OneToOne,
    #[serde(rename = "1:N")]
    OneToMany,
    #[default]
    #[serde(rename = "N:1")]
    ManyToOne,
    #[serde(rename = "N:M")]
    ManyToMany,
}

impl Cardinality {
    pub fn as_str(self) -> &'static str {
        match self {
            Cardinality::OneToOne => "1:1",
            Cardinality::OneToMany => "1:N",
            Cardinality::ManyToOne => "N:1",
            Cardinality::ManyToMany => "N:M",
        }
    }
}

impl fmt::Display for Cardinality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Column-level foreign key reference.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnReference {
    pub ref_table: String,
    pub ref_column: String,
}

/// Table-level foreign key descriptor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForeignKey {
    pub column: String,
    pub ref_table: String,
    pub ref_column: String,
}

/// One column of a table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnModel {
    pub name: String,
    #[serde(rename = "type")]
    pub data_type: String,
    #[serde(default)]
    pub nullable: bool,
    #[serde(default)]
    pub primary_key: bool,
    #[serde(default)]
    pub foreign_key: Option<ColumnReference>,
    #[serde(default)]
    pub default: Option<serde_json::Value>,
    #[serde(default)]
    pub comment: String,
    #[serde(default)]
    pub max_length: Option<u32>,
    #[serde(default)]
    pub aliases: Vec<String>,
}

impl ColumnModel {
    pub fn new(name: impl Into<String>, data_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            data_type: data_type.into(),
            nullable: false,
            primary_key: false,
            foreign_key: None,
            default: None,
            comment: String::new(),
            max_length: None,
            aliases: Vec::new(),
        }
    }

    pub fn primary(mut self) -> Self {
        self.primary_key = true;
        self
    }

    pub fn references(mut self, ref_table: impl Into<String>, ref_column: impl Into<String>) -> Self {
        self.foreign_key = Some(ColumnReference {
            ref_table: ref_table.into(),
            ref_column: ref_column.into(),
        });
        self
    }
}

/// One table with its columns and keys.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableModel {
    pub name: String,
    pub database: String,
    #[serde(default)]
    pub schema_name: String,
    #[serde(default)]
    pub columns: Vec<ColumnModel>,
    #[serde(default)]
    pub primary_keys: Vec<String>,
    #[serde(default)]
    pub foreign_keys: Vec<ForeignKey>,
    #[serde(default)]
    pub row_count: Option<u64>,
    #[serde(default)]
    pub comment: String,
    /// Node id in the graph; when unset the builder derives `table:{database}.{name}`.
    #[serde(default)]
    pub graph_node_id: Option<String>,
}

impl TableModel {
    /// Build a table from columns; primary and foreign keys are collected from the columns.
    pub fn new(
        database: impl Into<String>,
        name: impl Into<String>,
        columns: Vec<ColumnModel>,
    ) -> Self {
        let primary_keys = columns
            .iter()
            .filter(|c| c.primary_key)
            .map(|c| c.name.clone())
            .collect();
        let foreign_keys = columns
            .iter()
            .filter_map(|c| {
                c.foreign_key.as_ref().map(|fk| ForeignKey {
                    column: c.name.clone(),
                    ref_table: fk.ref_table.clone(),
                    ref_column: fk.ref_column.clone(),
                })
            })
            .collect();
        Self {
            name: name.into(),
            database: database.into(),
            schema_name: String::new(),
            columns,
            primary_keys,
            foreign_keys,
            row_count: None,
            comment: String::new(),
            graph_node_id: None,
        }
    }

    pub fn with_row_count(mut self, rows: u64) -> Self {
        self.row_count = Some(rows);
        self
    }

    /// Stable graph node id for this table.
    pub fn node_id(&self) -> String {
        self.graph_node_id
            .clone()
            .unwrap_or_else(|| format!("table:{}.{}", self.database, self.name))
    }

    pub fn get_column(&self, name: &str) -> Option<&ColumnModel> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn has_foreign_key_to(&self, table: &str) -> bool {
        self.foreign_keys.iter().any(|fk| fk.ref_table == table)
    }

    /// True when the column is a primary key or carries a declared foreign key.
    pub fn is_key_column(&self, column: &ColumnModel) -> bool {
        column.primary_key
            || column.foreign_key.is_some()
            || self.primary_keys.iter().any(|pk| pk == &column.name)
            || self.foreign_keys.iter().any(|fk| fk.column == column.name)
    }

    /// Every primary key name must match a column.
    pub fn validate(&self) -> Result<(), SchemaError> {
        for pk in &self.primary_keys {
            if self.get_column(pk).is_none() {
                return Err(SchemaError::UnknownPrimaryKey {
                    table: self.name.clone(),
                    column: pk.clone(),
                });
            }
        }
        Ok(())
    }
}

/// Identity of a relation: `(from_table, from_column, to_table, to_column)`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RelationKey {
    pub from_table: String,
    pub from_column: String,
    pub to_table: String,
    pub to_column: String,
}

impl fmt::Display for RelationKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}.{}->{}.{}",
            self.from_table, self.from_column, self.to_table, self.to_column
        )
    }
}

fn default_confidence() -> f64 {
    1.0
}

fn default_weight() -> f64 {
    1.0
}

/// A relation between a column of one table and a column of another.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableRelationModel {
    pub from_table: String,
    pub from_column: String,
    pub to_table: String,
    pub to_column: String,
    #[serde(rename = "relation_type")]
    pub kind: RelationKind,
    #[serde(default, rename = "join_type")]
    pub join_kind: JoinKind,
    #[serde(default)]
    pub cardinality: Cardinality,
    #[serde(default = "default_confidence")]
    pub confidence: f64,
    #[serde(default)]
    pub graph_edge_id: Option<String>,
    #[serde(default = "default_weight")]
    pub weight: f64,
    #[serde(default)]
    pub bidirectional: bool,
}

impl TableRelationModel {
    /// Relation with INNER join, N:1 cardinality and full confidence.
    pub fn new(
        from_table: impl Into<String>,
        from_column: impl Into<String>,
        to_table: impl Into<String>,
        to_column: impl Into<String>,
        kind: RelationKind,
    ) -> Self {
        Self {
            from_table: from_table.into(),
            from_column: from_column.into(),
            to_table: to_table.into(),
            to_column: to_column.into(),
            kind,
            join_kind: JoinKind::Inner,
            cardinality: Cardinality::ManyToOne,
            confidence: 1.0,
            graph_edge_id: None,
            weight: 1.0,
            bidirectional: false,
        }
    }

    pub fn with_join(mut self, join_kind: JoinKind) -> Self {
        self.join_kind = join_kind;
        self
    }

    pub fn with_cardinality(mut self, cardinality: Cardinality) -> Self {
        self.cardinality = cardinality;
        self
    }

    pub fn with_confidence(mut self, confidence: f64) -> Self {
        self.confidence = confidence.clamp(0.0, 1.0);
        self
    }

    pub fn identity(&self) -> RelationKey {
        RelationKey {
            from_table: self.from_table.clone(),
            from_column: self.from_column.clone(),
            to_table: self.to_table.clone(),
            to_column: self.to_column.clone(),
        }
    }

    /// `{from_table}.{from_column}->{to_table}.{to_column}`
    pub fn key(&self) -> String {
        self.identity().to_string()
    }

    pub fn edge_id(&self) -> String {
        self.graph_edge_id.clone().unwrap_or_else(|| self.key())
    }

    pub fn is_self_referential(&self) -> bool {
        self.from_table == self.to_table
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn table_collects_keys_from_columns() {
        let t = TableModel::new(
            "shop",
            "orders",
            vec![
                ColumnModel::new("id", "int").primary(),
                ColumnModel::new("customer_id", "int").references("customers", "id"),
            ],
        );
        assert_eq!(t.primary_keys, vec!["id".to_string()]);
        assert_eq!(t.foreign_keys.len(), 1);
        assert!(t.has_foreign_key_to("customers"));
        assert_eq!(t.node_id(), "table:shop.orders");
        assert!(t.validate().is_ok());
    }

    #[test]
    fn validate_rejects_unknown_primary_key() {
        let mut t = TableModel::new("shop", "orders", vec![ColumnModel::new("id", "int")]);
        t.primary_keys.push("order_no".to_string());
        assert!(matches!(
            t.validate(),
            Err(SchemaError::UnknownPrimaryKey { .. })
        ));
    }

    #[test]
    fn relation_key_and_wire_names() {
        let r = TableRelationModel::new("orders", "customer_id", "customers", "id", RelationKind::ForeignKey)
            .with_join(JoinKind::Left);
        assert_eq!(r.key(), "orders.customer_id->customers.id");
        let v = serde_json::to_value(&r).unwrap();
        assert_eq!(v["relation_type"], "foreign_key");
        assert_eq!(v["join_type"], "LEFT");
        assert_eq!(v["cardinality"], "N:1");
    }
}

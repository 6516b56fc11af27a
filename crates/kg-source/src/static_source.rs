//! Extractor over a hand-written schema definition.

use async_trait::async_trait;
use kg_types::{
    ExtractionOutput, ExtractorError, RelationKind, SchemaExtractor, StaticSchema, StaticTable,
    TableModel, TableRelationModel,
};
use std::collections::HashSet;

/// Serves tables and relations from a [`StaticSchema`]. Never touches the network.
pub struct StaticExtractor {
    name: String,
    schema: StaticSchema,
    connected: bool,
}

impl StaticExtractor {
    pub fn new(schema: StaticSchema) -> Self {
        Self {
            name: "static_extractor".to_string(),
            schema,
            connected: false,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    fn to_table(&self, decl: &StaticTable) -> TableModel {
        let database = decl
            .database
            .clone()
            .unwrap_or_else(|| self.schema.database.clone());
        let mut table = TableModel::new(database, decl.name.clone(), decl.columns.clone());
        if !decl.primary_keys.is_empty() {
            table.primary_keys = decl.primary_keys.clone();
        }
        table.row_count = decl.row_count;
        table.comment = decl.comment.clone();
        table.graph_node_id = Some(
            decl.graph_node_id
                .clone()
                .unwrap_or_else(|| format!("table:{}.{}", table.database, table.name)),
        );
        table
    }

    fn tables(&self) -> Vec<TableModel> {
        let mut out = Vec::with_capacity(self.schema.tables.len());
        for decl in &self.schema.tables {
            if decl.name.trim().is_empty() {
                tracing::warn!(source = %self.name, "Skipping static table without a name");
                continue;
            }
            let table = self.to_table(decl);
            if let Err(e) = table.validate() {
                tracing::warn!(source = %self.name, table = %decl.name, error = %e, "Skipping invalid static table");
                continue;
            }
            out.push(table);
        }
        out
    }

    fn relations(&self) -> Vec<TableRelationModel> {
        self.schema
            .relations
            .iter()
            .filter(|r| {
                let complete = [&r.from_table, &r.from_column, &r.to_table, &r.to_column]
                    .iter()
                    .all(|f| !f.trim().is_empty());
                if !complete {
                    tracing::warn!(source = %self.name, relation = %r.key(), "Skipping incomplete static relation");
                }
                complete
            })
            .cloned()
            .collect()
    }
}

#[async_trait]
impl SchemaExtractor for StaticExtractor {
    fn name(&self) -> &str {
        &self.name
    }

    async fn connect(&mut self) -> Result<(), ExtractorError> {
        self.connected = true;
        tracing::info!(
            source = %self.name,
            tables = self.schema.tables.len(),
            relations = self.schema.relations.len(),
            "Loaded static schema"
        );
        Ok(())
    }

    async fn disconnect(&mut self) {
        self.connected = false;
    }

    async fn validate_connection(&self) -> bool {
        self.connected
    }

    async fn extract_tables(&self) -> Result<Vec<TableModel>, ExtractorError> {
        Ok(self.tables())
    }

    async fn extract_relations(&self) -> Result<Vec<TableRelationModel>, ExtractorError> {
        Ok(self.relations())
    }

    /// Column-level foreign keys become `foreign_key` relations ahead of the configured
    /// ones; duplicates by identity keep the first occurrence.
    async fn extract_all(&self) -> Result<ExtractionOutput, ExtractorError> {
        let tables = self.tables();
        let column_relations = tables.iter().flat_map(|t| {
            t.foreign_keys.iter().map(move |fk| {
                TableRelationModel::new(
                    t.name.clone(),
                    fk.column.clone(),
                    fk.ref_table.clone(),
                    fk.ref_column.clone(),
                    RelationKind::ForeignKey,
                )
            })
        });
        let mut seen = HashSet::new();
        let relations: Vec<TableRelationModel> = column_relations
            .chain(self.relations())
            .filter(|r| seen.insert(r.identity()))
            .collect();
        tracing::info!(
            source = %self.name,
            tables = tables.len(),
            relations = relations.len(),
            "Extracted static schema"
        );
        Ok(ExtractionOutput::new(tables, relations))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kg_types::{Cardinality, ColumnModel, JoinKind};

    fn schema() -> StaticSchema {
        serde_json::from_value(serde_json::json!({
            "database": "shop",
            "tables": [
                {
                    "name": "orders",
                    "columns": [
                        {"name": "id", "type": "int", "primary_key": true},
                        {"name": "customer_id", "type": "int",
                         "foreign_key": {"ref_table": "customers", "ref_column": "id"}}
                    ],
                    "row_count": 2000000
                },
                {"name": "customers", "database": "crm",
                 "columns": [{"name": "id", "type": "int", "primary_key": true}]},
                {"name": "", "columns": []}
            ],
            "relations": [
                {"from_table": "orders", "from_column": "customer_id",
                 "to_table": "customers", "to_column": "id",
                 "relation_type": "join", "join_type": "LEFT"},
                {"from_table": "orders", "from_column": "region_code",
                 "to_table": "regions", "to_column": "code",
                 "relation_type": "reference", "cardinality": "N:1", "confidence": 0.9}
            ]
        }))
        .unwrap()
    }

    #[tokio::test]
    async fn extract_all_derives_and_dedups_column_foreign_keys() {
        let mut ex = StaticExtractor::new(schema());
        ex.connect().await.unwrap();
        assert!(ex.validate_connection().await);

        let out = ex.extract_all().await.unwrap();
        assert_eq!(out.table_count, 2);
        assert_eq!(out.relation_count, 2);

        let fk = &out.relations[0];
        assert_eq!(fk.key(), "orders.customer_id->customers.id");
        assert_eq!(fk.kind, RelationKind::ForeignKey);
        assert_eq!(fk.join_kind, JoinKind::Inner);
        assert_eq!(fk.cardinality, Cardinality::ManyToOne);
        assert_eq!(out.relations[1].kind, RelationKind::Reference);

        ex.disconnect().await;
        assert!(!ex.validate_connection().await);
    }

    #[tokio::test]
    async fn tables_get_database_and_node_ids() {
        let ex = StaticExtractor::new(schema());
        let tables = ex.extract_tables().await.unwrap();
        assert_eq!(tables[0].node_id(), "table:shop.orders");
        assert_eq!(tables[0].row_count, Some(2_000_000));
        assert_eq!(tables[1].node_id(), "table:crm.customers");

        let bare = StaticExtractor::new(StaticSchema {
            tables: vec![StaticTable {
                name: "t".to_string(),
                database: None,
                columns: vec![ColumnModel::new("id", "int").primary()],
                primary_keys: Vec::new(),
                row_count: None,
                comment: String::new(),
                graph_node_id: None,
            }],
            ..StaticSchema::default()
        });
        let tables = bare.extract_tables().await.unwrap();
        assert_eq!(tables[0].node_id(), "table:unknown_db.t");
    }

    #[tokio::test]
    async fn invalid_primary_key_is_skipped() {
        let mut s = schema();
        s.tables[1].primary_keys = vec!["missing".to_string()];
        let ex = StaticExtractor::new(s);
        let tables = ex.extract_tables().await.unwrap();
        assert_eq!(tables.len(), 1);
        assert_eq!(tables[0].name, "orders");
    }
}

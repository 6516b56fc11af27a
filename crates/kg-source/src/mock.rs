//! Mock extractor for tests: canned tables and relations, no database.

use async_trait::async_trait;
use kg_types::{ExtractorError, SchemaExtractor, TableModel, TableRelationModel};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Stands in for a relational catalog source.
pub struct MockExtractor {
    name: String,
    tables: Vec<TableModel>,
    relations: Vec<TableRelationModel>,
    fail_connect: bool,
    connected: bool,
    connects: Arc<AtomicUsize>,
}

impl MockExtractor {
    pub fn new(
        name: impl Into<String>,
        tables: Vec<TableModel>,
        relations: Vec<TableRelationModel>,
    ) -> Self {
        Self {
            name: name.into(),
            tables,
            relations,
            fail_connect: false,
            connected: false,
            connects: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// An extractor whose `connect` always fails.
    pub fn unreachable(name: impl Into<String>) -> Self {
        let mut ex = Self::new(name, Vec::new(), Vec::new());
        ex.fail_connect = true;
        ex
    }

    /// Shared counter of `connect` attempts, readable after the extractor is moved.
    pub fn connect_counter(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.connects)
    }

    fn ensure_connected(&self) -> Result<(), ExtractorError> {
        if self.connected {
            Ok(())
        } else {
            Err(ExtractorError::Extraction {
                source_name: self.name.clone(),
                reason: "not connected".to_string(),
            })
        }
    }
}

#[async_trait]
impl SchemaExtractor for MockExtractor {
    fn name(&self) -> &str {
        &self.name
    }

    async fn connect(&mut self) -> Result<(), ExtractorError> {
        self.connects.fetch_add(1, Ordering::SeqCst);
        if self.fail_connect {
            return Err(ExtractorError::Connection {
                source_name: self.name.clone(),
                reason: "connection refused".to_string(),
            });
        }
        self.connected = true;
        Ok(())
    }

    async fn disconnect(&mut self) {
        self.connected = false;
    }

    async fn validate_connection(&self) -> bool {
        self.connected
    }

    async fn extract_tables(&self) -> Result<Vec<TableModel>, ExtractorError> {
        self.ensure_connected()?;
        Ok(self.tables.clone())
    }

    async fn extract_relations(&self) -> Result<Vec<TableRelationModel>, ExtractorError> {
        self.ensure_connected()?;
        Ok(self.relations.clone())
    }
}

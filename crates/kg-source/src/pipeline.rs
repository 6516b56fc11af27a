//! Driving configured extractors and collecting what they return.

use crate::merge::{merge_sources, MergePolicy, SchemaSnapshot};
use kg_types::{ExtractorError, PipelineError, SchemaExtractor};

/// Relational extractors plus at most one static extractor.
#[derive(Default)]
pub struct SourceSet {
    relational: Vec<Box<dyn SchemaExtractor>>,
    static_source: Option<Box<dyn SchemaExtractor>>,
}

impl SourceSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_relational(mut self, extractor: impl SchemaExtractor + 'static) -> Self {
        self.relational.push(Box::new(extractor));
        self
    }

    pub fn with_static(mut self, extractor: impl SchemaExtractor + 'static) -> Self {
        self.static_source = Some(Box::new(extractor));
        self
    }

    /// Number of configured sources, contacted or not.
    pub fn configured(&self) -> usize {
        self.relational.len() + usize::from(self.static_source.is_some())
    }
}

/// Per-source outputs of one collection run.
#[derive(Debug, Default)]
pub struct CollectedSources {
    pub relational: Vec<SchemaSnapshot>,
    pub static_schema: Option<SchemaSnapshot>,
    /// Names of sources that could not be connected to or extracted from.
    pub failed_sources: Vec<String>,
    pub configured: usize,
    pub attempted: usize,
}

impl CollectedSources {
    /// Apply the merge policy to everything collected.
    pub fn merge(&self, policy: MergePolicy) -> SchemaSnapshot {
        merge_sources(&self.relational, self.static_schema.as_ref(), policy)
    }
}

/// Connect, extract and disconnect one source.
async fn extract_one(extractor: &mut dyn SchemaExtractor) -> Result<SchemaSnapshot, ExtractorError> {
    extractor.connect().await?;
    let result = extractor.extract_all().await;
    extractor.disconnect().await;
    let out = result?;
    tracing::info!(
        source = extractor.name(),
        tables = out.table_count,
        relations = out.relation_count,
        "Extracted schema source"
    );
    Ok(out.into())
}

/// Run every configured source in order. Failures are logged and recorded, never raised.
/// Under [`MergePolicy::StaticOnly`] relational sources are not contacted.
pub async fn collect_sources(sources: &mut SourceSet, policy: MergePolicy) -> CollectedSources {
    let mut collected = CollectedSources {
        configured: sources.configured(),
        ..CollectedSources::default()
    };

    if policy != MergePolicy::StaticOnly {
        for extractor in sources.relational.iter_mut() {
            collected.attempted += 1;
            match extract_one(extractor.as_mut()).await {
                Ok(snapshot) => collected.relational.push(snapshot),
                Err(e) => {
                    tracing::warn!(source = extractor.name(), error = %e, "Schema source failed");
                    collected.failed_sources.push(extractor.name().to_string());
                }
            }
        }
    }

    if let Some(extractor) = sources.static_source.as_mut() {
        collected.attempted += 1;
        match extract_one(extractor.as_mut()).await {
            Ok(snapshot) => collected.static_schema = Some(snapshot),
            Err(e) => {
                tracing::warn!(source = extractor.name(), error = %e, "Static schema source failed");
                collected.failed_sources.push(extractor.name().to_string());
            }
        }
    }

    collected
}

/// Fail when nothing was configured, or when every contacted source failed.
pub fn require_any_source(collected: &CollectedSources) -> Result<(), PipelineError> {
    if collected.configured == 0 {
        return Err(PipelineError::NoSources);
    }
    if collected.attempted > 0 && collected.failed_sources.len() == collected.attempted {
        return Err(PipelineError::AllSourcesFailed(
            collected.failed_sources.clone(),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{MockExtractor, StaticExtractor};
    use kg_types::{ColumnModel, StaticSchema, TableModel};
    use std::sync::atomic::Ordering;

    fn orders() -> TableModel {
        TableModel::new("shop", "orders", vec![ColumnModel::new("id", "int").primary()])
    }

    #[tokio::test]
    async fn failed_source_is_reported_and_others_continue() {
        let mut sources = SourceSet::new()
            .with_relational(MockExtractor::unreachable("primary"))
            .with_relational(MockExtractor::new("replica", vec![orders()], Vec::new()));
        let collected = collect_sources(&mut sources, MergePolicy::Merge).await;
        assert_eq!(collected.failed_sources, vec!["primary".to_string()]);
        assert_eq!(collected.relational.len(), 1);
        assert!(require_any_source(&collected).is_ok());
        assert_eq!(collected.merge(MergePolicy::Merge).tables.len(), 1);
    }

    #[tokio::test]
    async fn all_sources_failing_is_an_error() {
        let mut sources = SourceSet::new()
            .with_relational(MockExtractor::unreachable("a"))
            .with_relational(MockExtractor::unreachable("b"));
        let collected = collect_sources(&mut sources, MergePolicy::Merge).await;
        match require_any_source(&collected) {
            Err(PipelineError::AllSourcesFailed(names)) => assert_eq!(names, vec!["a", "b"]),
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[tokio::test]
    async fn nothing_configured_is_an_error() {
        let collected = collect_sources(&mut SourceSet::new(), MergePolicy::Merge).await;
        assert!(matches!(
            require_any_source(&collected),
            Err(PipelineError::NoSources)
        ));
    }

    #[tokio::test]
    async fn static_only_does_not_contact_relational_sources() {
        let relational = MockExtractor::new("primary", vec![orders()], Vec::new());
        let connects = relational.connect_counter();
        let mut sources = SourceSet::new()
            .with_relational(relational)
            .with_static(StaticExtractor::new(StaticSchema::default()));
        let collected = collect_sources(&mut sources, MergePolicy::StaticOnly).await;
        assert_eq!(connects.load(Ordering::SeqCst), 0);
        assert!(require_any_source(&collected).is_ok());
        let merged = collected.merge(MergePolicy::StaticOnly);
        assert!(merged.tables.is_empty());
        assert!(merged.relations.is_empty());
    }
}

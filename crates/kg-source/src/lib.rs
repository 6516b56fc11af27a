//! Schema sources: extractors, collection across sources, and merge policies.

mod merge;
#[cfg(any(test, feature = "test-util"))]
mod mock;
mod pipeline;
mod static_source;

pub use kg_types::{ExtractionOutput, ExtractorError, PipelineError, SchemaExtractor};
pub use merge::{merge_sources, MergePolicy, SchemaSnapshot};
pub use pipeline::{collect_sources, require_any_source, CollectedSources, SourceSet};
pub use static_source::StaticExtractor;

#[cfg(any(test, feature = "test-util"))]
pub use mock::MockExtractor;

//! Graph construction: table and relation projection, keyword classification, and
//! semantic enrichment.

mod builder;
pub mod classify;
mod enricher;
mod inflection;

pub use builder::GraphBuilder;
pub use enricher::{
    detect_table_communities, GraphEnricher, TableCommunity, INFERRED_CONFIDENCE,
    INFERRED_WEIGHT_FACTOR,
};
pub use inflection::{pluralize, singularize};
pub use kg_types::{BuildResult, EnrichmentStats, GraphConfig};

//! Schema knowledge graph service: build context, table-level queries, and path explanations.

pub mod config;
mod context;
pub mod explain;
mod service;

pub use config::{config_path, load_config, ConfigError};
pub use context::KgContext;
pub use service::GraphQueryService;

pub use kg_source::{MergePolicy, SourceSet, StaticExtractor};
pub use kg_types::{
    BuildResult, Direction, KgConfig, NeighborQueryResponse, PathQueryResponse, PipelineError,
    QueryError, RelationEntry, RelationKind, StatisticsResponse,
};

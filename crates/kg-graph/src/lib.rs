//! Graph store backends for the schema knowledge graph.

mod memory;
mod traversal;

#[cfg(feature = "sqlite")]
mod sqlite;

pub use kg_types::{
    GraphEdge, GraphNode, GraphPath, GraphStatistics, GraphStore, GraphStoreError, Subgraph,
    WriteSummary, NEIGHBOR_RESULT_LIMIT,
};
pub use memory::InMemoryGraphStore;

#[cfg(feature = "sqlite")]
pub use sqlite::SqliteGraphStore;

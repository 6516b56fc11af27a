//! Core types and traits for the schema knowledge graph.
//!
//! Schema models describe what extractors produce; graph models describe what the
//! builder writes and the store returns. Query DTOs are the JSON shapes handed to callers.

mod config;
mod dto;
mod graph;
mod schema;
mod traits;

pub use config::*;
pub use dto::*;
pub use graph::*;
pub use schema::*;
pub use traits::*;

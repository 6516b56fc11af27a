//! SQLite-backed graph store implementation (persistence).

use crate::traversal::{self, Adjacency};
use async_trait::async_trait;
use kg_types::{
    EdgeProperties, EdgeStyle, GraphEdge, GraphNode, GraphPath, GraphStatistics, GraphStore,
    GraphStoreError, NodeKind, NodeStyle, RelationKind, Subgraph, WriteSummary,
    NEIGHBOR_RESULT_LIMIT,
};
use rusqlite::types::Type;
use rusqlite::{Connection, OptionalExtension, Row};
use std::collections::HashMap;
use std::path::Path;
use std::sync::MutexGuard;
use std::time::Duration;

const DEFAULT_BUSY_TIMEOUT: Duration = Duration::from_secs(5);

const SCHEMA: &str = r#"
    CREATE TABLE IF NOT EXISTS nodes (
        id TEXT PRIMARY KEY,
        label TEXT NOT NULL,
        kind TEXT NOT NULL,
        properties TEXT NOT NULL,
        style TEXT NOT NULL,
        created_at TEXT NOT NULL,
        updated_at TEXT NOT NULL
    );

    CREATE TABLE IF NOT EXISTS edges (
        id TEXT PRIMARY KEY,
        from_node TEXT NOT NULL,
        to_node TEXT NOT NULL,
        relation_kind TEXT NOT NULL,
        label TEXT NOT NULL,
        properties TEXT NOT NULL,
        weight REAL NOT NULL,
        style TEXT NOT NULL,
        created_at TEXT NOT NULL,
        updated_at TEXT NOT NULL
    );

    CREATE INDEX IF NOT EXISTS idx_nodes_kind ON nodes(kind);
    CREATE INDEX IF NOT EXISTS idx_edges_from ON edges(from_node);
    CREATE INDEX IF NOT EXISTS idx_edges_to ON edges(to_node);
    CREATE INDEX IF NOT EXISTS idx_edges_relation_kind ON edges(relation_kind);
"#;

const NODE_COLUMNS: &str = "id, label, kind, properties, style";
const EDGE_COLUMNS: &str = "id, from_node, to_node, relation_kind, label, properties, weight, style";

/// SQLite-backed graph store for persistence.
///
/// Writes go through one connection behind a mutex; the busy timeout bounds how long a
/// call waits on a locked database before failing.
pub struct SqliteGraphStore {
    conn: std::sync::Mutex<Connection>,
}

impl SqliteGraphStore {
    /// Open (or create) a store at the given path with the default busy timeout.
    pub fn new(path: impl AsRef<Path>) -> Result<Self, GraphStoreError> {
        Self::with_busy_timeout(path, DEFAULT_BUSY_TIMEOUT)
    }

    pub fn with_busy_timeout(
        path: impl AsRef<Path>,
        timeout: Duration,
    ) -> Result<Self, GraphStoreError> {
        let conn = Connection::open(path).map_err(backend)?;
        conn.busy_timeout(timeout).map_err(backend)?;
        conn.execute_batch(SCHEMA).map_err(backend)?;
        Ok(Self {
            conn: std::sync::Mutex::new(conn),
        })
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>, GraphStoreError> {
        self.conn
            .lock()
            .map_err(|e| GraphStoreError::Backend(format!("failed to acquire lock: {}", e)))
    }

    fn with_conn<T, F>(&self, f: F) -> Result<T, GraphStoreError>
    where
        F: FnOnce(&Connection) -> Result<T, rusqlite::Error>,
    {
        let conn = self.lock()?;
        f(&conn).map_err(backend)
    }
}

fn backend(e: rusqlite::Error) -> GraphStoreError {
    GraphStoreError::Backend(e.to_string())
}

fn to_json<T: serde::Serialize>(value: &T) -> Result<String, rusqlite::Error> {
    serde_json::to_string(value).map_err(|e| rusqlite::Error::ToSqlConversionFailure(Box::new(e)))
}

fn from_json<T: serde::de::DeserializeOwned>(
    row: &Row<'_>,
    idx: usize,
) -> Result<T, rusqlite::Error> {
    let raw: String = row.get(idx)?;
    serde_json::from_str(&raw)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

fn row_to_node(row: &Row<'_>) -> Result<GraphNode, rusqlite::Error> {
    let kind: String = row.get(2)?;
    let kind = NodeKind::parse(&kind).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            2,
            Type::Text,
            Box::new(GraphStoreError::Backend(format!("unknown node kind: {}", kind))),
        )
    })?;
    let properties: HashMap<String, serde_json::Value> = from_json(row, 3)?;
    let style: NodeStyle = from_json(row, 4)?;
    Ok(GraphNode {
        id: row.get(0)?,
        label: row.get(1)?,
        kind,
        properties,
        style,
    })
}

fn row_to_edge(row: &Row<'_>) -> Result<GraphEdge, rusqlite::Error> {
    let kind: String = row.get(3)?;
    let kind = RelationKind::parse(&kind).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            3,
            Type::Text,
            Box::new(GraphStoreError::Backend(format!("unknown relation kind: {}", kind))),
        )
    })?;
    let properties: EdgeProperties = from_json(row, 5)?;
    let style: EdgeStyle = from_json(row, 7)?;
    Ok(GraphEdge {
        id: row.get(0)?,
        source: row.get(1)?,
        target: row.get(2)?,
        kind,
        label: row.get(4)?,
        properties,
        weight: row.get(6)?,
        style,
    })
}

fn node_exists(conn: &Connection, id: &str) -> Result<bool, rusqlite::Error> {
    conn.query_row("SELECT 1 FROM nodes WHERE id = ?1", [id], |_| Ok(()))
        .optional()
        .map(|r| r.is_some())
}

fn edge_exists(conn: &Connection, id: &str) -> Result<bool, rusqlite::Error> {
    conn.query_row("SELECT 1 FROM edges WHERE id = ?1", [id], |_| Ok(()))
        .optional()
        .map(|r| r.is_some())
}

fn upsert_node(conn: &Connection, node: &GraphNode, now: &str) -> Result<(), rusqlite::Error> {
    conn.execute(
        "INSERT INTO nodes (id, label, kind, properties, style, created_at, updated_at) \
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?6) \
         ON CONFLICT(id) DO UPDATE SET label = excluded.label, kind = excluded.kind, \
         properties = excluded.properties, style = excluded.style, updated_at = excluded.updated_at",
        rusqlite::params![
            node.id,
            node.label,
            node.kind.as_str(),
            to_json(&node.properties)?,
            to_json(&node.style)?,
            now,
        ],
    )?;
    Ok(())
}

fn upsert_edge(conn: &Connection, edge: &GraphEdge, now: &str) -> Result<(), rusqlite::Error> {
    conn.execute(
        "INSERT INTO edges (id, from_node, to_node, relation_kind, label, properties, weight, style, created_at, updated_at) \
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?9) \
         ON CONFLICT(id) DO UPDATE SET from_node = excluded.from_node, to_node = excluded.to_node, \
         relation_kind = excluded.relation_kind, label = excluded.label, properties = excluded.properties, \
         weight = excluded.weight, style = excluded.style, updated_at = excluded.updated_at",
        rusqlite::params![
            edge.id,
            edge.source,
            edge.target,
            edge.kind.as_str(),
            edge.label,
            to_json(&edge.properties)?,
            edge.weight,
            to_json(&edge.style)?,
            now,
        ],
    )?;
    Ok(())
}

/// Traversal view that reads straight from the connection using the endpoint indexes.
struct SqliteView<'c> {
    conn: &'c Connection,
}

impl Adjacency for SqliteView<'_> {
    fn node(&self, id: &str) -> Result<Option<GraphNode>, GraphStoreError> {
        self.conn
            .query_row(
                &format!("SELECT {} FROM nodes WHERE id = ?1", NODE_COLUMNS),
                [id],
                row_to_node,
            )
            .optional()
            .map_err(backend)
    }

    fn incident_edges(&self, id: &str) -> Result<Vec<GraphEdge>, GraphStoreError> {
        let mut stmt = self
            .conn
            .prepare_cached(&format!(
                "SELECT {} FROM edges WHERE from_node = ?1 OR to_node = ?1 ORDER BY id",
                EDGE_COLUMNS
            ))
            .map_err(backend)?;
        let rows = stmt.query_map([id], row_to_edge).map_err(backend)?;
        rows.collect::<Result<Vec<_>, _>>().map_err(backend)
    }
}

#[async_trait]
impl GraphStore for SqliteGraphStore {
    async fn initialize(&self) -> Result<(), GraphStoreError> {
        self.with_conn(|conn| conn.execute_batch(SCHEMA))
    }

    async fn add_node(&self, node: &GraphNode) -> Result<(), GraphStoreError> {
        let now = chrono::Utc::now().to_rfc3339();
        self.with_conn(|conn| upsert_node(conn, node, &now))
    }

    async fn add_nodes_batch(&self, nodes: &[GraphNode]) -> Result<WriteSummary, GraphStoreError> {
        let now = chrono::Utc::now().to_rfc3339();
        self.with_conn(|conn| {
            let tx = conn.unchecked_transaction()?;
            let mut summary = WriteSummary::default();
            for node in nodes {
                if node_exists(&tx, &node.id)? {
                    summary.updated += 1;
                } else {
                    summary.created += 1;
                }
                upsert_node(&tx, node, &now)?;
            }
            tx.commit()?;
            Ok(summary)
        })
    }

    async fn get_node(&self, id: &str) -> Result<Option<GraphNode>, GraphStoreError> {
        let conn = self.lock()?;
        SqliteView { conn: &conn }.node(id)
    }

    async fn get_all_nodes(&self) -> Result<Vec<GraphNode>, GraphStoreError> {
        self.with_conn(|conn| {
            let mut stmt =
                conn.prepare(&format!("SELECT {} FROM nodes ORDER BY id", NODE_COLUMNS))?;
            let rows = stmt.query_map([], row_to_node)?;
            rows.collect()
        })
    }

    async fn add_edge(&self, edge: &GraphEdge) -> Result<(), GraphStoreError> {
        let now = chrono::Utc::now().to_rfc3339();
        let conn = self.lock()?;
        for endpoint in [&edge.source, &edge.target] {
            if !node_exists(&conn, endpoint).map_err(backend)? {
                return Err(GraphStoreError::NodeNotFound(endpoint.clone()));
            }
        }
        upsert_edge(&conn, edge, &now).map_err(backend)
    }

    async fn add_edges_batch(&self, edges: &[GraphEdge]) -> Result<WriteSummary, GraphStoreError> {
        let now = chrono::Utc::now().to_rfc3339();
        self.with_conn(|conn| {
            let tx = conn.unchecked_transaction()?;
            let mut summary = WriteSummary::default();
            for edge in edges {
                if !node_exists(&tx, &edge.source)? || !node_exists(&tx, &edge.target)? {
                    summary.skipped += 1;
                    continue;
                }
                if edge_exists(&tx, &edge.id)? {
                    summary.updated += 1;
                } else {
                    summary.created += 1;
                }
                upsert_edge(&tx, edge, &now)?;
            }
            tx.commit()?;
            Ok(summary)
        })
    }

    async fn get_all_edges(&self) -> Result<Vec<GraphEdge>, GraphStoreError> {
        self.with_conn(|conn| {
            let mut stmt =
                conn.prepare(&format!("SELECT {} FROM edges ORDER BY id", EDGE_COLUMNS))?;
            let rows = stmt.query_map([], row_to_edge)?;
            rows.collect()
        })
    }

    async fn clear(&self) -> Result<(), GraphStoreError> {
        self.with_conn(|conn| conn.execute_batch("DELETE FROM edges; DELETE FROM nodes;"))
    }

    async fn find_shortest_path(
        &self,
        start_id: &str,
        end_id: &str,
        max_hops: usize,
        kinds: Option<&[RelationKind]>,
    ) -> Result<Option<GraphPath>, GraphStoreError> {
        let conn = self.lock()?;
        traversal::shortest_path(&SqliteView { conn: &conn }, start_id, end_id, max_hops, kinds)
    }

    async fn find_neighbors(
        &self,
        id: &str,
        depth: usize,
        kinds: Option<&[RelationKind]>,
    ) -> Result<Vec<GraphNode>, GraphStoreError> {
        let conn = self.lock()?;
        traversal::neighbors(
            &SqliteView { conn: &conn },
            id,
            depth,
            kinds,
            NEIGHBOR_RESULT_LIMIT,
        )
    }

    async fn get_subgraph(
        &self,
        center_id: &str,
        depth: usize,
    ) -> Result<Subgraph, GraphStoreError> {
        let conn = self.lock()?;
        traversal::subgraph(&SqliteView { conn: &conn }, center_id, depth)
    }

    async fn get_statistics(&self) -> Result<GraphStatistics, GraphStoreError> {
        let nodes = self.get_all_nodes().await?;
        let edges = self.get_all_edges().await?;
        Ok(GraphStatistics::from_graph(&nodes, &edges))
    }
}

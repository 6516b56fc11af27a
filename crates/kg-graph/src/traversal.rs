//! Undirected breadth-first traversals shared by every backend.
//!
//! A backend exposes its adjacency through [`Adjacency`]; incident edges must come back
//! ordered by edge id so results do not depend on insertion order.

use kg_types::{GraphEdge, GraphNode, GraphPath, GraphStoreError, RelationKind, Subgraph};
use std::collections::{HashMap, HashSet, VecDeque};

/// Read access to nodes and their incident edges.
pub(crate) trait Adjacency {
    fn node(&self, id: &str) -> Result<Option<GraphNode>, GraphStoreError>;

    /// Edges with `id` as source or target, each once, ordered by edge id.
    fn incident_edges(&self, id: &str) -> Result<Vec<GraphEdge>, GraphStoreError>;
}

fn kind_allowed(edge: &GraphEdge, kinds: Option<&[RelationKind]>) -> bool {
    kinds.map_or(true, |ks| ks.contains(&edge.kind))
}

/// Neighbor transitions from `current`, in edge-id order.
fn transitions<A: Adjacency + ?Sized>(
    graph: &A,
    current: &str,
    kinds: Option<&[RelationKind]>,
) -> Result<Vec<(String, GraphEdge)>, GraphStoreError> {
    let mut out = Vec::new();
    for edge in graph.incident_edges(current)? {
        if !kind_allowed(&edge, kinds) {
            continue;
        }
        let Some(next) = edge.other_end(current).map(str::to_string) else {
            continue;
        };
        out.push((next, edge));
    }
    Ok(out)
}

fn label_of<A: Adjacency + ?Sized>(graph: &A, id: &str) -> Result<String, GraphStoreError> {
    Ok(graph
        .node(id)?
        .map(|n| n.label)
        .unwrap_or_else(|| id.to_string()))
}

/// Fewest-hops path from `start` to `end` using at most `max_hops` edges.
pub(crate) fn shortest_path<A: Adjacency + ?Sized>(
    graph: &A,
    start: &str,
    end: &str,
    max_hops: usize,
    kinds: Option<&[RelationKind]>,
) -> Result<Option<GraphPath>, GraphStoreError> {
    if graph.node(start)?.is_none() || graph.node(end)?.is_none() {
        return Ok(None);
    }
    if start == end {
        let label = label_of(graph, start)?;
        return Ok(Some(GraphPath::new(
            vec![start.to_string()],
            vec![label],
            Vec::new(),
        )));
    }
    if max_hops == 0 {
        return Ok(None);
    }

    let mut queue: VecDeque<(String, usize)> = VecDeque::new();
    let mut visited: HashSet<String> = HashSet::new();
    let mut prev: HashMap<String, (String, GraphEdge)> = HashMap::new();

    queue.push_back((start.to_string(), 0));
    visited.insert(start.to_string());

    while let Some((current, depth)) = queue.pop_front() {
        if depth >= max_hops {
            continue;
        }
        for (next, edge) in transitions(graph, &current, kinds)? {
            if !visited.insert(next.clone()) {
                continue;
            }
            prev.insert(next.clone(), (current.clone(), edge));
            if next == end {
                return reconstruct(graph, start, end, &prev).map(Some);
            }
            queue.push_back((next, depth + 1));
        }
    }

    Ok(None)
}

fn reconstruct<A: Adjacency + ?Sized>(
    graph: &A,
    start: &str,
    end: &str,
    prev: &HashMap<String, (String, GraphEdge)>,
) -> Result<GraphPath, GraphStoreError> {
    let mut rev_nodes = vec![end.to_string()];
    let mut rev_edges: Vec<GraphEdge> = Vec::new();
    let mut cursor = end.to_string();
    while cursor != start {
        let (p, e) = prev
            .get(&cursor)
            .ok_or_else(|| GraphStoreError::Backend("path reconstruction failed".to_string()))?;
        rev_edges.push(e.clone());
        rev_nodes.push(p.clone());
        cursor = p.clone();
    }
    rev_nodes.reverse();
    rev_edges.reverse();
    let labels = rev_nodes
        .iter()
        .map(|id| label_of(graph, id))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(GraphPath::new(rev_nodes, labels, rev_edges))
}

/// Hop distance of every node reachable from `center` within `depth`, in discovery order.
fn reach<A: Adjacency + ?Sized>(
    graph: &A,
    center: &str,
    depth: usize,
    kinds: Option<&[RelationKind]>,
) -> Result<Vec<(String, usize)>, GraphStoreError> {
    let mut order = vec![(center.to_string(), 0)];
    let mut visited: HashSet<String> = HashSet::from([center.to_string()]);
    let mut queue: VecDeque<(String, usize)> = VecDeque::from([(center.to_string(), 0)]);

    while let Some((current, d)) = queue.pop_front() {
        if d >= depth {
            continue;
        }
        for (next, _) in transitions(graph, &current, kinds)? {
            if visited.insert(next.clone()) {
                order.push((next.clone(), d + 1));
                queue.push_back((next, d + 1));
            }
        }
    }
    Ok(order)
}

/// Distinct nodes within `depth` hops of `center`, excluding it, at most `limit` of them.
pub(crate) fn neighbors<A: Adjacency + ?Sized>(
    graph: &A,
    center: &str,
    depth: usize,
    kinds: Option<&[RelationKind]>,
    limit: usize,
) -> Result<Vec<GraphNode>, GraphStoreError> {
    if graph.node(center)?.is_none() {
        return Ok(Vec::new());
    }
    let mut out = Vec::new();
    for (id, _) in reach(graph, center, depth, kinds)?.into_iter().skip(1) {
        if out.len() >= limit {
            break;
        }
        if let Some(node) = graph.node(&id)? {
            out.push(node);
        }
    }
    Ok(out)
}

/// Center plus every node and edge on a path of at most `depth` hops.
///
/// A missing center yields an empty subgraph.
pub(crate) fn subgraph<A: Adjacency + ?Sized>(
    graph: &A,
    center: &str,
    depth: usize,
) -> Result<Subgraph, GraphStoreError> {
    let mut nodes = Vec::new();
    let mut edges: Vec<GraphEdge> = Vec::new();
    if graph.node(center)?.is_some() {
        let mut seen_edges: HashSet<String> = HashSet::new();
        for (id, d) in reach(graph, center, depth, None)? {
            let Some(node) = graph.node(&id)? else {
                continue;
            };
            nodes.push(node);
            if d < depth {
                for edge in graph.incident_edges(&id)? {
                    if seen_edges.insert(edge.id.clone()) {
                        edges.push(edge);
                    }
                }
            }
        }
        edges.sort_by(|a, b| a.id.cmp(&b.id));
    }
    Ok(Subgraph {
        nodes,
        edges,
        center_node: center.to_string(),
        depth,
    })
}

//! Text artifacts derived from a path: SQL join hint and a plain-language explanation.

use kg_types::{GraphEdge, GraphPath};

/// Table names along the path; falls back to ids when labels are missing.
fn tables(path: &GraphPath) -> Vec<&str> {
    if path.labels.len() == path.nodes.len() {
        path.labels.iter().map(String::as_str).collect()
    } else {
        path.nodes.iter().map(String::as_str).collect()
    }
}

/// Columns of `edge` as `(column on prev, column on next)` when walking from `prev_id`.
fn oriented_columns<'a>(edge: &'a GraphEdge, prev_id: &str) -> (&'a str, &'a str) {
    let p = &edge.properties;
    if edge.source == prev_id {
        (p.from_column.as_str(), p.to_column.as_str())
    } else {
        (p.to_column.as_str(), p.from_column.as_str())
    }
}

/// `FROM {base}` followed by one JOIN line per hop, in path order.
///
/// Each line joins the next table on the previous one, whichever way the underlying
/// relation points.
pub fn sql_join_hint(path: &GraphPath) -> String {
    let names = tables(path);
    let Some(base) = names.first() else {
        return String::new();
    };
    let mut lines = Vec::with_capacity(path.edges.len());
    for (i, edge) in path.edges.iter().enumerate() {
        let (Some(prev), Some(next), Some(prev_id)) =
            (names.get(i), names.get(i + 1), path.nodes.get(i))
        else {
            break;
        };
        let (prev_col, next_col) = oriented_columns(edge, prev_id);
        lines.push(format!(
            "{} JOIN {} ON {}.{} = {}.{}",
            edge.properties.join_kind, next, prev, prev_col, next, next_col
        ));
    }
    if lines.is_empty() {
        format!("FROM {}", base)
    } else {
        format!("FROM {}\n  {}", base, lines.join("\n  "))
    }
}

/// One sentence for a single hop; otherwise the chain plus numbered per-hop details.
pub fn explain_path(path: &GraphPath) -> String {
    let names = tables(path);
    let (Some(first), Some(last)) = (names.first(), names.last()) else {
        return "No path found.".to_string();
    };
    match path.edges.as_slice() {
        [] => format!("'{}' and '{}' are the same table.", first, last),
        [edge] => format!(
            "'{}' is directly connected to '{}' via {} → {}.",
            first, last, edge.properties.from_column, edge.properties.to_column
        ),
        edges => {
            let details: Vec<String> = edges
                .iter()
                .enumerate()
                .map(|(i, e)| {
                    let p = &e.properties;
                    format!(
                        "{}. {}.{} → {}.{} ({})",
                        i + 1,
                        p.from_table,
                        p.from_column,
                        p.to_table,
                        p.to_column,
                        p.cardinality
                    )
                })
                .collect();
            format!(
                "To get from '{}' to '{}', you need to go through {} steps: {}.\n\nDetails:\n{}",
                first,
                last,
                edges.len(),
                names.join(" → "),
                details.join("\n")
            )
        }
    }
}

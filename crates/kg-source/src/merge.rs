//! Combining relational and static schema sources.

use kg_types::{ExtractionOutput, PipelineError, RelationKey, TableModel, TableRelationModel};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

/// How static definitions combine with relational catalogs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MergePolicy {
    /// Static definitions only; relational sources are ignored.
    StaticOnly,
    /// Union; relational wins on collisions.
    #[default]
    Merge,
    /// Union; static wins on collisions.
    StaticOverride,
}

impl MergePolicy {
    pub fn as_str(self) -> &'static str {
        match self {
            MergePolicy::StaticOnly => "static_only",
            MergePolicy::Merge => "merge",
            MergePolicy::StaticOverride => "static_override",
        }
    }
}

impl fmt::Display for MergePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MergePolicy {
    type Err = PipelineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "static_only" => Ok(MergePolicy::StaticOnly),
            "merge" => Ok(MergePolicy::Merge),
            "static_override" => Ok(MergePolicy::StaticOverride),
            other => Err(PipelineError::UnknownPolicy(other.to_string())),
        }
    }
}

/// One merged `(tables, relations)` pair.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SchemaSnapshot {
    pub tables: Vec<TableModel>,
    pub relations: Vec<TableRelationModel>,
}

impl SchemaSnapshot {
    pub fn new(tables: Vec<TableModel>, relations: Vec<TableRelationModel>) -> Self {
        Self { tables, relations }
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty() && self.relations.is_empty()
    }
}

impl From<ExtractionOutput> for SchemaSnapshot {
    fn from(out: ExtractionOutput) -> Self {
        Self::new(out.tables, out.relations)
    }
}

/// Union in order; the first table per name and the first relation per key win.
fn union(inputs: &[SchemaSnapshot]) -> SchemaSnapshot {
    let mut names = HashSet::new();
    let mut keys = HashSet::new();
    let mut out = SchemaSnapshot::default();
    for input in inputs {
        for t in &input.tables {
            if names.insert(t.name.clone()) {
                out.tables.push(t.clone());
            }
        }
        for r in &input.relations {
            if keys.insert(r.identity()) {
                out.relations.push(r.clone());
            }
        }
    }
    out
}

/// Merge relational snapshots with an optional static one under `policy`. Pure.
pub fn merge_sources(
    relational: &[SchemaSnapshot],
    static_input: Option<&SchemaSnapshot>,
    policy: MergePolicy,
) -> SchemaSnapshot {
    let static_input = match (policy, static_input) {
        (MergePolicy::StaticOnly, s) => return s.cloned().unwrap_or_default(),
        (_, None) => return union(relational),
        (_, Some(s)) => s,
    };
    let mut merged = union(relational);

    match policy {
        MergePolicy::Merge | MergePolicy::StaticOnly => {
            let mut names: HashSet<String> = merged.tables.iter().map(|t| t.name.clone()).collect();
            for t in &static_input.tables {
                if names.insert(t.name.clone()) {
                    merged.tables.push(t.clone());
                }
            }
            let mut keys: HashSet<RelationKey> =
                merged.relations.iter().map(|r| r.identity()).collect();
            for r in &static_input.relations {
                if keys.insert(r.identity()) {
                    merged.relations.push(r.clone());
                }
            }
        }
        MergePolicy::StaticOverride => {
            let static_names: HashSet<&str> =
                static_input.tables.iter().map(|t| t.name.as_str()).collect();
            merged
                .tables
                .retain(|t| !static_names.contains(t.name.as_str()));
            merged.tables.extend(static_input.tables.iter().cloned());
            for r in &static_input.relations {
                let key = r.identity();
                merged.relations.retain(|existing| existing.identity() != key);
                merged.relations.push(r.clone());
            }
        }
    }
    merged
}

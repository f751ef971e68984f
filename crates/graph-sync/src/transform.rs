use crate::coerce::{coerce, Coercion};
use crate::error::SyncError;
use crate::mapping::{EdgeMapping, Mapping, MappingEngine, VertexMapping};
use crate::value::{Record, Value};
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};

/// Sparse attribute map: a key is present iff the source value was non-null.
pub type Attributes = BTreeMap<String, Value>;

/// One transformed edge, endpoints resolved to stringified natural keys.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Edge {
    pub from_type: String,
    pub from_id: String,
    pub to_type: String,
    pub to_id: String,
    pub attributes: Attributes,
}

/// Upsert payload for one micro-batch, grouped by type tag.
///
/// Serializes to `{"vertices": {"User": {"1": {...}}}}` or
/// `{"edges": {"PURCHASED": [...]}}`. Vertices are keyed by id, so a
/// repeated id within one batch overwrites (last write wins); edges are an
/// ordered list with duplicates allowed — an edge has no dedup key.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum GraphPayload {
    Vertices(BTreeMap<String, BTreeMap<String, Attributes>>),
    Edges(BTreeMap<String, Vec<Edge>>),
}

impl GraphPayload {
    pub fn entity_count(&self) -> usize {
        match self {
            GraphPayload::Vertices(by_type) => by_type.values().map(|v| v.len()).sum(),
            GraphPayload::Edges(by_type) => by_type.values().map(|e| e.len()).sum(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.entity_count() == 0
    }
}

/// Best-effort result of transforming one batch: every record either
/// contributed an entity, was silently skipped for a null natural key, or
/// left an error note behind.
#[derive(Debug)]
pub struct TransformOutcome {
    pub payload: GraphPayload,
    pub errors: Vec<String>,
}

impl MappingEngine {
    /// Transforms a batch of records for `table` into an upsert payload.
    ///
    /// Fails only when the table has no registered mapping; per-record
    /// failures are collected in the outcome and never abort the batch.
    pub fn transform_records(
        &self,
        table: &str,
        records: &[Record],
    ) -> Result<TransformOutcome, SyncError> {
        match self.get(table)? {
            Mapping::Vertex(mapping) => Ok(transform_vertices(mapping, records)),
            Mapping::Edge(mapping) => Ok(transform_edges(mapping, records)),
        }
    }
}

fn transform_vertices(mapping: &VertexMapping, records: &[Record]) -> TransformOutcome {
    let mut vertices: BTreeMap<String, Attributes> = BTreeMap::new();
    let mut errors = Vec::new();

    for record in records {
        match vertex_from_record(mapping, record) {
            Ok(Some((id, attributes))) => {
                vertices.insert(id, attributes);
            }
            Ok(None) => {} // null natural key, skipped
            Err(e) => errors.push(format!("vertex record: {}", e)),
        }
    }

    let mut by_type = BTreeMap::new();
    by_type.insert(mapping.vertex_type.clone(), vertices);
    TransformOutcome {
        payload: GraphPayload::Vertices(by_type),
        errors,
    }
}

fn transform_edges(mapping: &EdgeMapping, records: &[Record]) -> TransformOutcome {
    let mut edges = Vec::new();
    let mut errors = Vec::new();

    for record in records {
        match edge_from_record(mapping, record) {
            Ok(Some(edge)) => edges.push(edge),
            Ok(None) => {} // one endpoint key was null, skipped
            Err(e) => errors.push(format!("edge record: {}", e)),
        }
    }

    let mut by_type = BTreeMap::new();
    by_type.insert(mapping.edge_type.clone(), edges);
    TransformOutcome {
        payload: GraphPayload::Edges(by_type),
        errors,
    }
}

fn vertex_from_record(
    mapping: &VertexMapping,
    record: &Record,
) -> Result<Option<(String, Attributes)>, SyncError> {
    let Some(id) = coerce_field(record, &mapping.primary_id, &mapping.type_conversions)? else {
        return Ok(None);
    };
    let attributes = collect_attributes(&mapping.attributes, &mapping.type_conversions, record)?;
    Ok(Some((id.to_string(), attributes)))
}

fn edge_from_record(
    mapping: &EdgeMapping,
    record: &Record,
) -> Result<Option<Edge>, SyncError> {
    let Some(from_id) = coerce_field(record, &mapping.from_id, &mapping.type_conversions)? else {
        return Ok(None);
    };
    let Some(to_id) = coerce_field(record, &mapping.to_id, &mapping.type_conversions)? else {
        return Ok(None);
    };
    let attributes = collect_attributes(&mapping.attributes, &mapping.type_conversions, record)?;
    Ok(Some(Edge {
        from_type: mapping.from_vertex_type.clone(),
        from_id: from_id.to_string(),
        to_type: mapping.to_vertex_type.clone(),
        to_id: to_id.to_string(),
        attributes,
    }))
}

fn coerce_field(
    record: &Record,
    field: &str,
    conversions: &HashMap<String, Coercion>,
) -> Result<Option<Value>, SyncError> {
    let raw = record.get(field).unwrap_or(&Value::Null);
    coerce(raw, conversions.get(field).copied())
}

fn collect_attributes(
    fields: &[String],
    conversions: &HashMap<String, Coercion>,
    record: &Record,
) -> Result<Attributes, SyncError> {
    let mut attributes = Attributes::new();
    for field in fields {
        let Some(raw) = record.get(field) else {
            continue;
        };
        if let Some(value) = coerce(raw, conversions.get(field).copied())? {
            attributes.insert(field.clone(), value);
        }
    }
    Ok(attributes)
}

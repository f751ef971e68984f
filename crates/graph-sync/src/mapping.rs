use crate::coerce::Coercion;
use crate::error::SyncError;
use serde::Deserialize;
use std::collections::HashMap;
use std::fmt::Write as _;

/// Declarative rule turning rows of one source table into typed vertices.
///
/// `primary_id` names the field holding the natural key; it does not have
/// to appear in `attributes`. Fields without a `type_conversions` entry
/// pass through unconverted.
#[derive(Debug, Clone, Deserialize)]
pub struct VertexMapping {
    pub table: String,
    pub vertex_type: String,
    pub primary_id: String,
    pub attributes: Vec<String>,
    #[serde(default)]
    pub type_conversions: HashMap<String, Coercion>,
}

/// Declarative rule turning rows of one source table into typed, directed
/// edges between two vertex types.
#[derive(Debug, Clone, Deserialize)]
pub struct EdgeMapping {
    pub table: String,
    pub edge_type: String,
    pub from_vertex_type: String,
    pub to_vertex_type: String,
    pub from_id: String,
    pub to_id: String,
    pub attributes: Vec<String>,
    #[serde(default)]
    pub type_conversions: HashMap<String, Coercion>,
}

/// A registered mapping, dispatched by kind.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Mapping {
    Vertex(VertexMapping),
    Edge(EdgeMapping),
}

impl Mapping {
    pub fn table(&self) -> &str {
        match self {
            Mapping::Vertex(m) => &m.table,
            Mapping::Edge(m) => &m.table,
        }
    }
}

/// Registry of table-to-graph mappings, one per source table.
///
/// Re-registering a table overwrites its mapping. Edge endpoint types are
/// deliberately not checked against registered vertex types: broken
/// references surface at the destination store, not here.
#[derive(Debug, Default)]
pub struct MappingEngine {
    mappings: HashMap<String, Mapping>,
}

impl MappingEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_vertex_mapping(&mut self, mapping: VertexMapping) {
        self.mappings
            .insert(mapping.table.clone(), Mapping::Vertex(mapping));
    }

    pub fn add_edge_mapping(&mut self, mapping: EdgeMapping) {
        self.mappings
            .insert(mapping.table.clone(), Mapping::Edge(mapping));
    }

    pub fn register(&mut self, mapping: Mapping) {
        self.mappings.insert(mapping.table().to_string(), mapping);
    }

    pub fn get(&self, table: &str) -> Result<&Mapping, SyncError> {
        self.mappings
            .get(table)
            .ok_or_else(|| SyncError::MappingNotFound(table.to_string()))
    }

    pub fn len(&self) -> usize {
        self.mappings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.mappings.is_empty()
    }

    /// Loads a mapping set from a JSON array of tagged definitions.
    pub fn from_json(json: &str) -> Result<Self, SyncError> {
        let mappings: Vec<Mapping> = serde_json::from_str(json)?;
        let mut engine = Self::new();
        for mapping in mappings {
            engine.register(mapping);
        }
        Ok(engine)
    }

    /// Human-readable rundown of the registered mappings.
    pub fn summary(&self) -> String {
        let mut out = String::new();
        for (table, mapping) in &self.mappings {
            let _ = writeln!(out, "Table: {}", table);
            match mapping {
                Mapping::Vertex(m) => {
                    let _ = writeln!(out, "  Vertex: {}", m.vertex_type);
                    let _ = writeln!(out, "  Primary ID: {}", m.primary_id);
                    let _ = writeln!(out, "  Attributes: {}", m.attributes.join(", "));
                }
                Mapping::Edge(m) => {
                    let _ = writeln!(out, "  Edge: {}", m.edge_type);
                    let _ = writeln!(
                        out,
                        "  From {}({}) To {}({})",
                        m.from_vertex_type, m.from_id, m.to_vertex_type, m.to_id
                    );
                }
            }
        }
        out
    }
}

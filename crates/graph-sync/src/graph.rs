use crate::error::SyncError;
use crate::transform::{Attributes, Edge};
use std::collections::{BTreeMap, HashMap};
use std::sync::Mutex;

/// What the store reports back for one upsert call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UpsertReport {
    pub accepted: usize,
    pub skipped: usize,
}

/// Writer side of the pipeline. Upserts are assumed idempotent and
/// order-insensitive across calls; `batch_size` is a hint for store-side
/// sub-batching, not a contract this crate enforces.
pub trait GraphClient: Send + Sync {
    fn upsert_vertices(
        &self,
        vertex_type: &str,
        vertices: &BTreeMap<String, Attributes>,
        batch_size: usize,
    ) -> Result<UpsertReport, SyncError>;

    fn upsert_edges(
        &self,
        edge_type: &str,
        edges: &[Edge],
        batch_size: usize,
    ) -> Result<UpsertReport, SyncError>;
}

/// In-memory graph store. Vertices dedup on (type, id) the way a real
/// upsert would; edges accumulate in arrival order.
#[derive(Debug, Default)]
pub struct MemoryGraph {
    vertices: Mutex<HashMap<String, BTreeMap<String, Attributes>>>,
    edges: Mutex<HashMap<String, Vec<Edge>>>,
}

impl MemoryGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn vertex_count(&self, vertex_type: &str) -> usize {
        self.vertices
            .lock()
            .map(|v| v.get(vertex_type).map_or(0, |m| m.len()))
            .unwrap_or(0)
    }

    pub fn edge_count(&self, edge_type: &str) -> usize {
        self.edges
            .lock()
            .map(|e| e.get(edge_type).map_or(0, |v| v.len()))
            .unwrap_or(0)
    }

    pub fn vertex(&self, vertex_type: &str, id: &str) -> Option<Attributes> {
        self.vertices
            .lock()
            .ok()
            .and_then(|v| v.get(vertex_type).and_then(|m| m.get(id).cloned()))
    }
}

impl GraphClient for MemoryGraph {
    fn upsert_vertices(
        &self,
        vertex_type: &str,
        vertices: &BTreeMap<String, Attributes>,
        _batch_size: usize,
    ) -> Result<UpsertReport, SyncError> {
        let mut store = self
            .vertices
            .lock()
            .map_err(|_| SyncError::StoreUpsert("vertex store poisoned".into()))?;
        let slot = store.entry(vertex_type.to_string()).or_default();
        for (id, attributes) in vertices {
            slot.insert(id.clone(), attributes.clone());
        }
        Ok(UpsertReport {
            accepted: vertices.len(),
            skipped: 0,
        })
    }

    fn upsert_edges(
        &self,
        edge_type: &str,
        edges: &[Edge],
        _batch_size: usize,
    ) -> Result<UpsertReport, SyncError> {
        let mut store = self
            .edges
            .lock()
            .map_err(|_| SyncError::StoreUpsert("edge store poisoned".into()))?;
        store
            .entry(edge_type.to_string())
            .or_default()
            .extend_from_slice(edges);
        Ok(UpsertReport {
            accepted: edges.len(),
            skipped: 0,
        })
    }
}

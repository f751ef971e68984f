use serde::Serialize;

/// Counters for one pipeline run, accumulated monotonically and reported at
/// the end. The error list keeps human-readable notes tagged with their
/// table or partition/chunk context, in the order they were recorded.
#[derive(Debug, Default, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RunStats {
    pub vertices_pushed: usize,
    pub edges_pushed: usize,
    pub tables_processed: usize,
    pub batches_processed: usize,
    pub errors: Vec<String>,
}

impl RunStats {
    pub fn is_clean(&self) -> bool {
        self.errors.is_empty()
    }
}

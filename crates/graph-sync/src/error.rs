use thiserror::Error;

/// Everything that can go wrong between a source row and a graph upsert.
///
/// Records and chunks are fault-isolated: above single-record/single-chunk
/// granularity these become statistics entries, never a run abort. The one
/// exception is `MappingConfig`, a broken mapping definition, which is a
/// programming error and is allowed to propagate.
#[derive(Debug, Error)]
pub enum SyncError {
    #[error("no mapping registered for table '{0}'")]
    MappingNotFound(String),

    #[error("cannot coerce '{value}' to {target}")]
    Conversion { value: String, target: &'static str },

    #[error("failed to read table '{table}': {reason}")]
    TableFetch { table: String, reason: String },

    #[error("graph upsert failed: {0}")]
    StoreUpsert(String),

    #[error("invalid mapping definition: {0}")]
    MappingConfig(#[from] serde_json::Error),
}

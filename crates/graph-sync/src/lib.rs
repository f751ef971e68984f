pub mod value {
    use chrono::{DateTime, SecondsFormat, Utc};
    use serde::{Deserialize, Serialize};
    use std::collections::HashMap;
    use std::fmt;

    /// A scalar field value as read from a tabular source.
    ///
    /// Untagged on the wire, so a record round-trips as plain JSON:
    /// numbers, booleans, strings, RFC 3339 timestamps and nulls.
    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    #[serde(untagged)]
    pub enum Value {
        Null,
        Bool(bool),
        Int(i64),
        Float(f64),
        DateTime(DateTime<Utc>),
        String(String),
    }

    /// One source row: field name -> scalar value.
    pub type Record = HashMap<String, Value>;

    impl Value {
        pub fn is_null(&self) -> bool {
            matches!(self, Value::Null)
        }

        /// Best-effort typing of a raw text cell (CSV and friends).
        ///
        /// Tries int, float, bool and RFC 3339 in that order; anything
        /// else stays a string. An empty cell is null.
        pub fn infer(raw: &str) -> Value {
            let raw = raw.trim();
            if raw.is_empty() {
                return Value::Null;
            }
            if let Ok(i) = raw.parse::<i64>() {
                return Value::Int(i);
            }
            if let Ok(f) = raw.parse::<f64>() {
                return Value::Float(f);
            }
            if raw.eq_ignore_ascii_case("true") {
                return Value::Bool(true);
            }
            if raw.eq_ignore_ascii_case("false") {
                return Value::Bool(false);
            }
            if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
                return Value::DateTime(dt.with_timezone(&Utc));
            }
            Value::String(raw.to_string())
        }
    }

    impl fmt::Display for Value {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            match self {
                Value::Null => Ok(()),
                Value::Bool(b) => write!(f, "{}", b),
                Value::Int(i) => write!(f, "{}", i),
                Value::Float(x) => write!(f, "{}", x),
                Value::DateTime(dt) => {
                    write!(f, "{}", dt.to_rfc3339_opts(SecondsFormat::Secs, true))
                }
                Value::String(s) => write!(f, "{}", s),
            }
        }
    }
}

pub mod catalog;
pub mod coerce;
pub mod error;
pub mod graph;
pub mod mapping;
pub mod partition;
pub mod pipeline;
pub mod stats;
pub mod transform;

pub use error::SyncError;
pub use mapping::{EdgeMapping, Mapping, MappingEngine, VertexMapping};
pub use pipeline::{BatchPipeline, PipelineConfig};
pub use stats::RunStats;
pub use value::{Record, Value};

use crate::error::SyncError;
use crate::value::Value;
use chrono::SecondsFormat;
use serde::{Deserialize, Serialize};
use std::fmt;

/// How a raw field value is made storage-compatible before upsert.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Coercion {
    String,
    Int,
    Double,
    Bool,
    /// Renders an already-structured timestamp as RFC 3339. Textual input
    /// is passed through stringified, never parsed: normalizing ambiguous
    /// timestamp text is an upstream concern, not this engine's.
    Datetime,
}

impl fmt::Display for Coercion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Coercion::String => "string",
            Coercion::Int => "int",
            Coercion::Double => "double",
            Coercion::Bool => "bool",
            Coercion::Datetime => "datetime",
        };
        write!(f, "{}", name)
    }
}

/// Applies a coercion directive to one field value.
///
/// Null always comes back as `None`, whatever the directive. Without a
/// directive the value passes through untouched, except that structured
/// timestamps still render to RFC 3339 text — that asymmetry is the
/// contract the downstream store relies on.
pub fn coerce(value: &Value, directive: Option<Coercion>) -> Result<Option<Value>, SyncError> {
    if value.is_null() {
        return Ok(None);
    }

    let coerced = match directive {
        Some(Coercion::String) => Value::String(value.to_string()),
        Some(Coercion::Int) => Value::Int(to_int(value)?),
        Some(Coercion::Double) => Value::Float(to_double(value)?),
        Some(Coercion::Bool) => Value::Bool(truthy(value)),
        Some(Coercion::Datetime) => match value {
            Value::DateTime(dt) => {
                Value::String(dt.to_rfc3339_opts(SecondsFormat::Secs, true))
            }
            other => Value::String(other.to_string()),
        },
        None => match value {
            Value::DateTime(dt) => {
                Value::String(dt.to_rfc3339_opts(SecondsFormat::Secs, true))
            }
            other => other.clone(),
        },
    };

    Ok(Some(coerced))
}

fn to_int(value: &Value) -> Result<i64, SyncError> {
    match value {
        Value::Int(i) => Ok(*i),
        Value::Float(f) => Ok(*f as i64),
        Value::Bool(b) => Ok(i64::from(*b)),
        Value::String(s) => s.parse::<i64>().map_err(|_| SyncError::Conversion {
            value: s.clone(),
            target: "int",
        }),
        other => Err(SyncError::Conversion {
            value: other.to_string(),
            target: "int",
        }),
    }
}

fn to_double(value: &Value) -> Result<f64, SyncError> {
    match value {
        Value::Int(i) => Ok(*i as f64),
        Value::Float(f) => Ok(*f),
        Value::Bool(b) => Ok(if *b { 1.0 } else { 0.0 }),
        Value::String(s) => s.parse::<f64>().map_err(|_| SyncError::Conversion {
            value: s.clone(),
            target: "double",
        }),
        other => Err(SyncError::Conversion {
            value: other.to_string(),
            target: "double",
        }),
    }
}

// Truthiness of the value's native semantics: zero and the empty string
// are false, any other non-null value (including the string "false") is true.
fn truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Int(i) => *i != 0,
        Value::Float(f) => *f != 0.0,
        Value::String(s) => !s.is_empty(),
        Value::DateTime(_) => true,
    }
}

//! Record and record identifier types
//!
//! A record is kept as a JSON object so that the library stays agnostic of
//! the concrete model. Field order is preserved end to end.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// One persisted entity of the managed model
pub type Record = serde_json::Map<String, Value>;

/// Field holding the record identity unless the model says otherwise
pub const DEFAULT_ID_FIELD: &str = "_id";

/// Unique key of a record
///
/// Integer keys are the common case (`{"_id": 1}`); any other key is kept as
/// a string. Path segments that parse as `i64` are always integer keys, so a
/// string key never looks like an integer.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RecordId {
    Int(i64),
    Str(String),
}

impl RecordId {
    /// Parse an id coming from a URL path segment
    pub fn parse(raw: &str) -> Self {
        raw.parse::<i64>()
            .map(RecordId::Int)
            .unwrap_or_else(|_| RecordId::Str(raw.to_string()))
    }

    /// Read an id out of a JSON value
    ///
    /// Returns `None` for values that cannot act as a key: floats, integers
    /// outside `i64`, strings that parse as `i64` (they would be unreachable
    /// from a path segment), objects, arrays, booleans and null.
    pub fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Number(n) => n.as_i64().map(RecordId::Int),
            Value::String(s) => match Self::parse(s) {
                RecordId::Str(s) => Some(RecordId::Str(s)),
                RecordId::Int(_) => None,
            },
            _ => None,
        }
    }

    pub fn to_value(&self) -> Value {
        match self {
            RecordId::Int(i) => Value::from(*i),
            RecordId::Str(s) => Value::String(s.clone()),
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            RecordId::Int(i) => Some(*i),
            RecordId::Str(_) => None,
        }
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecordId::Int(i) => write!(f, "{}", i),
            RecordId::Str(s) => write!(f, "{}", s),
        }
    }
}

impl From<i64> for RecordId {
    fn from(value: i64) -> Self {
        RecordId::Int(value)
    }
}

impl From<&str> for RecordId {
    fn from(value: &str) -> Self {
        RecordId::Str(value.to_string())
    }
}

/// Return a copy of `record` with `id_field` set to `id` as its first field
pub fn with_leading_id(record: Record, id_field: &str, id: &RecordId) -> Record {
    let mut out = Record::with_capacity(record.len() + 1);
    out.insert(id_field.to_string(), id.to_value());
    for (key, value) in record {
        if key != id_field {
            out.insert(key, value);
        }
    }
    out
}

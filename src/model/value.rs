//! Result cell and statement parameter representation shared by the
//! backend adapters and the row decoders.
use serde::{Deserialize, Serialize};

/// Typed value tagged with explicit type information so the wire format
/// remains unambiguous across drivers.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "t", content = "v")]
pub enum Value {
    /// SQL NULL.
    Null,
    /// Boolean cell.
    Bool(bool),
    /// Signed 64-bit integer cell.
    Int(i64),
    /// 64-bit floating point cell.
    Float(f64),
    /// UTF-8 text cell.
    String(String),
    /// Arbitrary binary payload.
    Bytes(Vec<u8>),
    /// Already decoded JSON document (e.g. a `jsonb` column).
    Json(serde_json::Value),
}

impl Value {
    /// Returns true for [`Value::Null`].
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Interprets the cell as an integer, accepting numeric text.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int(v) => Some(*v),
            Value::Float(v) if v.fract() == 0.0 => Some(*v as i64),
            Value::String(s) => s.trim().parse().ok(),
            Value::Json(serde_json::Value::Number(n)) => n.as_i64(),
            _ => None,
        }
    }

    /// Interprets the cell as text. Binary cells are accepted when they hold
    /// UTF-8.
    pub fn as_text(&self) -> Option<String> {
        match self {
            Value::String(s) => Some(s.clone()),
            Value::Bytes(b) => String::from_utf8(b.clone()).ok(),
            Value::Int(v) => Some(v.to_string()),
            Value::Float(v) => Some(v.to_string()),
            Value::Bool(v) => Some(v.to_string()),
            Value::Json(serde_json::Value::String(s)) => Some(s.clone()),
            Value::Json(other) => Some(other.to_string()),
            Value::Null => None,
        }
    }

    /// Converts the cell into a JSON document. Text holding a JSON document
    /// is parsed; other text is kept as a JSON string.
    pub fn into_json(self) -> serde_json::Value {
        match self {
            Value::Null => serde_json::Value::Null,
            Value::Bool(v) => serde_json::Value::Bool(v),
            Value::Int(v) => serde_json::Value::from(v),
            Value::Float(v) => serde_json::Value::from(v),
            Value::Json(v) => v,
            Value::String(s) => serde_json::from_str(&s).unwrap_or(serde_json::Value::String(s)),
            Value::Bytes(b) => match String::from_utf8(b) {
                Ok(s) => Value::String(s).into_json(),
                Err(err) => serde_json::Value::from(err.into_bytes()),
            },
        }
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::String(value.to_owned())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::String(value)
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Bool(value)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Int(value)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Float(value)
    }
}

impl From<serde_json::Value> for Value {
    fn from(value: serde_json::Value) -> Self {
        Value::Json(value)
    }
}

impl From<Vec<u8>> for Value {
    fn from(value: Vec<u8>) -> Self {
        Value::Bytes(value)
    }
}

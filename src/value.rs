//! Wire values carried in a marshaled context map.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Flat map from wire key to value, produced by marshal and consumed by unmarshal.
pub type ContextValues = HashMap<String, WireValue>;

/// A single value in the wire map.
///
/// The variant set is closed and flat: there is no list or object variant, so
/// a marshaled context is always a plain string-keyed object on the wire.
///
/// JSON has no representation for `NaN` or infinities, so `From<f64>`
/// maps non-finite floats to `Null` rather than letting serde_json emit a
/// `null` that comes back as a different variant. Integers outside the `i64`
/// range deserialize as `Float` and lose precision; carry such values as
/// strings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum WireValue {
    String(String),
    Int(i64),
    Float(f64),
    Bool(bool),
    Null,
}

impl WireValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            WireValue::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            WireValue::Int(i) => Some(*i),
            _ => None,
        }
    }

    /// Integers widen to floats; other variants yield `None`.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            WireValue::Float(f) => Some(*f),
            WireValue::Int(i) => Some(*i as f64),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            WireValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, WireValue::Null)
    }
}

impl fmt::Display for WireValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WireValue::String(s) => write!(f, "{}", s),
            WireValue::Int(i) => write!(f, "{}", i),
            WireValue::Float(fl) => write!(f, "{}", fl),
            WireValue::Bool(b) => write!(f, "{}", b),
            WireValue::Null => write!(f, "null"),
        }
    }
}

impl From<String> for WireValue {
    fn from(value: String) -> Self {
        WireValue::String(value)
    }
}

impl From<&str> for WireValue {
    fn from(value: &str) -> Self {
        WireValue::String(value.to_string())
    }
}

impl From<i64> for WireValue {
    fn from(value: i64) -> Self {
        WireValue::Int(value)
    }
}

impl From<i32> for WireValue {
    fn from(value: i32) -> Self {
        WireValue::Int(value.into())
    }
}

impl From<u32> for WireValue {
    fn from(value: u32) -> Self {
        WireValue::Int(value.into())
    }
}

impl From<f64> for WireValue {
    fn from(value: f64) -> Self {
        if value.is_finite() {
            WireValue::Float(value)
        } else {
            WireValue::Null
        }
    }
}

impl From<bool> for WireValue {
    fn from(value: bool) -> Self {
        WireValue::Bool(value)
    }
}

impl From<serde_json::Value> for WireValue {
    fn from(value: serde_json::Value) -> Self {
        match value {
            serde_json::Value::String(s) => WireValue::String(s),
            serde_json::Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    WireValue::Int(i)
                } else if let Some(f) = n.as_f64() {
                    WireValue::from(f)
                } else {
                    WireValue::Null
                }
            }
            serde_json::Value::Bool(b) => WireValue::Bool(b),
            serde_json::Value::Null => WireValue::Null,
            // Nested structures are flattened to their JSON text
            nested @ (serde_json::Value::Array(_) | serde_json::Value::Object(_)) => {
                WireValue::String(nested.to_string())
            }
        }
    }
}

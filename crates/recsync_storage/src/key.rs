//! Primary key type.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// Primary key of a record.
///
/// A key is either a scalar (integer or text) or a composite of scalars,
/// one part per key field, in schema order. Keys are totally ordered so
/// stores can keep records in key order and reconciliation can collect
/// them into ordered sets.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RecordKey {
    /// Integer key.
    Int(i64),
    /// Text key.
    Text(String),
    /// Composite key, one part per key field.
    Composite(Vec<RecordKey>),
}

impl RecordKey {
    /// Converts a field value into a scalar key part.
    ///
    /// Returns `None` for nulls, floats, booleans and structured values,
    /// none of which can identify a record.
    #[must_use]
    pub fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Number(n) => n.as_i64().map(Self::Int),
            Value::String(s) => Some(Self::Text(s.clone())),
            _ => None,
        }
    }

    /// Converts a scalar key back into a field value.
    ///
    /// Composite keys become arrays.
    #[must_use]
    pub fn to_value(&self) -> Value {
        match self {
            Self::Int(n) => Value::from(*n),
            Self::Text(s) => Value::from(s.as_str()),
            Self::Composite(parts) => Value::Array(parts.iter().map(Self::to_value).collect()),
        }
    }

    /// Returns the integer value for integer keys.
    #[must_use]
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Self::Int(n) => Some(*n),
            _ => None,
        }
    }

    /// Returns true for composite keys.
    #[must_use]
    pub fn is_composite(&self) -> bool {
        matches!(self, Self::Composite(_))
    }
}

impl fmt::Display for RecordKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int(n) => write!(f, "{n}"),
            Self::Text(s) => write!(f, "{s}"),
            Self::Composite(parts) => {
                write!(f, "(")?;
                for (i, part) in parts.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{part}")?;
                }
                write!(f, ")")
            }
        }
    }
}

impl From<i64> for RecordKey {
    fn from(n: i64) -> Self {
        Self::Int(n)
    }
}

impl From<&str> for RecordKey {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

impl From<String> for RecordKey {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

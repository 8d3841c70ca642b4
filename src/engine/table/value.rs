use serde::{Deserialize, Serialize};
use std::fmt;

/// Storage kind of one column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ColumnKind {
    Int,
    Float,
    Text,
    IntList,
    FloatList,
}

impl ColumnKind {
    pub fn default_value(&self) -> Value {
        match self {
            ColumnKind::Int => Value::Int(0),
            ColumnKind::Float => Value::Float(0.0),
            ColumnKind::Text => Value::Text(String::new()),
            ColumnKind::IntList => Value::IntList(Vec::new()),
            ColumnKind::FloatList => Value::FloatList(Vec::new()),
        }
    }
}

impl fmt::Display for ColumnKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ColumnKind::Int => "int",
            ColumnKind::Float => "float",
            ColumnKind::Text => "text",
            ColumnKind::IntList => "int[]",
            ColumnKind::FloatList => "float[]",
        };
        f.write_str(s)
    }
}

/// One cell of a row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Value {
    Int(i64),
    Float(f64),
    Text(String),
    IntList(Vec<i64>),
    FloatList(Vec<f64>),
}

impl Value {
    pub fn kind(&self) -> ColumnKind {
        match self {
            Value::Int(_) => ColumnKind::Int,
            Value::Float(_) => ColumnKind::Float,
            Value::Text(_) => ColumnKind::Text,
            Value::IntList(_) => ColumnKind::IntList,
            Value::FloatList(_) => ColumnKind::FloatList,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int(v) => Some(*v),
            _ => None,
        }
    }

    /// Scalar numeric view, used for relative differences.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Int(v) => Some(*v as f64),
            Value::Float(v) => Some(*v),
            _ => None,
        }
    }

    /// Encoded size of the value inside a basket.
    pub fn stored_bytes(&self) -> u64 {
        bincode::serialized_size(self).unwrap_or(0)
    }

    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Value::Int(v) => serde_json::json!(v),
            Value::Float(v) => serde_json::json!(v),
            Value::Text(v) => serde_json::json!(v),
            Value::IntList(v) => serde_json::json!(v),
            Value::FloatList(v) => serde_json::json!(v),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_json())
    }
}

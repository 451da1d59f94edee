//! Raw cell and parameter values.
//!
//! `Value` is the currency exchanged with drivers: parameters are bound as
//! values and result cells are read back as values. `FromValue` turns an
//! already-coerced value into the Rust type of an entity field.

use crate::error::{DbError, DbResult};
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A database value for parameters and result cells.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    /// NULL value
    Null,
    /// Boolean value
    Bool(bool),
    /// Integer value (stored as i64 for maximum range)
    Int(i64),
    /// Floating point value
    Float(f64),
    /// Text value
    Text(String),
    /// Binary data (base64 encoded in JSON)
    #[serde(with = "base64_bytes")]
    Blob(Vec<u8>),
    /// 128-bit globally unique identifier
    #[serde(skip_deserializing)]
    Uuid(Uuid),
    /// Timestamp without time zone
    #[serde(skip_deserializing)]
    DateTime(NaiveDateTime),
}

impl Value {
    /// Check if this value is null.
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Get the type name of this value for diagnostics.
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Bool(_) => "bool",
            Self::Int(_) => "int",
            Self::Float(_) => "float",
            Self::Text(_) => "text",
            Self::Blob(_) => "blob",
            Self::Uuid(_) => "uuid",
            Self::DateTime(_) => "datetime",
        }
    }
}

impl std::fmt::Display for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Null => write!(f, "NULL"),
            Self::Bool(v) => write!(f, "{}", v),
            Self::Int(v) => write!(f, "{}", v),
            Self::Float(v) => write!(f, "{}", v),
            Self::Text(v) => write!(f, "{}", v),
            Self::Blob(v) => write!(f, "<{} bytes>", v.len()),
            Self::Uuid(v) => write!(f, "{}", v),
            Self::DateTime(v) => write!(f, "{}", v.format("%Y-%m-%d %H:%M:%S%.f")),
        }
    }
}

/// Custom serialization for binary data as base64.
mod base64_bytes {
    use base64::{Engine as _, engine::general_purpose::STANDARD};
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<S>(bytes: &Vec<u8>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        STANDARD.encode(bytes).serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Vec<u8>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        STANDARD.decode(&s).map_err(serde::de::Error::custom)
    }
}

macro_rules! impl_value_from {
    ($($ty:ty => $variant:ident),+ $(,)?) => {
        $(
            impl From<$ty> for Value {
                fn from(v: $ty) -> Self {
                    Value::$variant(v.into())
                }
            }
        )+
    };
}

impl_value_from! {
    bool => Bool,
    i64 => Int,
    i32 => Int,
    i16 => Int,
    u32 => Int,
    f64 => Float,
    f32 => Float,
    String => Text,
    &str => Text,
    Vec<u8> => Blob,
    Uuid => Uuid,
    NaiveDateTime => DateTime,
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map(Into::into).unwrap_or(Value::Null)
    }
}

/// Extract a typed Rust value from a coerced `Value`.
pub trait FromValue: Sized {
    fn from_value(value: Value) -> DbResult<Self>;
}

fn mismatch(value: &Value, target: &str) -> DbError {
    DbError::conversion(value.to_string(), target, format!("unexpected {}", value.type_name()))
}

impl FromValue for Value {
    fn from_value(value: Value) -> DbResult<Self> {
        Ok(value)
    }
}

impl FromValue for i64 {
    fn from_value(value: Value) -> DbResult<Self> {
        match value {
            Value::Int(v) => Ok(v),
            other => Err(mismatch(&other, "i64")),
        }
    }
}

impl FromValue for i32 {
    fn from_value(value: Value) -> DbResult<Self> {
        match value {
            Value::Int(v) => i32::try_from(v)
                .map_err(|e| DbError::conversion(v.to_string(), "i32", e.to_string())),
            other => Err(mismatch(&other, "i32")),
        }
    }
}

impl FromValue for f64 {
    fn from_value(value: Value) -> DbResult<Self> {
        match value {
            Value::Float(v) => Ok(v),
            Value::Int(v) => Ok(v as f64),
            other => Err(mismatch(&other, "f64")),
        }
    }
}

impl FromValue for bool {
    fn from_value(value: Value) -> DbResult<Self> {
        match value {
            Value::Bool(v) => Ok(v),
            other => Err(mismatch(&other, "bool")),
        }
    }
}

impl FromValue for String {
    fn from_value(value: Value) -> DbResult<Self> {
        match value {
            Value::Text(v) => Ok(v),
            other => Err(mismatch(&other, "String")),
        }
    }
}

impl FromValue for Vec<u8> {
    fn from_value(value: Value) -> DbResult<Self> {
        match value {
            Value::Blob(v) => Ok(v),
            other => Err(mismatch(&other, "Vec<u8>")),
        }
    }
}

impl FromValue for Uuid {
    fn from_value(value: Value) -> DbResult<Self> {
        match value {
            Value::Uuid(v) => Ok(v),
            other => Err(mismatch(&other, "Uuid")),
        }
    }
}

impl FromValue for NaiveDateTime {
    fn from_value(value: Value) -> DbResult<Self> {
        match value {
            Value::DateTime(v) => Ok(v),
            other => Err(mismatch(&other, "NaiveDateTime")),
        }
    }
}

impl<T: FromValue> FromValue for Option<T> {
    fn from_value(value: Value) -> DbResult<Self> {
        match value {
            Value::Null => Ok(None),
            other => T::from_value(other).map(Some),
        }
    }
}

//! SQLite type mappings.
//!
//! Maps SQLite values onto the engine's [`Value`] type.
//!
//! # Architecture
//!
//! Decoding uses a two-phase approach:
//! 1. `TypeCategory` classifies the cell's storage class into a logical category
//! 2. A per-category decoder extracts the value
//!
//! SQLite is dynamically typed, so classification uses the type of each cell
//! rather than the declared column type.

use crate::db::driver::Row;
use crate::error::DbResult;
use crate::models::Value;
use sqlx::sqlite::SqliteRow;
use sqlx::{Column, Row as _, TypeInfo, ValueRef};
use std::sync::Arc;

// =============================================================================
// Type Classification
// =============================================================================

/// Logical category for SQLite types.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeCategory {
    Integer,
    Float,
    Text,
    Binary,
    Unknown,
}

/// Classify a SQLite type name into a logical category.
pub fn categorize_type(type_name: &str) -> TypeCategory {
    let lower = type_name.to_lowercase();

    if lower.contains("int") {
        return TypeCategory::Integer;
    }

    // NUMERIC affinity stores non-integral values as REAL
    if lower.contains("real")
        || lower.contains("floa")
        || lower.contains("doub")
        || lower == "numeric"
        || lower.contains("decimal")
    {
        return TypeCategory::Float;
    }

    if lower.contains("blob") || lower.contains("binary") {
        return TypeCategory::Binary;
    }

    if lower.contains("char") || lower.contains("clob") || lower.contains("text") {
        return TypeCategory::Text;
    }

    TypeCategory::Unknown
}

// =============================================================================
// Row Decoding
// =============================================================================

/// Column names of a result row, in ordinal order.
pub fn column_names(row: &SqliteRow) -> Vec<String> {
    row.columns().iter().map(|c| c.name().to_string()).collect()
}

/// Decode one cell.
pub fn decode_column(row: &SqliteRow, idx: usize) -> DbResult<Value> {
    let category = {
        let raw = row.try_get_raw(idx)?;
        if raw.is_null() {
            return Ok(Value::Null);
        }
        categorize_type(raw.type_info().name())
    };

    let value = match category {
        TypeCategory::Integer => Value::Int(row.try_get::<i64, _>(idx)?),
        TypeCategory::Float => Value::Float(row.try_get::<f64, _>(idx)?),
        TypeCategory::Binary => Value::Blob(row.try_get::<Vec<u8>, _>(idx)?),
        TypeCategory::Text | TypeCategory::Unknown => {
            Value::Text(row.try_get_unchecked::<String, _>(idx)?)
        }
    };
    Ok(value)
}

/// Decode a whole row, sharing `columns` with the other rows of the result set.
pub fn decode_row(row: &SqliteRow, columns: Arc<[String]>) -> DbResult<Row> {
    let values = (0..columns.len())
        .map(|idx| decode_column(row, idx))
        .collect::<DbResult<Vec<_>>>()?;
    Ok(Row::new(columns, values))
}

//! Coercion of raw driver values into entity field values.
//!
//! # Rules
//!
//! 1. A NULL cell yields the field's default value.
//! 2. Enumerations are parsed symbolically; a value that names no variant also
//!    yields the default. This is the only coercion failure that is absorbed.
//! 3. Identifiers are built from the raw value's string form and fail with
//!    [`DbError::Format`].
//! 4. Everything else goes through a generic conversion that fails with
//!    [`DbError::Conversion`].

use crate::db::mapping::FieldKind;
use crate::error::{DbError, DbResult};
use crate::models::Value;
use chrono::{NaiveDate, NaiveDateTime};
use uuid::Uuid;

/// Timestamp layouts accepted when converting text into a datetime.
const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M",
    "%m/%d/%Y %H:%M:%S",
];

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%m/%d/%Y", "%Y%m%d"];

/// Convert a raw cell value into a value of the given field kind.
pub fn coerce(raw: Value, default: Value, kind: FieldKind) -> DbResult<Value> {
    if raw.is_null() {
        return Ok(default);
    }

    match kind {
        FieldKind::Enum(names) => Ok(parse_enum(&raw, names)
            .map(|name| Value::Text(name.to_string()))
            .unwrap_or(default)),
        FieldKind::Uuid => to_uuid(raw).map(Value::Uuid),
        _ => convert(raw, kind),
    }
}

/// Resolve an enum variant by exact name, case-insensitive name or ordinal.
fn parse_enum(raw: &Value, names: &'static [&'static str]) -> Option<&'static str> {
    let by_ordinal = |idx: i64| usize::try_from(idx).ok().and_then(|i| names.get(i).copied());
    match raw {
        Value::Int(i) => by_ordinal(*i),
        Value::Text(s) => {
            let s = s.trim();
            names
                .iter()
                .find(|n| **n == s)
                .or_else(|| names.iter().find(|n| n.eq_ignore_ascii_case(s)))
                .copied()
                .or_else(|| s.parse::<i64>().ok().and_then(by_ordinal))
        }
        _ => None,
    }
}

fn to_uuid(raw: Value) -> DbResult<Uuid> {
    match raw {
        Value::Uuid(u) => Ok(u),
        Value::Blob(bytes) => {
            Uuid::from_slice(&bytes).map_err(|e| DbError::format(format!("{:?}", bytes), e.to_string()))
        }
        other => {
            let text = other.to_string();
            Uuid::parse_str(text.trim()).map_err(|e| DbError::format(text, e.to_string()))
        }
    }
}

/// Generic conversion for non-enum, non-identifier kinds.
pub fn convert(raw: Value, kind: FieldKind) -> DbResult<Value> {
    let fail = |raw: &Value, message: &str| DbError::conversion(raw.to_string(), kind.name(), message);

    match (kind, raw) {
        (FieldKind::Text, Value::Text(s)) => Ok(Value::Text(s)),
        (FieldKind::Text, Value::Blob(b)) => String::from_utf8(b)
            .map(Value::Text)
            .map_err(|e| DbError::conversion("<blob>", "text", e.to_string())),
        (FieldKind::Text, other) => Ok(Value::Text(other.to_string())),

        (FieldKind::Int, Value::Int(i)) => Ok(Value::Int(i)),
        (FieldKind::Int, Value::Bool(b)) => Ok(Value::Int(b as i64)),
        (FieldKind::Int, Value::Float(f)) => {
            if f.is_finite() && f >= i64::MIN as f64 && f <= i64::MAX as f64 {
                Ok(Value::Int(f.round() as i64))
            } else {
                Err(fail(&Value::Float(f), "out of range"))
            }
        }
        (FieldKind::Int, Value::Text(s)) => s
            .trim()
            .parse::<i64>()
            .map(Value::Int)
            .map_err(|e| fail(&Value::Text(s.clone()), &e.to_string())),

        (FieldKind::Float, Value::Float(f)) => Ok(Value::Float(f)),
        (FieldKind::Float, Value::Int(i)) => Ok(Value::Float(i as f64)),
        (FieldKind::Float, Value::Text(s)) => s
            .trim()
            .parse::<f64>()
            .map(Value::Float)
            .map_err(|e| fail(&Value::Text(s.clone()), &e.to_string())),

        (FieldKind::Bool, Value::Bool(b)) => Ok(Value::Bool(b)),
        (FieldKind::Bool, Value::Int(i)) => Ok(Value::Bool(i != 0)),
        (FieldKind::Bool, Value::Text(s)) => match s.trim().to_ascii_lowercase().as_str() {
            "true" | "1" | "-1" | "yes" => Ok(Value::Bool(true)),
            "false" | "0" | "no" => Ok(Value::Bool(false)),
            _ => Err(fail(&Value::Text(s.clone()), "not a boolean")),
        },

        (FieldKind::DateTime, Value::DateTime(d)) => Ok(Value::DateTime(d)),
        (FieldKind::DateTime, Value::Text(s)) => parse_datetime(&s)
            .map(Value::DateTime)
            .ok_or_else(|| fail(&Value::Text(s), "unrecognized timestamp format")),

        (FieldKind::Blob, Value::Blob(b)) => Ok(Value::Blob(b)),
        (FieldKind::Blob, Value::Text(s)) => Ok(Value::Blob(s.into_bytes())),

        (FieldKind::Uuid, other) => to_uuid(other).map(Value::Uuid),
        (FieldKind::Enum(names), other) => parse_enum(&other, names)
            .map(|n| Value::Text(n.to_string()))
            .ok_or_else(|| fail(&other, "no matching variant")),

        (_, other) => Err(fail(&other, "incompatible source type")),
    }
}

fn parse_datetime(s: &str) -> Option<NaiveDateTime> {
    let s = s.trim();
    DATETIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
        .or_else(|| {
            DATE_FORMATS
                .iter()
                .find_map(|fmt| NaiveDate::parse_from_str(s, fmt).ok())
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })
}

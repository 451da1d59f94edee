//! Data access layer.
//!
//! This module provides the engine's moving parts:
//! - Static entity mapping and value coercion
//! - Per-provider SQL dialects
//! - Positional parameter binding
//! - The driver boundary and a SQLite driver
//! - Transaction-scoped execution, CRUD helpers and predicates

pub mod coerce;
pub mod crud;
pub mod dialect;
pub mod driver;
pub mod executor;
#[macro_use]
pub mod macros;
pub mod mapping;
pub mod params;
pub mod predicate;
pub mod sqlite;
pub mod types;

pub use dialect::{Dialect, dialect_for};
pub use driver::{Command, Connection, Driver, Parameter, Row};
pub use executor::{DatabaseAccess, Scope, Transaction, materialize};
pub use mapping::{Entity, Field, FieldKind, FieldType, field_list, key_fields, mapped_fields};
pub use predicate::{Operator, SearchParameter, where_clause};
pub use sqlite::{SqliteDriver, SqliteFileConnection};

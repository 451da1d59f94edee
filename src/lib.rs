//! Provider-agnostic data access engine.
//!
//! Maps statically registered entity types to relational tables and executes
//! parameterized statements through a uniform, transaction-scoped API across
//! a relational server, an embedded file database and a desktop file database.

pub mod config;
pub mod db;
pub mod error;
pub mod models;

pub use config::Config;
pub use db::{DatabaseAccess, Entity, Field, Scope, SqliteDriver, Transaction};
pub use error::{DbError, DbResult};
pub use models::{FromValue, IsolationLevel, Provider, Value};

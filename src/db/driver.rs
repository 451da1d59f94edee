//! Driver boundary.
//!
//! The engine talks to a concrete database only through these traits: a
//! [`Driver`] opens connections, a [`Connection`] runs transactions and
//! executes [`Command`]s, and result rows come back as [`Row`]s. All calls
//! block until the driver has finished.

use crate::error::DbResult;
use crate::models::{IsolationLevel, Provider, Value};
use std::sync::Arc;

/// A named value attached to a command.
#[derive(Debug, Clone, PartialEq)]
pub struct Parameter {
    pub name: String,
    pub value: Value,
}

/// A single statement with its bound parameters, built fresh for every call.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Command {
    pub text: String,
    pub parameters: Vec<Parameter>,
}

impl Command {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            parameters: Vec::new(),
        }
    }

    /// Attach a parameter.
    pub fn add_parameter(&mut self, name: impl Into<String>, value: Value) {
        self.parameters.push(Parameter {
            name: name.into(),
            value,
        });
    }
}

/// One result row: column names shared across the result set plus cell values.
#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    columns: Arc<[String]>,
    values: Vec<Value>,
}

impl Row {
    pub fn new(columns: Arc<[String]>, values: Vec<Value>) -> Self {
        debug_assert_eq!(columns.len(), values.len());
        Self { columns, values }
    }

    pub fn field_count(&self) -> usize {
        self.values.len()
    }

    /// Column name at `ordinal`.
    pub fn name(&self, ordinal: usize) -> Option<&str> {
        self.columns.get(ordinal).map(String::as_str)
    }

    /// Cell value at `ordinal`.
    pub fn value(&self, ordinal: usize) -> Option<&Value> {
        self.values.get(ordinal)
    }

    /// Ordinal of a column, ignoring ASCII case.
    pub fn ordinal(&self, column: &str) -> Option<usize> {
        self.columns
            .iter()
            .position(|c| c.eq_ignore_ascii_case(column))
    }

    /// Cell value of a column, ignoring ASCII case.
    pub fn get(&self, column: &str) -> Option<&Value> {
        self.ordinal(column).and_then(|i| self.values.get(i))
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }
}

/// An open (or openable) database connection.
///
/// Transactions are connection state: between `begin` and `commit`/`rollback`
/// every command runs inside the transaction.
pub trait Connection: Send {
    /// Whether this connection belongs to the provider's family.
    fn supports(&self, provider: Provider) -> bool;

    fn is_open(&self) -> bool;

    fn open(&mut self) -> DbResult<()>;

    fn close(&mut self) -> DbResult<()>;

    fn begin(&mut self, isolation: IsolationLevel) -> DbResult<()>;

    fn commit(&mut self) -> DbResult<()>;

    fn rollback(&mut self) -> DbResult<()>;

    /// Execute a statement and return the number of affected rows.
    fn execute(&mut self, command: &Command) -> DbResult<u64>;

    /// Execute a query and return the first column of the first row, or NULL.
    fn query_scalar(&mut self, command: &Command) -> DbResult<Value>;

    /// Execute a query and feed each row to `sink` until it returns `false`.
    fn query(
        &mut self,
        command: &Command,
        sink: &mut dyn FnMut(&Row) -> DbResult<bool>,
    ) -> DbResult<()>;
}

/// Factory for connections of one or more providers.
pub trait Driver: Send + Sync {
    /// Whether this driver can serve the provider.
    fn supports(&self, provider: Provider) -> bool;

    /// Open a new connection.
    fn connect(&self, connection_string: &str) -> DbResult<Box<dyn Connection>>;
}

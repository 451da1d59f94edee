//! Statement execution engine.
//!
//! This module provides transaction-scoped statement execution:
//! - Connection lifecycle (ephemeral per-call connections or one ambient connection)
//! - Implicit transactions when the caller does not supply one
//! - Execution primitives (non-query, scalar, row streaming, existence check)
//! - Mapped materialization of result rows into entities
//!
//! # Call lifecycle
//!
//! Every call walks `Idle -> ConnectionAcquired -> TransactionActive ->
//! Committed | RolledBack -> Released`. Release is tied to scope exit through
//! the `Lease` and `Transaction` drop guards, so no exit path (including a
//! panic inside a row callback) leaks a connection or an open transaction.
//!
//! # Ownership of transactions
//!
//! [`Scope::Owned`] makes the call own a fresh transaction: it commits on
//! success and rolls back on failure, returning the original error. With
//! [`Scope::Borrowed`] the caller owns the transaction and the engine never
//! commits, rolls back or ends it.

use crate::db::coerce::coerce;
use crate::db::dialect::{Dialect, dialect_for};
use crate::db::driver::{Command, Connection, Driver, Row};
use crate::db::mapping::{Entity, mapped_fields};
use crate::db::params::bind;
use crate::error::{DbError, DbResult};
use crate::models::{IsolationLevel, Provider, Value};
use parking_lot::{Mutex, MutexGuard};
use std::sync::Arc;
use tracing::{debug, warn};

enum ConnectionSource {
    /// A new connection per call
    Ephemeral {
        driver: Arc<dyn Driver>,
        /// Contains sensitive data - never log
        connection_string: String,
    },
    /// One long-lived connection supplied by the caller
    Ambient(Mutex<Box<dyn Connection>>),
}

/// Entry point for statement execution against one logical database.
///
/// Create one instance per database target and reuse it across calls.
///
/// An instance built with [`DatabaseAccess::new`] or [`DatabaseAccess::from_file`]
/// opens a connection per call and can be shared between threads. An instance
/// built with [`DatabaseAccess::with_connection`] reuses one connection and is
/// a single-caller-at-a-time resource: a call made while another call (or an
/// open [`Transaction`]) holds the connection fails instead of waiting.
pub struct DatabaseAccess {
    provider: Provider,
    dialect: Box<dyn Dialect>,
    isolation: IsolationLevel,
    source: ConnectionSource,
}

impl std::fmt::Debug for DatabaseAccess {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DatabaseAccess")
            .field("provider", &self.provider)
            .field("isolation", &self.isolation)
            .field("ambient", &self.is_ambient())
            .finish()
    }
}

impl DatabaseAccess {
    /// Create an instance that opens a new connection per call.
    pub fn new(
        driver: Arc<dyn Driver>,
        provider: Provider,
        connection_string: impl Into<String>,
    ) -> DbResult<Self> {
        let connection_string = connection_string.into();
        if connection_string.trim().is_empty() {
            return Err(DbError::configuration("Connection string cannot be empty"));
        }
        if !driver.supports(provider) {
            return Err(DbError::unsupported_provider(provider, "this driver"));
        }

        Ok(Self {
            provider,
            dialect: dialect_for(provider),
            isolation: IsolationLevel::default(),
            source: ConnectionSource::Ephemeral {
                driver,
                connection_string,
            },
        })
    }

    /// Create an instance for a database file.
    ///
    /// Only file-based providers support this entry point.
    pub fn from_file(
        driver: Arc<dyn Driver>,
        provider: Provider,
        path: &str,
        exclusive: bool,
    ) -> DbResult<Self> {
        let connection_string = dialect_for(provider).file_connection_string(path, exclusive)?;
        Self::new(driver, provider, connection_string)
    }

    /// Create an instance around an externally supplied connection.
    ///
    /// A closed connection is opened for the duration of each call and closed
    /// again afterwards; an open one is reused and left open. Fails if the
    /// connection does not belong to `provider`.
    pub fn with_connection(
        provider: Provider,
        connection: Box<dyn Connection>,
    ) -> DbResult<Self> {
        if !connection.supports(provider) {
            return Err(DbError::unsupported_provider(provider, "this connection"));
        }

        Ok(Self {
            provider,
            dialect: dialect_for(provider),
            isolation: IsolationLevel::default(),
            source: ConnectionSource::Ambient(Mutex::new(connection)),
        })
    }

    /// Set the isolation level used for transactions begun by this instance.
    pub fn with_isolation_level(mut self, isolation: IsolationLevel) -> Self {
        self.isolation = isolation;
        self
    }

    pub fn provider(&self) -> Provider {
        self.provider
    }

    pub fn dialect(&self) -> &dyn Dialect {
        self.dialect.as_ref()
    }

    pub fn isolation_level(&self) -> IsolationLevel {
        self.isolation
    }

    pub fn is_ambient(&self) -> bool {
        matches!(self.source, ConnectionSource::Ambient(_))
    }

    /// Begin a caller-owned transaction.
    ///
    /// Pass `&mut tx` as the scope of each call that should join it, then
    /// `commit` or `rollback`. Dropping an unfinished transaction rolls it back.
    pub fn begin_transaction(&self) -> DbResult<Transaction<'_>> {
        let mut lease = self.acquire()?;
        lease
            .connection()
            .begin(self.isolation)
            .map_err(|e| DbError::transaction(format!("Failed to begin transaction: {}", e)))?;
        debug!(isolation = %self.isolation, "Transaction started");
        Ok(Transaction {
            lease,
            finished: false,
        })
    }

    fn acquire(&self) -> DbResult<Lease<'_>> {
        match &self.source {
            ConnectionSource::Ephemeral {
                driver,
                connection_string,
            } => {
                let mut connection = driver.connect(connection_string)?;
                if !connection.is_open() {
                    connection.open()?;
                }
                Ok(Lease::Ephemeral(connection))
            }
            ConnectionSource::Ambient(shared) => {
                let mut guard = shared.try_lock().ok_or_else(|| {
                    DbError::connection(
                        "Ambient connection is already in use",
                        "Pass the open transaction to this call, or use one caller at a time",
                    )
                })?;
                let close_on_release = !guard.is_open();
                if close_on_release {
                    guard.open()?;
                }
                Ok(Lease::Ambient {
                    guard,
                    close_on_release,
                })
            }
        }
    }

    /// Bind parameters for this instance's dialect.
    pub(crate) fn prepare(&self, sql: &str, params: &[Value]) -> DbResult<Command> {
        bind(self.dialect.as_ref(), sql, params)
    }

    /// Run `work` inside the scope's transaction.
    pub(crate) fn run<T>(
        &self,
        scope: Scope<'_, '_>,
        work: impl FnOnce(&mut dyn Connection) -> DbResult<T>,
    ) -> DbResult<T> {
        match scope {
            Scope::Borrowed(tx) => work(tx.connection()),
            Scope::Owned => {
                let mut tx = self.begin_transaction()?;
                match work(tx.connection()) {
                    Ok(value) => {
                        tx.commit()?;
                        Ok(value)
                    }
                    Err(e) => {
                        tx.rollback_quietly();
                        Err(e)
                    }
                }
            }
        }
    }

    /// Execute a statement and discard any result, returning the affected row count.
    pub fn execute_non_query<'t, 'a: 't>(
        &self,
        scope: impl Into<Scope<'t, 'a>>,
        sql: &str,
        params: &[Value],
    ) -> DbResult<u64> {
        let command = self.prepare(sql, params)?;
        debug!(sql = %command.text, params = command.parameters.len(), "Executing non-query");
        self.run(scope.into(), |conn| conn.execute(&command))
    }

    /// Execute a query and return the first column of the first row, or NULL.
    pub fn execute_scalar<'t, 'a: 't>(
        &self,
        scope: impl Into<Scope<'t, 'a>>,
        sql: &str,
        params: &[Value],
    ) -> DbResult<Value> {
        let command = self.prepare(sql, params)?;
        debug!(sql = %command.text, params = command.parameters.len(), "Executing scalar");
        self.run(scope.into(), |conn| conn.query_scalar(&command))
    }

    /// Execute a query and stream every row into `accumulator`.
    ///
    /// An error returned by the accumulator stops the read and fails the call.
    pub fn execute_reader<'t, 'a: 't>(
        &self,
        scope: impl Into<Scope<'t, 'a>>,
        sql: &str,
        params: &[Value],
        mut accumulator: impl FnMut(&Row) -> DbResult<()>,
    ) -> DbResult<()> {
        let command = self.prepare(sql, params)?;
        debug!(sql = %command.text, params = command.parameters.len(), "Executing reader");
        self.run(scope.into(), |conn| {
            conn.query(&command, &mut |row| {
                accumulator(row)?;
                Ok(true)
            })
        })
    }

    /// True if the query yields at least one row.
    pub fn exists<'t, 'a: 't>(
        &self,
        scope: impl Into<Scope<'t, 'a>>,
        sql: &str,
        params: &[Value],
    ) -> DbResult<bool> {
        let command = self.prepare(sql, params)?;
        debug!(sql = %command.text, params = command.parameters.len(), "Executing existence check");
        self.run(scope.into(), |conn| {
            let mut found = false;
            conn.query(&command, &mut |_| {
                found = true;
                Ok(false)
            })?;
            Ok(found)
        })
    }

    /// Execute a query and materialize every row as an `E`.
    pub fn query<'t, 'a: 't, E: Entity>(
        &self,
        scope: impl Into<Scope<'t, 'a>>,
        sql: &str,
        params: &[Value],
    ) -> DbResult<Vec<E>> {
        let mut items = Vec::new();
        self.execute_reader(scope, sql, params, |row| {
            items.push(materialize::<E>(row)?);
            Ok(())
        })?;
        Ok(items)
    }

    /// Execute a query and materialize only its first row, if any.
    pub fn query_first<'t, 'a: 't, E: Entity>(
        &self,
        scope: impl Into<Scope<'t, 'a>>,
        sql: &str,
        params: &[Value],
    ) -> DbResult<Option<E>> {
        let command = self.prepare(sql, params)?;
        debug!(sql = %command.text, params = command.parameters.len(), "Executing single-row query");
        self.run(scope.into(), |conn| {
            let mut first = None;
            conn.query(&command, &mut |row| {
                first = Some(materialize::<E>(row)?);
                Ok(false)
            })?;
            Ok(first)
        })
    }
}

/// Populate a fresh `E` from a row.
///
/// Only mapped fields whose column is present in the row are assigned; the
/// others keep the value from `E::default()`. Extra columns are ignored.
pub fn materialize<E: Entity>(row: &Row) -> DbResult<E> {
    let mut entity = E::default();
    for field in mapped_fields::<E>(false) {
        if let Some(raw) = row.get(field.column_name()) {
            let value = coerce(raw.clone(), field.default_value(), field.kind())?;
            field.set(&mut entity, value)?;
        }
    }
    Ok(entity)
}

// =============================================================================
// Scopes, leases and transactions
// =============================================================================

/// Transaction ownership for a single call.
pub enum Scope<'t, 'a> {
    /// The call begins, commits or rolls back its own transaction.
    Owned,
    /// The call joins a caller-owned transaction and leaves it open.
    Borrowed(&'t mut Transaction<'a>),
}

impl Default for Scope<'_, '_> {
    fn default() -> Self {
        Scope::Owned
    }
}

impl<'t, 'a> From<&'t mut Transaction<'a>> for Scope<'t, 'a> {
    fn from(tx: &'t mut Transaction<'a>) -> Self {
        Scope::Borrowed(tx)
    }
}

/// A connection held for the duration of one call or transaction.
enum Lease<'a> {
    Ephemeral(Box<dyn Connection>),
    Ambient {
        guard: MutexGuard<'a, Box<dyn Connection>>,
        close_on_release: bool,
    },
}

impl Lease<'_> {
    fn connection(&mut self) -> &mut dyn Connection {
        match self {
            Lease::Ephemeral(conn) => &mut **conn,
            Lease::Ambient { guard, .. } => &mut ***guard,
        }
    }
}

impl Drop for Lease<'_> {
    fn drop(&mut self) {
        let result = match self {
            Lease::Ephemeral(conn) => conn.close(),
            Lease::Ambient {
                guard,
                close_on_release: true,
            } => guard.close(),
            Lease::Ambient { .. } => Ok(()),
        };
        if let Err(e) = result {
            warn!(error = %e, "Failed to close connection");
        }
    }
}

/// An open transaction on a leased connection.
///
/// Dropping a transaction that was neither committed nor rolled back rolls
/// it back.
pub struct Transaction<'a> {
    lease: Lease<'a>,
    finished: bool,
}

impl Transaction<'_> {
    /// Commit the transaction.
    ///
    /// If the commit fails the transaction is rolled back when dropped.
    pub fn commit(mut self) -> DbResult<()> {
        self.lease.connection().commit()?;
        self.finished = true;
        debug!("Transaction committed");
        Ok(())
    }

    /// Roll the transaction back.
    pub fn rollback(mut self) -> DbResult<()> {
        self.finished = true;
        self.lease.connection().rollback()?;
        debug!("Transaction rolled back");
        Ok(())
    }

    /// Roll back, logging instead of returning a failure.
    fn rollback_quietly(mut self) {
        self.finished = true;
        match self.lease.connection().rollback() {
            Ok(()) => debug!("Transaction rolled back"),
            Err(e) => warn!(error = %e, "Rollback failed; returning the original error"),
        }
    }

    pub(crate) fn connection(&mut self) -> &mut dyn Connection {
        self.lease.connection()
    }
}

impl Drop for Transaction<'_> {
    fn drop(&mut self) {
        if !self.finished {
            if let Err(e) = self.lease.connection().rollback() {
                warn!(error = %e, "Rollback of abandoned transaction failed");
            } else {
                debug!("Abandoned transaction rolled back");
            }
        }
    }
}

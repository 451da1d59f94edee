//! Embedded-file driver backed by sqlx's SQLite connection.
//!
//! sqlx is asynchronous while the engine is blocking, so every driver shares a
//! single current-thread tokio runtime and drives each statement to completion
//! with `block_on`. Must not be called from inside an async context.

use crate::db::driver::{Command, Connection, Driver, Row};
use crate::db::types::{column_names, decode_column, decode_row};
use crate::error::{DbError, DbResult};
use crate::models::{IsolationLevel, Provider, Value};
use futures_util::TryStreamExt;
use sqlx::Connection as _;
use sqlx::sqlite::{SqliteArguments, SqliteConnectOptions, SqliteLockingMode};
use sqlx::{ConnectOptions, Row as _, Sqlite};
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::Runtime;
use tracing::debug;

/// Default time to wait for a locked database before failing.
pub const DEFAULT_BUSY_TIMEOUT_SECS: u64 = 5;

/// Driver for [`Provider::EmbeddedFile`].
#[derive(Clone)]
pub struct SqliteDriver {
    runtime: Arc<Runtime>,
    busy_timeout: Duration,
}

impl std::fmt::Debug for SqliteDriver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteDriver")
            .field("busy_timeout", &self.busy_timeout)
            .finish()
    }
}

impl SqliteDriver {
    pub fn new() -> DbResult<Self> {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|e| DbError::internal(format!("Failed to start driver runtime: {}", e)))?;
        Ok(Self {
            runtime: Arc::new(runtime),
            busy_timeout: Duration::from_secs(DEFAULT_BUSY_TIMEOUT_SECS),
        })
    }

    /// Set how long a statement waits on a locked database.
    pub fn with_busy_timeout(mut self, busy_timeout: Duration) -> Self {
        self.busy_timeout = busy_timeout;
        self
    }

    /// Create a connection without opening it.
    ///
    /// Useful as the ambient connection of a `DatabaseAccess`, which then
    /// opens and closes it around each call.
    pub fn connection(&self, connection_string: &str) -> DbResult<SqliteFileConnection> {
        let options = parse_options(connection_string)?.busy_timeout(self.busy_timeout);
        Ok(SqliteFileConnection {
            runtime: Arc::clone(&self.runtime),
            options,
            inner: None,
        })
    }
}

impl Driver for SqliteDriver {
    fn supports(&self, provider: Provider) -> bool {
        provider == Provider::EmbeddedFile
    }

    fn connect(&self, connection_string: &str) -> DbResult<Box<dyn Connection>> {
        let mut connection = self.connection(connection_string)?;
        connection.open()?;
        Ok(Box::new(connection))
    }
}

/// Parse a `sqlite:` URL, honoring the `exclusive=true` query flag.
fn parse_options(connection_string: &str) -> DbResult<SqliteConnectOptions> {
    let cs = connection_string.trim();
    if cs.is_empty() {
        return Err(DbError::configuration("Connection string cannot be empty"));
    }

    let (base, query) = cs.split_once('?').unwrap_or((cs, ""));
    let mut exclusive = false;
    let kept: Vec<&str> = query
        .split('&')
        .filter(|pair| !pair.is_empty())
        .filter(|pair| match pair.split_once('=') {
            Some((key, value)) if key.eq_ignore_ascii_case("exclusive") => {
                exclusive = value.eq_ignore_ascii_case("true");
                false
            }
            _ => true,
        })
        .collect();

    let url = if kept.is_empty() {
        base.to_string()
    } else {
        format!("{}?{}", base, kept.join("&"))
    };

    let mut options = SqliteConnectOptions::from_str(&url).map_err(|e| {
        DbError::configuration(format!(
            "Invalid SQLite connection string: {} (expected sqlite:path/to/db.sqlite)",
            e
        ))
    })?;
    if exclusive {
        options = options.locking_mode(SqliteLockingMode::Exclusive);
    }
    Ok(options)
}

fn not_open() -> DbError {
    DbError::connection(
        "Connection is not open",
        "Open the connection before executing commands",
    )
}

/// A single SQLite connection.
pub struct SqliteFileConnection {
    runtime: Arc<Runtime>,
    options: SqliteConnectOptions,
    inner: Option<sqlx::SqliteConnection>,
}

impl SqliteFileConnection {
    fn run_raw(&mut self, sql: &str) -> DbResult<()> {
        let runtime = &self.runtime;
        let conn = self.inner.as_mut().ok_or_else(not_open)?;
        runtime.block_on(sqlx::query(sql).execute(&mut *conn))?;
        Ok(())
    }
}

type SqliteQuery<'q> = sqlx::query::Query<'q, Sqlite, SqliteArguments<'q>>;

fn build_query(command: &Command) -> SqliteQuery<'_> {
    let mut query = sqlx::query(&command.text);
    for param in &command.parameters {
        query = bind_param(query, &param.value);
    }
    query
}

fn bind_param<'q>(query: SqliteQuery<'q>, value: &'q Value) -> SqliteQuery<'q> {
    match value {
        Value::Null => query.bind(None::<String>),
        Value::Bool(v) => query.bind(*v),
        Value::Int(v) => query.bind(*v),
        Value::Float(v) => query.bind(*v),
        Value::Text(v) => query.bind(v.as_str()),
        Value::Blob(v) => query.bind(v.as_slice()),
        // SQLite has no native identifier or timestamp type, store as text
        Value::Uuid(v) => query.bind(v.hyphenated().to_string()),
        Value::DateTime(v) => query.bind(v.format("%Y-%m-%d %H:%M:%S%.f").to_string()),
    }
}

impl Connection for SqliteFileConnection {
    fn supports(&self, provider: Provider) -> bool {
        provider == Provider::EmbeddedFile
    }

    fn is_open(&self) -> bool {
        self.inner.is_some()
    }

    fn open(&mut self) -> DbResult<()> {
        if self.inner.is_some() {
            return Ok(());
        }
        let conn = self
            .runtime
            .block_on(self.options.connect())
            .map_err(|e| {
                DbError::connection(
                    format!("Failed to open SQLite database: {}", e),
                    "Check that the file path exists and is writable, or add ?mode=rwc to create it",
                )
            })?;
        debug!("SQLite connection opened");
        self.inner = Some(conn);
        Ok(())
    }

    fn close(&mut self) -> DbResult<()> {
        if let Some(conn) = self.inner.take() {
            self.runtime.block_on(conn.close())?;
            debug!("SQLite connection closed");
        }
        Ok(())
    }

    fn begin(&mut self, isolation: IsolationLevel) -> DbResult<()> {
        // SQLite transactions are serializable; the level only decides when
        // the write lock is taken.
        let sql = match isolation {
            IsolationLevel::Serializable | IsolationLevel::Snapshot => "BEGIN IMMEDIATE",
            _ => "BEGIN DEFERRED",
        };
        self.run_raw(sql)
    }

    fn commit(&mut self) -> DbResult<()> {
        self.run_raw("COMMIT")
    }

    fn rollback(&mut self) -> DbResult<()> {
        self.run_raw("ROLLBACK")
    }

    fn execute(&mut self, command: &Command) -> DbResult<u64> {
        let runtime = &self.runtime;
        let conn = self.inner.as_mut().ok_or_else(not_open)?;
        let done = runtime.block_on(build_query(command).execute(&mut *conn))?;
        Ok(done.rows_affected())
    }

    fn query_scalar(&mut self, command: &Command) -> DbResult<Value> {
        let runtime = &self.runtime;
        let conn = self.inner.as_mut().ok_or_else(not_open)?;
        let row = runtime.block_on(build_query(command).fetch_optional(&mut *conn))?;
        match row {
            Some(row) if !row.columns().is_empty() => decode_column(&row, 0),
            _ => Ok(Value::Null),
        }
    }

    fn query(
        &mut self,
        command: &Command,
        sink: &mut dyn FnMut(&Row) -> DbResult<bool>,
    ) -> DbResult<()> {
        let runtime = &self.runtime;
        let conn = self.inner.as_mut().ok_or_else(not_open)?;
        runtime.block_on(async {
            let mut rows = build_query(command).fetch(&mut *conn);
            let mut columns: Option<Arc<[String]>> = None;
            while let Some(row) = rows.try_next().await? {
                let names = columns
                    .get_or_insert_with(|| column_names(&row).into())
                    .clone();
                if !sink(&decode_row(&row, names)?)? {
                    break;
                }
            }
            Ok::<(), DbError>(())
        })
    }
}

impl Drop for SqliteFileConnection {
    fn drop(&mut self) {
        if let Some(conn) = self.inner.take() {
            let _ = self.runtime.block_on(conn.close());
        }
    }
}

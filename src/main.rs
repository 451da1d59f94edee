//! db-access - Main entry point.
//!
//! Runs one parameterized statement through the data access engine and prints
//! the result as JSON on stdout. Logs go to stderr.

use db_access::config::{Action, Config, Target};
use db_access::db::{DatabaseAccess, Scope, SqliteDriver};
use db_access::error::{DbError, DbResult};
use serde_json::{Map, Value as JsonValue, json};
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Initialize the tracing subscriber for logging.
fn init_tracing(config: &Config) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    let subscriber = tracing_subscriber::registry().with(filter);

    if config.json_logs {
        subscriber
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        subscriber
            .with(
                fmt::layer()
                    .with_target(true)
                    .with_thread_ids(false)
                    .with_writer(std::io::stderr),
            )
            .init();
    }
}

fn open(config: &Config) -> DbResult<DatabaseAccess> {
    let driver = Arc::new(SqliteDriver::new()?.with_busy_timeout(config.busy_timeout_duration()));

    let access = match config.target()? {
        Target::Connection(database) => {
            info!(
                provider = %database.provider,
                connection = %database.masked(),
                "Opening database"
            );
            DatabaseAccess::new(driver, database.provider, database.connection_string)?
        }
        Target::File {
            provider,
            path,
            exclusive,
        } => {
            info!(%provider, %path, exclusive, "Opening database file");
            DatabaseAccess::from_file(driver, provider, &path, exclusive)?
        }
    };

    Ok(access.with_isolation_level(config.isolation_level))
}

fn run(config: &Config) -> DbResult<JsonValue> {
    let access = open(config)?;

    let output = match &config.action {
        Action::Exec(statement) => {
            let affected =
                access.execute_non_query(Scope::Owned, &statement.sql, &statement.values())?;
            json!({ "rows_affected": affected })
        }
        Action::Scalar(statement) => {
            let value = access.execute_scalar(Scope::Owned, &statement.sql, &statement.values())?;
            json!({ "value": value })
        }
        Action::Query(statement) => {
            let mut rows = Vec::new();
            access.execute_reader(Scope::Owned, &statement.sql, &statement.values(), |row| {
                let mut object = Map::new();
                for (ordinal, column) in row.columns().iter().enumerate() {
                    let value = serde_json::to_value(row.value(ordinal))
                        .map_err(|e| DbError::internal(format!("Failed to encode {}: {}", column, e)))?;
                    object.insert(column.clone(), value);
                }
                rows.push(JsonValue::Object(object));
                Ok(())
            })?;
            json!({ "count": rows.len(), "rows": rows })
        }
        Action::Exists(statement) => {
            let exists = access.exists(Scope::Owned, &statement.sql, &statement.values())?;
            json!({ "exists": exists })
        }
    };

    Ok(output)
}

fn main() {
    // Parse configuration from command line and environment
    let config = Config::parse_args();

    // Initialize logging
    init_tracing(&config);

    match run(&config) {
        Ok(output) => println!("{}", output),
        Err(e) => {
            error!(error = %e, "Statement failed");
            let mut body = json!({ "error": e.to_string() });
            if let Some(suggestion) = e.suggestion() {
                body["suggestion"] = json!(suggestion);
            }
            eprintln!("{}", body);
            std::process::exit(1);
        }
    }
}

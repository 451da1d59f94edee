//! Error types for the data access engine.
//!
//! This module defines all error types using `thiserror` for ergonomic error handling.
//! Errors are surfaced to the caller unchanged; the engine never retries.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum DbError {
    #[error("Configuration error: {message}")]
    Configuration { message: String },

    #[error("Provider '{provider}' does not support {operation}")]
    UnsupportedProvider { provider: String, operation: String },

    #[error(
        "Binding failed: {values} value(s) supplied but only {placeholders} placeholder(s) found in command text"
    )]
    BindingArity { placeholders: usize, values: usize },

    #[error("Cannot convert {value} to {target}: {message}")]
    Conversion {
        value: String,
        target: String,
        message: String,
    },

    #[error("Invalid identifier format '{value}': {message}")]
    Format { value: String, message: String },

    #[error("Operator '{operator}' cannot be rendered for a NULL value (field: {field})")]
    UnsupportedPredicate { field: String, operator: String },

    #[error("Connection failed: {message}")]
    Connection { message: String, suggestion: String },

    #[error("Database error: {message}")]
    Database {
        message: String,
        /// e.g., "2067" for a SQLite unique constraint violation
        sql_state: Option<String>,
        suggestion: String,
    },

    #[error("Transaction error: {message}")]
    Transaction { message: String },

    #[error("Invalid input: {message}")]
    InvalidInput { message: String },

    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl DbError {
    /// Create a configuration error.
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// Create an unsupported provider error.
    pub fn unsupported_provider(provider: impl ToString, operation: impl Into<String>) -> Self {
        Self::UnsupportedProvider {
            provider: provider.to_string(),
            operation: operation.into(),
        }
    }

    /// Create a binding arity error.
    pub fn binding_arity(placeholders: usize, values: usize) -> Self {
        Self::BindingArity {
            placeholders,
            values,
        }
    }

    /// Create a conversion error.
    pub fn conversion(
        value: impl Into<String>,
        target: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::Conversion {
            value: value.into(),
            target: target.into(),
            message: message.into(),
        }
    }

    /// Create a format error.
    pub fn format(value: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Format {
            value: value.into(),
            message: message.into(),
        }
    }

    /// Create an unsupported predicate error.
    pub fn unsupported_predicate(field: impl Into<String>, operator: impl ToString) -> Self {
        Self::UnsupportedPredicate {
            field: field.into(),
            operator: operator.to_string(),
        }
    }

    /// Create a connection error with a helpful suggestion.
    pub fn connection(message: impl Into<String>, suggestion: impl Into<String>) -> Self {
        Self::Connection {
            message: message.into(),
            suggestion: suggestion.into(),
        }
    }

    /// Create a database error with optional SQL state.
    pub fn database(
        message: impl Into<String>,
        sql_state: Option<String>,
        suggestion: impl Into<String>,
    ) -> Self {
        Self::Database {
            message: message.into(),
            sql_state,
            suggestion: suggestion.into(),
        }
    }

    /// Create a transaction error.
    pub fn transaction(message: impl Into<String>) -> Self {
        Self::Transaction {
            message: message.into(),
        }
    }

    /// Create an invalid input error.
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput {
            message: message.into(),
        }
    }

    /// Create an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Get the suggestion for this error, if available.
    pub fn suggestion(&self) -> Option<&str> {
        match self {
            Self::Connection { suggestion, .. } => Some(suggestion),
            Self::Database { suggestion, .. } => Some(suggestion),
            Self::BindingArity { .. } => {
                Some("Supply exactly one value per placeholder, in textual order")
            }
            _ => None,
        }
    }
}

/// Convert sqlx errors to DbError.
impl From<sqlx::Error> for DbError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::Configuration(msg) => DbError::configuration(msg.to_string()),
            sqlx::Error::Database(db_err) => {
                let code = db_err.code().map(|c| c.to_string());
                DbError::database(
                    db_err.message(),
                    code,
                    "Check the SQL syntax and referenced objects",
                )
            }
            sqlx::Error::RowNotFound => DbError::database(
                "No rows returned",
                None,
                "Verify the query conditions match existing data",
            ),
            sqlx::Error::Io(io_err) => DbError::connection(
                format!("I/O error: {}", io_err),
                "Check that the database file exists and is accessible",
            ),
            sqlx::Error::Protocol(msg) => DbError::connection(
                format!("Protocol error: {}", msg),
                "Check database driver compatibility",
            ),
            sqlx::Error::ColumnNotFound(col) => {
                DbError::invalid_input(format!("Column not found: {}", col))
            }
            sqlx::Error::ColumnIndexOutOfBounds { index, len } => DbError::internal(format!(
                "Column index {} out of bounds (len: {})",
                index, len
            )),
            sqlx::Error::ColumnDecode { index, source } => {
                DbError::internal(format!("Failed to decode column {}: {}", index, source))
            }
            sqlx::Error::Decode(source) => DbError::internal(format!("Decode error: {}", source)),
            sqlx::Error::WorkerCrashed => DbError::internal("Database worker crashed"),
            _ => DbError::internal(format!("Unknown database error: {}", err)),
        }
    }
}

/// Result type alias for database operations.
pub type DbResult<T> = Result<T, DbError>;

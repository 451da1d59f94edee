//! Provider SQL dialects.
//!
//! Each provider gets one [`Dialect`] implementation, selected once when a
//! `DatabaseAccess` is constructed. Call sites never branch on the provider;
//! they ask the dialect. Operations a provider cannot express fail with
//! [`DbError::UnsupportedProvider`] instead of producing degraded SQL.

use crate::error::{DbError, DbResult};
use crate::models::{PlaceholderStyle, Provider, Value};
use chrono::NaiveDate;

/// Prefix of named placeholders, shared by all dialects.
pub const PARAMETER_SIGIL: char = '@';

/// Per-provider SQL rendering capabilities.
pub trait Dialect: std::fmt::Debug + Send + Sync {
    /// The provider this dialect renders for.
    fn provider(&self) -> Provider;

    /// Placeholder convention of the provider.
    fn placeholder_style(&self) -> PlaceholderStyle;

    /// Literal for a calendar date.
    fn date_literal(&self, year: i32, month: u32, day: u32) -> DbResult<String>;

    /// Expression evaluating to the current timestamp.
    fn current_timestamp(&self) -> &'static str;

    /// Expression yielding `fallback` when `field` is NULL.
    fn null_coalesce(&self, field: &str, fallback: &str) -> String;

    /// Scalar query returning the identity generated by the last insert.
    fn last_identity_query(&self) -> &'static str;

    /// Connection string for a database file.
    fn file_connection_string(&self, path: &str, exclusive: bool) -> DbResult<String>;

    /// Post-process a bound value before it is attached to a command.
    fn adapt_parameter(&self, value: Value) -> Value {
        value
    }

    /// Sigil that starts a named placeholder.
    fn parameter_sigil(&self) -> char {
        PARAMETER_SIGIL
    }

    /// Placeholder text for a parameter name as it should appear in generated SQL.
    ///
    /// Generated SQL always uses the named form; positional providers have it
    /// rewritten to `?` by the binder.
    fn placeholder(&self, name: &str) -> String {
        format!("{}{}", self.parameter_sigil(), name)
    }
}

/// Select the dialect for a provider.
pub fn dialect_for(provider: Provider) -> Box<dyn Dialect> {
    match provider {
        Provider::RelationalServer => Box::new(ServerDialect),
        Provider::EmbeddedFile => Box::new(EmbeddedDialect),
        Provider::DesktopFile => Box::new(DesktopDialect),
    }
}

fn checked_date(year: i32, month: u32, day: u32) -> DbResult<NaiveDate> {
    NaiveDate::from_ymd_opt(year, month, day).ok_or_else(|| {
        DbError::invalid_input(format!("Invalid date: {:04}-{:02}-{:02}", year, month, day))
    })
}

fn require_path(path: &str) -> DbResult<&str> {
    let path = path.trim();
    if path.is_empty() {
        return Err(DbError::configuration("Database file path cannot be empty"));
    }
    Ok(path)
}

// =============================================================================
// Relational server (SQL Server family)
// =============================================================================

#[derive(Debug, Clone, Copy, Default)]
pub struct ServerDialect;

impl Dialect for ServerDialect {
    fn provider(&self) -> Provider {
        Provider::RelationalServer
    }

    fn placeholder_style(&self) -> PlaceholderStyle {
        PlaceholderStyle::Named
    }

    fn date_literal(&self, year: i32, month: u32, day: u32) -> DbResult<String> {
        let date = checked_date(year, month, day)?;
        Ok(format!("CONVERT(DATETIME, '{}', 120)", date.format("%Y-%m-%d")))
    }

    fn current_timestamp(&self) -> &'static str {
        "GETDATE()"
    }

    fn null_coalesce(&self, field: &str, fallback: &str) -> String {
        format!("ISNULL({}, {})", field, fallback)
    }

    fn last_identity_query(&self) -> &'static str {
        "SELECT SCOPE_IDENTITY()"
    }

    fn file_connection_string(&self, _path: &str, _exclusive: bool) -> DbResult<String> {
        Err(DbError::unsupported_provider(
            self.provider(),
            "file-based connections",
        ))
    }
}

// =============================================================================
// Embedded file (SQLite)
// =============================================================================

#[derive(Debug, Clone, Copy, Default)]
pub struct EmbeddedDialect;

impl Dialect for EmbeddedDialect {
    fn provider(&self) -> Provider {
        Provider::EmbeddedFile
    }

    fn placeholder_style(&self) -> PlaceholderStyle {
        PlaceholderStyle::Positional
    }

    fn date_literal(&self, year: i32, month: u32, day: u32) -> DbResult<String> {
        let date = checked_date(year, month, day)?;
        Ok(format!("DATE('{}')", date.format("%Y-%m-%d")))
    }

    fn current_timestamp(&self) -> &'static str {
        "CURRENT_TIMESTAMP"
    }

    fn null_coalesce(&self, field: &str, fallback: &str) -> String {
        format!("IFNULL({}, {})", field, fallback)
    }

    fn last_identity_query(&self) -> &'static str {
        "SELECT last_insert_rowid()"
    }

    fn file_connection_string(&self, path: &str, exclusive: bool) -> DbResult<String> {
        let path = require_path(path)?;
        let mut cs = format!("sqlite:{}?mode=rwc", path);
        if exclusive {
            cs.push_str("&exclusive=true");
        }
        Ok(cs)
    }

    // SQLite has no native boolean, identifier or timestamp storage.
    fn adapt_parameter(&self, value: Value) -> Value {
        match value {
            Value::Bool(b) => Value::Int(b as i64),
            Value::Uuid(u) => Value::Text(u.hyphenated().to_string()),
            Value::DateTime(d) => Value::Text(d.format("%Y-%m-%d %H:%M:%S%.f").to_string()),
            other => other,
        }
    }
}

// =============================================================================
// Desktop file (Access/Jet family)
// =============================================================================

#[derive(Debug, Clone, Copy, Default)]
pub struct DesktopDialect;

impl Dialect for DesktopDialect {
    fn provider(&self) -> Provider {
        Provider::DesktopFile
    }

    fn placeholder_style(&self) -> PlaceholderStyle {
        PlaceholderStyle::Positional
    }

    fn date_literal(&self, year: i32, month: u32, day: u32) -> DbResult<String> {
        let date = checked_date(year, month, day)?;
        Ok(format!("#{}#", date.format("%m/%d/%Y")))
    }

    fn current_timestamp(&self) -> &'static str {
        "Now()"
    }

    fn null_coalesce(&self, field: &str, fallback: &str) -> String {
        format!("IIF(ISNULL({0}), {1}, {0})", field, fallback)
    }

    fn last_identity_query(&self) -> &'static str {
        "SELECT @@IDENTITY"
    }

    fn file_connection_string(&self, path: &str, exclusive: bool) -> DbResult<String> {
        let path = require_path(path)?;
        let mode = if exclusive {
            "Share Exclusive"
        } else {
            "Share Deny None"
        };
        Ok(format!(
            "Provider=Microsoft.ACE.OLEDB.12.0;Data Source={};Mode={}",
            path, mode
        ))
    }

    // Jet stores booleans as -1/0 and identifiers in braced form.
    fn adapt_parameter(&self, value: Value) -> Value {
        match value {
            Value::Bool(b) => Value::Int(if b { -1 } else { 0 }),
            Value::Uuid(u) => Value::Text(u.braced().to_string()),
            other => other,
        }
    }
}

//! Provider-related data models.
//!
//! This module defines the database provider families and transaction
//! isolation levels understood by the engine.

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

/// Supported provider families.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ValueEnum,
)]
#[serde(rename_all = "snake_case")]
pub enum Provider {
    /// Client/server database with named `@param` placeholders (SQL Server family)
    #[value(alias = "server", alias = "sqlserver")]
    RelationalServer,
    /// Embedded single-file database (SQLite)
    #[value(alias = "embedded", alias = "sqlite")]
    EmbeddedFile,
    /// Desktop file database with positional `?` placeholders (Access/Jet family)
    #[value(alias = "desktop", alias = "access")]
    DesktopFile,
}

impl Provider {
    /// Detect the provider from a connection string.
    pub fn from_connection_string(connection_string: &str) -> Option<Self> {
        let lower = connection_string.trim().to_lowercase();
        if lower.starts_with("sqlite:") {
            Some(Self::EmbeddedFile)
        } else if lower.contains("microsoft.ace.oledb") || lower.contains("microsoft.jet.oledb")
        {
            Some(Self::DesktopFile)
        } else if lower.contains("server=") || lower.contains("data source=") {
            Some(Self::RelationalServer)
        } else {
            None
        }
    }

    /// Get the display name for this provider.
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::RelationalServer => "RelationalServer",
            Self::EmbeddedFile => "EmbeddedFile",
            Self::DesktopFile => "DesktopFile",
        }
    }
}

impl std::fmt::Display for Provider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.display_name())
    }
}

/// Placeholder convention of a provider's SQL dialect.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaceholderStyle {
    /// `@name` placeholders bound by name
    Named,
    /// bare `?` placeholders bound by position
    Positional,
}

/// Transaction isolation level requested when the engine begins a transaction.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum,
)]
#[serde(rename_all = "snake_case")]
pub enum IsolationLevel {
    ReadUncommitted,
    #[default]
    ReadCommitted,
    RepeatableRead,
    Serializable,
    Snapshot,
}

impl std::fmt::Display for IsolationLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let sql = match self {
            Self::ReadUncommitted => "READ UNCOMMITTED",
            Self::ReadCommitted => "READ COMMITTED",
            Self::RepeatableRead => "REPEATABLE READ",
            Self::Serializable => "SERIALIZABLE",
            Self::Snapshot => "SNAPSHOT",
        };
        write!(f, "{}", sql)
    }
}

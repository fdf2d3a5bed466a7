/// Tablekit Error Module
///
/// This module defines the error type shared by every connection, query and
/// table helper in the crate. Read helpers and write helpers report failures
/// the same way, through `Result`.
use thiserror::Error;

/// Comprehensive error type for tablekit.
///
/// This enum covers:
/// - Driver failures (SQLite, MySQL)
/// - Identifier and batch validation performed before any statement runs
/// - Query lifecycle violations (fetching before executing)
/// - Connection context and transaction state errors
/// - Configuration loading
#[derive(Error, Debug)]
pub enum TablekitError {
    /// Errors reported by the SQLite driver
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// Errors reported by the MySQL driver
    #[cfg(feature = "mysql")]
    #[error("MySQL error: {0}")]
    MySql(#[from] sqlx::Error),

    /// A table or field name contains the identifier quote character
    #[error("Illegal identifier: {kind} name {name:?} contains a backtick")]
    IllegalIdentifier { kind: IdentifierKind, name: String },

    /// The target table has no primary-key column
    #[error("No primary key in table {0}")]
    NoPrimaryKey(String),

    /// A record of an update batch does not carry the primary-key field
    #[error("Missing primary key field {key:?} in record at index {index}")]
    MissingPrimaryKeyField { key: String, index: usize },

    /// A record of a batch does not have the same fields as the first record
    #[error("Record at index {index} does not have the same fields as the first record of the batch")]
    HeterogeneousBatch { index: usize },

    /// An update batch carries no field besides the primary key
    #[error("Nothing to update in table {0}: records only carry the primary key")]
    EmptyUpdate(String),

    /// A fetch or accessor was called on a query that has not been executed
    #[error("Query error: the query has not been executed yet")]
    NotExecuted,

    /// No default connection has been registered in the context
    #[error("Connection error: no connection established yet")]
    NoConnection,

    /// Transaction-related errors
    #[error("Transaction error: {0}")]
    Transaction(String),

    /// Operation the configured driver cannot perform
    #[error("Unsupported operation: {0}")]
    Unsupported(String),

    /// Configuration loading and validation errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// File system and I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Which kind of identifier failed validation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdentifierKind {
    Table,
    Field,
}

impl std::fmt::Display for IdentifierKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            IdentifierKind::Table => f.write_str("table"),
            IdentifierKind::Field => f.write_str("field"),
        }
    }
}

/// Type alias for Result to use TablekitError as the error type.
pub type Result<T> = std::result::Result<T, TablekitError>;

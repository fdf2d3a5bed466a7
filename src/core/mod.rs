/// Core Module for tablekit
///
/// This module contains the building blocks the table helpers sit on:
/// driver backends, connections, queries, schema lookups and the shared
/// error type.

pub mod db;
pub mod error;

// Re-export commonly used types for convenience
pub use error::{IdentifierKind, Result, TablekitError};

// Core infrastructure modules
pub mod core;

// Table helpers and their configuration
pub mod config;
pub mod context;
pub mod database;

#[cfg(test)]
mod test_utils;

// Re-export commonly used types for convenience
pub use crate::config::DatabaseConfig;
pub use crate::context::ConnectionContext;
pub use crate::core::db::{Connection, DriverKind, Params, Query, Record, StatementType, Value};
pub use crate::core::{Result, TablekitError};
pub use crate::database::{Batch, Database, InsertedIds};

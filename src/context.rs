//! Caller-owned default connection.
//!
//! Code that works with a single database can keep one `ConnectionContext`
//! and pull the database from it instead of threading a handle through every
//! call. The context remembers the first database registered with it; there
//! is no process-wide state.

use crate::config::DatabaseConfig;
use crate::core::{Result, TablekitError};
use crate::database::Database;
use once_cell::unsync::OnceCell;
use tracing::debug;

#[derive(Debug, Default)]
pub struct ConnectionContext {
    first: OnceCell<Database>,
}

impl ConnectionContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Remembers `database` if the context is still empty
    ///
    /// # Returns
    ///
    /// `Ok(&database)` once stored, or `Err(database)` handing it back when a
    /// first database is already registered.
    pub fn register(&self, database: Database) -> std::result::Result<&Database, Database> {
        let registered = self.first.try_insert(database).map_err(|(_, rejected)| rejected)?;
        debug!(dsn = %registered.dsn(), "registered default connection");
        Ok(registered)
    }

    /// The first registered database
    ///
    /// # Errors
    ///
    /// `TablekitError::NoConnection` if nothing has been registered yet.
    pub fn get(&self) -> Result<&Database> {
        self.first.get().ok_or(TablekitError::NoConnection)
    }

    /// The first registered database, opening it from `config` if there is none
    pub fn get_or_open(&self, config: &DatabaseConfig) -> Result<&Database> {
        self.first.get_or_try_init(|| Database::open(config))
    }

    pub fn is_connected(&self) -> bool {
        self.first.get().is_some()
    }

    /// Hands the registered database back, leaving the context empty
    pub fn take(&mut self) -> Option<Database> {
        self.first.take()
    }
}

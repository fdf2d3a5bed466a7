/// Connection Management Module
///
/// This module provides the connection wrapper and transaction lifecycle
/// management for tablekit. A connection owns exactly one driver backend and
/// is used by one caller at a time.

use crate::config::DatabaseConfig;
use crate::core::db::backend::{Backend, DriverKind};
use crate::core::db::sqlite::SqliteBackend;
use crate::core::{Result, TablekitError};
use std::cell::Cell;
use tracing::{debug, error, info, warn};

/// Represents database transaction states
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum TransactionState {
    /// No active transaction (autocommit mode)
    #[default]
    Autocommit,
    /// Transaction in progress
    Transaction,
    /// A rollback failed; the driver may still hold an open transaction
    Failed,
}

/// One open database connection
#[derive(Debug)]
pub struct Connection {
    backend: Box<dyn Backend>,
    dsn: String,
    transaction_state: Cell<TransactionState>,
}

impl Connection {
    /// Opens a connection described by `config`
    ///
    /// This is the single entry point for every driver kind.
    ///
    /// # Errors
    ///
    /// Returns `TablekitError::Config` for an incomplete configuration, the
    /// driver error if the connection cannot be established, and
    /// `TablekitError::Unsupported` for MySQL when built without the `mysql` feature.
    pub fn open(config: &DatabaseConfig) -> Result<Self> {
        config.validate()?;

        let backend: Box<dyn Backend> = match config.driver {
            DriverKind::Sqlite => Box::new(SqliteBackend::open(config.sqlite_path()?)?),
            DriverKind::Mysql => mysql_backend(config)?,
        };

        info!("Connected to {}", config.dsn());
        Ok(Self::from_backend(config.dsn(), backend))
    }

    /// Opens a private in-memory SQLite database
    pub fn open_in_memory() -> Result<Self> {
        let backend = SqliteBackend::open_in_memory()?;
        Ok(Self::from_backend("sqlite::memory:", Box::new(backend)))
    }

    /// Wraps an already open backend
    pub fn from_backend(dsn: impl Into<String>, backend: Box<dyn Backend>) -> Self {
        Connection {
            backend,
            dsn: dsn.into(),
            transaction_state: Cell::new(TransactionState::Autocommit),
        }
    }

    pub fn backend(&self) -> &dyn Backend {
        self.backend.as_ref()
    }

    pub fn driver(&self) -> DriverKind {
        self.backend.driver()
    }

    /// Data-source name this connection was opened with (never carries credentials)
    pub fn dsn(&self) -> &str {
        &self.dsn
    }

    pub fn transaction_state(&self) -> TransactionState {
        self.transaction_state.get()
    }

    pub fn in_transaction(&self) -> bool {
        self.transaction_state() != TransactionState::Autocommit
    }

    /// Starts a transaction
    ///
    /// # Errors
    ///
    /// `TablekitError::Transaction` if a transaction is already in progress or
    /// a previous one could not be rolled back.
    pub fn begin(&self) -> Result<()> {
        match self.transaction_state() {
            TransactionState::Autocommit => {}
            TransactionState::Transaction => {
                return Err(TablekitError::Transaction("Transaction already in progress".to_string()))
            }
            TransactionState::Failed => {
                return Err(TablekitError::Transaction(
                    "Previous transaction failed to roll back".to_string(),
                ))
            }
        }

        self.backend.begin()?;
        self.transaction_state.set(TransactionState::Transaction);
        Ok(())
    }

    /// Commits the current transaction
    pub fn commit(&self) -> Result<()> {
        if self.transaction_state() != TransactionState::Transaction {
            return Err(TablekitError::Transaction("No transaction in progress".to_string()));
        }

        self.backend.commit()?;
        self.transaction_state.set(TransactionState::Autocommit);
        Ok(())
    }

    /// Rolls back the current transaction
    ///
    /// Also accepted after a failed rollback, to retry it.
    pub fn rollback(&self) -> Result<()> {
        if self.transaction_state() == TransactionState::Autocommit {
            return Err(TablekitError::Transaction("No transaction in progress".to_string()));
        }

        match self.backend.rollback() {
            Ok(()) => {
                self.transaction_state.set(TransactionState::Autocommit);
                Ok(())
            }
            Err(e) => {
                self.transaction_state.set(TransactionState::Failed);
                Err(e)
            }
        }
    }

    /// Runs `f` inside a transaction
    ///
    /// Commits when `f` succeeds. When `f` (or the commit) fails, the
    /// transaction is rolled back and the original error is returned unchanged.
    pub fn transaction<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Self) -> Result<T>,
    {
        self.begin()?;
        debug!(dsn = %self.dsn, "transaction started");

        let outcome = f(self).and_then(|value| self.commit().map(|_| value));

        match outcome {
            Ok(value) => {
                debug!(dsn = %self.dsn, "transaction committed");
                Ok(value)
            }
            Err(err) => {
                warn!(dsn = %self.dsn, error = %err, "rolling back transaction");
                if let Err(rollback_err) = self.rollback() {
                    error!(dsn = %self.dsn, error = %rollback_err, "rollback failed");
                }
                Err(err)
            }
        }
    }
}

#[cfg(feature = "mysql")]
fn mysql_backend(config: &DatabaseConfig) -> Result<Box<dyn Backend>> {
    let backend = crate::core::db::mysql::MysqlBackend::connect(config)?;
    Ok(Box::new(backend))
}

#[cfg(not(feature = "mysql"))]
fn mysql_backend(_config: &DatabaseConfig) -> Result<Box<dyn Backend>> {
    Err(TablekitError::Unsupported(
        "tablekit was built without the `mysql` feature".to_string(),
    ))
}

/// # Test Utilities Module
///
/// Testing infrastructure for tablekit with proper isolation.
///
/// This module provides:
/// - In-memory database fixtures with a sample schema
/// - A backend that records every statement it runs
/// - Error assertion helpers

use crate::core::db::sqlite::SqliteBackend;
use crate::core::db::{Backend, Connection, DriverKind, ExecutionResult, Params};
use crate::core::Result;
use crate::database::Database;
use std::sync::{Arc, Mutex};

/// Isolated database test fixture
pub struct DatabaseFixture {
    pub name: String,
    pub database: Database,
}

impl DatabaseFixture {
    /// Create a new, empty in-memory test database
    pub fn new(name: &str) -> Result<Self> {
        Ok(DatabaseFixture {
            name: name.to_string(),
            database: Database::open_in_memory()?,
        })
    }

    /// Create fixture with sample data schema
    pub fn with_sample_data(name: &str) -> Result<Self> {
        let fixture = Self::new(name)?;
        fixture.setup_standard_schema()?;
        fixture.populate_sample_data()?;
        Ok(fixture)
    }

    /// Set up standard test schema
    pub fn setup_standard_schema(&self) -> Result<()> {
        for sql in [
            "CREATE TABLE users (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                username TEXT NOT NULL UNIQUE,
                email TEXT NOT NULL UNIQUE,
                active INTEGER NOT NULL DEFAULT 1
            )",
            "CREATE TABLE posts (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                user_id INTEGER NOT NULL,
                title TEXT NOT NULL,
                published INTEGER NOT NULL DEFAULT 0,
                FOREIGN KEY (user_id) REFERENCES users (id) ON DELETE CASCADE
            )",
            "CREATE TABLE categories (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name TEXT NOT NULL UNIQUE,
                description TEXT
            )",
            "CREATE TABLE audit_log (
                message TEXT NOT NULL,
                created_at TEXT
            )",
        ] {
            self.database.query(sql)?.execute(())?;
        }
        Ok(())
    }

    /// Populate with realistic sample data
    pub fn populate_sample_data(&self) -> Result<()> {
        let mut users = self
            .database
            .query("INSERT INTO users (username, email) VALUES (?, ?)")?;
        for (username, email) in [
            ("alice", "alice@example.com"),
            ("bob", "bob@example.com"),
            ("charlie", "charlie@example.com"),
        ] {
            users.execute([username, email])?;
        }

        let mut categories = self
            .database
            .query("INSERT INTO categories (name, description) VALUES (?, ?)")?;
        for (name, description) in [
            ("Technology", "Posts about technology"),
            ("Travel", "Travel experiences"),
            ("Food", "Food and recipes"),
        ] {
            categories.execute([name, description])?;
        }

        let mut posts = self
            .database
            .query("INSERT INTO posts (user_id, title, published) VALUES (?, ?, ?)")?;
        for (user_id, title, published) in [
            (1, "Welcome to Rust", true),
            (2, "My Trip to Paris", false),
            (1, "Building Terminal UIs", true),
        ] {
            posts.execute(Params::positional([
                user_id.into(),
                crate::core::db::Value::from(title),
                published.into(),
            ]))?;
        }

        Ok(())
    }
}

#[derive(Debug, Default)]
struct LogInner {
    statements: Vec<String>,
    transactions: usize,
}

/// Shared view of what a `RecordingBackend` ran
#[derive(Debug, Clone, Default)]
pub struct StatementLog {
    inner: Arc<Mutex<LogInner>>,
}

impl StatementLog {
    /// SQL of every executed statement, in order
    pub fn statements(&self) -> Vec<String> {
        self.inner.lock().map(|log| log.statements.clone()).unwrap_or_default()
    }

    /// Number of transactions started
    pub fn transactions(&self) -> usize {
        self.inner.lock().map(|log| log.transactions).unwrap_or_default()
    }

    pub fn clear(&self) {
        if let Ok(mut log) = self.inner.lock() {
            log.statements.clear();
            log.transactions = 0;
        }
    }
}

/// In-memory SQLite backend that records what it runs
#[derive(Debug)]
pub struct RecordingBackend {
    inner: SqliteBackend,
    log: StatementLog,
}

impl RecordingBackend {
    /// A database over a fresh recording backend, plus its log
    pub fn database() -> (Database, StatementLog) {
        let log = StatementLog::default();
        let backend = RecordingBackend {
            inner: SqliteBackend::open_in_memory().expect("in-memory database"),
            log: log.clone(),
        };
        let connection = Connection::from_backend("sqlite::memory:", Box::new(backend));
        (Database::from(connection), log)
    }
}

impl Backend for RecordingBackend {
    fn driver(&self) -> DriverKind {
        self.inner.driver()
    }

    fn prepare(&self, sql: &str) -> Result<()> {
        self.inner.prepare(sql)
    }

    fn run(&self, sql: &str, params: &Params) -> Result<ExecutionResult> {
        if let Ok(mut log) = self.log.inner.lock() {
            log.statements.push(sql.to_string());
        }
        self.inner.run(sql, params)
    }

    fn begin(&self) -> Result<()> {
        if let Ok(mut log) = self.log.inner.lock() {
            log.transactions += 1;
        }
        self.inner.begin()
    }

    fn commit(&self) -> Result<()> {
        self.inner.commit()
    }

    fn rollback(&self) -> Result<()> {
        self.inner.rollback()
    }
}

/// Asserts that a result is a specific `TablekitError` variant
#[macro_export]
macro_rules! assert_tablekit_error {
    ($result:expr, $expected_type:ident, $context:expr) => {
        match $result {
            Err($crate::core::TablekitError::$expected_type { .. }) => {}
            Ok(_) => panic!("Expected {} error but got Ok in {}", stringify!($expected_type), $context),
            Err(other) => panic!("Expected {} but got {:?} in {}", stringify!($expected_type), other, $context),
        }
    };
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::db::Value;

    #[test]
    fn test_database_fixture_creation() {
        let fixture = DatabaseFixture::new("test_create").unwrap();
        assert_eq!(fixture.name, "test_create");
    }

    #[test]
    fn test_sample_data_fixture() {
        let fixture = DatabaseFixture::with_sample_data("test_sample").unwrap();

        let count = fixture
            .database
            .get_field("SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name NOT LIKE 'sqlite_%'", ())
            .unwrap();
        assert_eq!(count, Some(Value::Integer(4)));
    }

    #[test]
    fn test_recording_backend_logs_statements() {
        let (database, log) = RecordingBackend::database();
        database.get_field("SELECT 1", ()).unwrap();
        database.transaction(|_| Ok(())).unwrap();

        assert_eq!(log.statements(), vec!["SELECT 1".to_string()]);
        assert_eq!(log.transactions(), 1);
    }

    #[test]
    fn test_error_assertion_macro() {
        let result: Result<i32> = Err(crate::core::TablekitError::NoConnection);
        assert_tablekit_error!(result, NoConnection, "macro test");
    }
}

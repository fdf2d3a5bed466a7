/// SQLite Backend Module
///
/// Runs statements through `rusqlite`. Statements go through the
/// connection's prepared-statement cache, so a statement executed once per
/// batch record is parsed only once.

use crate::core::db::backend::{placeholder_name, Backend, DriverKind, ExecutionResult};
use crate::core::db::value::{Params, Value};
use crate::core::Result;
use rusqlite::types::{ToSql, ToSqlOutput, ValueRef};
use rusqlite::{params_from_iter, Connection, Statement};
use std::path::Path;
use tracing::debug;

/// Number of prepared statements kept per connection
const STATEMENT_CACHE_CAPACITY: usize = 32;

/// Backend over a single rusqlite connection
#[derive(Debug)]
pub struct SqliteBackend {
    conn: Connection,
}

impl SqliteBackend {
    /// Opens (or creates) the database file at `path`
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let conn = Connection::open(path)?;
        Self::from_connection(conn)
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        Self::from_connection(conn)
    }

    /// Wraps an already open rusqlite connection
    pub fn from_connection(conn: Connection) -> Result<Self> {
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        conn.set_prepared_statement_cache_capacity(STATEMENT_CACHE_CAPACITY);
        Ok(SqliteBackend { conn })
    }

    /// Direct access to the underlying rusqlite connection
    pub fn connection(&self) -> &Connection {
        &self.conn
    }
}

impl Backend for SqliteBackend {
    fn driver(&self) -> DriverKind {
        DriverKind::Sqlite
    }

    fn prepare(&self, sql: &str) -> Result<()> {
        self.conn.prepare_cached(sql)?;
        Ok(())
    }

    fn run(&self, sql: &str, params: &Params) -> Result<ExecutionResult> {
        let mut stmt = self.conn.prepare_cached(sql)?;

        if stmt.column_count() == 0 {
            let changed = execute_bound(&mut stmt, params)?;
            return Ok(ExecutionResult {
                columns: Vec::new(),
                rows: Vec::new(),
                rows_affected: changed as u64,
                last_insert_id: self.conn.last_insert_rowid(),
            });
        }

        let columns: Vec<String> = stmt.column_names().into_iter().map(String::from).collect();
        let rows = query_bound(&mut stmt, params, columns.len())?;

        Ok(ExecutionResult {
            columns,
            rows,
            rows_affected: 0,
            last_insert_id: self.conn.last_insert_rowid(),
        })
    }

    fn begin(&self) -> Result<()> {
        debug!("sqlite: BEGIN");
        self.conn.execute_batch("BEGIN")?;
        Ok(())
    }

    fn commit(&self) -> Result<()> {
        debug!("sqlite: COMMIT");
        self.conn.execute_batch("COMMIT")?;
        Ok(())
    }

    fn rollback(&self) -> Result<()> {
        debug!("sqlite: ROLLBACK");
        self.conn.execute_batch("ROLLBACK")?;
        Ok(())
    }
}

fn execute_bound(stmt: &mut Statement<'_>, params: &Params) -> Result<usize> {
    let changed = match params {
        Params::None => stmt.execute([])?,
        Params::Positional(values) => stmt.execute(params_from_iter(values.iter()))?,
        Params::Named(pairs) => {
            let names: Vec<String> = pairs.iter().map(|(name, _)| placeholder_name(name)).collect();
            let bound: Vec<(&str, &dyn ToSql)> = names
                .iter()
                .zip(pairs.iter())
                .map(|(name, (_, value))| (name.as_str(), value as &dyn ToSql))
                .collect();
            stmt.execute(bound.as_slice())?
        }
    };
    Ok(changed)
}

fn query_bound(stmt: &mut Statement<'_>, params: &Params, column_count: usize) -> Result<Vec<Vec<Value>>> {
    let mut rows = match params {
        Params::None => stmt.query([])?,
        Params::Positional(values) => stmt.query(params_from_iter(values.iter()))?,
        Params::Named(pairs) => {
            let names: Vec<String> = pairs.iter().map(|(name, _)| placeholder_name(name)).collect();
            let bound: Vec<(&str, &dyn ToSql)> = names
                .iter()
                .zip(pairs.iter())
                .map(|(name, (_, value))| (name.as_str(), value as &dyn ToSql))
                .collect();
            stmt.query(bound.as_slice())?
        }
    };

    let mut collected = Vec::new();
    while let Some(row) = rows.next()? {
        let mut values = Vec::with_capacity(column_count);
        for i in 0..column_count {
            values.push(Value::from(row.get_ref(i)?));
        }
        collected.push(values);
    }
    Ok(collected)
}

impl ToSql for Value {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        let value = match self {
            Value::Null => ValueRef::Null,
            Value::Integer(i) => ValueRef::Integer(*i),
            Value::Real(f) => ValueRef::Real(*f),
            Value::Text(s) => ValueRef::Text(s.as_bytes()),
            Value::Blob(b) => ValueRef::Blob(b),
        };
        Ok(ToSqlOutput::Borrowed(value))
    }
}

impl From<ValueRef<'_>> for Value {
    fn from(value: ValueRef<'_>) -> Self {
        match value {
            ValueRef::Null => Value::Null,
            ValueRef::Integer(i) => Value::Integer(i),
            ValueRef::Real(f) => Value::Real(f),
            ValueRef::Text(t) => Value::Text(String::from_utf8_lossy(t).into_owned()),
            ValueRef::Blob(b) => Value::Blob(b.to_vec()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn backend_with_table() -> SqliteBackend {
        let backend = SqliteBackend::open_in_memory().unwrap();
        backend
            .connection()
            .execute_batch(
                "
                CREATE TABLE test (
                    id INTEGER PRIMARY KEY,
                    name TEXT,
                    value REAL,
                    data BLOB
                );
                INSERT INTO test (name, value) VALUES ('Alice', 123.45);
                INSERT INTO test (name, value) VALUES ('Bob', 678.90);
                INSERT INTO test (name, value) VALUES (NULL, NULL);
            ",
            )
            .unwrap();
        backend
    }

    #[test]
    fn test_run_select_buffers_rows() {
        let backend = backend_with_table();
        let result = backend
            .run("SELECT id, name, value FROM test ORDER BY id", &Params::None)
            .unwrap();

        assert_eq!(result.columns, vec!["id", "name", "value"]);
        assert_eq!(result.rows.len(), 3);
        assert_eq!(
            result.rows[0],
            vec![Value::Integer(1), Value::Text("Alice".to_string()), Value::Real(123.45)]
        );
        assert_eq!(result.rows[2], vec![Value::Integer(3), Value::Null, Value::Null]);
    }

    #[test]
    fn test_run_insert_reports_id_and_changes() {
        let backend = backend_with_table();
        let result = backend
            .run(
                "INSERT INTO test (name, data) VALUES (?, ?)",
                &Params::positional([Value::from("Cy"), Value::Blob(vec![0x48, 0x69])]),
            )
            .unwrap();

        assert!(result.columns.is_empty());
        assert_eq!(result.rows_affected, 1);
        assert_eq!(result.last_insert_id, 4);
    }

    #[test]
    fn test_named_parameters_with_and_without_prefix() {
        let backend = backend_with_table();
        let result = backend
            .run(
                "SELECT name FROM test WHERE id = :id OR name = :name ORDER BY id",
                &Params::named([(":id", Value::from(1)), ("name", Value::from("Bob"))]),
            )
            .unwrap();

        assert_eq!(result.rows.len(), 2);
        assert_eq!(result.rows[1][0], Value::Text("Bob".to_string()));
    }

    #[test]
    fn test_prepare_rejects_invalid_sql() {
        let backend = backend_with_table();
        assert!(backend.prepare("SELECT * FROM nonexistent_table").is_err());
        assert!(backend.prepare("SELECT * FROM test").is_ok());
    }

    #[test]
    fn test_rollback_discards_changes() {
        let backend = backend_with_table();
        backend.begin().unwrap();
        backend.run("DELETE FROM test", &Params::None).unwrap();
        backend.rollback().unwrap();

        let result = backend.run("SELECT COUNT(*) FROM test", &Params::None).unwrap();
        assert_eq!(result.rows[0][0], Value::Integer(3));
    }
}

/// Query Execution Module
///
/// A `Query` wraps one statement bound to a connection. It is prepared on
/// creation, executed with bound parameters, and then fetched from:
///
/// ```text
/// Created --execute--> Executed --execute--> Executed (fresh result)
/// ```
///
/// There is no way back to `Created`; build a new `Query` to start over.

use crate::core::db::backend::ExecutionResult;
use crate::core::db::connection::Connection;
use crate::core::db::value::{Params, Record, Value};
use crate::core::{Result, TablekitError};
use tracing::debug;

/// Lifecycle of a query
#[derive(Debug)]
enum QueryState {
    /// Statement prepared, not executed
    Created,
    /// Parameters bound and results buffered; `cursor` is the next row to fetch
    Executed { result: ExecutionResult, cursor: usize },
}

/// One prepared statement on a connection
#[derive(Debug)]
pub struct Query<'c> {
    connection: &'c Connection,
    sql: String,
    state: QueryState,
}

impl<'c> Query<'c> {
    /// Prepares `sql` on `connection`
    ///
    /// # Errors
    ///
    /// Returns the driver error if the statement cannot be prepared.
    pub fn new(connection: &'c Connection, sql: impl Into<String>) -> Result<Self> {
        let sql = sql.into();
        connection.backend().prepare(&sql)?;

        Ok(Query {
            connection,
            sql,
            state: QueryState::Created,
        })
    }

    pub fn sql(&self) -> &str {
        &self.sql
    }

    pub fn is_executed(&self) -> bool {
        matches!(self.state, QueryState::Executed { .. })
    }

    /// Binds `params` and executes the statement
    ///
    /// Any previously buffered result is replaced and the fetch cursor rewinds
    /// to the first row.
    ///
    /// # Returns
    ///
    /// The number of rows changed by the statement (0 for row-returning statements).
    pub fn execute(&mut self, params: impl Into<Params>) -> Result<u64> {
        let params = params.into();
        debug!(sql = %self.sql, params = params.len(), "executing statement");

        let result = self.connection.backend().run(&self.sql, &params)?;
        let rows_affected = result.rows_affected;
        self.state = QueryState::Executed { result, cursor: 0 };

        Ok(rows_affected)
    }

    fn executed(&self) -> Result<&ExecutionResult> {
        match &self.state {
            QueryState::Executed { result, .. } => Ok(result),
            QueryState::Created => Err(TablekitError::NotExecuted),
        }
    }

    /// Returns the rows from the cursor onwards and moves the cursor past `take` of them
    fn advance(&mut self, take: usize) -> Result<(&[String], &[Vec<Value>])> {
        match &mut self.state {
            QueryState::Executed { result, cursor } => {
                let start = (*cursor).min(result.rows.len());
                let end = start.saturating_add(take).min(result.rows.len());
                *cursor = end;
                Ok((result.columns.as_slice(), &result.rows[start..end]))
            }
            QueryState::Created => Err(TablekitError::NotExecuted),
        }
    }

    /// Column names of the result set
    pub fn column_names(&self) -> Result<&[String]> {
        Ok(&self.executed()?.columns)
    }

    /// Rows changed by the last execution
    pub fn rows_affected(&self) -> Result<u64> {
        Ok(self.executed()?.rows_affected)
    }

    /// Id generated by the last insert on the connection
    pub fn last_insert_id(&self) -> Result<i64> {
        Ok(self.executed()?.last_insert_id)
    }

    /// Fetches the next row, or `None` once the result set is exhausted
    pub fn fetch_record(&mut self) -> Result<Option<Record>> {
        let (columns, rows) = self.advance(1)?;
        Ok(rows.first().map(|row| to_record(columns, row)))
    }

    /// Fetches every remaining row
    pub fn fetch_all_records(&mut self) -> Result<Vec<Record>> {
        let (columns, rows) = self.advance(usize::MAX)?;
        Ok(rows.iter().map(|row| to_record(columns, row)).collect())
    }

    /// Fetches the first column of the next row
    pub fn fetch_field(&mut self) -> Result<Option<Value>> {
        let (_, rows) = self.advance(1)?;
        Ok(rows.first().map(|row| first_column(row)))
    }

    /// Fetches the first column of every remaining row
    pub fn fetch_all_fields(&mut self) -> Result<Vec<Value>> {
        let (_, rows) = self.advance(usize::MAX)?;
        Ok(rows.iter().map(|row| first_column(row)).collect())
    }
}

fn to_record(columns: &[String], row: &[Value]) -> Record {
    columns
        .iter()
        .zip(row.iter())
        .map(|(name, value)| (name.clone(), value.clone()))
        .collect()
}

fn first_column(row: &[Value]) -> Value {
    row.first().cloned().unwrap_or(Value::Null)
}

/// Represents different SQL statement types for introspection
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum StatementType {
    /// SELECT statement (including WITH ... SELECT)
    Select,
    /// INSERT statement
    Insert,
    /// UPDATE statement
    Update,
    /// DELETE statement
    Delete,
    /// CREATE statement
    Create,
    /// DROP statement
    Drop,
    /// ALTER statement
    Alter,
    /// SHOW, DESCRIBE, EXPLAIN and PRAGMA statements
    Introspection,
    /// BEGIN/COMMIT/ROLLBACK transaction commands
    Transaction,
    /// Other statement types
    Other,
}

impl StatementType {
    /// Determines the statement type from a SQL string
    pub fn from_sql(sql: &str) -> Self {
        let sql_upper = skip_leading_noise(sql).to_uppercase();
        let keyword = sql_upper
            .split(|c: char| c.is_whitespace() || c == '(' || c == ';')
            .next()
            .unwrap_or("");

        match keyword {
            "SELECT" | "WITH" | "VALUES" => StatementType::Select,
            "INSERT" | "REPLACE" => StatementType::Insert,
            "UPDATE" => StatementType::Update,
            "DELETE" => StatementType::Delete,
            "CREATE" => StatementType::Create,
            "DROP" => StatementType::Drop,
            "ALTER" => StatementType::Alter,
            "SHOW" | "DESCRIBE" | "DESC" | "EXPLAIN" | "PRAGMA" => StatementType::Introspection,
            "BEGIN" | "START" | "COMMIT" | "ROLLBACK" => StatementType::Transaction,
            _ => StatementType::Other,
        }
    }

    /// Whether statements of this type produce a result set
    pub fn returns_rows(self) -> bool {
        matches!(self, StatementType::Select | StatementType::Introspection)
    }
}

/// Strips whitespace, comments and opening parentheses ahead of the first keyword
fn skip_leading_noise(sql: &str) -> &str {
    let mut rest = sql;
    loop {
        rest = rest.trim_start_matches(|c: char| c.is_whitespace() || c == '(');
        if let Some(comment) = rest.strip_prefix("/*") {
            rest = match comment.find("*/") {
                Some(end) => &comment[end + 2..],
                None => "",
            };
        } else if rest.starts_with("--") || rest.starts_with('#') {
            rest = match rest.find('\n') {
                Some(end) => &rest[end + 1..],
                None => "",
            };
        } else {
            return rest;
        }
    }
}

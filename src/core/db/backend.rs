/// Backend Module
///
/// The seam between tablekit and the underlying driver. A backend prepares,
/// binds and executes statements and drives transactions; everything above it
/// is driver-agnostic.

use crate::core::db::value::{Params, Value};
use crate::core::Result;
use serde::Deserialize;

/// Supported driver kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DriverKind {
    Sqlite,
    Mysql,
}

impl std::fmt::Display for DriverKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DriverKind::Sqlite => f.write_str("sqlite"),
            DriverKind::Mysql => f.write_str("mysql"),
        }
    }
}

/// Everything a single statement execution produced
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExecutionResult {
    /// Column names of the result set (empty for statements returning no rows)
    pub columns: Vec<String>,
    /// Buffered rows, one value per column
    pub rows: Vec<Vec<Value>>,
    /// Rows changed by a write statement
    pub rows_affected: u64,
    /// Id generated by the last insert on this connection (0 if none)
    pub last_insert_id: i64,
}

/// Driver operations tablekit relies on.
///
/// All calls block until the driver returns. Implementations are used by a
/// single caller at a time.
pub trait Backend: Send + std::fmt::Debug {
    fn driver(&self) -> DriverKind;

    /// Prepares `sql`, failing if the driver rejects it
    fn prepare(&self, sql: &str) -> Result<()>;

    /// Binds `params` to `sql` and executes it, buffering any rows
    fn run(&self, sql: &str, params: &Params) -> Result<ExecutionResult>;

    fn begin(&self) -> Result<()>;

    fn commit(&self) -> Result<()>;

    fn rollback(&self) -> Result<()>;
}

/// Normalizes a named parameter to the `:name` form
pub(crate) fn placeholder_name(name: &str) -> String {
    if name.starts_with([':', '@', '$']) {
        name.to_string()
    } else {
        format!(":{}", name)
    }
}

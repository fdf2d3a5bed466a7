/// MySQL Backend Module
///
/// Runs statements through a single `sqlx` MySQL connection. sqlx is async,
/// so the backend owns a current-thread runtime and blocks on every call.

use crate::config::DatabaseConfig;
use crate::core::db::backend::{Backend, DriverKind, ExecutionResult};
use crate::core::db::query::StatementType;
use crate::core::db::value::{Params, Value};
use crate::core::{Result, TablekitError};
use sqlx::mysql::{MySql, MySqlArguments, MySqlConnectOptions, MySqlConnection, MySqlRow};
use sqlx::query::Query as SqlxQuery;
use sqlx::types::chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use sqlx::types::Decimal;
use sqlx::{Column, Connection as _, Executor, Row, TypeInfo, ValueRef as _};
use std::cell::RefCell;
use tokio::runtime::Runtime;
use tracing::{debug, info};

/// Backend over a single MySQL connection
pub struct MysqlBackend {
    runtime: Runtime,
    conn: RefCell<MySqlConnection>,
}

impl std::fmt::Debug for MysqlBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MysqlBackend").finish_non_exhaustive()
    }
}

impl MysqlBackend {
    /// Connects to the server described by `config`
    pub fn connect(config: &DatabaseConfig) -> Result<Self> {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()?;

        let mut options = MySqlConnectOptions::new()
            .host(config.host.as_deref().unwrap_or("localhost"))
            .port(config.port.unwrap_or(3306));
        if let Some(name) = &config.name {
            options = options.database(name);
        }
        if let Some(username) = &config.username {
            options = options.username(username);
        }
        if let Some(password) = &config.password {
            options = options.password(password);
        }

        let conn = runtime.block_on(MySqlConnection::connect_with(&options))?;
        info!("Connected to {}", config.dsn());

        Ok(MysqlBackend {
            runtime,
            conn: RefCell::new(conn),
        })
    }

    fn simple(&self, sql: &str) -> Result<()> {
        debug!("mysql: {}", sql);
        let mut conn = self.conn.borrow_mut();
        self.runtime.block_on(Executor::execute(&mut *conn, sql))?;
        Ok(())
    }
}

impl Backend for MysqlBackend {
    fn driver(&self) -> DriverKind {
        DriverKind::Mysql
    }

    fn prepare(&self, sql: &str) -> Result<()> {
        let mut conn = self.conn.borrow_mut();
        self.runtime.block_on(Executor::prepare(&mut *conn, sql))?;
        Ok(())
    }

    fn run(&self, sql: &str, params: &Params) -> Result<ExecutionResult> {
        let values = positional_values(params)?;
        let query = values.into_iter().fold(sqlx::query(sql), bind_value);
        let mut conn = self.conn.borrow_mut();

        if StatementType::from_sql(sql).returns_rows() {
            let rows = self.runtime.block_on(query.fetch_all(&mut *conn))?;
            let columns = rows
                .first()
                .map(|row| row.columns().iter().map(|c| c.name().to_string()).collect())
                .unwrap_or_default();
            let rows = rows.iter().map(decode_row).collect::<Result<Vec<_>>>()?;
            Ok(ExecutionResult {
                columns,
                rows,
                rows_affected: 0,
                last_insert_id: 0,
            })
        } else {
            let done = self.runtime.block_on(query.execute(&mut *conn))?;
            Ok(ExecutionResult {
                columns: Vec::new(),
                rows: Vec::new(),
                rows_affected: done.rows_affected(),
                last_insert_id: done.last_insert_id() as i64,
            })
        }
    }

    fn begin(&self) -> Result<()> {
        self.simple("START TRANSACTION")
    }

    fn commit(&self) -> Result<()> {
        self.simple("COMMIT")
    }

    fn rollback(&self) -> Result<()> {
        self.simple("ROLLBACK")
    }
}

fn bind_value<'q>(
    query: SqlxQuery<'q, MySql, MySqlArguments>,
    value: Value,
) -> SqlxQuery<'q, MySql, MySqlArguments> {
    match value {
        Value::Null => query.bind(None::<i64>),
        Value::Integer(i) => query.bind(i),
        Value::Real(f) => query.bind(f),
        Value::Text(s) => query.bind(s),
        Value::Blob(b) => query.bind(b),
    }
}

/// sqlx binds MySQL parameters by position only
fn positional_values(params: &Params) -> Result<Vec<Value>> {
    match params {
        Params::None => Ok(Vec::new()),
        Params::Positional(values) => Ok(values.clone()),
        Params::Named(_) => Err(TablekitError::Unsupported(
            "named parameters are not supported by the MySQL driver".to_string(),
        )),
    }
}

/// BIGINT UNSIGNED values past `i64::MAX` are kept exact as text
fn unsigned_value(v: u64) -> Value {
    i64::try_from(v)
        .map(Value::Integer)
        .unwrap_or_else(|_| Value::Text(v.to_string()))
}

fn decode_row(row: &MySqlRow) -> Result<Vec<Value>> {
    let mut values = Vec::with_capacity(row.len());
    for (i, column) in row.columns().iter().enumerate() {
        let raw = row.try_get_raw(i)?;
        if raw.is_null() {
            values.push(Value::Null);
            continue;
        }
        let type_name = raw.type_info().name().to_string();

        match decode_column(row, i, &type_name) {
            Some(value) => values.push(value),
            None => {
                return Err(TablekitError::Unsupported(format!(
                    "cannot decode column {} of type {}",
                    column.name(),
                    type_name
                )))
            }
        }
    }
    Ok(values)
}

/// Decodes one non-null column; temporal and decimal values become text
fn decode_column(row: &MySqlRow, i: usize, type_name: &str) -> Option<Value> {
    match type_name {
        // No sqlx type claims these two; read the wire value directly
        "YEAR" => return row.try_get_unchecked::<u16, _>(i).ok().map(Value::from),
        "BIT" => return row.try_get_unchecked::<Vec<u8>, _>(i).ok().map(Value::Blob),
        _ => {}
    }

    if let Ok(v) = row.try_get::<i64, _>(i) {
        Some(Value::Integer(v))
    } else if let Ok(v) = row.try_get::<u64, _>(i) {
        Some(unsigned_value(v))
    } else if let Ok(v) = row.try_get::<Decimal, _>(i) {
        Some(Value::Text(v.to_string()))
    } else if let Ok(v) = row.try_get::<f64, _>(i) {
        Some(Value::Real(v))
    } else if let Ok(v) = row.try_get::<f32, _>(i) {
        Some(Value::Real(f64::from(v)))
    } else if let Ok(v) = row.try_get::<NaiveDateTime, _>(i) {
        Some(Value::Text(v.to_string()))
    } else if let Ok(v) = row.try_get::<NaiveDate, _>(i) {
        Some(Value::Text(v.to_string()))
    } else if let Ok(v) = row.try_get::<NaiveTime, _>(i) {
        Some(Value::Text(v.to_string()))
    } else if let Ok(v) = row.try_get::<String, _>(i) {
        Some(Value::Text(v))
    } else if let Ok(v) = row.try_get::<Vec<u8>, _>(i) {
        Some(Value::Blob(v))
    } else {
        None
    }
}

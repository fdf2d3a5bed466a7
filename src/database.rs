//! Table-level helpers on top of a `Connection`.
//!
//! `Database` runs ad-hoc reads (`get_record`, `get_records`, `get_field`,
//! `get_fields`) and builds INSERT/UPDATE/DELETE statements from records.
//! Every name that ends up in SQL text is checked for the identifier quote
//! character before anything is sent to the driver; values are always bound.

use crate::config::DatabaseConfig;
use crate::core::db::statement::{self, check_identifier};
use crate::core::db::{schema, Connection, Params, Query, Record, Value};
use crate::core::{IdentifierKind, Result, TablekitError};
use std::ops::Deref;
use tracing::{debug, info};

/// One record or a list of records to write
#[derive(Debug, Clone, PartialEq)]
pub enum Batch {
    Single(Record),
    Many(Vec<Record>),
}

impl Batch {
    fn into_records(self) -> Vec<Record> {
        match self {
            Batch::Single(record) => vec![record],
            Batch::Many(records) => records,
        }
    }
}

impl From<Record> for Batch {
    fn from(record: Record) -> Self {
        Batch::Single(record)
    }
}

impl From<Vec<Record>> for Batch {
    fn from(records: Vec<Record>) -> Self {
        Batch::Many(records)
    }
}

/// Ids generated by `Database::insert`, shaped like the batch that was passed
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InsertedIds {
    Single(i64),
    Many(Vec<i64>),
}

impl InsertedIds {
    /// The id of a single-record insert
    pub fn single(&self) -> Option<i64> {
        match self {
            InsertedIds::Single(id) => Some(*id),
            InsertedIds::Many(_) => None,
        }
    }

    pub fn into_vec(self) -> Vec<i64> {
        match self {
            InsertedIds::Single(id) => vec![id],
            InsertedIds::Many(ids) => ids,
        }
    }
}

/// A connection with table helpers
#[derive(Debug)]
pub struct Database {
    connection: Connection,
}

impl Deref for Database {
    type Target = Connection;

    fn deref(&self) -> &Connection {
        &self.connection
    }
}

impl From<Connection> for Database {
    fn from(connection: Connection) -> Self {
        Database { connection }
    }
}

impl Database {
    /// Opens the database described by `config`
    pub fn open(config: &DatabaseConfig) -> Result<Self> {
        Ok(Database {
            connection: Connection::open(config)?,
        })
    }

    /// Opens a private in-memory SQLite database
    pub fn open_in_memory() -> Result<Self> {
        Ok(Database {
            connection: Connection::open_in_memory()?,
        })
    }

    pub fn connection(&self) -> &Connection {
        &self.connection
    }

    pub fn into_connection(self) -> Connection {
        self.connection
    }

    /// Prepares `sql` on this database
    pub fn query(&self, sql: impl Into<String>) -> Result<Query<'_>> {
        Query::new(&self.connection, sql)
    }

    fn executed(&self, sql: &str, params: Params) -> Result<Query<'_>> {
        let mut query = self.query(sql)?;
        query.execute(params)?;
        Ok(query)
    }

    /// Runs `sql` and returns its first row
    pub fn get_record(&self, sql: &str, params: impl Into<Params>) -> Result<Option<Record>> {
        self.executed(sql, params.into())?.fetch_record()
    }

    /// Runs `sql` and returns every row
    pub fn get_records(&self, sql: &str, params: impl Into<Params>) -> Result<Vec<Record>> {
        self.executed(sql, params.into())?.fetch_all_records()
    }

    /// Runs `sql` and returns the first column of its first row
    pub fn get_field(&self, sql: &str, params: impl Into<Params>) -> Result<Option<Value>> {
        self.executed(sql, params.into())?.fetch_field()
    }

    /// Runs `sql` and returns the first column of every row
    pub fn get_fields(&self, sql: &str, params: impl Into<Params>) -> Result<Vec<Value>> {
        self.executed(sql, params.into())?.fetch_all_fields()
    }

    /// Inserts one record or a list of records into `table`
    ///
    /// Every record of a list must carry the same fields. All inserts share
    /// one transaction: if any of them fails, none is kept and the error is
    /// returned unchanged.
    ///
    /// # Returns
    ///
    /// `InsertedIds::Single` for a single record, `InsertedIds::Many` with
    /// one id per record, in input order, for a list.
    ///
    /// # Errors
    ///
    /// - `IllegalIdentifier` if the table or a field name contains a backtick
    /// - `HeterogeneousBatch` if a record's fields differ from the first record's
    /// - the driver error of the failing statement
    pub fn insert(&self, table: &str, batch: impl Into<Batch>) -> Result<InsertedIds> {
        check_identifier(table, IdentifierKind::Table)?;

        let batch = batch.into();
        let single = matches!(batch, Batch::Single(_));
        let records = batch.into_records();

        let Some(first) = records.first() else {
            return Ok(InsertedIds::Many(Vec::new()));
        };
        check_fields(&records)?;
        check_uniform(&records)?;
        let fields: Vec<String> = first.fields().map(String::from).collect();

        let sql = statement::insert_sql(table, &fields);
        debug!(table, records = records.len(), "inserting records");

        let ids = self.connection.transaction(|conn| {
            let mut query = Query::new(conn, sql.as_str())?;
            let mut ids = Vec::with_capacity(records.len());
            for record in &records {
                query.execute(bound_values(record, &fields))?;
                ids.push(query.last_insert_id()?);
            }
            Ok(ids)
        })?;

        info!(table, count = ids.len(), "inserted records");
        if single {
            Ok(InsertedIds::Single(ids[0]))
        } else {
            Ok(InsertedIds::Many(ids))
        }
    }

    /// Updates one record or a list of records in `table`, matched on its primary key
    ///
    /// Every record must carry the primary-key field, and every record of a
    /// list the same fields. Nothing is written unless all of that holds. The
    /// updates share one transaction and are rolled back together on failure.
    ///
    /// # Returns
    ///
    /// The total number of rows changed. A record whose key matches no row
    /// changes nothing and is not an error.
    ///
    /// # Errors
    ///
    /// - `IllegalIdentifier` if the table or a field name contains a backtick
    /// - `NoPrimaryKey` if the table has no primary key
    /// - `MissingPrimaryKeyField` if a record lacks the primary-key field
    /// - `HeterogeneousBatch` if a record's fields differ from the first record's
    /// - `EmptyUpdate` if the records carry nothing but the primary key
    /// - the driver error of the failing statement
    pub fn update(&self, table: &str, batch: impl Into<Batch>) -> Result<u64> {
        check_identifier(table, IdentifierKind::Table)?;
        let records = batch.into().into_records();
        check_fields(&records)?;

        let primary_key = self.require_primary_key(table)?;

        let Some(first) = records.first() else {
            return Ok(0);
        };
        let fields: Vec<String> = first
            .fields()
            .filter(|field| *field != primary_key)
            .map(String::from)
            .collect();

        if let Some(index) = records.iter().position(|record| !record.contains(&primary_key)) {
            return Err(TablekitError::MissingPrimaryKeyField {
                key: primary_key,
                index,
            });
        }
        check_uniform(&records)?;
        if fields.is_empty() {
            return Err(TablekitError::EmptyUpdate(table.to_string()));
        }

        let sql = statement::update_sql(table, &fields, &primary_key);
        debug!(table, records = records.len(), "updating records");

        let changed = self.connection.transaction(|conn| {
            let mut query = Query::new(conn, sql.as_str())?;
            let mut changed = 0;
            for record in &records {
                let mut values = bound_values(record, &fields);
                values.push(record.get(&primary_key).cloned().unwrap_or_default());
                changed += query.execute(values)?;
            }
            Ok(changed)
        })?;

        info!(table, changed, "updated records");
        Ok(changed)
    }

    /// Deletes the rows of `table` whose primary key is one of `ids`
    ///
    /// Runs a single statement, so no transaction is opened.
    ///
    /// # Returns
    ///
    /// The number of rows deleted. An empty `ids` list deletes nothing.
    ///
    /// # Errors
    ///
    /// - `IllegalIdentifier` if the table name contains a backtick
    /// - `NoPrimaryKey` if the table has no primary key
    /// - the driver error of the statement
    pub fn delete<I, V>(&self, table: &str, ids: I) -> Result<u64>
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        check_identifier(table, IdentifierKind::Table)?;
        let primary_key = self.require_primary_key(table)?;

        let ids: Vec<Value> = ids.into_iter().map(Into::into).collect();
        if ids.is_empty() {
            return Ok(0);
        }

        let sql = statement::delete_sql(table, &primary_key, ids.len());
        let deleted = self.query(sql)?.execute(ids)?;

        info!(table, deleted, "deleted records");
        Ok(deleted)
    }

    fn require_primary_key(&self, table: &str) -> Result<String> {
        let key = schema::primary_key(&self.connection, table)?
            .ok_or_else(|| TablekitError::NoPrimaryKey(table.to_string()))?;
        check_identifier(&key, IdentifierKind::Field)?;
        Ok(key)
    }
}

/// Every field of every record must be a legal identifier
fn check_fields(records: &[Record]) -> Result<()> {
    records
        .iter()
        .flat_map(Record::fields)
        .try_for_each(|field| check_identifier(field, IdentifierKind::Field))
}

/// Every record must carry the same field set as the first one
fn check_uniform(records: &[Record]) -> Result<()> {
    let Some(first) = records.first() else {
        return Ok(());
    };
    match records.iter().position(|record| !record.same_fields(first)) {
        Some(index) => Err(TablekitError::HeterogeneousBatch { index }),
        None => Ok(()),
    }
}

/// Values of `record` in `fields` order
fn bound_values(record: &Record, fields: &[String]) -> Vec<Value> {
    fields
        .iter()
        .map(|field| record.get(field).cloned().unwrap_or_default())
        .collect()
}

/// Schema Lookup Module
///
/// Metadata queries the table helpers depend on. The lookup differs per
/// driver, but both go through the regular `Query` lifecycle.

use crate::core::db::backend::DriverKind;
use crate::core::db::connection::Connection;
use crate::core::db::query::Query;
use crate::core::db::statement;
use crate::core::db::value::Value;
use crate::core::Result;
use tracing::debug;

/// Resolves the primary-key column of `table`
///
/// For a composite key this is its first column. Returns `None` when the
/// table has no primary key or does not exist. `table` must already have
/// passed `statement::check_identifier`.
pub fn primary_key(conn: &Connection, table: &str) -> Result<Option<String>> {
    let key = match conn.driver() {
        DriverKind::Sqlite => {
            let mut query = Query::new(conn, statement::SQLITE_PRIMARY_KEY_SQL)?;
            query.execute([table])?;
            query.fetch_field()?
        }
        DriverKind::Mysql => {
            let mut query = Query::new(conn, statement::mysql_primary_key_sql(table))?;
            query.execute(())?;
            query
                .fetch_record()?
                .and_then(|record| record.get("Column_name").cloned())
        }
    };

    let key = match key {
        Some(Value::Text(name)) => Some(name),
        _ => None,
    };
    debug!(table, primary_key = ?key, "resolved primary key");
    Ok(key)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn setup_test_schema(conn: &Connection) -> Result<()> {
        for sql in [
            "CREATE TABLE users (id INTEGER PRIMARY KEY, name TEXT NOT NULL)",
            "CREATE TABLE tags (code TEXT PRIMARY KEY, label TEXT)",
            "CREATE TABLE post_tags (post_id INTEGER, tag TEXT, PRIMARY KEY (post_id, tag))",
            "CREATE TABLE audit_log (message TEXT)",
        ] {
            Query::new(conn, sql)?.execute(())?;
        }
        Ok(())
    }

    #[test]
    fn test_primary_key_lookup() {
        let conn = Connection::open_in_memory().unwrap();
        setup_test_schema(&conn).unwrap();

        assert_eq!(primary_key(&conn, "users").unwrap(), Some("id".to_string()));
        assert_eq!(primary_key(&conn, "tags").unwrap(), Some("code".to_string()));
        // Composite keys resolve to their first column
        assert_eq!(primary_key(&conn, "post_tags").unwrap(), Some("post_id".to_string()));
    }

    #[test]
    fn test_missing_primary_key() {
        let conn = Connection::open_in_memory().unwrap();
        setup_test_schema(&conn).unwrap();

        assert_eq!(primary_key(&conn, "audit_log").unwrap(), None);
        assert_eq!(primary_key(&conn, "no_such_table").unwrap(), None);
    }
}

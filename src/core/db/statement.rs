/// Statement Building Module
///
/// SQL text for the table helpers. Identifiers are wrapped in backticks and
/// values are always sent as bound parameters, so the backtick is the only
/// character that has to be refused in table and field names.

use crate::core::{IdentifierKind, Result, TablekitError};

/// Character used to quote identifiers
pub const IDENTIFIER_QUOTE: char = '`';

/// Fails with `IllegalIdentifier` if `name` contains the quote character
pub fn check_identifier(name: &str, kind: IdentifierKind) -> Result<()> {
    if name.contains(IDENTIFIER_QUOTE) {
        return Err(TablekitError::IllegalIdentifier {
            kind,
            name: name.to_string(),
        });
    }
    Ok(())
}

/// Wraps an already checked identifier in backticks
pub fn quote_identifier(name: &str) -> String {
    format!("{q}{name}{q}", q = IDENTIFIER_QUOTE)
}

fn placeholders(count: usize) -> String {
    vec!["?"; count].join(", ")
}

/// `INSERT INTO `t` (`a`, `b`) VALUES (?, ?)`
pub fn insert_sql<S: AsRef<str>>(table: &str, fields: &[S]) -> String {
    let columns: Vec<String> = fields.iter().map(|f| quote_identifier(f.as_ref())).collect();
    format!(
        "INSERT INTO {} ({}) VALUES ({})",
        quote_identifier(table),
        columns.join(", "),
        placeholders(fields.len())
    )
}

/// `UPDATE `t` SET `a` = ?, `b` = ? WHERE `pk` = ?`
pub fn update_sql<S: AsRef<str>>(table: &str, fields: &[S], primary_key: &str) -> String {
    let assignments: Vec<String> = fields
        .iter()
        .map(|f| format!("{} = ?", quote_identifier(f.as_ref())))
        .collect();
    format!(
        "UPDATE {} SET {} WHERE {} = ?",
        quote_identifier(table),
        assignments.join(", "),
        quote_identifier(primary_key)
    )
}

/// `DELETE FROM `t` WHERE `pk` IN (?, ?)`
pub fn delete_sql(table: &str, primary_key: &str, count: usize) -> String {
    format!(
        "DELETE FROM {} WHERE {} IN ({})",
        quote_identifier(table),
        quote_identifier(primary_key),
        placeholders(count)
    )
}

/// Primary-key lookup for MySQL; the first row's `Column_name` is the key
pub fn mysql_primary_key_sql(table: &str) -> String {
    format!("SHOW KEYS FROM {} WHERE Key_name = 'PRIMARY'", quote_identifier(table))
}

/// Primary-key lookup for SQLite, bound to the table name
pub const SQLITE_PRIMARY_KEY_SQL: &str = "SELECT name FROM pragma_table_info(?) WHERE pk = 1";

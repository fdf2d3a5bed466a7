/// Database Module
///
/// This module provides the database plumbing for tablekit, organized into
/// focused submodules.
///
/// ## Architecture
///
/// - **Values** (`value.rs`): Scalars, records and bound parameters
/// - **Backends** (`backend.rs`, `sqlite.rs`, `mysql.rs`): The seam to the underlying driver
/// - **Connection Management** (`connection.rs`): Connections and transactions
/// - **Query Execution** (`query.rs`): The execute-then-fetch statement lifecycle
/// - **Schema Lookups** (`schema.rs`): Primary-key resolution
/// - **Statement Building** (`statement.rs`): Identifier checks and SQL text for the table helpers
///
/// ## Error Handling
///
/// All database operations use the standardized `TablekitError` type.
pub mod backend;
pub mod connection;
#[cfg(feature = "mysql")]
pub mod mysql;
pub mod query;
pub mod schema;
pub mod sqlite;
pub mod statement;
pub mod value;

pub use backend::*;
pub use connection::*;
pub use query::*;
pub use value::*;

//! Database abstraction layer for table-talk.
//!
//! Provides a trait-based interface over the SQLite file holding the dataset,
//! plus partial reflection of the dataset table.

mod schema;
mod sqlite;
mod types;

pub use schema::{Column, TableSchema};
pub use sqlite::SqliteClient;
pub use types::{ColumnInfo, QueryResult, Row, Value};

use crate::error::Result;
use async_trait::async_trait;
use tracing::info;

/// Trait defining the interface for database clients.
///
/// All database operations are async and return Results with AppError.
#[async_trait]
pub trait DatabaseClient: Send + Sync {
    /// Introspects every column of a table.
    async fn introspect_table(&self, table: &str) -> Result<TableSchema>;

    /// Returns the distinct non-null values of one column.
    async fn distinct_values(&self, table: &str, column: &str) -> Result<Vec<Value>>;

    /// Executes a SQL query and returns the results.
    async fn execute_query(&self, sql: &str) -> Result<QueryResult>;

    /// Closes the database connection.
    async fn close(&self) -> Result<()>;
}

/// Reflects only the `include` columns of `table`.
///
/// Columns outside the list are dropped from the returned schema and each
/// removal is logged. An empty list keeps every column.
pub async fn reflect_table(
    db: &dyn DatabaseClient,
    table: &str,
    include: &[String],
) -> Result<TableSchema> {
    let mut schema = db.introspect_table(table).await?;

    for removed in schema.retain_columns(include) {
        info!("Removed column '{}' from reflection.", removed);
    }

    info!(
        "Table '{}' partially reflected with columns: {:?}",
        table,
        schema.column_names()
    );

    Ok(schema)
}

/// Quotes an SQL identifier, doubling embedded quotes.
pub fn quote_identifier(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

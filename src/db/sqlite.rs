//! SQLite database client implementation.
//!
//! Provides the `SqliteClient` struct that implements the `DatabaseClient`
//! trait for the local dataset file using sqlx.

use crate::db::{
    quote_identifier, Column, ColumnInfo, DatabaseClient, QueryResult, Row, TableSchema, Value,
};
use crate::error::{AppError, Result};
use async_trait::async_trait;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions, SqliteRow};
use sqlx::{Column as SqlxColumn, Row as SqlxRow, TypeInfo, ValueRef};
use std::path::Path;
use std::time::{Duration, Instant};
use tracing::debug;

/// Query timeout in seconds.
const QUERY_TIMEOUT_SECS: u64 = 30;

/// Default maximum rows to return from a query.
const DEFAULT_MAX_ROWS: usize = 1000;

/// SQLite database client.
#[derive(Debug, Clone)]
pub struct SqliteClient {
    pool: SqlitePool,
    max_rows: usize,
}

impl SqliteClient {
    /// Opens an existing SQLite file.
    ///
    /// With `read_only` set, the connection refuses any write at the SQLite
    /// level regardless of what SQL is sent.
    pub async fn open(path: &Path, read_only: bool) -> Result<Self> {
        if !path.exists() {
            return Err(AppError::connection(format!(
                "Database file not found at {}",
                path.display()
            )));
        }

        let options = SqliteConnectOptions::new()
            .filename(path)
            .read_only(read_only)
            .create_if_missing(false)
            .busy_timeout(Duration::from_secs(5));

        let pool = SqlitePoolOptions::new()
            .max_connections(4)
            .acquire_timeout(Duration::from_secs(10))
            .connect_with(options)
            .await
            .map_err(|e| {
                AppError::connection(format!(
                    "Failed to open database {}: {e}",
                    path.display()
                ))
            })?;

        debug!(path = %path.display(), read_only, "Opened SQLite database");
        Ok(Self::from_pool(pool))
    }

    /// Creates a client from an existing connection pool.
    pub fn from_pool(pool: SqlitePool) -> Self {
        Self {
            pool,
            max_rows: DEFAULT_MAX_ROWS,
        }
    }

    /// Sets the maximum number of rows kept per result.
    pub fn with_max_rows(mut self, max_rows: usize) -> Self {
        self.max_rows = max_rows.max(1);
        self
    }
}

#[async_trait]
impl DatabaseClient for SqliteClient {
    async fn introspect_table(&self, table: &str) -> Result<TableSchema> {
        let pragma = format!("PRAGMA table_info({})", quote_identifier(table));
        let rows: Vec<(i64, String, String, i64, Option<String>, i64)> = sqlx::query_as(&pragma)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| AppError::query(format!("Failed to reflect table {table}: {e}")))?;

        if rows.is_empty() {
            return Err(AppError::query(format!(
                "Table '{table}' does not exist in the database"
            )));
        }

        let columns = rows
            .into_iter()
            .map(|(_cid, name, data_type, not_null, default, pk)| Column {
                name,
                data_type,
                is_nullable: not_null == 0,
                default,
                primary_key: pk > 0,
            })
            .collect();

        Ok(TableSchema {
            name: table.to_string(),
            columns,
        })
    }

    async fn distinct_values(&self, table: &str, column: &str) -> Result<Vec<Value>> {
        let sql = format!(
            "SELECT DISTINCT {} FROM {}",
            quote_identifier(column),
            quote_identifier(table)
        );

        let rows = sqlx::query(&sql)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| AppError::query(format_query_error(e)))?;

        Ok(rows
            .iter()
            .map(|row| convert_value(row, 0))
            .filter(|value| !value.is_null())
            .collect())
    }

    async fn execute_query(&self, sql: &str) -> Result<QueryResult> {
        let start = Instant::now();

        let result = tokio::time::timeout(
            Duration::from_secs(QUERY_TIMEOUT_SECS),
            sqlx::query(sql).fetch_all(&self.pool),
        )
        .await
        .map_err(|_| {
            AppError::query(format!(
                "Query timed out after {QUERY_TIMEOUT_SECS} seconds"
            ))
        })?
        .map_err(|e| AppError::query(format_query_error(e)))?;

        let elapsed = start.elapsed();

        let rows: Vec<Row> = result.iter().map(convert_row).collect();
        let columns: Vec<ColumnInfo> = match (result.first(), rows.first()) {
            (Some(first_row), Some(values)) => first_row
                .columns()
                .iter()
                .zip(values)
                .map(|(column, value)| ColumnInfo::new(column.name(), value.storage_class()))
                .collect(),
            _ => Vec::new(),
        };

        Ok(QueryResult::new(columns, rows)
            .capped(self.max_rows)
            .with_elapsed(elapsed))
    }

    async fn close(&self) -> Result<()> {
        self.pool.close().await;
        Ok(())
    }
}

/// Converts a sqlx SqliteRow to our Row type.
fn convert_row(row: &SqliteRow) -> Row {
    (0..row.columns().len())
        .map(|i| convert_value(row, i))
        .collect()
}

/// Runtime storage class of one value. SQLite columns are dynamically
/// typed and expression columns (`AVG(score)`) carry no declared type.
fn storage_class(row: &SqliteRow, index: usize) -> String {
    match row.try_get_raw(index) {
        Ok(raw) if !raw.is_null() => raw.type_info().name().to_uppercase(),
        _ => "NULL".to_string(),
    }
}

fn convert_value(row: &SqliteRow, index: usize) -> Value {
    let value = match storage_class(row, index).as_str() {
        "NULL" => return Value::Null,
        "INTEGER" | "INT" | "INT8" | "BIGINT" | "BOOLEAN" => {
            row.try_get::<i64, _>(index).map(Value::Integer)
        }
        "REAL" | "FLOAT" | "DOUBLE" | "NUMERIC" => row.try_get::<f64, _>(index).map(Value::Real),
        "BLOB" => row.try_get::<Vec<u8>, _>(index).map(Value::Blob),
        _ => row.try_get::<String, _>(index).map(Value::Text),
    };
    value.unwrap_or(Value::Null)
}

/// Formats a sqlx error into the message surfaced to the model and the user.
fn format_query_error(e: sqlx::Error) -> String {
    match e {
        sqlx::Error::Database(db_err) => db_err.message().to_string(),
        other => other.to_string(),
    }
}

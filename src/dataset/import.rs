//! Loads a `Sheet` into a SQLite table.

use std::fmt;

use sqlx::query::Query;
use sqlx::sqlite::{Sqlite, SqliteArguments, SqlitePool};
use tracing::debug;

use super::spreadsheet::{Cell, Sheet};
use crate::db::quote_identifier;
use crate::error::{AppError, Result};

/// SQLite storage type chosen for a spreadsheet column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnType {
    Integer,
    Real,
    Text,
}

impl ColumnType {
    pub fn as_sql(&self) -> &'static str {
        match self {
            Self::Integer => "INTEGER",
            Self::Real => "REAL",
            Self::Text => "TEXT",
        }
    }
}

impl fmt::Display for ColumnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_sql())
    }
}

/// Infers a column type from its cells.
///
/// Integral when every non-empty cell is a whole number (floats such as
/// `3.0` included), real when every non-empty cell is numeric, text
/// otherwise. A column with no values is text.
pub fn infer_column_type<'a>(cells: impl IntoIterator<Item = &'a Cell>) -> ColumnType {
    let mut seen_value = false;
    let mut integral = true;

    for cell in cells {
        match cell {
            Cell::Empty => continue,
            Cell::Int(_) => {}
            Cell::Float(f) => {
                if f.fract() != 0.0 || f.abs() > i64::MAX as f64 {
                    integral = false;
                }
            }
            Cell::Text(_) => return ColumnType::Text,
        }
        seen_value = true;
    }

    match (seen_value, integral) {
        (false, _) => ColumnType::Text,
        (true, true) => ColumnType::Integer,
        (true, false) => ColumnType::Real,
    }
}

/// Replaces `table` with the contents of `sheet`. Returns the number of rows inserted.
///
/// Runs in one transaction: either the whole sheet lands or nothing changes.
pub async fn import_sheet(pool: &SqlitePool, table: &str, sheet: &Sheet) -> Result<usize> {
    if sheet.headers.is_empty() {
        return Err(AppError::dataset("No valid columns found in spreadsheet."));
    }

    let types: Vec<ColumnType> = (0..sheet.headers.len())
        .map(|index| infer_column_type(sheet.column(index)))
        .collect();

    let table_ident = quote_identifier(table);
    let column_defs = sheet
        .headers
        .iter()
        .zip(&types)
        .map(|(name, ty)| format!("{} {}", quote_identifier(name), ty))
        .collect::<Vec<_>>()
        .join(", ");
    let column_list = sheet
        .headers
        .iter()
        .map(|name| quote_identifier(name))
        .collect::<Vec<_>>()
        .join(", ");
    let placeholders = vec!["?"; sheet.headers.len()].join(", ");

    let drop_sql = format!("DROP TABLE IF EXISTS {table_ident}");
    let create_sql = format!("CREATE TABLE {table_ident} ({column_defs})");
    let insert_sql = format!("INSERT INTO {table_ident} ({column_list}) VALUES ({placeholders})");

    debug!(table, columns = %column_defs, "Creating dataset table");

    let mut tx = pool.begin().await.map_err(import_error)?;

    sqlx::query(&drop_sql)
        .execute(&mut *tx)
        .await
        .map_err(import_error)?;
    sqlx::query(&create_sql)
        .execute(&mut *tx)
        .await
        .map_err(import_error)?;

    for row in &sheet.rows {
        let query = row
            .iter()
            .zip(&types)
            .fold(sqlx::query(&insert_sql), |query, (cell, ty)| {
                bind_cell(query, cell, *ty)
            });
        query.execute(&mut *tx).await.map_err(import_error)?;
    }

    tx.commit().await.map_err(import_error)?;

    Ok(sheet.rows.len())
}

fn bind_cell<'q>(
    query: Query<'q, Sqlite, SqliteArguments<'q>>,
    cell: &Cell,
    column_type: ColumnType,
) -> Query<'q, Sqlite, SqliteArguments<'q>> {
    match (cell, column_type) {
        (Cell::Empty, _) => query.bind(None::<String>),
        (Cell::Int(i), ColumnType::Real) => query.bind(*i as f64),
        (Cell::Int(i), ColumnType::Text) => query.bind(i.to_string()),
        (Cell::Int(i), ColumnType::Integer) => query.bind(*i),
        (Cell::Float(f), ColumnType::Integer) => query.bind(*f as i64),
        (Cell::Float(f), ColumnType::Real) => query.bind(*f),
        (Cell::Float(f), ColumnType::Text) => query.bind(f.to_string()),
        (Cell::Text(s), _) => query.bind(s.clone()),
    }
}

fn import_error(e: sqlx::Error) -> AppError {
    AppError::dataset(format!("Error creating DB: {e}"))
}

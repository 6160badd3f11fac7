//! Spreadsheet to SQLite import.
//!
//! The dataset ships as a spreadsheet; the first run turns it into a SQLite
//! file that every later run reuses.

mod import;
mod spreadsheet;

pub use import::{import_sheet, infer_column_type, ColumnType};
pub use spreadsheet::{read_spreadsheet, Cell, Sheet};

use std::path::Path;

use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use tracing::{error, info};

use crate::config::DatasetConfig;
use crate::error::{AppError, Result};

/// Outcome of [`ensure_database`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DatabaseStatus {
    /// The SQLite file was already there.
    Existing,
    /// The SQLite file was built with this many rows.
    Created(usize),
}

/// Builds the SQLite file from the spreadsheet unless it already exists.
pub async fn ensure_database(config: &DatasetConfig) -> Result<DatabaseStatus> {
    let db_path = config.db_path();

    if db_path.exists() {
        info!("DB file '{}' exists. Skipping creation.", db_path.display());
        return Ok(DatabaseStatus::Existing);
    }

    info!("DB file not found. Creating from spreadsheet.");
    create_database(config).await.map(DatabaseStatus::Created)
}

/// Deletes the SQLite file, if any, and imports the spreadsheet again.
pub async fn rebuild_database(config: &DatasetConfig) -> Result<usize> {
    let db_path = config.db_path();

    if db_path.exists() {
        tokio::fs::remove_file(&db_path).await.map_err(|e| {
            AppError::dataset(format!("Failed to remove {}: {}", db_path.display(), e))
        })?;
        info!("Removed existing DB file '{}'", db_path.display());
    }

    create_database(config).await
}

async fn create_database(config: &DatasetConfig) -> Result<usize> {
    let spreadsheet = config.spreadsheet_path().ok_or_else(|| {
        AppError::dataset("No spreadsheet configured. Set dataset.spreadsheet or pass --spreadsheet.")
    })?;

    if !spreadsheet.exists() {
        error!("Spreadsheet not found at {}.", spreadsheet.display());
        return Err(AppError::dataset(format!(
            "Spreadsheet not found at {}",
            spreadsheet.display()
        )));
    }

    let path = spreadsheet.clone();
    let sheet = tokio::task::spawn_blocking(move || read_spreadsheet(&path))
        .await
        .map_err(|e| AppError::internal(format!("Spreadsheet reader panicked: {e}")))??;

    if sheet.is_empty() {
        error!("Spreadsheet {} is empty.", spreadsheet.display());
        return Err(AppError::dataset(format!(
            "Spreadsheet {} is empty",
            spreadsheet.display()
        )));
    }

    let db_path = config.db_path();
    if let Some(parent) = db_path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await.map_err(|e| {
            AppError::dataset(format!("Failed to create {}: {}", parent.display(), e))
        })?;
    }

    match write_database(&db_path, &config.table, &sheet).await {
        Ok(rows) => {
            info!(
                rows,
                columns = sheet.headers.len(),
                "Database created at: {}",
                db_path.display()
            );
            Ok(rows)
        }
        Err(e) => {
            // A half-written file would be mistaken for a finished one on the next run.
            let _ = tokio::fs::remove_file(&db_path).await;
            Err(e)
        }
    }
}

async fn write_database(db_path: &Path, table: &str, sheet: &Sheet) -> Result<usize> {
    let options = SqliteConnectOptions::new()
        .filename(db_path)
        .create_if_missing(true);

    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect_with(options)
        .await
        .map_err(|e| {
            AppError::dataset(format!("Failed to create {}: {}", db_path.display(), e))
        })?;

    let result = import_sheet(&pool, table, sheet).await;
    pool.close().await;
    result
}

//! Spreadsheet reading.
//!
//! Excel and OpenDocument workbooks are read with calamine (first worksheet,
//! first row as header); CSV files with the csv crate. Both produce a `Sheet`.

use std::collections::HashSet;
use std::path::Path;

use calamine::{open_workbook_auto, Data, Reader};

use crate::error::{AppError, Result};

/// A single spreadsheet cell.
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Empty,
    Int(i64),
    Float(f64),
    Text(String),
}

impl Cell {
    /// Interprets raw text the way a CSV reader infers numbers.
    pub fn from_text(raw: &str) -> Self {
        let text = raw.trim();
        if text.is_empty() {
            return Self::Empty;
        }
        if let Ok(i) = text.parse::<i64>() {
            return Self::Int(i);
        }
        match text.parse::<f64>() {
            Ok(f) if f.is_finite() => Self::Float(f),
            _ => Self::Text(text.to_string()),
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, Self::Empty)
    }
}

impl From<&Data> for Cell {
    fn from(data: &Data) -> Self {
        match data {
            Data::Empty | Data::Error(_) => Self::Empty,
            Data::Int(i) => Self::Int(*i),
            Data::Float(f) if f.is_finite() => Self::Float(*f),
            Data::Float(_) => Self::Empty,
            Data::String(s) if s.trim().is_empty() => Self::Empty,
            Data::String(s) => Self::Text(s.clone()),
            Data::DateTime(dt) if dt.is_datetime() => dt
                .as_datetime()
                .map(|d| Self::Text(d.format(DATETIME_FORMAT).to_string()))
                .unwrap_or(Self::Float(dt.as_f64())),
            // Durations stay a fraction of a day.
            Data::DateTime(dt) => Self::Float(dt.as_f64()),
            Data::DateTimeIso(s) | Data::DurationIso(s) => Self::Text(s.clone()),
            Data::Bool(b) => Self::Text(b.to_string()),
        }
    }
}

/// Text form of Excel date cells, sortable and understood by SQLite's date functions.
const DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Tabular content of one worksheet.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Sheet {
    /// Unique, non-empty column names.
    pub headers: Vec<String>,
    /// Data rows, each exactly `headers.len()` cells long.
    pub rows: Vec<Vec<Cell>>,
}

impl Sheet {
    /// Builds a sheet, normalizing headers and padding ragged rows.
    ///
    /// Rows with no non-empty cell are dropped.
    pub fn new(raw_headers: Vec<String>, raw_rows: Vec<Vec<Cell>>) -> Self {
        let headers = normalize_headers(raw_headers);
        let width = headers.len();

        let rows = raw_rows
            .into_iter()
            .filter(|row| row.iter().any(|cell| !cell.is_empty()))
            .map(|mut row| {
                row.resize(width, Cell::Empty);
                row
            })
            .collect();

        Self { headers, rows }
    }

    pub fn is_empty(&self) -> bool {
        self.headers.is_empty() || self.rows.is_empty()
    }

    /// Iterates the cells of one column.
    pub fn column(&self, index: usize) -> impl Iterator<Item = &Cell> + '_ {
        self.rows.iter().filter_map(move |row| row.get(index))
    }
}

/// Reads the first worksheet of a workbook, or a CSV file.
pub fn read_spreadsheet(path: &Path) -> Result<Sheet> {
    let extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_ascii_lowercase)
        .unwrap_or_default();

    match extension.as_str() {
        "csv" => read_csv(path),
        "xlsx" | "xlsm" | "xlsb" | "xls" | "ods" => read_workbook(path),
        other => Err(AppError::dataset(format!(
            "Unsupported spreadsheet format '{}' for {}",
            other,
            path.display()
        ))),
    }
}

fn read_workbook(path: &Path) -> Result<Sheet> {
    let mut workbook = open_workbook_auto(path)
        .map_err(|e| AppError::dataset(format!("Failed to open {}: {}", path.display(), e)))?;

    let range = workbook
        .worksheet_range_at(0)
        .ok_or_else(|| AppError::dataset(format!("{} has no worksheets", path.display())))?
        .map_err(|e| AppError::dataset(format!("Failed to read {}: {}", path.display(), e)))?;

    let mut rows = range.rows();
    let headers: Vec<String> = match rows.next() {
        Some(header) => header.iter().map(|c| c.to_string().trim().to_string()).collect(),
        None => Vec::new(),
    };
    let data: Vec<Vec<Cell>> = rows.map(|row| row.iter().map(Cell::from).collect()).collect();

    Ok(Sheet::new(headers, data))
}

fn read_csv(path: &Path) -> Result<Sheet> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .has_headers(true)
        .from_path(path)
        .map_err(|e| AppError::dataset(format!("Failed to open {}: {}", path.display(), e)))?;

    let headers: Vec<String> = reader
        .headers()
        .map_err(|e| AppError::dataset(format!("Failed to parse CSV headers: {}", e)))?
        .iter()
        .map(|h| h.trim().to_string())
        .collect();

    let mut rows = Vec::new();
    for (line, record) in reader.records().enumerate() {
        let record = record.map_err(|e| {
            AppError::dataset(format!("Malformed CSV row {} in {}: {}", line + 2, path.display(), e))
        })?;
        rows.push(record.iter().map(Cell::from_text).collect());
    }

    Ok(Sheet::new(headers, rows))
}

/// Names blank headers `Unnamed: <index>` and suffixes duplicates with `.1`, `.2`, ...
///
/// SQLite column names are case-insensitive, so `Score` and `score` collide.
fn normalize_headers(raw: Vec<String>) -> Vec<String> {
    let mut seen: HashSet<String> = HashSet::with_capacity(raw.len());
    let mut headers = Vec::with_capacity(raw.len());

    for (index, header) in raw.into_iter().enumerate() {
        let base = if header.trim().is_empty() {
            format!("Unnamed: {index}")
        } else {
            header.trim().to_string()
        };

        let mut name = base.clone();
        let mut suffix = 1;
        while seen.contains(&name.to_lowercase()) {
            name = format!("{base}.{suffix}");
            suffix += 1;
        }

        seen.insert(name.to_lowercase());
        headers.push(name);
    }

    headers
}

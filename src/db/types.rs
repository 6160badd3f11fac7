//! Query result types for table-talk.
//!
//! Values mirror SQLite's storage classes; results keep track of the row
//! cap so the model can be told when it only saw part of the answer.

use std::fmt;
use std::time::Duration;
use tracing::warn;

/// Rows and column names produced by one statement.
#[derive(Debug, Clone, Default)]
pub struct QueryResult {
    pub columns: Vec<ColumnInfo>,

    /// Returned rows, at most the configured row cap.
    pub rows: Vec<Row>,

    pub elapsed: Duration,

    /// Rows the statement produced before the cap was applied.
    pub total_rows: usize,
}

impl QueryResult {
    pub fn new(columns: Vec<ColumnInfo>, rows: Vec<Row>) -> Self {
        let total_rows = rows.len();
        Self {
            columns,
            rows,
            elapsed: Duration::ZERO,
            total_rows,
        }
    }

    /// Drops every row past `max_rows`.
    pub fn capped(mut self, max_rows: usize) -> Self {
        if self.rows.len() > max_rows {
            warn!(
                "Query returned {} rows, keeping the first {}",
                self.rows.len(),
                max_rows
            );
            self.rows.truncate(max_rows);
        }
        self
    }

    pub fn with_elapsed(mut self, elapsed: Duration) -> Self {
        self.elapsed = elapsed;
        self
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// True when rows were dropped by [`QueryResult::capped`].
    pub fn is_truncated(&self) -> bool {
        self.total_rows > self.rows.len()
    }

    pub fn truncation_warning(&self) -> Option<String> {
        self.is_truncated().then(|| {
            format!(
                "Only the first {} of {} rows were returned.",
                self.rows.len(),
                self.total_rows
            )
        })
    }

    /// Column names with the storage class of their first value, e.g.
    /// `agency TEXT, avg_score REAL`.
    pub fn describe_columns(&self) -> String {
        self.columns
            .iter()
            .map(|c| format!("{} {}", c.name, c.storage_class))
            .collect::<Vec<_>>()
            .join(", ")
    }

    /// Encodes the rows as a JSON array of row arrays, the payload handed
    /// back to the model after a function call.
    pub fn rows_as_json(&self) -> serde_json::Value {
        self.rows
            .iter()
            .map(|row| row.iter().map(Value::to_json).collect::<serde_json::Value>())
            .collect()
    }
}

/// A result column and the storage class of its first value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ColumnInfo {
    pub name: String,
    pub storage_class: String,
}

impl ColumnInfo {
    pub fn new(name: impl Into<String>, storage_class: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            storage_class: storage_class.into(),
        }
    }
}

pub type Row = Vec<Value>;

/// A single SQLite value, tagged with its storage class.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum Value {
    #[default]
    Null,
    Integer(i64),
    Real(f64),
    Text(String),
    Blob(Vec<u8>),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// SQLite name of the storage class.
    pub fn storage_class(&self) -> &'static str {
        match self {
            Value::Null => "NULL",
            Value::Integer(_) => "INTEGER",
            Value::Real(_) => "REAL",
            Value::Text(_) => "TEXT",
            Value::Blob(_) => "BLOB",
        }
    }

    /// Converts the value to JSON. Non-finite reals and blobs have no JSON
    /// counterpart; reals become `null` and blobs a size marker.
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Value::Null => serde_json::Value::Null,
            Value::Integer(i) => (*i).into(),
            Value::Real(f) => serde_json::Number::from_f64(*f)
                .map(serde_json::Value::Number)
                .unwrap_or(serde_json::Value::Null),
            Value::Text(s) => s.as_str().into(),
            Value::Blob(_) => self.to_string().into(),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => f.write_str("NULL"),
            Value::Integer(i) => write!(f, "{i}"),
            Value::Real(r) => write!(f, "{r}"),
            Value::Text(s) => f.write_str(s),
            Value::Blob(b) => write!(f, "<{} bytes>", b.len()),
        }
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Integer(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Real(v)
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Text(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Text(v.to_string())
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map_or(Value::Null, Into::into)
    }
}

//! Table schema types for table-talk.
//!
//! Represents the reflected structure of the dataset table.

use std::collections::HashSet;

/// Represents a reflected database table.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TableSchema {
    /// Table name.
    pub name: String,

    /// Columns in table order.
    pub columns: Vec<Column>,
}

impl TableSchema {
    /// Creates a new table with the given name and no columns.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            columns: Vec::new(),
        }
    }

    /// Adds a column (builder style).
    pub fn with_column(mut self, column: Column) -> Self {
        self.columns.push(column);
        self
    }

    /// Returns the column names in table order.
    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }

    /// Returns true if the table has a column with the given name.
    pub fn has_column(&self, name: &str) -> bool {
        self.columns.iter().any(|c| c.name == name)
    }

    /// Keeps only the columns listed in `keep` and returns the names removed.
    ///
    /// An empty `keep` list keeps every column.
    pub fn retain_columns(&mut self, keep: &[String]) -> Vec<String> {
        if keep.is_empty() {
            return Vec::new();
        }

        let keep: HashSet<&str> = keep.iter().map(String::as_str).collect();
        let mut removed = Vec::new();
        self.columns.retain(|column| {
            let kept = keep.contains(column.name.as_str());
            if !kept {
                removed.push(column.name.clone());
            }
            kept
        });
        removed
    }

    /// Formats the table for display, one column per line.
    pub fn format_for_display(&self) -> String {
        let column_lines = self
            .columns
            .iter()
            .map(|column| {
                let mut annotations = Vec::new();
                if column.primary_key {
                    annotations.push("PK".to_string());
                }
                if !column.is_nullable {
                    annotations.push("NOT NULL".to_string());
                }
                if let Some(default) = &column.default {
                    annotations.push(format!("DEFAULT {default}"));
                }
                if annotations.is_empty() {
                    format!("  - {}: {}\n", column.name, column.data_type)
                } else {
                    format!(
                        "  - {}: {} ({})\n",
                        column.name,
                        column.data_type,
                        annotations.join(", ")
                    )
                }
            })
            .collect::<String>();

        format!("Table: {}\n{}", self.name, column_lines)
    }
}

/// Represents a column in a table.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Column {
    /// Column name.
    pub name: String,

    /// Declared type (may be empty in SQLite).
    pub data_type: String,

    /// Whether the column allows NULL values.
    pub is_nullable: bool,

    /// Default value expression, if any.
    pub default: Option<String>,

    /// Whether the column is part of the primary key.
    pub primary_key: bool,
}

impl Column {
    /// Creates a new nullable column with the given name and type.
    pub fn new(name: impl Into<String>, data_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            data_type: data_type.into(),
            is_nullable: true,
            default: None,
            primary_key: false,
        }
    }

    /// Sets whether the column is nullable.
    pub fn nullable(mut self, nullable: bool) -> Self {
        self.is_nullable = nullable;
        self
    }

    /// Marks the column as part of the primary key.
    pub fn primary_key(mut self) -> Self {
        self.primary_key = true;
        self
    }
}

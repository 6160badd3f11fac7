//! Query safety classification module.
//!
//! Parses SQL proposed by the model and classifies it as safe, mutating, or
//! destructive. SQL the parser does not understand is unverified; it is left
//! to the read-only connection rather than refused.

mod parser;

pub use parser::{classify_sql, SqlClassifier};

use std::fmt;

/// Safety level classification for SQL queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum SafetyLevel {
    /// Read-only queries (SELECT, plain EXPLAIN).
    Safe,
    /// SQL the parser rejected, such as SQLite-only syntax (GLOB, `LIMIT 2, 1`).
    Unverified,
    /// Data modification (INSERT, UPDATE).
    Mutating,
    /// Data loss, schema changes, or statements parsed but not recognised.
    Destructive,
}

impl SafetyLevel {
    /// Returns true if the statement only reads data.
    pub fn is_read_only(&self) -> bool {
        matches!(self, Self::Safe)
    }

    /// Returns true if the parser could not vouch for the statement either way.
    pub fn is_unverified(&self) -> bool {
        matches!(self, Self::Unverified)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Safe => "safe",
            Self::Unverified => "unverified",
            Self::Mutating => "mutating",
            Self::Destructive => "destructive",
        }
    }
}

impl fmt::Display for SafetyLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The type of SQL statement detected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StatementType {
    Select,
    Insert,
    Update,
    Delete,
    Drop,
    Alter,
    Create,
    Explain,
    Pragma,
    /// Multiple statements detected; contains the most dangerous type.
    Multiple(Box<StatementType>),
    /// Statement type could not be determined.
    Unknown,
}

impl StatementType {
    /// SQL keyword for single statements.
    fn keyword(&self) -> &'static str {
        match self {
            Self::Select => "SELECT",
            Self::Insert => "INSERT",
            Self::Update => "UPDATE",
            Self::Delete => "DELETE",
            Self::Drop => "DROP",
            Self::Alter => "ALTER",
            Self::Create => "CREATE",
            Self::Explain => "EXPLAIN",
            Self::Pragma => "PRAGMA",
            Self::Multiple(inner) => inner.keyword(),
            Self::Unknown => "unrecognised statement",
        }
    }
}

impl fmt::Display for StatementType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Multiple(_) => write!(f, "several statements incl. {}", self.keyword()),
            _ => f.write_str(self.keyword()),
        }
    }
}

/// Result of classifying a SQL query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassificationResult {
    /// The determined safety level.
    pub level: SafetyLevel,
    /// The type of statement(s) detected.
    pub statement_type: StatementType,
    /// Why the statement was classified this way, when not obvious.
    pub warning: Option<String>,
}

impl ClassificationResult {
    /// Creates a new classification result.
    pub fn new(level: SafetyLevel, statement_type: StatementType) -> Self {
        Self {
            level,
            statement_type,
            warning: None,
        }
    }

    /// Creates a classification result with a warning message.
    pub fn with_warning(
        level: SafetyLevel,
        statement_type: StatementType,
        warning: impl Into<String>,
    ) -> Self {
        Self {
            level,
            statement_type,
            warning: Some(warning.into()),
        }
    }

    /// Returns true if the statement only reads data.
    pub fn is_read_only(&self) -> bool {
        self.level.is_read_only()
    }
}

//! Error type shared by every layer of table-talk.
//!
//! Each variant carries a human-readable message; `category` gives the
//! short label printed before fatal errors.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    /// The SQLite file could not be opened.
    #[error("Connection error: {0}")]
    Connection(String),

    /// SQLite rejected or failed a statement.
    #[error("Query error: {0}")]
    Query(String),

    /// The chat-completions endpoint failed or answered with something unusable.
    #[error("LLM error: {0}")]
    Llm(String),

    #[error("Configuration error: {0}")]
    Config(String),

    /// The spreadsheet could not be turned into a table.
    #[error("Dataset error: {0}")]
    Dataset(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

// Shorthand constructors taking anything string-like.
impl AppError {
    pub fn connection(msg: impl Into<String>) -> Self {
        Self::Connection(msg.into())
    }

    pub fn query(msg: impl Into<String>) -> Self {
        Self::Query(msg.into())
    }

    pub fn llm(msg: impl Into<String>) -> Self {
        Self::Llm(msg.into())
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    pub fn dataset(msg: impl Into<String>) -> Self {
        Self::Dataset(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// Label shown in front of fatal errors, e.g. `Dataset Error: ...`.
    pub fn category(&self) -> &'static str {
        match self {
            Self::Connection(_) => "Connection Error",
            Self::Query(_) => "Query Error",
            Self::Llm(_) => "LLM Error",
            Self::Config(_) => "Configuration Error",
            Self::Dataset(_) => "Dataset Error",
            Self::Internal(_) => "Internal Error",
        }
    }
}

/// Result type alias using AppError.
pub type Result<T> = std::result::Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_query() {
        let err = AppError::query("no such column: scroe");
        assert_eq!(err.to_string(), "Query error: no such column: scroe");
        assert_eq!(err.category(), "Query Error");
    }

    #[test]
    fn test_error_display_llm() {
        let err = AppError::llm("Azure OpenAI error 429: Too Many Requests");
        assert_eq!(
            err.to_string(),
            "LLM error: Azure OpenAI error 429: Too Many Requests"
        );
        assert_eq!(err.category(), "LLM Error");
    }

    #[test]
    fn test_error_display_config() {
        let err = AppError::config("Env var 'AZURE_OPENAI_API_KEY' is not set.");
        assert_eq!(
            err.to_string(),
            "Configuration error: Env var 'AZURE_OPENAI_API_KEY' is not set."
        );
        assert_eq!(err.category(), "Configuration Error");
    }

    #[test]
    fn test_error_display_dataset() {
        let err = AppError::dataset("Spreadsheet is empty");
        assert_eq!(err.to_string(), "Dataset error: Spreadsheet is empty");
        assert_eq!(err.category(), "Dataset Error");
    }

    #[test]
    fn test_error_display_connection_and_internal() {
        assert_eq!(
            AppError::connection("unable to open database file").category(),
            "Connection Error"
        );
        assert_eq!(
            AppError::internal("unexpected state").to_string(),
            "Internal error: unexpected state"
        );
    }

    #[test]
    fn test_error_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<AppError>();
    }
}

//! table-talk - ask natural-language questions about a spreadsheet.
//!
//! The spreadsheet is imported into SQLite once; each question goes to a
//! chat-completions model that may call `run_sql_query` to ground its answer.

pub mod backend;
pub mod chat;
pub mod cli;
pub mod config;
pub mod dataset;
pub mod db;
pub mod error;
pub mod llm;
pub mod logging;
pub mod profile;
pub mod safety;

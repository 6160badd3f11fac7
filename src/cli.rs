//! Command-line argument parsing for table-talk.
//!
//! Uses clap derive. Dataset flags override the config file, which in turn
//! overrides environment variables.

use crate::config::Config;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Ask natural-language questions about a spreadsheet.
#[derive(Parser, Debug)]
#[command(name = "tabletalk")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Config file path
    #[arg(long, global = true, value_name = "PATH", env = "TABLE_TALK_CONFIG")]
    pub config: Option<PathBuf>,

    /// Folder holding the spreadsheet and the SQLite file
    #[arg(long, global = true, value_name = "DIR")]
    pub data_dir: Option<PathBuf>,

    /// Dataset table name
    #[arg(long, global = true, value_name = "NAME")]
    pub table: Option<String>,

    /// SQLite file name inside the data folder
    #[arg(long, global = true, value_name = "FILE")]
    pub db_file: Option<String>,

    /// Spreadsheet file name inside the data folder
    #[arg(long, global = true, value_name = "FILE")]
    pub spreadsheet: Option<String>,

    /// LLM provider: azure, openai or mock
    #[arg(long, global = true, value_name = "PROVIDER")]
    pub llm: Option<String>,

    /// Log file used in chat mode
    #[arg(long, global = true, value_name = "PATH")]
    pub log_file: Option<PathBuf>,

    /// Disable coloured output
    #[arg(long, global = true)]
    pub no_color: bool,

    #[command(subcommand)]
    pub command: Option<CliCommand>,
}

/// Subcommands. Without one, `chat` runs.
#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum CliCommand {
    /// Start an interactive chat (default)
    Chat,
    /// Ask a single question and print the answer
    Ask {
        /// The question
        #[arg(required = true, num_args = 1.., trailing_var_arg = true)]
        question: Vec<String>,
    },
    /// Build the SQLite database from the spreadsheet
    Import {
        /// Rebuild even if the database already exists
        #[arg(long)]
        force: bool,
    },
    /// Print the reflected table and the sampled values
    Schema,
}

impl Cli {
    /// Parses command-line arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Returns the config file path to use.
    ///
    /// Uses the --config argument if provided, otherwise the default path.
    pub fn config_path(&self) -> PathBuf {
        self.config.clone().unwrap_or_else(Config::default_path)
    }

    /// Returns the subcommand, defaulting to chat.
    pub fn command(&self) -> CliCommand {
        self.command.clone().unwrap_or(CliCommand::Chat)
    }

    /// Returns true when the session is interactive.
    pub fn is_interactive(&self) -> bool {
        self.command() == CliCommand::Chat
    }

    /// Applies command-line overrides on top of the loaded config.
    pub fn apply_overrides(&self, config: &mut Config) {
        if let Some(dir) = &self.data_dir {
            config.dataset.data_dir = dir.clone();
        }
        if let Some(table) = &self.table {
            config.dataset.table = table.clone();
        }
        if let Some(db_file) = &self.db_file {
            config.dataset.db_file = db_file.clone();
        }
        if let Some(spreadsheet) = &self.spreadsheet {
            config.dataset.spreadsheet = Some(spreadsheet.clone());
        }
        if let Some(provider) = &self.llm {
            config.llm.provider = provider.to_lowercase();
        }
        if let Some(log_file) = &self.log_file {
            config.logging.file = Some(log_file.clone());
        }
    }
}

//! Configuration management for table-talk.
//!
//! Handles loading configuration from TOML files and environment variables.
//! The config file describes the dataset (spreadsheet, table, columns worth
//! reflecting) while LLM credentials usually come from the environment.

use crate::error::{AppError, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Chat-completions API version used for Azure deployments.
pub const DEFAULT_AZURE_API_VERSION: &str = "2023-07-01-preview";

/// Main configuration structure for table-talk.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// LLM provider configuration.
    #[serde(default)]
    pub llm: LlmConfig,

    /// Dataset and SQLite configuration.
    #[serde(default)]
    pub dataset: DatasetConfig,

    /// Prompt construction settings.
    #[serde(default)]
    pub prompt: PromptConfig,

    /// Limits applied to model-proposed SQL.
    #[serde(default)]
    pub agent: AgentConfig,

    /// Terminal chat settings.
    #[serde(default)]
    pub chat: ChatConfig,

    /// Log output settings.
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// LLM provider configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    /// LLM provider: "azure", "openai" or "mock".
    #[serde(default = "default_provider")]
    pub provider: String,

    /// Azure resource endpoint, e.g. `https://my-resource.openai.azure.com`.
    pub endpoint: Option<String>,

    /// Azure deployment name.
    pub deployment: Option<String>,

    /// Azure API version.
    pub api_version: Option<String>,

    /// API key (prefer the environment over storing it here).
    pub api_key: Option<String>,

    /// Model name, used by the OpenAI provider.
    pub model: Option<String>,

    /// Request timeout in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Attempts per request; values above 1 enable retry on transient errors.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
}

fn default_provider() -> String {
    "azure".to_string()
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_max_attempts() -> u32 {
    1
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            endpoint: None,
            deployment: None,
            api_version: None,
            api_key: None,
            model: None,
            timeout_secs: default_timeout_secs(),
            max_attempts: default_max_attempts(),
        }
    }
}

impl LlmConfig {
    /// Applies environment variables as defaults for unset fields.
    pub fn apply_env_defaults(&mut self) {
        self.apply_defaults_from(|name| std::env::var(name).ok());
    }

    /// Fills unset fields using the given variable lookup.
    pub fn apply_defaults_from<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).filter(|value| !value.is_empty());

        match self.provider.as_str() {
            "openai" => {
                if self.api_key.is_none() {
                    self.api_key = get("OPENAI_API_KEY");
                }
                if self.model.is_none() {
                    self.model = get("OPENAI_MODEL");
                }
            }
            _ => {
                if self.api_key.is_none() {
                    self.api_key = get("AZURE_OPENAI_API_KEY");
                }
                if self.endpoint.is_none() {
                    self.endpoint = get("AZURE_OPENAI_ENDPOINT");
                }
                if self.deployment.is_none() {
                    self.deployment = get("AZURE_OPENAI_DEPLOYMENT_NAME");
                }
                if self.api_version.is_none() {
                    self.api_version = get("AZURE_OPENAI_API_VERSION");
                }
            }
        }
    }

    /// Returns the Azure API version, falling back to the default.
    pub fn api_version(&self) -> &str {
        self.api_version
            .as_deref()
            .unwrap_or(DEFAULT_AZURE_API_VERSION)
    }

    /// Checks that every credential the selected provider needs is present.
    pub fn validate(&self) -> Result<()> {
        let required: Vec<(&str, &Option<String>)> = match self.provider.as_str() {
            "azure" => vec![
                ("AZURE_OPENAI_API_KEY", &self.api_key),
                ("AZURE_OPENAI_ENDPOINT", &self.endpoint),
                ("AZURE_OPENAI_DEPLOYMENT_NAME", &self.deployment),
            ],
            "openai" => vec![("OPENAI_API_KEY", &self.api_key)],
            "mock" => Vec::new(),
            other => {
                return Err(AppError::config(format!("Unknown LLM provider: {other}")));
            }
        };

        for (name, value) in required {
            if value.as_deref().map_or(true, str::is_empty) {
                tracing::error!("Env var '{}' is not set.", name);
                return Err(AppError::config(format!("Env var '{name}' is not set.")));
            }
        }

        Ok(())
    }
}

/// Optional human description of a column, used in the system prompt.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct ColumnMetadata {
    pub description: Option<String>,
}

/// Dataset and SQLite configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatasetConfig {
    /// Folder holding the spreadsheet and the SQLite file.
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    /// SQLite file name inside `data_dir`.
    #[serde(default)]
    pub db_file: String,

    /// Spreadsheet file name inside `data_dir` (.xlsx, .xls, .ods or .csv).
    #[serde(default)]
    pub spreadsheet: Option<String>,

    /// Table holding the dataset.
    #[serde(default)]
    pub table: String,

    /// Columns to reflect. Empty means every column.
    #[serde(default)]
    pub included_columns: Vec<String>,

    /// Columns whose distinct values are sampled into the prompt.
    #[serde(default)]
    pub distinct_value_columns: Vec<String>,

    /// Per-column descriptions.
    #[serde(default)]
    pub columns: HashMap<String, ColumnMetadata>,
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("data")
}

impl Default for DatasetConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            db_file: String::new(),
            spreadsheet: None,
            table: String::new(),
            included_columns: Vec::new(),
            distinct_value_columns: Vec::new(),
            columns: HashMap::new(),
        }
    }
}

impl DatasetConfig {
    /// Full path of the SQLite database.
    pub fn db_path(&self) -> PathBuf {
        self.data_dir.join(&self.db_file)
    }

    /// Full path of the source spreadsheet, if one is configured.
    pub fn spreadsheet_path(&self) -> Option<PathBuf> {
        self.spreadsheet
            .as_deref()
            .filter(|name| !name.is_empty())
            .map(|name| self.data_dir.join(name))
    }

    /// Returns the description configured for a column.
    pub fn description(&self, column: &str) -> Option<&str> {
        self.columns
            .get(column)
            .and_then(|meta| meta.description.as_deref())
    }

    /// Checks the fields every command needs.
    pub fn validate(&self) -> Result<()> {
        if self.table.trim().is_empty() {
            return Err(AppError::config(
                "dataset.table is not set. Set it in the config file or pass --table.",
            ));
        }
        if self.db_file.trim().is_empty() {
            return Err(AppError::config(
                "dataset.db_file is not set. Set it in the config file or pass --db-file.",
            ));
        }
        Ok(())
    }
}

/// Prompt construction settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PromptConfig {
    /// Distinct values shown per column.
    #[serde(default = "default_sample_limit")]
    pub sample_limit: usize,

    /// Extra domain instructions appended to the system prompt.
    #[serde(default)]
    pub guidance: Vec<String>,
}

fn default_sample_limit() -> usize {
    15
}

impl Default for PromptConfig {
    fn default() -> Self {
        Self {
            sample_limit: default_sample_limit(),
            guidance: Vec::new(),
        }
    }
}

/// Limits applied to SQL proposed by the model.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentConfig {
    /// Allow statements other than read-only queries.
    #[serde(default)]
    pub allow_writes: bool,

    /// Maximum rows returned to the model per query.
    #[serde(default = "default_max_result_rows")]
    pub max_result_rows: usize,
}

fn default_max_result_rows() -> usize {
    1000
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            allow_writes: false,
            max_result_rows: default_max_result_rows(),
        }
    }
}

/// Terminal chat settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatConfig {
    /// Label printed before each question.
    #[serde(default = "default_chat_prompt")]
    pub prompt: String,
}

fn default_chat_prompt() -> String {
    crate::chat::DEFAULT_PROMPT.to_string()
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            prompt: default_chat_prompt(),
        }
    }
}

/// Log output settings.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct LoggingConfig {
    /// Log file used in interactive mode.
    pub file: Option<PathBuf>,
}

impl Config {
    /// Returns the default config file path for the current platform.
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("table-talk")
            .join("config.toml")
    }

    /// Loads configuration from a TOML file.
    pub fn load_from_file(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)
            .map_err(|e| AppError::config(format!("Failed to read config file: {e}")))?;

        Self::parse_toml(&content, path)
    }

    /// Parses configuration from a TOML string.
    fn parse_toml(content: &str, path: &Path) -> Result<Self> {
        toml::from_str(content).map_err(|e| {
            AppError::config(format!(
                "Configuration error in {}:\n  {}",
                path.display(),
                e
            ))
        })
    }
}

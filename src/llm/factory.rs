//! LLM client factory.
//!
//! Centralizes provider-specific logic for creating LLM clients.

use crate::config::LlmConfig;
use crate::error::{AppError, Result};
use crate::llm::{ChatCompletionsClient, ChatCompletionsConfig, LlmClient, LlmProvider, MockLlmClient};

/// Creates an LLM client for the configured provider.
///
/// Credentials must already be resolved into `config` (file values first,
/// then environment variables via [`LlmConfig::apply_env_defaults`]).
pub fn create_client(config: &LlmConfig) -> Result<Box<dyn LlmClient>> {
    let provider: LlmProvider = config.provider.parse().map_err(AppError::config)?;
    config.validate()?;

    match provider {
        LlmProvider::Azure | LlmProvider::OpenAi => {
            let client_config = ChatCompletionsConfig::from_llm_config(config)?;
            tracing::debug!(provider = %provider, "Creating chat-completions client");
            Ok(Box::new(ChatCompletionsClient::new(client_config)?))
        }
        LlmProvider::Mock => Ok(Box::new(MockLlmClient::new())),
    }
}

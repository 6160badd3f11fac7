//! LLM integration for table-talk.
//!
//! Provides the client trait, the chat-completions implementations and the
//! service that turns a user question into an answer grounded in the dataset.

pub mod factory;
pub mod mock;
pub mod openai;
pub mod prompt;
pub mod service;
pub mod tools;
pub mod types;

pub use factory::create_client;
pub use mock::MockLlmClient;
pub use openai::{ChatCompletionsClient, ChatCompletionsConfig, Endpoint};
pub use prompt::{build_schema_prompt, build_system_prompt};
pub use service::LlmService;
pub use tools::{
    get_function_definitions, run_sql_query_definition, FunctionDefinition, RunSqlQueryInput,
    RUN_SQL_QUERY,
};
pub use types::{
    Conversation, FinishReason, FunctionCall, FunctionCallMode, LlmResponse, Message, Role,
};

use async_trait::async_trait;
use std::str::FromStr;
use std::sync::Arc;

use crate::error::Result;

/// Trait for LLM clients that can generate completions.
///
/// Implementations must be thread-safe (Send + Sync) to support async operations.
#[async_trait]
pub trait LlmClient: Send + Sync {
    /// Generates a completion, offering `functions` under the given mode.
    async fn complete(
        &self,
        messages: &[Message],
        functions: &[FunctionDefinition],
        mode: FunctionCallMode,
    ) -> Result<LlmResponse>;
}

#[async_trait]
impl<T: LlmClient + ?Sized> LlmClient for Arc<T> {
    async fn complete(
        &self,
        messages: &[Message],
        functions: &[FunctionDefinition],
        mode: FunctionCallMode,
    ) -> Result<LlmResponse> {
        (**self).complete(messages, functions, mode).await
    }
}

/// LLM provider type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LlmProvider {
    /// Azure OpenAI deployment
    #[default]
    Azure,
    /// OpenAI platform API
    OpenAi,
    /// Mock client for testing (no API key required)
    Mock,
}

impl LlmProvider {
    /// Returns the provider as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Azure => "azure",
            Self::OpenAi => "openai",
            Self::Mock => "mock",
        }
    }
}

impl FromStr for LlmProvider {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "azure" => Ok(Self::Azure),
            "openai" => Ok(Self::OpenAi),
            "mock" => Ok(Self::Mock),
            _ => Err(format!("Unknown LLM provider: {}", s)),
        }
    }
}

impl std::fmt::Display for LlmProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

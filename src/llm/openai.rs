//! Chat-completions client for Azure OpenAI and the OpenAI platform.
//!
//! Both services speak the same request and response format; they differ in
//! the URL and in how the API key is sent. Requests use the function-calling
//! fields (`functions` and `function_call`).

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, warn};
use url::Url;

use crate::config::LlmConfig;
use crate::error::{AppError, Result};
use crate::llm::tools::FunctionDefinition;
use crate::llm::types::{FinishReason, FunctionCall, FunctionCallMode, LlmResponse, Message};
use crate::llm::LlmClient;

/// OpenAI platform chat-completions URL.
const OPENAI_API_URL: &str = "https://api.openai.com/v1/chat/completions";

/// Model used on the OpenAI platform when none is configured.
const DEFAULT_OPENAI_MODEL: &str = "gpt-4o";

/// Base delay for exponential backoff (milliseconds).
const RETRY_BASE_DELAY_MS: u64 = 1000;

/// Which chat-completions service to call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Endpoint {
    /// An Azure OpenAI deployment.
    Azure {
        endpoint: String,
        deployment: String,
        api_version: String,
    },
    /// The OpenAI platform API.
    OpenAi { model: String },
}

impl Endpoint {
    /// Name used in error messages.
    fn label(&self) -> &'static str {
        match self {
            Self::Azure { .. } => "Azure OpenAI",
            Self::OpenAi { .. } => "OpenAI",
        }
    }

    /// Environment variable that holds the key for this service.
    fn key_var(&self) -> &'static str {
        match self {
            Self::Azure { .. } => "AZURE_OPENAI_API_KEY",
            Self::OpenAi { .. } => "OPENAI_API_KEY",
        }
    }

    /// Builds the request URL.
    fn url(&self) -> Result<Url> {
        match self {
            Self::Azure {
                endpoint,
                deployment,
                api_version,
            } => {
                let base = format!("{}/", endpoint.trim_end_matches('/'));
                let mut url = Url::parse(&base)
                    .and_then(|base| {
                        base.join(&format!("openai/deployments/{deployment}/chat/completions"))
                    })
                    .map_err(|e| {
                        AppError::config(format!("Invalid Azure OpenAI endpoint '{endpoint}': {e}"))
                    })?;
                url.query_pairs_mut().append_pair("api-version", api_version);
                Ok(url)
            }
            Self::OpenAi { .. } => Url::parse(OPENAI_API_URL)
                .map_err(|e| AppError::internal(format!("Invalid OpenAI URL: {e}"))),
        }
    }
}

/// Chat-completions client configuration.
#[derive(Debug, Clone)]
pub struct ChatCompletionsConfig {
    /// API key for authentication.
    pub api_key: String,
    /// Target service.
    pub endpoint: Endpoint,
    /// Request timeout in seconds.
    pub timeout_secs: u64,
    /// Attempts per request. Transient failures are retried only above 1.
    pub max_attempts: u32,
}

impl ChatCompletionsConfig {
    /// Creates a config for an Azure OpenAI deployment.
    pub fn azure(
        api_key: impl Into<String>,
        endpoint: impl Into<String>,
        deployment: impl Into<String>,
        api_version: impl Into<String>,
    ) -> Self {
        Self {
            api_key: api_key.into(),
            endpoint: Endpoint::Azure {
                endpoint: endpoint.into(),
                deployment: deployment.into(),
                api_version: api_version.into(),
            },
            timeout_secs: 30,
            max_attempts: 1,
        }
    }

    /// Creates a config for the OpenAI platform.
    pub fn openai(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            endpoint: Endpoint::OpenAi {
                model: model.into(),
            },
            timeout_secs: 30,
            max_attempts: 1,
        }
    }

    /// Builds the client config from validated LLM settings.
    pub fn from_llm_config(config: &LlmConfig) -> Result<Self> {
        let required = |value: &Option<String>, name: &str| {
            value
                .clone()
                .ok_or_else(|| AppError::config(format!("Env var '{name}' is not set.")))
        };

        let base = match config.provider.as_str() {
            "openai" => Self::openai(
                required(&config.api_key, "OPENAI_API_KEY")?,
                config
                    .model
                    .clone()
                    .unwrap_or_else(|| DEFAULT_OPENAI_MODEL.to_string()),
            ),
            _ => Self::azure(
                required(&config.api_key, "AZURE_OPENAI_API_KEY")?,
                required(&config.endpoint, "AZURE_OPENAI_ENDPOINT")?,
                required(&config.deployment, "AZURE_OPENAI_DEPLOYMENT_NAME")?,
                config.api_version(),
            ),
        };

        Ok(base
            .with_timeout(config.timeout_secs)
            .with_max_attempts(config.max_attempts))
    }

    /// Sets the request timeout.
    pub fn with_timeout(mut self, timeout_secs: u64) -> Self {
        self.timeout_secs = timeout_secs;
        self
    }

    /// Sets the number of attempts per request.
    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts.max(1);
        self
    }
}

/// Chat-completions client.
#[derive(Debug, Clone)]
pub struct ChatCompletionsClient {
    config: ChatCompletionsConfig,
    url: Url,
    client: Client,
}

impl ChatCompletionsClient {
    /// Creates a new client with the given configuration.
    pub fn new(config: ChatCompletionsConfig) -> Result<Self> {
        let url = config.endpoint.url()?;
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| AppError::llm(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            config,
            url,
            client,
        })
    }

    /// Returns the request URL.
    pub fn url(&self) -> &Url {
        &self.url
    }

    fn build_request<'a>(
        &'a self,
        messages: &'a [Message],
        functions: &'a [FunctionDefinition],
        mode: FunctionCallMode,
    ) -> ChatRequest<'a> {
        let model = match &self.config.endpoint {
            Endpoint::OpenAi { model } => Some(model.as_str()),
            Endpoint::Azure { .. } => None,
        };

        ChatRequest {
            model,
            messages,
            functions: (!functions.is_empty()).then_some(functions),
            function_call: (!functions.is_empty()).then_some(mode),
        }
    }

    fn request_builder(&self) -> reqwest::RequestBuilder {
        let builder = self
            .client
            .post(self.url.clone())
            .header("Content-Type", "application/json");

        match self.config.endpoint {
            Endpoint::Azure { .. } => builder.header("api-key", &self.config.api_key),
            Endpoint::OpenAi { .. } => {
                builder.header("Authorization", format!("Bearer {}", self.config.api_key))
            }
        }
    }

    /// Parses an API error response and returns (error, is_retryable).
    fn parse_error(&self, status: StatusCode, body: &str) -> (AppError, bool) {
        let label = self.config.endpoint.label();

        if status == StatusCode::UNAUTHORIZED {
            return (
                AppError::llm(format!(
                    "{label} error {}: authentication failed. Check your {}.",
                    status.as_u16(),
                    self.config.endpoint.key_var()
                )),
                false,
            );
        }

        let is_retryable = status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error();

        let detail = serde_json::from_str::<ApiErrorResponse>(body)
            .map(|response| response.error.message)
            .unwrap_or_else(|_| body.to_string());

        (
            AppError::llm(format!("{label} error {}: {}", status.as_u16(), detail)),
            is_retryable,
        )
    }

    /// Determines if a request error is retryable.
    fn is_retryable_request_error(error: &reqwest::Error) -> bool {
        error.is_timeout() || error.is_connect()
    }
}

/// Parses a successful chat-completions body into an `LlmResponse`.
fn parse_response(body: &str) -> Result<LlmResponse> {
    let response: ChatResponse = serde_json::from_str(body)
        .map_err(|e| AppError::llm(format!("Failed to parse response: {}", e)))?;

    let choice = response
        .choices
        .into_iter()
        .next()
        .ok_or_else(|| AppError::llm("No choices in chat completion response"))?;

    let finish_reason = match (choice.finish_reason.as_deref(), &choice.message.function_call) {
        (Some(reason), _) => FinishReason::parse(reason),
        (None, Some(_)) => FinishReason::FunctionCall,
        (None, None) => FinishReason::Stop,
    };

    Ok(LlmResponse {
        content: choice.message.content.unwrap_or_default(),
        function_call: choice.message.function_call,
        finish_reason,
    })
}

#[async_trait]
impl LlmClient for ChatCompletionsClient {
    async fn complete(
        &self,
        messages: &[Message],
        functions: &[FunctionDefinition],
        mode: FunctionCallMode,
    ) -> Result<LlmResponse> {
        let request = self.build_request(messages, functions, mode);
        let label = self.config.endpoint.label();
        let max_attempts = self.config.max_attempts.max(1);

        let mut last_error = None;
        let mut delay = Duration::from_millis(RETRY_BASE_DELAY_MS);

        for attempt in 1..=max_attempts {
            debug!(
                attempt,
                max_attempts,
                messages = messages.len(),
                ?mode,
                "{label} chat completion request"
            );

            let result = self.request_builder().json(&request).send().await;

            match result {
                Ok(response) => {
                    let status = response.status();
                    let body = response
                        .text()
                        .await
                        .map_err(|e| AppError::llm(format!("Failed to read response: {}", e)))?;

                    if status.is_success() {
                        return parse_response(&body);
                    }

                    let (error, is_retryable) = self.parse_error(status, &body);
                    last_error = Some(error);

                    if !is_retryable || attempt >= max_attempts {
                        break;
                    }

                    warn!(
                        "{} request failed (attempt {}), retrying in {:?}: {}",
                        label, attempt, delay, status
                    );
                }
                Err(e) => {
                    let is_retryable = Self::is_retryable_request_error(&e);
                    let error = if e.is_timeout() {
                        AppError::llm(format!("{label} request timed out. Try again."))
                    } else if e.is_connect() {
                        AppError::llm(format!("Failed to connect to {label}. Check your network."))
                    } else {
                        AppError::llm(format!("Request failed: {}", e))
                    };
                    last_error = Some(error);

                    if !is_retryable || attempt >= max_attempts {
                        break;
                    }

                    warn!(
                        "{} request failed (attempt {}), retrying in {:?}",
                        label, attempt, delay
                    );
                }
            }

            tokio::time::sleep(delay).await;
            delay *= 2;
        }

        Err(last_error.unwrap_or_else(|| AppError::llm(format!("No request sent to {label}"))))
    }
}

// Chat-completions API types

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    model: Option<&'a str>,
    messages: &'a [Message],
    #[serde(skip_serializing_if = "Option::is_none")]
    functions: Option<&'a [FunctionDefinition]>,
    #[serde(skip_serializing_if = "Option::is_none")]
    function_call: Option<FunctionCallMode>,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChatMessage {
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    function_call: Option<FunctionCall>,
}

#[derive(Debug, Deserialize)]
struct ApiErrorResponse {
    error: ApiError,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    message: String,
}

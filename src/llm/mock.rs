//! Mock LLM client for testing.
//!
//! Provides deterministic responses without network access. Scripted
//! responses are returned first, in order; after that the mock follows
//! simple input patterns.

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::{Mutex, PoisonError};

use crate::error::Result;
use crate::llm::tools::{FunctionDefinition, RUN_SQL_QUERY};
use crate::llm::types::{FunctionCallMode, LlmResponse, Message, Role};
use crate::llm::LlmClient;

/// Prefix that makes the mock request a `run_sql_query` call.
const SQL_PREFIX: &str = "sql:";

/// A request observed by the mock.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedRequest {
    pub messages: Vec<Message>,
    pub function_names: Vec<String>,
    pub mode: FunctionCallMode,
}

/// Mock LLM client that returns canned responses.
///
/// Used for unit testing and for `--llm mock` runs without credentials.
#[derive(Debug, Default)]
pub struct MockLlmClient {
    /// Responses returned before falling back to pattern matching.
    scripted: Mutex<VecDeque<LlmResponse>>,
    /// Every request received, oldest first.
    requests: Mutex<Vec<RecordedRequest>>,
}

impl MockLlmClient {
    /// Creates a new mock client with default responses.
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues a response to return on the next unanswered call.
    pub fn with_response(self, response: LlmResponse) -> Self {
        self.scripted
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push_back(response);
        self
    }

    /// Returns a copy of every request received so far.
    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Generates a response from the conversation when nothing is scripted.
    fn mock_response(
        messages: &[Message],
        functions: &[FunctionDefinition],
        mode: FunctionCallMode,
    ) -> LlmResponse {
        if let Some(last) = messages.last() {
            if last.role == Role::Function {
                return LlmResponse::text(format!("Here is what the data shows: {}", last.text()));
            }
        }

        let input = messages
            .iter()
            .rev()
            .find(|m| m.role == Role::User)
            .map(|m| m.text().trim())
            .unwrap_or_default();

        let can_call = mode == FunctionCallMode::Auto
            && functions.iter().any(|f| f.name == RUN_SQL_QUERY);

        if can_call {
            if let Some(query) = strip_prefix_ignore_case(input, SQL_PREFIX) {
                let arguments = serde_json::json!({ "query": query.trim() }).to_string();
                return LlmResponse::function_call(RUN_SQL_QUERY, arguments);
            }
        }

        if input.is_empty() {
            return LlmResponse::text("How can I help you with your data?");
        }

        LlmResponse::text(format!(
            "I can answer questions about your data. Start a message with '{SQL_PREFIX}' to run a query directly."
        ))
    }
}

fn strip_prefix_ignore_case<'a>(input: &'a str, prefix: &str) -> Option<&'a str> {
    let head = input.get(..prefix.len())?;
    head.eq_ignore_ascii_case(prefix)
        .then(|| &input[prefix.len()..])
}

#[async_trait]
impl LlmClient for MockLlmClient {
    async fn complete(
        &self,
        messages: &[Message],
        functions: &[FunctionDefinition],
        mode: FunctionCallMode,
    ) -> Result<LlmResponse> {
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(RecordedRequest {
                messages: messages.to_vec(),
                function_names: functions.iter().map(|f| f.name.clone()).collect(),
                mode,
            });

        let scripted = self
            .scripted
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pop_front();

        Ok(scripted.unwrap_or_else(|| Self::mock_response(messages, functions, mode)))
    }
}

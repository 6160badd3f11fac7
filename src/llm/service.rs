//! LLM service for answering questions about the dataset.
//!
//! One user turn is at most two model calls: the first may ask for
//! `run_sql_query`, the query runs locally, and the second call (with
//! function calling disabled) turns the rows into an answer.

use std::sync::Arc;
use std::time::Instant;

use serde_json::json;

use crate::backend::BackendState;
use crate::config::{AgentConfig, Config, PromptConfig};
use crate::error::Result;
use crate::safety::SqlClassifier;

use super::{
    build_system_prompt, get_function_definitions, Conversation, FunctionCallMode, LlmClient,
    Message, RunSqlQueryInput, RUN_SQL_QUERY,
};

/// Reply recorded when the model calls a function we do not offer.
pub const UNKNOWN_FUNCTION_REPLY: &str = "Unknown function called.";

/// LLM service that handles natural language questions and SQL function calls.
pub struct LlmService {
    client: Box<dyn LlmClient>,
    state: Arc<BackendState>,
    prompt: PromptConfig,
    agent: AgentConfig,
    classifier: SqlClassifier,
}

impl LlmService {
    /// Creates a new LLM service using the prompt and agent settings of `config`.
    pub fn new(client: Box<dyn LlmClient>, state: Arc<BackendState>, config: &Config) -> Self {
        Self::with_settings(client, state, config.prompt.clone(), config.agent.clone())
    }

    pub fn with_settings(
        client: Box<dyn LlmClient>,
        state: Arc<BackendState>,
        prompt: PromptConfig,
        agent: AgentConfig,
    ) -> Self {
        Self {
            client,
            state,
            prompt,
            agent,
            classifier: SqlClassifier::new(),
        }
    }

    /// Returns the shared backend state.
    pub fn state(&self) -> &BackendState {
        &self.state
    }

    /// Builds the system prompt for the current dataset.
    pub fn system_prompt(&self) -> String {
        build_system_prompt(&self.state, &self.prompt)
    }

    /// Answers the last user message of `conversation`, appending the
    /// function call, its result and the assistant reply.
    ///
    /// On error the conversation keeps whatever was appended before the
    /// failing call.
    pub async fn process_user_query(&self, conversation: &mut Conversation) -> Result<()> {
        let start = Instant::now();

        if !conversation.has_system() {
            conversation.insert_system(self.system_prompt());
            tracing::debug!("Inserted system prompt");
        }

        let functions = get_function_definitions(self.state.table());

        tracing::debug!(
            message_count = conversation.len(),
            function_count = functions.len(),
            "Sending request to LLM"
        );

        let response = self
            .client
            .complete(conversation.messages(), &functions, FunctionCallMode::Auto)
            .await?;

        let requests_function = response.requests_function();
        let call = match response.function_call {
            Some(call) if requests_function => call,
            _ => {
                conversation.add_assistant(response.content);
                tracing::info!(
                    total_duration_ms = start.elapsed().as_millis(),
                    "Answered without a function call"
                );
                return Ok(());
            }
        };

        tracing::info!("Model called function={} with args={}", call.name, call.arguments);

        if call.name != RUN_SQL_QUERY {
            conversation.add_assistant(UNKNOWN_FUNCTION_REPLY);
            return Ok(());
        }

        let input = RunSqlQueryInput::parse(&call.arguments);
        conversation.add(Message::assistant_function_call(call));

        let result = self.run_sql_query(&input.query).await;
        conversation.add(Message::function(RUN_SQL_QUERY, result));

        let final_response = self
            .client
            .complete(conversation.messages(), &functions, FunctionCallMode::None)
            .await?;
        conversation.add_assistant(final_response.content);

        tracing::info!(
            total_duration_ms = start.elapsed().as_millis(),
            "Answered with a function call"
        );

        Ok(())
    }

    /// Runs model-proposed SQL and returns the JSON text sent back to the model.
    ///
    /// Never fails: problems are reported as `{"error": "..."}`.
    pub async fn run_sql_query(&self, sql: &str) -> String {
        tracing::info!("Running local SQL:\n{}", sql);

        if sql.trim().is_empty() {
            return error_json("No SQL query provided");
        }

        if !self.agent.allow_writes {
            let classification = self.classifier.classify(sql);
            if classification.level.is_unverified() {
                // The connection is read-only in this mode; SQLite has the final say.
                tracing::warn!(
                    warning = classification.warning.as_deref().unwrap_or_default(),
                    "Could not classify SQL, running it on the read-only connection"
                );
            } else if !classification.is_read_only() {
                tracing::warn!(
                    level = %classification.level,
                    statement = %classification.statement_type,
                    "Rejected SQL"
                );
                let mut message = format!(
                    "Only read-only queries are allowed; got {} ({}).",
                    classification.statement_type, classification.level
                );
                if let Some(warning) = classification.warning {
                    message.push(' ');
                    message.push_str(&warning);
                }
                return error_json(&message);
            }
        }

        match self.state.db.execute_query(sql).await {
            Ok(result) => {
                if let Some(warning) = result.truncation_warning() {
                    tracing::warn!("{}", warning);
                }
                tracing::debug!(
                    rows = result.rows.len(),
                    columns = %result.describe_columns(),
                    duration_ms = result.elapsed.as_millis(),
                    "SQL executed"
                );
                result.rows_as_json().to_string()
            }
            Err(e) => {
                tracing::error!("SQL error: {}", e);
                error_json(&e.to_string())
            }
        }
    }
}

fn error_json(message: &str) -> String {
    json!({ "error": message }).to_string()
}

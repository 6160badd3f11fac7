//! Interactive terminal chat.
//!
//! A line-oriented session over any async reader and writer: questions go
//! through the [`LlmService`], slash commands manage the conversation.

mod command;

pub use command::{Command, HELP_TEXT};

use crossterm::style::{Color, Stylize};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};

use crate::error::{AppError, Result};
use crate::llm::{Conversation, LlmService, Message, Role};

/// Title printed when the session starts.
pub const TITLE: &str = "Virtual Assistant";

/// Default input prompt.
pub const DEFAULT_PROMPT: &str = "Ask me something about your data:";

/// Whether the session should keep reading input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Quit,
}

/// A chat session bound to one reader and one writer.
pub struct ChatSession<R, W> {
    service: LlmService,
    conversation: Conversation,
    reader: R,
    writer: W,
    prompt: String,
    color: bool,
}

impl<R, W> ChatSession<R, W>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    pub fn new(service: LlmService, reader: R, writer: W) -> Self {
        Self {
            service,
            conversation: Conversation::new(),
            reader,
            writer,
            prompt: DEFAULT_PROMPT.to_string(),
            color: false,
        }
    }

    /// Enables ANSI colours on labels.
    pub fn with_color(mut self, color: bool) -> Self {
        self.color = color;
        self
    }

    /// Replaces the input prompt.
    pub fn with_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.prompt = prompt.into();
        self
    }

    pub fn conversation(&self) -> &Conversation {
        &self.conversation
    }

    /// Consumes the session, returning the writer.
    pub fn into_writer(self) -> W {
        self.writer
    }

    /// Reads and answers lines until `/quit` or end of input.
    pub async fn run(&mut self) -> Result<()> {
        let title = self.styled(TITLE, Color::Cyan);
        self.write_line(&title).await?;
        self.write_line("Type /help for commands.").await?;

        loop {
            let prompt = format!("\n{} ", self.styled(&self.prompt, Color::Yellow));
            self.write(&prompt).await?;

            let mut line = String::new();
            let read = self
                .reader
                .read_line(&mut line)
                .await
                .map_err(|e| AppError::internal(format!("Failed to read input: {e}")))?;

            if read == 0 {
                self.write_line("").await?;
                tracing::info!("Input closed; ending chat session");
                break;
            }

            if self.handle_line(&line).await? == Flow::Quit {
                break;
            }
        }

        Ok(())
    }

    /// Handles one line of input.
    pub async fn handle_line(&mut self, line: &str) -> Result<Flow> {
        match Command::parse(line) {
            Command::Empty => {}
            Command::Question(question) => self.ask(question).await?,
            Command::History => self.print_history().await?,
            Command::Clear => {
                self.conversation.clear();
                self.write_line("Conversation cleared.").await?;
            }
            Command::Schema => {
                let schema = self.service.state().schema.format_for_display();
                self.write_line(schema.trim_end()).await?;
            }
            Command::Help => self.write_line(HELP_TEXT).await?,
            Command::Quit => return Ok(Flow::Quit),
            Command::Unknown(command) => {
                self.write_line(&format!(
                    "Unknown command: {command}. Type /help for commands."
                ))
                .await?;
            }
        }

        Ok(Flow::Continue)
    }

    async fn ask(&mut self, question: String) -> Result<()> {
        self.conversation.add_user(question);
        let had_system = self.conversation.has_system();
        let before = self.conversation.len();

        let outcome = self
            .service
            .process_user_query(&mut self.conversation)
            .await;

        // A freshly inserted system prompt shifts every earlier message by one.
        let offset = before + usize::from(!had_system && self.conversation.has_system());
        let replies: Vec<String> = self
            .conversation
            .messages()
            .iter()
            .skip(offset)
            .filter(|m| is_visible(m) && m.role == Role::Assistant)
            .map(|m| m.text().to_string())
            .collect();

        for reply in replies {
            let label = self.styled("Assistant:", Color::Green);
            self.write_line(&format!("{label} {reply}")).await?;
        }

        if let Err(e) = outcome {
            tracing::error!("{}: {}", e.category(), e);
            let label = self.styled("An error occurred:", Color::Red);
            self.write_line(&format!("{label} {e}")).await?;
        }

        Ok(())
    }

    async fn print_history(&mut self) -> Result<()> {
        let lines: Vec<String> = self
            .conversation
            .messages()
            .iter()
            .rev()
            .filter(|m| is_visible(m))
            .map(|m| {
                let label = match m.role {
                    Role::User => self.styled("You:", Color::Blue),
                    _ => self.styled("Assistant:", Color::Green),
                };
                format!("{label} {}", m.text())
            })
            .collect();

        if lines.is_empty() {
            return self.write_line("No messages yet.").await;
        }

        self.write_line("Conversation history (newest first):").await?;
        for line in lines {
            self.write_line(&line).await?;
        }
        Ok(())
    }

    fn styled(&self, text: &str, color: Color) -> String {
        if self.color {
            text.with(color).bold().to_string()
        } else {
            text.to_string()
        }
    }

    async fn write(&mut self, text: &str) -> Result<()> {
        self.writer
            .write_all(text.as_bytes())
            .await
            .map_err(|e| AppError::internal(format!("Failed to write output: {e}")))?;
        self.writer
            .flush()
            .await
            .map_err(|e| AppError::internal(format!("Failed to write output: {e}")))
    }

    async fn write_line(&mut self, text: &str) -> Result<()> {
        self.write(&format!("{text}\n")).await
    }
}

/// User and assistant text messages; system prompts, function calls and
/// function results stay hidden.
fn is_visible(message: &Message) -> bool {
    matches!(message.role, Role::User | Role::Assistant) && !message.is_function_call()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::BackendState;
    use crate::config::{AgentConfig, PromptConfig};
    use crate::db::{Column, SqliteClient, TableSchema};
    use crate::llm::{FunctionCall, LlmResponse, MockLlmClient};
    use crate::profile::DistinctValues;
    use pretty_assertions::assert_eq;
    use sqlx::sqlite::SqlitePoolOptions;
    use std::collections::HashMap;
    use std::sync::Arc;

    async fn service(client: MockLlmClient) -> LlmService {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap();
        sqlx::query("CREATE TABLE scores (agency TEXT, score REAL)")
            .execute(&pool)
            .await
            .unwrap();
        sqlx::query("INSERT INTO scores VALUES ('North', 4.0), ('South', 2.0)")
            .execute(&pool)
            .await
            .unwrap();

        let schema = TableSchema::new("scores")
            .with_column(Column::new("agency", "TEXT"))
            .with_column(Column::new("score", "REAL"));
        let state = BackendState::new(
            Arc::new(SqliteClient::from_pool(pool)),
            schema,
            HashMap::new(),
            DistinctValues::new(),
        );

        LlmService::with_settings(
            Box::new(client),
            Arc::new(state),
            PromptConfig::default(),
            AgentConfig::default(),
        )
    }

    async fn run_session(client: MockLlmClient, input: &str) -> (String, Conversation) {
        let mut session = ChatSession::new(service(client).await, input.as_bytes(), Vec::new());
        session.run().await.unwrap();
        let conversation = session.conversation().clone();
        let output = String::from_utf8(session.into_writer()).unwrap();
        (output, conversation)
    }

    #[test]
    fn test_is_visible() {
        assert!(is_visible(&Message::user("hi")));
        assert!(is_visible(&Message::assistant("hello")));
        assert!(!is_visible(&Message::system("prompt")));
        assert!(!is_visible(&Message::function("run_sql_query", "[]")));
        assert!(!is_visible(&Message::assistant_function_call(FunctionCall {
            name: "run_sql_query".to_string(),
            arguments: "{}".to_string(),
        })));
    }

    #[tokio::test]
    async fn test_session_answers_and_quits() {
        let client = MockLlmClient::new().with_response(LlmResponse::text("Two agencies."));
        let (output, conversation) =
            run_session(client, "How many agencies?\n/quit\nignored\n").await;

        assert!(output.starts_with("Virtual Assistant\n"));
        assert!(output.contains("Ask me something about your data:"));
        assert!(output.contains("Assistant: Two agencies.\n"));
        assert!(!output.contains("ignored"));
        assert_eq!(conversation.len(), 3);
    }

    #[tokio::test]
    async fn test_session_prints_reply_after_function_call() {
        let (output, conversation) =
            run_session(MockLlmClient::new(), "sql: SELECT COUNT(*) FROM scores\n").await;

        assert!(output.contains("Assistant: Here is what the data shows: [[2]]\n"));
        assert_eq!(output.matches("Assistant:").count(), 1);
        assert_eq!(conversation.len(), 5);
    }

    #[tokio::test]
    async fn test_history_newest_first() {
        let client = MockLlmClient::new()
            .with_response(LlmResponse::text("first answer"))
            .with_response(LlmResponse::text("second answer"));
        let (output, _) =
            run_session(client, "first question\nsecond question\n/history\n").await;

        let history = output
            .split("Conversation history (newest first):\n")
            .nth(1)
            .unwrap();
        let lines: Vec<&str> = history.lines().take(4).collect();
        assert_eq!(
            lines,
            vec![
                "Assistant: second answer",
                "You: second question",
                "Assistant: first answer",
                "You: first question",
            ]
        );
    }

    #[tokio::test]
    async fn test_clear_and_empty_history() {
        let client = MockLlmClient::new().with_response(LlmResponse::text("ok"));
        let (output, conversation) = run_session(client, "hello\n/clear\n/history\n").await;

        assert!(output.contains("Conversation cleared."));
        assert!(output.contains("No messages yet."));
        assert!(conversation.is_empty());
    }

    #[tokio::test]
    async fn test_schema_help_and_unknown_commands() {
        let (output, _) = run_session(MockLlmClient::new(), "/schema\n/help\n/vim\n").await;

        assert!(output.contains("Table: scores"));
        assert!(output.contains("  - agency: TEXT"));
        assert!(output.contains("/history   Show the conversation, newest first"));
        assert!(output.contains("Unknown command: /vim. Type /help for commands."));
    }

    #[tokio::test]
    async fn test_colored_labels() {
        let client = MockLlmClient::new().with_response(LlmResponse::text("hi"));
        let mut session =
            ChatSession::new(service(client).await, "hello\n".as_bytes(), Vec::new()).with_color(true);
        session.run().await.unwrap();

        let output = String::from_utf8(session.into_writer()).unwrap();
        assert!(output.contains("\u{1b}["));
    }
}

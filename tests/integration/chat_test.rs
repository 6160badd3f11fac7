//! Terminal chat session driven through in-memory input.

use super::survey_config;
use std::sync::Arc;
use table_talk::backend::initialize_backend;
use table_talk::chat::{ChatSession, DEFAULT_PROMPT};
use table_talk::llm::{LlmService, MockLlmClient};

#[tokio::test]
async fn test_chat_session_over_spreadsheet() {
    let dir = tempfile::tempdir().unwrap();
    let config = survey_config(dir.path());
    let state = Arc::new(initialize_backend(&config).await.unwrap());
    let service = LlmService::new(Box::new(MockLlmClient::new()), state, &config);

    let input = "sql: SELECT COUNT(DISTINCT agency) FROM public_scores\n/history\n/quit\n";
    let mut session = ChatSession::new(service, input.as_bytes(), Vec::new());
    session.run().await.unwrap();

    let output = String::from_utf8(session.into_writer()).unwrap();
    assert!(output.contains("Assistant: Here is what the data shows: [[3]]"));
    assert!(output.contains("Conversation history (newest first):"));
    assert!(output.contains("You: sql: SELECT COUNT(DISTINCT agency) FROM public_scores"));
    assert!(!output.contains("run_sql_query"));
}

#[tokio::test]
async fn test_chat_prompt_from_config() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = survey_config(dir.path());
    config.chat.prompt = "Question:".to_string();
    let state = Arc::new(initialize_backend(&config).await.unwrap());
    let service = LlmService::new(Box::new(MockLlmClient::new()), state, &config);

    let mut session = ChatSession::new(service, "/quit\n".as_bytes(), Vec::new())
        .with_prompt(config.chat.prompt.clone());
    session.run().await.unwrap();

    let output = String::from_utf8(session.into_writer()).unwrap();
    assert!(output.contains("\nQuestion: "));
    assert!(!output.contains(DEFAULT_PROMPT));
}

//! End-to-end question handling against an imported spreadsheet.

use super::survey_config;
use std::sync::Arc;
use table_talk::backend::initialize_backend;
use table_talk::llm::{
    Conversation, FunctionCallMode, LlmResponse, LlmService, MockLlmClient, Role, RUN_SQL_QUERY,
};

#[tokio::test]
async fn test_question_grounded_in_sql() {
    let dir = tempfile::tempdir().unwrap();
    let config = survey_config(dir.path());
    let state = Arc::new(initialize_backend(&config).await.unwrap());

    let client = Arc::new(
        MockLlmClient::new()
            .with_response(LlmResponse::function_call(
                RUN_SQL_QUERY,
                r#"{"query": "SELECT agency FROM public_scores ORDER BY score LIMIT 1"}"#,
            ))
            .with_response(LlmResponse::text("South scored lowest.")),
    );
    let service = LlmService::new(Box::new(Arc::clone(&client)), state, &config);

    let mut conversation = Conversation::new();
    conversation.add_user("Which agency scored lowest?");
    service.process_user_query(&mut conversation).await.unwrap();

    let roles: Vec<Role> = conversation.messages().iter().map(|m| m.role).collect();
    assert_eq!(
        roles,
        vec![
            Role::System,
            Role::User,
            Role::Assistant,
            Role::Function,
            Role::Assistant,
        ]
    );
    assert_eq!(conversation.messages()[3].text(), r#"[["South"]]"#);
    assert_eq!(conversation.last().unwrap().text(), "South scored lowest.");

    let requests = client.requests();
    assert_eq!(requests.len(), 2);
    assert_eq!(requests[0].mode, FunctionCallMode::Auto);
    assert_eq!(requests[1].mode, FunctionCallMode::None);
    assert_eq!(requests[0].function_names, vec![RUN_SQL_QUERY.to_string()]);

    let system = requests[0].messages[0].text();
    assert!(system.contains("'public_scores'"));
    assert!(system.contains("- **agency** (No desc): e.g."));
    assert!(!system.contains("comment"));
}

#[tokio::test]
async fn test_write_statement_is_refused() {
    let dir = tempfile::tempdir().unwrap();
    let config = survey_config(dir.path());
    let state = Arc::new(initialize_backend(&config).await.unwrap());
    let service = LlmService::new(Box::new(MockLlmClient::new()), Arc::clone(&state), &config);

    let reply: serde_json::Value =
        serde_json::from_str(&service.run_sql_query("DROP TABLE public_scores").await).unwrap();
    assert_eq!(
        reply["error"],
        "Only read-only queries are allowed; got DROP (destructive)."
    );

    let count = service
        .run_sql_query("SELECT COUNT(*) FROM public_scores")
        .await;
    assert_eq!(count, "[[4]]");
}

#[tokio::test]
async fn test_query_error_is_returned_to_model() {
    let dir = tempfile::tempdir().unwrap();
    let config = survey_config(dir.path());
    let state = Arc::new(initialize_backend(&config).await.unwrap());
    let service = LlmService::new(Box::new(MockLlmClient::new()), state, &config);

    let mut conversation = Conversation::new();
    conversation.add_user("sql: SELECT nope FROM public_scores");
    service.process_user_query(&mut conversation).await.unwrap();

    let function_result: serde_json::Value =
        serde_json::from_str(conversation.messages()[3].text()).unwrap();
    assert!(function_result["error"]
        .as_str()
        .unwrap()
        .contains("nope"));
    assert!(conversation
        .last()
        .unwrap()
        .text()
        .starts_with("Here is what the data shows:"));
}

#[tokio::test]
async fn test_glob_query_reaches_the_database() {
    let dir = tempfile::tempdir().unwrap();
    let config = survey_config(dir.path());
    let state = Arc::new(initialize_backend(&config).await.unwrap());

    let client = MockLlmClient::new()
        .with_response(LlmResponse::function_call(
            RUN_SQL_QUERY,
            r#"{"query": "SELECT agency FROM public_scores WHERE agency GLOB 'N*'"}"#,
        ))
        .with_response(LlmResponse::text("North has two ratings."));
    let service = LlmService::new(Box::new(client), state, &config);

    let mut conversation = Conversation::new();
    conversation.add_user("Which agencies start with N?");
    service.process_user_query(&mut conversation).await.unwrap();

    assert_eq!(conversation.messages()[3].text(), r#"[["North"],["North"]]"#);
}

#[tokio::test]
async fn test_unclassified_write_is_stopped_by_read_only_connection() {
    let dir = tempfile::tempdir().unwrap();
    let config = survey_config(dir.path());
    let state = Arc::new(initialize_backend(&config).await.unwrap());
    let service = LlmService::new(Box::new(MockLlmClient::new()), state, &config);

    let reply: serde_json::Value = serde_json::from_str(
        &service
            .run_sql_query("DELETE FROM public_scores WHERE agency GLOB 'N*'")
            .await,
    )
    .unwrap();
    assert!(reply["error"].is_string());

    let count = service
        .run_sql_query("SELECT COUNT(*) FROM public_scores")
        .await;
    assert_eq!(count, "[[4]]");
}

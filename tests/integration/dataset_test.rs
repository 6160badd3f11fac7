//! Spreadsheet import and table reflection tests.

use std::path::{Path, PathBuf};

use super::survey_config;
use table_talk::backend::initialize_backend;
use table_talk::dataset::{
    ensure_database, read_spreadsheet, rebuild_database, Cell, DatabaseStatus,
};
use table_talk::db::{DatabaseClient, SqliteClient, Value};

#[tokio::test]
async fn test_import_creates_typed_table() {
    let dir = tempfile::tempdir().unwrap();
    let config = survey_config(dir.path());

    let status = ensure_database(&config.dataset).await.unwrap();
    assert_eq!(status, DatabaseStatus::Created(4));
    assert!(config.dataset.db_path().exists());

    let client = SqliteClient::open(&config.dataset.db_path(), true)
        .await
        .unwrap();
    let schema = client.introspect_table("public_scores").await.unwrap();

    let types: Vec<(&str, &str)> = schema
        .columns
        .iter()
        .map(|c| (c.name.as_str(), c.data_type.as_str()))
        .collect();
    assert_eq!(
        types,
        vec![
            ("agency", "TEXT"),
            ("region", "TEXT"),
            ("score", "REAL"),
            ("comment", "TEXT"),
        ]
    );

    let result = client
        .execute_query("SELECT score FROM public_scores WHERE agency = 'East'")
        .await
        .unwrap();
    assert_eq!(result.rows, vec![vec![Value::Real(3.5)]]);

    client.close().await.unwrap();
}

#[tokio::test]
async fn test_existing_database_is_reused() {
    let dir = tempfile::tempdir().unwrap();
    let config = survey_config(dir.path());

    ensure_database(&config.dataset).await.unwrap();

    // A changed spreadsheet is ignored until the database is rebuilt.
    std::fs::write(dir.path().join("survey.csv"), "agency,score\nWest,1\n").unwrap();
    let status = ensure_database(&config.dataset).await.unwrap();
    assert_eq!(status, DatabaseStatus::Existing);

    let rows = rebuild_database(&config.dataset).await.unwrap();
    assert_eq!(rows, 1);
}

#[tokio::test]
async fn test_missing_spreadsheet_is_dataset_error() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = survey_config(dir.path());
    config.dataset.spreadsheet = Some("missing.xlsx".to_string());

    let err = ensure_database(&config.dataset).await.unwrap_err();
    assert_eq!(err.category(), "Dataset Error");
    assert!(!config.dataset.db_path().exists());
}

#[tokio::test]
async fn test_backend_reflects_included_columns_only() {
    let dir = tempfile::tempdir().unwrap();
    let config = survey_config(dir.path());

    let state = initialize_backend(&config).await.unwrap();

    assert_eq!(state.schema.column_names(), vec!["agency", "region", "score"]);
    assert!(!state.schema.has_column("comment"));

    let mut agencies: Vec<String> = state
        .distinct("agency")
        .iter()
        .map(Value::to_string)
        .collect();
    agencies.sort();
    assert_eq!(agencies, vec!["East", "North", "South"]);
    assert_eq!(state.distinct("region").len(), 3);
    assert!(state.distinct("score").is_empty());
}

#[tokio::test]
async fn test_backend_connection_is_read_only() {
    let dir = tempfile::tempdir().unwrap();
    let config = survey_config(dir.path());

    let state = initialize_backend(&config).await.unwrap();
    let err = state
        .db
        .execute_query("DELETE FROM public_scores")
        .await
        .unwrap_err();
    assert_eq!(err.category(), "Query Error");

    let result = state
        .db
        .execute_query("SELECT COUNT(*) FROM public_scores")
        .await
        .unwrap();
    assert_eq!(result.rows, vec![vec![Value::Integer(4)]]);
}

fn fixture(name: &str) -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(name)
}

#[test]
fn test_read_workbook_first_sheet() {
    let sheet = read_spreadsheet(&fixture("survey.xlsx")).unwrap();

    assert_eq!(sheet.headers, vec!["agency", "score", "year", "surveyed_on"]);
    assert_eq!(
        sheet.rows,
        vec![
            vec![
                Cell::Text("North".to_string()),
                Cell::Float(4.5),
                Cell::Float(2023.0),
                Cell::Text("2023-07-15 00:00:00".to_string()),
            ],
            vec![
                Cell::Text("South".to_string()),
                Cell::Float(2.0),
                Cell::Float(2024.0),
                Cell::Text("2023-10-01 12:00:00".to_string()),
            ],
            vec![
                Cell::Text("East".to_string()),
                Cell::Float(3.0),
                Cell::Float(2024.0),
                Cell::Empty,
            ],
        ]
    );
}

#[tokio::test]
async fn test_import_workbook_keeps_dates_as_text() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::copy(fixture("survey.xlsx"), dir.path().join("survey.xlsx")).unwrap();

    let mut config = survey_config(dir.path());
    config.dataset.spreadsheet = Some("survey.xlsx".to_string());
    config.dataset.included_columns.clear();

    let status = ensure_database(&config.dataset).await.unwrap();
    assert_eq!(status, DatabaseStatus::Created(3));

    let client = SqliteClient::open(&config.dataset.db_path(), true)
        .await
        .unwrap();
    let schema = client.introspect_table("public_scores").await.unwrap();
    let types: Vec<(&str, &str)> = schema
        .columns
        .iter()
        .map(|c| (c.name.as_str(), c.data_type.as_str()))
        .collect();
    assert_eq!(
        types,
        vec![
            ("agency", "TEXT"),
            ("score", "REAL"),
            ("year", "INTEGER"),
            ("surveyed_on", "TEXT"),
        ]
    );

    let result = client
        .execute_query(
            "SELECT agency, year FROM public_scores \
             WHERE date(surveyed_on) >= '2023-09-01' ORDER BY agency",
        )
        .await
        .unwrap();
    assert_eq!(
        result.rows,
        vec![vec![Value::from("South"), Value::Integer(2024)]]
    );

    client.close().await.unwrap();
}

#[tokio::test]
async fn test_import_headers_differing_only_in_case() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = survey_config(dir.path());
    std::fs::write(dir.path().join("cased.csv"), "Score,score\n1,2\n").unwrap();
    config.dataset.spreadsheet = Some("cased.csv".to_string());

    let status = ensure_database(&config.dataset).await.unwrap();
    assert_eq!(status, DatabaseStatus::Created(1));

    let client = SqliteClient::open(&config.dataset.db_path(), true)
        .await
        .unwrap();
    let schema = client.introspect_table("public_scores").await.unwrap();
    assert_eq!(schema.column_names(), vec!["Score", "score.1"]);

    let result = client
        .execute_query("SELECT \"Score\", \"score.1\" FROM public_scores")
        .await
        .unwrap();
    assert_eq!(result.rows, vec![vec![Value::Integer(1), Value::Integer(2)]]);

    client.close().await.unwrap();
}

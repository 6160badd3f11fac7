//! Shared backend state.
//!
//! Everything a conversation turn needs that is computed once at startup:
//! the database handle, the reflected table, column descriptions and the
//! sampled distinct values.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::info;

use crate::config::{ColumnMetadata, Config};
use crate::dataset;
use crate::db::{reflect_table, DatabaseClient, SqliteClient, TableSchema, Value};
use crate::error::Result;
use crate::profile::{collect_distinct_values, DistinctValues};

/// State shared by every conversation turn.
pub struct BackendState {
    pub db: Arc<dyn DatabaseClient>,
    pub schema: TableSchema,
    pub column_metadata: HashMap<String, ColumnMetadata>,
    pub distinct_values: DistinctValues,
}

impl BackendState {
    pub fn new(
        db: Arc<dyn DatabaseClient>,
        schema: TableSchema,
        column_metadata: HashMap<String, ColumnMetadata>,
        distinct_values: DistinctValues,
    ) -> Self {
        Self {
            db,
            schema,
            column_metadata,
            distinct_values,
        }
    }

    /// Name of the dataset table.
    pub fn table(&self) -> &str {
        &self.schema.name
    }

    /// Configured description of a column.
    pub fn description(&self, column: &str) -> Option<&str> {
        self.column_metadata
            .get(column)
            .and_then(|meta| meta.description.as_deref())
    }

    /// Sampled distinct values of a column; empty when none were sampled.
    pub fn distinct(&self, column: &str) -> &[Value] {
        self.distinct_values
            .get(column)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }
}

impl std::fmt::Debug for BackendState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BackendState")
            .field("schema", &self.schema)
            .field("column_metadata", &self.column_metadata)
            .field("distinct_values", &self.distinct_values.len())
            .finish_non_exhaustive()
    }
}

/// Builds the backend: creates the SQLite file if needed, connects,
/// partially reflects the table and samples distinct values.
pub async fn initialize_backend(config: &Config) -> Result<BackendState> {
    info!("Initializing backend (DB, LLM).");
    let dataset_config = &config.dataset;
    dataset_config.validate()?;

    dataset::ensure_database(dataset_config).await?;

    let db_path = dataset_config.db_path();
    let client = SqliteClient::open(&db_path, !config.agent.allow_writes)
        .await?
        .with_max_rows(config.agent.max_result_rows);
    let db: Arc<dyn DatabaseClient> = Arc::new(client);

    let schema = reflect_table(
        db.as_ref(),
        &dataset_config.table,
        &dataset_config.included_columns,
    )
    .await?;
    info!(
        "Connected to DB at {}, table '{}' partially reflected",
        db_path.display(),
        schema.name
    );

    let distinct_values = collect_distinct_values(
        db.as_ref(),
        &schema,
        &dataset_config.distinct_value_columns,
    )
    .await;

    Ok(BackendState::new(
        db,
        schema,
        dataset_config.columns.clone(),
        distinct_values,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DatasetConfig;
    use pretty_assertions::assert_eq;

    #[tokio::test]
    async fn test_initialize_backend_from_csv() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("survey.csv"),
            "agency,region,score,comment\nNorth,EMEA,4,ok\nSouth,APAC,2,late\nNorth,EMEA,5,\n",
        )
        .unwrap();

        let mut columns = HashMap::new();
        columns.insert(
            "agency".to_string(),
            ColumnMetadata {
                description: Some("Agency name".to_string()),
            },
        );

        let config = Config {
            dataset: DatasetConfig {
                data_dir: dir.path().to_path_buf(),
                db_file: "survey.db".to_string(),
                spreadsheet: Some("survey.csv".to_string()),
                table: "public_scores".to_string(),
                included_columns: vec![
                    "agency".to_string(),
                    "region".to_string(),
                    "score".to_string(),
                ],
                distinct_value_columns: vec!["agency".to_string(), "comment".to_string()],
                columns,
            },
            ..Config::default()
        };

        let state = initialize_backend(&config).await.unwrap();

        assert_eq!(state.table(), "public_scores");
        assert_eq!(state.schema.column_names(), vec!["agency", "region", "score"]);
        assert_eq!(state.description("agency"), Some("Agency name"));
        assert_eq!(state.description("score"), None);
        assert_eq!(state.distinct("agency").len(), 2);
        assert!(state.distinct("comment").is_empty());
        assert!(state.distinct("unknown").is_empty());
    }

    #[tokio::test]
    async fn test_initialize_backend_requires_table() {
        let err = initialize_backend(&Config::default()).await.unwrap_err();
        assert_eq!(err.category(), "Configuration Error");
    }
}

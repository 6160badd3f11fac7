//! Integration tests for table-talk.

pub mod chat_test;
pub mod dataset_test;
pub mod service_test;

use std::path::Path;
use table_talk::config::{Config, DatasetConfig};

/// Sample survey used across the integration tests.
pub const SURVEY_CSV: &str = "\
agency,region,score,comment
North,EMEA,4,on time
South,APAC,2,late
North,EMEA,5,
East,AMER,3.5,ok
";

/// Writes the sample survey into `dir` and returns a config pointing at it.
pub fn survey_config(dir: &Path) -> Config {
    std::fs::write(dir.join("survey.csv"), SURVEY_CSV).unwrap();

    Config {
        dataset: DatasetConfig {
            data_dir: dir.to_path_buf(),
            db_file: "survey.db".to_string(),
            spreadsheet: Some("survey.csv".to_string()),
            table: "public_scores".to_string(),
            included_columns: vec![
                "agency".to_string(),
                "region".to_string(),
                "score".to_string(),
            ],
            distinct_value_columns: vec!["agency".to_string(), "region".to_string()],
            ..DatasetConfig::default()
        },
        ..Config::default()
    }
}

//! LLM function definitions for function calling.
//!
//! The model gets a single function, `run_sql_query`, scoped to the dataset
//! table.

use serde::{Deserialize, Serialize};

/// Name of the SQL function offered to the model.
pub const RUN_SQL_QUERY: &str = "run_sql_query";

/// Function definition for LLM function calling.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionDefinition {
    pub name: String,
    pub description: String,
    pub parameters: serde_json::Value,
}

/// Arguments of the `run_sql_query` function.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RunSqlQueryInput {
    #[serde(default)]
    pub query: String,
}

impl RunSqlQueryInput {
    /// Parses the model's JSON arguments. Malformed arguments yield an empty query.
    pub fn parse(arguments: &str) -> Self {
        serde_json::from_str(arguments).unwrap_or_default()
    }
}

/// Returns the `run_sql_query` definition for the given table.
pub fn run_sql_query_definition(table: &str) -> FunctionDefinition {
    FunctionDefinition {
        name: RUN_SQL_QUERY.to_string(),
        description: format!(
            "Execute a SQL query on the '{table}' table and return rows as JSON."
        ),
        parameters: serde_json::json!({
            "type": "object",
            "properties": {
                "query": {
                    "type": "string",
                    "description": format!("Valid SQL, e.g. SELECT * FROM {table} WHERE ...;")
                }
            },
            "required": ["query"]
        }),
    }
}

/// Returns every function definition offered to the model.
pub fn get_function_definitions(table: &str) -> Vec<FunctionDefinition> {
    vec![run_sql_query_definition(table)]
}

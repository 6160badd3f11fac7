//! Prompt construction for LLM requests.
//!
//! Builds the system prompt from the reflected columns, their descriptions
//! and sampled distinct values.

use crate::backend::BackendState;
use crate::config::PromptConfig;

/// Builds the column overview: one line per reflected column with its
/// description and up to `sample_limit` distinct values.
pub fn build_schema_prompt(state: &BackendState, sample_limit: usize) -> String {
    state
        .schema
        .columns
        .iter()
        .map(|column| {
            let description = state.description(&column.name).unwrap_or("No desc");
            let samples = state
                .distinct(&column.name)
                .iter()
                .take(sample_limit)
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join(", ");
            format!("- **{}** ({}): e.g. {}", column.name, description, samples)
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Builds the system prompt that opens every conversation.
pub fn build_system_prompt(state: &BackendState, config: &PromptConfig) -> String {
    let mut sections = vec![
        format!("You are an expert data assistant for '{}'.", state.table()),
        format!(
            "Columns and sample distinct values:\n{}",
            build_schema_prompt(state, config.sample_limit)
        ),
    ];

    sections.extend(
        config
            .guidance
            .iter()
            .map(|line| line.trim())
            .filter(|line| !line.is_empty())
            .map(str::to_string),
    );

    sections.push(
        "If user references a known value (like a name that appears in the samples above), \
         check which column has that value before filtering on it."
            .to_string(),
    );
    sections.push(
        "NEVER say 'I cannot run queries'; you can call run_sql_query if needed.".to_string(),
    );

    sections.join("\n\n")
}

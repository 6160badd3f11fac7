//! Distinct-value sampling.
//!
//! Collects the unique values of selected columns so the system prompt can
//! show the model what the data actually looks like.

use std::collections::HashMap;

use tracing::{info, warn};

use crate::db::{DatabaseClient, TableSchema, Value};

/// Distinct non-null values per column.
pub type DistinctValues = HashMap<String, Vec<Value>>;

/// Collects distinct values for each of `columns`.
///
/// Never fails as a whole: a column missing from the reflected schema, or
/// one whose query errors, is logged and maps to an empty list.
pub async fn collect_distinct_values(
    db: &dyn DatabaseClient,
    schema: &TableSchema,
    columns: &[String],
) -> DistinctValues {
    let mut distinct = DistinctValues::with_capacity(columns.len());

    for column in columns {
        if !schema.has_column(column) {
            warn!(
                "Cannot retrieve distinct for column '{}': not in reflected table '{}'",
                column, schema.name
            );
            distinct.insert(column.clone(), Vec::new());
            continue;
        }

        let values = match db.distinct_values(&schema.name, column).await {
            Ok(values) => values,
            Err(e) => {
                warn!("Cannot retrieve distinct for column '{}': {}", column, e);
                Vec::new()
            }
        };

        info!(column = %column, count = values.len(), "Sampled distinct values");
        distinct.insert(column.clone(), values);
    }

    distinct
}

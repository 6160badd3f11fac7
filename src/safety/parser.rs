//! SQL parsing and classification logic.
//!
//! Uses sqlparser-rs with the SQLite dialect to parse SQL and classify
//! statements by their safety level.

use sqlparser::ast::{Query, SetExpr, Statement};
use sqlparser::dialect::SQLiteDialect;
use sqlparser::parser::Parser;

use super::{ClassificationResult, SafetyLevel, StatementType};

/// SQL classifier that parses and classifies SQL queries.
#[derive(Debug)]
pub struct SqlClassifier {
    dialect: SQLiteDialect,
}

impl Default for SqlClassifier {
    fn default() -> Self {
        Self::new()
    }
}

impl SqlClassifier {
    /// Creates a new SQL classifier.
    pub fn new() -> Self {
        Self {
            dialect: SQLiteDialect {},
        }
    }

    /// Classifies a SQL string.
    ///
    /// SQL that cannot be parsed is unverified: the SQLite dialect of
    /// sqlparser misses some syntax SQLite itself accepts.
    pub fn classify(&self, sql: &str) -> ClassificationResult {
        let statements = match Parser::parse_sql(&self.dialect, sql) {
            Ok(statements) => statements,
            Err(e) => {
                return ClassificationResult::with_warning(
                    SafetyLevel::Unverified,
                    StatementType::Unknown,
                    format!("Could not parse SQL: {e}"),
                );
            }
        };

        match statements.as_slice() {
            [] => ClassificationResult::with_warning(
                SafetyLevel::Destructive,
                StatementType::Unknown,
                "Empty SQL statement",
            ),
            [statement] => {
                let (level, stmt_type) = classify_statement(statement);
                ClassificationResult::new(level, stmt_type)
            }
            many => {
                let (level, stmt_type) = many
                    .iter()
                    .map(classify_statement)
                    .fold((SafetyLevel::Safe, StatementType::Select), most_dangerous);
                ClassificationResult::new(level, StatementType::Multiple(Box::new(stmt_type)))
            }
        }
    }
}

/// Convenience function to classify SQL without creating a classifier instance.
pub fn classify_sql(sql: &str) -> ClassificationResult {
    SqlClassifier::new().classify(sql)
}

type Verdict = (SafetyLevel, StatementType);

/// Keeps the earlier verdict on ties.
fn most_dangerous(current: Verdict, candidate: Verdict) -> Verdict {
    if candidate.0 > current.0 {
        candidate
    } else {
        current
    }
}

/// Classifies a single parsed statement.
fn classify_statement(statement: &Statement) -> Verdict {
    match statement {
        // Query: may contain data-modifying CTEs, so recurse
        Statement::Query(query) => classify_query(query),
        Statement::Explain {
            analyze, statement, ..
        } => {
            if *analyze {
                let (inner_level, _) = classify_statement(statement);
                (inner_level, StatementType::Explain)
            } else {
                (SafetyLevel::Safe, StatementType::Explain)
            }
        }

        Statement::Insert { .. } => (SafetyLevel::Mutating, StatementType::Insert),
        Statement::Update { .. } => (SafetyLevel::Mutating, StatementType::Update),

        Statement::Delete { .. } => (SafetyLevel::Destructive, StatementType::Delete),
        Statement::Drop { .. } => (SafetyLevel::Destructive, StatementType::Drop),
        Statement::AlterTable { .. } => (SafetyLevel::Destructive, StatementType::Alter),
        Statement::CreateTable { .. } => (SafetyLevel::Destructive, StatementType::Create),
        Statement::CreateIndex { .. } => (SafetyLevel::Destructive, StatementType::Create),
        Statement::CreateView { .. } => (SafetyLevel::Destructive, StatementType::Create),
        // PRAGMA can change connection state (journal_mode, writable_schema).
        Statement::Pragma { .. } => (SafetyLevel::Destructive, StatementType::Pragma),

        _ => (SafetyLevel::Destructive, StatementType::Unknown),
    }
}

/// Classifies a Query, including the statements inside its CTEs.
fn classify_query(query: &Query) -> Verdict {
    let ctes = query
        .with
        .iter()
        .flat_map(|with| with.cte_tables.iter())
        .map(|cte| classify_query(&cte.query));

    ctes.chain(std::iter::once(classify_set_expr(&query.body)))
        .fold((SafetyLevel::Safe, StatementType::Select), most_dangerous)
}

fn classify_set_expr(set_expr: &SetExpr) -> Verdict {
    match set_expr {
        SetExpr::Select(_) | SetExpr::Values(_) => (SafetyLevel::Safe, StatementType::Select),
        SetExpr::Query(query) => classify_query(query),
        SetExpr::SetOperation { left, right, .. } => {
            most_dangerous(classify_set_expr(left), classify_set_expr(right))
        }
        SetExpr::Insert(statement) | SetExpr::Update(statement) => classify_statement(statement),
        _ => (SafetyLevel::Destructive, StatementType::Unknown),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn assert_classification(sql: &str, expected_level: SafetyLevel, expected_type: StatementType) {
        let result = classify_sql(sql);
        assert_eq!(result.level, expected_level, "level for {sql}");
        assert_eq!(result.statement_type, expected_type, "type for {sql}");
    }

    #[test]
    fn test_select_is_safe() {
        assert_classification(
            "SELECT agency, AVG(score) FROM public_scores GROUP BY agency ORDER BY 2 LIMIT 1",
            SafetyLevel::Safe,
            StatementType::Select,
        );
    }

    #[test]
    fn test_select_with_subquery_is_safe() {
        assert_classification(
            "SELECT * FROM (SELECT agency FROM public_scores) AS t WHERE agency LIKE 'H%'",
            SafetyLevel::Safe,
            StatementType::Select,
        );
    }

    #[test]
    fn test_union_is_safe() {
        assert_classification(
            "SELECT agency FROM a UNION SELECT agency FROM b",
            SafetyLevel::Safe,
            StatementType::Select,
        );
    }

    #[test]
    fn test_cte_select_is_safe() {
        assert_classification(
            "WITH avgs AS (SELECT agency, AVG(score) AS s FROM t GROUP BY agency) \
             SELECT * FROM avgs ORDER BY s",
            SafetyLevel::Safe,
            StatementType::Select,
        );
    }

    #[test]
    fn test_explain_is_safe() {
        assert_classification(
            "EXPLAIN SELECT * FROM t",
            SafetyLevel::Safe,
            StatementType::Explain,
        );
    }

    #[test]
    fn test_insert_is_mutating() {
        assert_classification(
            "INSERT INTO t (agency) VALUES ('x')",
            SafetyLevel::Mutating,
            StatementType::Insert,
        );
    }

    #[test]
    fn test_update_is_mutating() {
        assert_classification(
            "UPDATE t SET score = 5 WHERE agency = 'x'",
            SafetyLevel::Mutating,
            StatementType::Update,
        );
    }

    #[test]
    fn test_delete_is_destructive() {
        assert_classification(
            "DELETE FROM t WHERE score < 2",
            SafetyLevel::Destructive,
            StatementType::Delete,
        );
    }

    #[test]
    fn test_drop_is_destructive() {
        assert_classification("DROP TABLE t", SafetyLevel::Destructive, StatementType::Drop);
    }

    #[test]
    fn test_create_table_is_destructive() {
        assert_classification(
            "CREATE TABLE x (id INTEGER)",
            SafetyLevel::Destructive,
            StatementType::Create,
        );
    }

    #[test]
    fn test_multiple_statements_use_most_dangerous() {
        assert_classification(
            "SELECT 1; DELETE FROM t",
            SafetyLevel::Destructive,
            StatementType::Multiple(Box::new(StatementType::Delete)),
        );
        assert_classification(
            "SELECT 1; SELECT 2",
            SafetyLevel::Safe,
            StatementType::Multiple(Box::new(StatementType::Select)),
        );
    }

    #[test]
    fn test_unparsable_is_unverified() {
        let result = classify_sql("SELEC * FORM t");
        assert_eq!(result.level, SafetyLevel::Unverified);
        assert_eq!(result.statement_type, StatementType::Unknown);
        assert!(result.warning.unwrap().contains("Could not parse SQL"));
    }

    #[test]
    fn test_sqlite_only_syntax_is_unverified() {
        for sql in [
            "SELECT agency FROM t WHERE agency GLOB 'N*'",
            "SELECT agency FROM t LIMIT 2, 1",
            "SELECT agency FROM t WHERE score IS NOT 3",
        ] {
            let result = classify_sql(sql);
            assert!(
                matches!(result.level, SafetyLevel::Safe | SafetyLevel::Unverified),
                "level for {sql}: {}",
                result.level
            );
        }
    }

    #[test]
    fn test_empty_is_destructive() {
        let result = classify_sql("");
        assert_eq!(result.level, SafetyLevel::Destructive);
        assert_eq!(result.statement_type, StatementType::Unknown);
    }
}

//! Guard rails around the natural-language-to-SQL collaborator.
//!
//! The collaborator is an external component; this module owns the two
//! obligations toward it: generated SQL that mutates anything (or touches
//! the employee cost table at all) is rejected before execution, and every
//! result row is redacted before it reaches a caller.

use anyhow::{bail, Result};
use async_trait::async_trait;
use serde::Serialize;
use serde_json::{Map, Value};

use crate::redact;

/// Operations the generated SQL must never contain, matched as
/// case-insensitive substrings. Writes to the employee table are singled
/// out because that is where compensation data lives.
pub const FORBIDDEN_SQL_OPERATIONS: &[&str] = &[
    "DROP",
    "DELETE",
    "TRUNCATE",
    "ALTER",
    "GRANT",
    "REVOKE",
    "CREATE",
    "INSERT INTO EMPLOYEE",
    "UPDATE EMPLOYEE",
];

/// Reject SQL containing any forbidden operation. Substring matching can
/// reject a harmless query; it cannot let a mutating one through.
pub fn guard_sql(sql: &str) -> Result<()> {
    let upper = sql.to_uppercase();
    for op in FORBIDDEN_SQL_OPERATIONS {
        if upper.contains(op) {
            bail!("refusing to execute generated SQL containing '{}'", op);
        }
    }
    Ok(())
}

/// Questions asking directly about compensation are refused before any SQL
/// is generated.
pub fn question_is_blocked(question: &str) -> bool {
    let upper = question.to_uppercase();
    redact::SENSITIVE_FIELDS.iter().any(|token| upper.contains(token))
}

/// The external natural-language-to-SQL component.
#[async_trait]
pub trait SqlCollaborator: Send + Sync {
    /// Turn a question (plus optional context) into a SQL string.
    async fn ask(&self, question: &str, context: Option<&str>) -> Result<String>;
    /// Execute SQL and return named-field rows in stable column order.
    async fn run(&self, sql: &str) -> Result<Vec<Map<String, Value>>>;
}

pub const SECURITY_NOTE: &str =
    "Compensation data is never returned; sensitive fields are redacted.";

#[derive(Debug, Serialize)]
pub struct AskAnswer {
    pub question: String,
    pub sql_query: String,
    pub results: Vec<Value>,
    pub row_count: usize,
    pub security_note: &'static str,
}

/// Guarded ask flow: screen the question, generate SQL, screen the SQL,
/// execute, redact. Any failure, including a redaction failure, returns
/// the error; raw rows are never the fallback.
pub async fn answer_question(
    collaborator: &dyn SqlCollaborator,
    question: &str,
    context: Option<&str>,
) -> Result<AskAnswer> {
    if question_is_blocked(question) {
        bail!("questions about compensation data are not allowed");
    }

    let sql = collaborator.ask(question, context).await?;
    guard_sql(&sql)?;

    let rows = collaborator.run(&sql).await?;
    let redacted = redact::redact_rows(rows)?;
    let results: Vec<Value> = redacted.into_iter().map(Value::Object).collect();

    Ok(AskAnswer {
        question: question.to_string(),
        sql_query: sql,
        row_count: results.len(),
        results,
        security_note: SECURITY_NOTE,
    })
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::atomic::{AtomicBool, Ordering};

    struct FakeCollaborator {
        sql: String,
        rows: Vec<Map<String, Value>>,
        ran: AtomicBool,
    }

    impl FakeCollaborator {
        fn new(sql: &str, rows: Vec<Map<String, Value>>) -> Self {
            Self {
                sql: sql.to_string(),
                rows,
                ran: AtomicBool::new(false),
            }
        }
    }

    #[async_trait]
    impl SqlCollaborator for FakeCollaborator {
        async fn ask(&self, _question: &str, _context: Option<&str>) -> Result<String> {
            Ok(self.sql.clone())
        }
        async fn run(&self, _sql: &str) -> Result<Vec<Map<String, Value>>> {
            self.ran.store(true, Ordering::SeqCst);
            Ok(self.rows.clone())
        }
    }

    fn row(pairs: &[(&str, Value)]) -> Map<String, Value> {
        pairs.iter().map(|(k, v)| (k.to_string(), v.clone())).collect()
    }

    // -------------------------------------------------------------------------
    // SQL GUARD
    // -------------------------------------------------------------------------

    #[test]
    fn test_guard_allows_plain_select() {
        guard_sql("SELECT project_name, total_hours FROM gross_margin_view").unwrap();
    }

    #[test]
    fn test_guard_rejects_every_mutating_keyword() {
        for sql in [
            "DROP TABLE timecard",
            "DELETE FROM timecard",
            "TRUNCATE timecard",
            "ALTER TABLE project ADD COLUMN x int",
            "GRANT ALL ON timecard TO public",
            "REVOKE ALL ON timecard FROM public",
            "CREATE TABLE evil (x int)",
        ] {
            assert!(guard_sql(sql).is_err(), "should reject: {}", sql);
        }
    }

    #[test]
    fn test_guard_rejects_employee_table_writes() {
        assert!(guard_sql("insert into employee values ('E9', 'X', 1, 1)").is_err());
        assert!(guard_sql("UPDATE employee SET annual_cost = 0").is_err());
    }

    #[test]
    fn test_guard_is_case_insensitive() {
        assert!(guard_sql("dRoP tAbLe project").is_err());
    }

    // -------------------------------------------------------------------------
    // QUESTION SCREENING
    // -------------------------------------------------------------------------

    #[test]
    fn test_compensation_questions_blocked() {
        assert!(question_is_blocked("what is the CTC of E001?"));
        assert!(question_is_blocked("show me everyone's salary"));
        assert!(!question_is_blocked("which project has the best margin?"));
    }

    // -------------------------------------------------------------------------
    // GUARDED ASK FLOW
    // -------------------------------------------------------------------------

    #[tokio::test]
    async fn test_answer_redacts_result_rows() {
        let collab = FakeCollaborator::new(
            "SELECT employee_id, hourly_cost FROM margin_rows_by_employee",
            vec![row(&[("employee_id", json!("E001")), ("hourly_cost", json!(1000.0))])],
        );
        let answer = answer_question(&collab, "who worked most?", None).await.unwrap();
        assert_eq!(answer.row_count, 1);
        assert_eq!(answer.results[0]["employee_id"], json!("E001"));
        assert_eq!(
            answer.results[0]["hourly_cost"],
            json!(redact::REDACTION_MARKER)
        );
    }

    #[tokio::test]
    async fn test_rejected_sql_is_never_executed() {
        let collab = FakeCollaborator::new("DROP TABLE employee", vec![]);
        let result = answer_question(&collab, "tidy up the tables", None).await;
        assert!(result.is_err());
        assert!(!collab.ran.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn test_blocked_question_short_circuits() {
        let collab = FakeCollaborator::new("SELECT 1", vec![]);
        let result = answer_question(&collab, "list all salary figures", None).await;
        assert!(result.is_err());
        assert!(!collab.ran.load(Ordering::SeqCst));
    }
}

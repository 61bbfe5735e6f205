//! Redaction: compensation figures never leave the system.
//!
//! Any field whose name contains a sensitive token (case-insensitive) has
//! its value replaced with a fixed marker before rows cross the trust
//! boundary. Callers must treat a redaction error as fatal for the
//! response: the fallback is the error, never the unredacted rows.

use anyhow::Result;
use serde_json::{Map, Value};

pub const REDACTION_MARKER: &str = "[REDACTED]";

/// Field-name tokens that mark a value as compensation data. Matched as
/// case-insensitive substrings, so EMPLOYEE_CTC_ANNUAL and ctcphr both hit.
pub const SENSITIVE_FIELDS: &[&str] = &[
    "CTC",
    "CTCPHR",
    "CTC_ANNUAL",
    "ANNUAL_COST",
    "HOURLY_COST",
    "SALARY",
    "COMPENSATION",
    "COST_TO_COMPANY",
    "HOURLY_RATE",
    "WAGE",
];

pub fn is_sensitive_field(name: &str) -> bool {
    let upper = name.to_uppercase();
    SENSITIVE_FIELDS.iter().any(|token| upper.contains(token))
}

/// Replace every sensitive field's value with the marker, recursing into
/// nested objects and arrays so wrapped result shapes stay covered.
pub fn redact_rows(rows: Vec<Map<String, Value>>) -> Result<Vec<Map<String, Value>>> {
    rows.into_iter().map(redact_object).collect()
}

fn redact_object(row: Map<String, Value>) -> Result<Map<String, Value>> {
    let mut redacted = Map::with_capacity(row.len());
    for (key, value) in row {
        let value = if is_sensitive_field(&key) {
            Value::String(REDACTION_MARKER.to_string())
        } else {
            redact_value(value)?
        };
        redacted.insert(key, value);
    }
    Ok(redacted)
}

fn redact_value(value: Value) -> Result<Value> {
    Ok(match value {
        Value::Object(map) => Value::Object(redact_object(map)?),
        Value::Array(items) => Value::Array(
            items
                .into_iter()
                .map(redact_value)
                .collect::<Result<Vec<_>>>()?,
        ),
        other => other,
    })
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn row(pairs: &[(&str, Value)]) -> Map<String, Value> {
        pairs.iter().map(|(k, v)| (k.to_string(), v.clone())).collect()
    }

    #[test]
    fn test_sensitive_field_matching() {
        assert!(is_sensitive_field("CTC"));
        assert!(is_sensitive_field("ctc"));
        assert!(is_sensitive_field("Salary"));
        assert!(is_sensitive_field("EMPLOYEE_CTC_ANNUAL"));
        assert!(is_sensitive_field("hourly_cost"));
        assert!(is_sensitive_field("annual_cost"));
        assert!(is_sensitive_field("Cost_To_Company"));
        assert!(!is_sensitive_field("project_name"));
        assert!(!is_sensitive_field("total_hours"));
        assert!(!is_sensitive_field("budget"));
    }

    #[test]
    fn test_redact_replaces_sensitive_values() {
        let rows = vec![row(&[
            ("employee_id", json!("E001")),
            ("CTC", json!(1920000)),
            ("hourly_cost", json!(1000.0)),
        ])];
        let redacted = redact_rows(rows).unwrap();
        assert_eq!(redacted[0]["employee_id"], json!("E001"));
        assert_eq!(redacted[0]["CTC"], json!(REDACTION_MARKER));
        assert_eq!(redacted[0]["hourly_cost"], json!(REDACTION_MARKER));
    }

    #[test]
    fn test_redact_recurses_into_nested_shapes() {
        let rows = vec![row(&[(
            "employees",
            json!([{ "name": "Ana", "salary": 100 }, { "name": "Bo", "salary": 200 }]),
        )])];
        let redacted = redact_rows(rows).unwrap();
        assert_eq!(
            redacted[0]["employees"][0]["salary"],
            json!(REDACTION_MARKER)
        );
        assert_eq!(redacted[0]["employees"][1]["salary"], json!(REDACTION_MARKER));
        assert_eq!(redacted[0]["employees"][0]["name"], json!("Ana"));
    }

    #[test]
    fn test_redact_preserves_non_sensitive_rows() {
        let rows = vec![row(&[
            ("project_name", json!("APOLLO")),
            ("total_hours", json!(120.5)),
        ])];
        let redacted = redact_rows(rows.clone()).unwrap();
        assert_eq!(redacted, rows);
    }

    #[test]
    fn test_every_sensitive_value_is_marker_never_original() {
        let rows = vec![
            row(&[("WAGE", json!(55.5))]),
            row(&[("compensation_total", json!(99))]),
            row(&[("Hourly_Rate", json!(12))]),
        ];
        for r in redact_rows(rows).unwrap() {
            for (key, value) in &r {
                assert!(is_sensitive_field(key));
                assert_eq!(value, &json!(REDACTION_MARKER));
            }
        }
    }
}

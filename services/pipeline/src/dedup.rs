//! Deduplication within one cleaned dataset.
//!
//! Exact duplicates (every field equal) go first, then business-key
//! duplicates. Running in that order means a business-key issue always
//! cites a genuinely different row, not a byte-identical copy.

use std::collections::HashMap;

use serde::Serialize;

use crate::model::{EmployeeCost, Numbered, ProjectBudget, TimeEntry};
use crate::report::ValidationIssue;

/// Drop later exact duplicates, then later business-key duplicates, keeping
/// the first occurrence in file order. One issue is recorded per dropped
/// row, citing the row it duplicates.
pub fn dedup<T, F>(
    records: Vec<Numbered<T>>,
    business_key: F,
    key_label: &str,
) -> (Vec<Numbered<T>>, Vec<ValidationIssue>)
where
    T: Serialize,
    F: Fn(&T) -> String,
{
    let mut issues = Vec::new();

    // Pass 1: exact duplicates, keyed on the full serialized record.
    let mut seen_exact: HashMap<String, usize> = HashMap::new();
    let mut survivors = Vec::with_capacity(records.len());
    for item in records {
        let fingerprint = match serde_json::to_string(&item.record) {
            Ok(s) => s,
            Err(_) => {
                // Unserializable records cannot be fingerprinted; let the
                // business-key pass handle them.
                survivors.push(item);
                continue;
            }
        };
        match seen_exact.get(&fingerprint) {
            Some(first_row) => {
                issues.push(ValidationIssue::new(
                    item.row,
                    key_label,
                    None,
                    format!("exact duplicate of row {}", first_row),
                ));
            }
            None => {
                seen_exact.insert(fingerprint, item.row);
                survivors.push(item);
            }
        }
    }

    // Pass 2: business-key duplicates among the remaining rows.
    let mut seen_key: HashMap<String, usize> = HashMap::new();
    let mut kept = Vec::with_capacity(survivors.len());
    for item in survivors {
        let key = business_key(&item.record);
        match seen_key.get(&key) {
            Some(first_row) => {
                issues.push(ValidationIssue::new(
                    item.row,
                    key_label,
                    Some(key.clone()),
                    format!("duplicate of row {}", first_row),
                ));
            }
            None => {
                seen_key.insert(key, item.row);
                kept.push(item);
            }
        }
    }

    (kept, issues)
}

pub fn timecard_key(rec: &TimeEntry) -> String {
    format!("{}|{}|{}", rec.employee_id, rec.work_date, rec.project_name)
}

pub fn employee_key(rec: &EmployeeCost) -> String {
    rec.employee_id.clone()
}

pub fn project_key(rec: &ProjectBudget) -> String {
    rec.project_name.clone()
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn entry(row: usize, id: &str, date: &str, project: &str, hours: f64) -> Numbered<TimeEntry> {
        Numbered {
            row,
            record: TimeEntry {
                employee_id: id.to_string(),
                employee_name: "Ana".to_string(),
                work_date: NaiveDate::parse_from_str(date, "%Y-%m-%d").unwrap(),
                hours_worked: hours,
                project_name: project.to_string(),
                status: None,
                task_type: None,
            },
        }
    }

    #[test]
    fn test_exact_duplicate_removed_first_kept() {
        let records = vec![
            entry(2, "E001", "2024-01-15", "APOLLO", 8.0),
            entry(3, "E001", "2024-01-15", "APOLLO", 8.0),
        ];
        let (kept, issues) = dedup(records, timecard_key, "employee_id+work_date+project_name");
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].row, 2);
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].row, 3);
        assert!(issues[0].error.contains("exact duplicate of row 2"));
    }

    #[test]
    fn test_business_key_duplicate_cites_distinct_row() {
        // Same key, different hours: a real conflict, not a copy.
        let records = vec![
            entry(2, "E001", "2024-01-15", "APOLLO", 8.0),
            entry(3, "E001", "2024-01-15", "APOLLO", 4.0),
        ];
        let (kept, issues) = dedup(records, timecard_key, "employee_id+work_date+project_name");
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].record.hours_worked, 8.0);
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].row, 3);
        assert_eq!(issues[0].error, "duplicate of row 2");
        assert_eq!(
            issues[0].value.as_deref(),
            Some("E001|2024-01-15|APOLLO")
        );
    }

    #[test]
    fn test_exact_pass_runs_before_business_key_pass() {
        // Rows 3 (copy of 2) and 4 (key clash with 2). The copy must be
        // reported as exact, the clash as a business-key duplicate of row 2.
        let records = vec![
            entry(2, "E001", "2024-01-15", "APOLLO", 8.0),
            entry(3, "E001", "2024-01-15", "APOLLO", 8.0),
            entry(4, "E001", "2024-01-15", "APOLLO", 6.0),
        ];
        let (kept, issues) = dedup(records, timecard_key, "employee_id+work_date+project_name");
        assert_eq!(kept.len(), 1);
        assert_eq!(issues.len(), 2);
        assert!(issues[0].error.contains("exact duplicate of row 2"));
        assert_eq!(issues[1].error, "duplicate of row 2");
        assert_eq!(issues[1].row, 4);
    }

    #[test]
    fn test_distinct_rows_survive() {
        let records = vec![
            entry(2, "E001", "2024-01-15", "APOLLO", 8.0),
            entry(3, "E001", "2024-01-16", "APOLLO", 8.0),
            entry(4, "E002", "2024-01-15", "APOLLO", 8.0),
        ];
        let (kept, issues) = dedup(records, timecard_key, "key");
        assert_eq!(kept.len(), 3);
        assert!(issues.is_empty());
    }

    #[test]
    fn test_employee_key_dedup() {
        let records = vec![
            Numbered {
                row: 2,
                record: EmployeeCost {
                    employee_id: "E001".into(),
                    employee_name: "Ana".into(),
                    annual_cost: 100.0,
                    hourly_cost: 1.0,
                },
            },
            Numbered {
                row: 3,
                record: EmployeeCost {
                    employee_id: "E001".into(),
                    employee_name: "Ana P".into(),
                    annual_cost: 200.0,
                    hourly_cost: 2.0,
                },
            },
        ];
        let (kept, issues) = dedup(records, employee_key, "employee_id");
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].record.annual_cost, 100.0);
        assert_eq!(issues[0].value.as_deref(), Some("E001"));
    }
}

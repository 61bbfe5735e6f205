//! Cross-dataset referential integrity: every time entry must reference a
//! known employee and a known project.
//!
//! The comparison sets come either from the same upload's cleaned files or,
//! when a file was not part of the upload, from the persisted roster the
//! caller read back from the store. A missing roster (offline validation)
//! skips that side of the check rather than flagging every reference.

use std::collections::HashSet;

use crate::model::{Numbered, TimeEntry};
use crate::report::ValidationIssue;

/// Key sets the time entries are checked against.
#[derive(Debug, Default)]
pub struct Rosters {
    pub employee_ids: Option<HashSet<String>>,
    pub project_names: Option<HashSet<String>>,
}

impl Rosters {
    pub fn from_sets(employee_ids: HashSet<String>, project_names: HashSet<String>) -> Self {
        Self {
            employee_ids: Some(employee_ids),
            project_names: Some(project_names),
        }
    }
}

/// One issue per unknown reference, naming the row and the missing key.
pub fn check_references(
    entries: &[Numbered<TimeEntry>],
    rosters: &Rosters,
) -> Vec<ValidationIssue> {
    let mut issues = Vec::new();

    for item in entries {
        if let Some(employees) = &rosters.employee_ids {
            if !employees.contains(&item.record.employee_id) {
                issues.push(ValidationIssue::new(
                    item.row,
                    "employee_id",
                    Some(item.record.employee_id.clone()),
                    format!("unknown employee '{}'", item.record.employee_id),
                ));
            }
        }
        if let Some(projects) = &rosters.project_names {
            if !projects.contains(&item.record.project_name) {
                issues.push(ValidationIssue::new(
                    item.row,
                    "project_name",
                    Some(item.record.project_name.clone()),
                    format!("unknown project '{}'", item.record.project_name),
                ));
            }
        }
    }

    issues
}

// =============================================================================
// TESTS
// =============================================================================

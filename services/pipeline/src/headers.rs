//! Header resolution: maps the column names users actually type to the
//! canonical field names the rest of the pipeline works with.
//!
//! Matching is case- and whitespace-insensitive, driven by fixed per-kind
//! synonym tables. A raw header that would match two different canonical
//! fields is a configuration error, caught at startup, never at upload time.

use std::collections::HashMap;

use anyhow::{bail, Result};

use crate::model::DatasetKind;

/// Known synonyms per canonical field, per dataset kind.
/// The canonical name itself always matches too.
const TIMECARD_SYNONYMS: &[(&str, &[&str])] = &[
    ("employee_id", &["EMPLOYEE_ID", "EMP_ID", "EmpId", "EmployeeID", "Employee ID", "EMPID"]),
    ("employee_name", &["EMPLOYEE_NAME", "EMP_NAME", "EmpName", "Employee Name", "Name"]),
    ("work_date", &["DAILY_DATE", "DATE", "Date", "WorkDate", "WORK_DATE", "Daily Date"]),
    ("hours_worked", &["TIME_WORKED", "HOURS_WORKED", "HoursWorked", "Hours", "HOURS", "Time"]),
    ("project_name", &["PROJECT_NAME", "PROJECT", "Project", "ProjectName"]),
    ("status", &["TIME_CARD_STATE", "Status", "STATE", "State", "CardState"]),
    ("task_type", &["TASK_TYPE", "Task", "TASK", "Type", "TaskType"]),
];

const EMPLOYEE_SYNONYMS: &[(&str, &[&str])] = &[
    ("employee_id", &["EMPLOYEE_ID", "EMP_ID", "EmpId", "EmployeeID", "Employee ID", "EMPID"]),
    ("employee_name", &["EMPLOYEE_NAME", "EMP_NAME", "EmpName", "Employee Name", "Name"]),
    ("annual_cost", &["CTC", "CTC_ANNUAL", "CTCANNUAL", "Cost to Company", "Annual CTC", "Salary"]),
    ("hourly_cost", &["CTCPHR", "CTC_HOURLY", "Hourly Rate", "HourlyRate"]),
];

const PROJECT_SYNONYMS: &[(&str, &[&str])] = &[
    ("project_name", &["PROJECT_NAME", "PROJECT", "Project", "ProjectName", "Name"]),
    ("budget", &["SOW", "BUDGET", "Budget", "SOW_VALUE", "Statement of Work", "Project Budget"]),
    ("project_id", &["PROJECT_ID", "ID", "ProjectID", "Project ID"]),
];

/// Canonical columns a file must provide to be cleanable at all.
pub fn required_fields(kind: DatasetKind) -> &'static [&'static str] {
    match kind {
        DatasetKind::Timecard => &[
            "employee_id",
            "employee_name",
            "work_date",
            "hours_worked",
            "project_name",
        ],
        DatasetKind::Employee => &["employee_id", "employee_name", "annual_cost"],
        DatasetKind::Project => &["project_name", "budget"],
    }
}

fn synonym_table(kind: DatasetKind) -> &'static [(&'static str, &'static [&'static str])] {
    match kind {
        DatasetKind::Timecard => TIMECARD_SYNONYMS,
        DatasetKind::Employee => EMPLOYEE_SYNONYMS,
        DatasetKind::Project => PROJECT_SYNONYMS,
    }
}

/// Lowercase and strip all whitespace, so "Employee ID", "EmployeeID" and
/// "employee_id " all land on the same index key.
fn normalize(header: &str) -> String {
    header
        .chars()
        .filter(|c| !c.is_whitespace())
        .flat_map(|c| c.to_lowercase())
        .collect()
}

/// Precomputed reverse index (normalized raw header -> canonical field) for
/// one dataset kind. Built once at startup, shared for the process lifetime.
#[derive(Debug)]
pub struct HeaderResolver {
    index: HashMap<String, &'static str>,
}

impl HeaderResolver {
    /// Build the index, failing if any raw header would map to two
    /// different canonical fields.
    pub fn new(kind: DatasetKind) -> Result<Self> {
        let mut index: HashMap<String, &'static str> = HashMap::new();
        for &(canonical, synonyms) in synonym_table(kind) {
            for raw in std::iter::once(canonical).chain(synonyms.iter().copied()) {
                let key = normalize(raw);
                match index.get(key.as_str()) {
                    Some(&existing) if existing != canonical => bail!(
                        "ambiguous header synonym for {}: '{}' maps to both {} and {}",
                        kind,
                        raw,
                        existing,
                        canonical
                    ),
                    Some(_) => {}
                    None => {
                        index.insert(key, canonical);
                    }
                }
            }
        }
        Ok(Self { index })
    }

    /// Map one raw header row. Returns, per column position, the canonical
    /// field it provides (or None), plus the headers nothing matched.
    pub fn resolve(&self, raw_headers: &[String]) -> ResolvedHeaders {
        let mut columns = Vec::with_capacity(raw_headers.len());
        let mut unmapped = Vec::new();
        for raw in raw_headers {
            if raw.trim().is_empty() {
                columns.push(None);
                continue;
            }
            match self.index.get(normalize(raw).as_str()) {
                Some(canonical) => columns.push(Some(*canonical)),
                None => {
                    unmapped.push(raw.trim().to_string());
                    columns.push(None);
                }
            }
        }
        ResolvedHeaders { columns, unmapped }
    }
}

/// Result of resolving one header row.
#[derive(Debug)]
pub struct ResolvedHeaders {
    /// Canonical field provided by each column position, if recognized.
    pub columns: Vec<Option<&'static str>>,
    /// Raw headers that matched no synonym; surfaced as warnings.
    pub unmapped: Vec<String>,
}

impl ResolvedHeaders {
    /// Column position of a canonical field, if any column provides it.
    pub fn position(&self, canonical: &str) -> Option<usize> {
        self.columns.iter().position(|c| *c == Some(canonical))
    }

    /// Required canonical fields that no column provides.
    pub fn missing_required(&self, kind: DatasetKind) -> Vec<&'static str> {
        required_fields(kind)
            .iter()
            .filter(|f| self.position(f).is_none())
            .copied()
            .collect()
    }
}

/// Startup check: every kind's synonym table must build a conflict-free
/// index. Called from config validation so a bad table never reaches a
/// request.
pub fn validate_synonym_tables() -> Result<()> {
    for kind in [DatasetKind::Timecard, DatasetKind::Employee, DatasetKind::Project] {
        HeaderResolver::new(kind)?;
    }
    Ok(())
}

// =============================================================================
// TESTS
// =============================================================================

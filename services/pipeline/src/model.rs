//! Canonical record types shared by the cleaning and loading stages.

use chrono::NaiveDate;
use serde::Serialize;

/// The three dataset kinds the pipeline understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DatasetKind {
    Timecard,
    Employee,
    Project,
}

impl DatasetKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            DatasetKind::Timecard => "timecard",
            DatasetKind::Employee => "employee",
            DatasetKind::Project => "project",
        }
    }
}

impl std::fmt::Display for DatasetKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One time entry: an employee worked some hours on a project on a date.
/// Immutable historical fact; never updated once persisted.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TimeEntry {
    pub employee_id: String,
    pub employee_name: String,
    pub work_date: NaiveDate,
    pub hours_worked: f64,
    pub project_name: String,
    pub status: Option<String>,
    pub task_type: Option<String>,
}

/// Annual and derived hourly cost for one employee.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EmployeeCost {
    pub employee_id: String,
    pub employee_name: String,
    pub annual_cost: f64,
    pub hourly_cost: f64,
}

/// SOW budget for one project.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProjectBudget {
    pub project_name: String,
    pub budget: f64,
    pub project_id: Option<i64>,
}

/// A cleaned record together with the row it came from in the source file
/// (1-indexed, header on row 1, so data starts at row 2).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Numbered<T> {
    pub row: usize,
    pub record: T,
}

/// Output of cleaning one file: the surviving records, every problem found,
/// and the unrecognized-header warnings. Immutable once produced.
#[derive(Debug, Clone, Serialize)]
pub struct CleanedDataset<T> {
    pub records: Vec<Numbered<T>>,
    pub issues: Vec<crate::report::ValidationIssue>,
    pub header_warnings: Vec<String>,
    pub total_rows: usize,
}

impl<T> CleanedDataset<T> {
    pub fn empty() -> Self {
        Self {
            records: Vec::new(),
            issues: Vec::new(),
            header_warnings: Vec::new(),
            total_rows: 0,
        }
    }
}

/// The cleaned datasets of one upload, ready for the loader.
#[derive(Debug, Default)]
pub struct CleanedBundle {
    pub timecard: Option<CleanedDataset<TimeEntry>>,
    pub employee: Option<CleanedDataset<EmployeeCost>>,
    pub project: Option<CleanedDataset<ProjectBudget>>,
}

impl CleanedBundle {
    pub fn is_empty(&self) -> bool {
        self.timecard.as_ref().map_or(true, |d| d.records.is_empty())
            && self.employee.as_ref().map_or(true, |d| d.records.is_empty())
            && self.project.as_ref().map_or(true, |d| d.records.is_empty())
    }
}

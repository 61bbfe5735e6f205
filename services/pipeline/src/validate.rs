//! Row validation: table-driven rules applied by a single dispatcher.
//!
//! A row either becomes a canonical record or contributes nothing but its
//! issues. Every problem in the row is reported in one pass, so users fix
//! a file once instead of resubmitting per error.

use std::sync::OnceLock;

use chrono::{Local, NaiveDate};
use regex::Regex;

use crate::headers::HeaderResolver;
use crate::model::{CleanedDataset, DatasetKind, EmployeeCost, Numbered, ProjectBudget, TimeEntry};
use crate::reader::{excel_serial_to_date, Cell, RawTable};
use crate::report::ValidationIssue;

/// One validation constraint. Each field carries a list of these; the
/// dispatcher in [`apply_rules`] evaluates them in order.
#[derive(Debug, Clone, Copy)]
pub enum Rule {
    Numeric {
        min: Option<f64>,
        max: Option<f64>,
        exclusive_min: bool,
    },
    Date {
        max_today: bool,
    },
    Pattern(&'static Regex),
    MaxLength(usize),
    Required,
}

/// A coerced field value, typed by the rules that produced it.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Number(f64),
    Date(NaiveDate),
    Text(String),
}

impl FieldValue {
    fn into_number(self) -> Option<f64> {
        match self {
            FieldValue::Number(n) => Some(n),
            _ => None,
        }
    }
    fn into_date(self) -> Option<NaiveDate> {
        match self {
            FieldValue::Date(d) => Some(d),
            _ => None,
        }
    }
    fn into_text(self) -> Option<String> {
        match self {
            FieldValue::Text(s) => Some(s),
            _ => None,
        }
    }
}

/// Uppercase alphanumeric identifiers (employee ids).
pub fn id_pattern() -> &'static Regex {
    static PAT: OnceLock<Regex> = OnceLock::new();
    PAT.get_or_init(|| Regex::new("^[A-Z0-9]+$").expect("id pattern is a valid regex"))
}

/// Evaluate every rule for one cell. On success returns the coerced value;
/// on any violation pushes one issue per violation and returns None.
/// `uppercase` folds text to uppercase before pattern checks, so ids and
/// project names are canonicalized and validated in the same form they are
/// stored.
pub fn apply_rules(
    row: usize,
    column: &str,
    cell: &Cell,
    rules: &[Rule],
    uppercase: bool,
    issues: &mut Vec<ValidationIssue>,
) -> Option<FieldValue> {
    let required = rules.iter().any(|r| matches!(r, Rule::Required));

    if cell.is_empty() {
        if required {
            issues.push(ValidationIssue::new(row, column, None, "required value is missing"));
        }
        return None;
    }

    // Coerce to the type the rules expect before range/shape checks.
    let value = if rules.iter().any(|r| matches!(r, Rule::Numeric { .. })) {
        match coerce_number(cell) {
            Some(n) => FieldValue::Number(n),
            None => {
                issues.push(ValidationIssue::new(
                    row,
                    column,
                    cell.display(),
                    "must be a number",
                ));
                return None;
            }
        }
    } else if rules.iter().any(|r| matches!(r, Rule::Date { .. })) {
        match coerce_date(cell) {
            Some(d) => FieldValue::Date(d),
            None => {
                issues.push(ValidationIssue::new(
                    row,
                    column,
                    cell.display(),
                    "invalid date format, expected YYYY-MM-DD",
                ));
                return None;
            }
        }
    } else {
        let text = match cell.display() {
            Some(s) => s.trim().to_string(),
            None => return None,
        };
        FieldValue::Text(if uppercase { text.to_uppercase() } else { text })
    };

    let before = issues.len();
    for rule in rules {
        match (rule, &value) {
            (Rule::Numeric { min, max, exclusive_min }, FieldValue::Number(n)) => {
                let below = match min {
                    Some(m) if *exclusive_min => n <= m,
                    Some(m) => n < m,
                    None => false,
                };
                let above = matches!(max, Some(m) if n > m);
                if below || above {
                    issues.push(ValidationIssue::new(
                        row,
                        column,
                        cell.display(),
                        range_message(*min, *max, *exclusive_min),
                    ));
                }
            }
            (Rule::Date { max_today }, FieldValue::Date(d)) => {
                if *max_today && *d > Local::now().date_naive() {
                    issues.push(ValidationIssue::new(
                        row,
                        column,
                        cell.display(),
                        "date is in the future",
                    ));
                }
            }
            (Rule::Pattern(re), FieldValue::Text(s)) => {
                if !re.is_match(s) {
                    issues.push(ValidationIssue::new(
                        row,
                        column,
                        cell.display(),
                        format!("does not match expected format {}", re.as_str()),
                    ));
                }
            }
            (Rule::MaxLength(max), FieldValue::Text(s)) => {
                if s.chars().count() > *max {
                    issues.push(ValidationIssue::new(
                        row,
                        column,
                        cell.display(),
                        format!("exceeds maximum length of {} characters", max),
                    ));
                }
            }
            _ => {}
        }
    }

    if issues.len() > before {
        None
    } else {
        Some(value)
    }
}

fn range_message(min: Option<f64>, max: Option<f64>, exclusive_min: bool) -> String {
    match (min, max) {
        (Some(lo), Some(hi)) if exclusive_min => {
            format!("must be greater than {} and at most {}", lo, hi)
        }
        (Some(lo), Some(hi)) => format!("must be between {} and {}", lo, hi),
        (Some(lo), None) => format!("must be at least {}", lo),
        (None, Some(hi)) => format!("must be at most {}", hi),
        (None, None) => "out of range".to_string(),
    }
}

fn coerce_number(cell: &Cell) -> Option<f64> {
    match cell {
        Cell::Number(n) => Some(*n),
        Cell::Text(s) => s.trim().replace(',', "").parse::<f64>().ok(),
        _ => None,
    }
}

fn coerce_date(cell: &Cell) -> Option<NaiveDate> {
    match cell {
        Cell::Date(d) => Some(*d),
        Cell::Text(s) => NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d").ok(),
        Cell::Number(n) => excel_serial_to_date(*n),
        _ => None,
    }
}

/// Round a derived hourly cost to six decimal places.
fn round_hourly(value: f64) -> f64 {
    (value * 1_000_000.0).round() / 1_000_000.0
}

// =============================================================================
// Per-kind row cleaning
// =============================================================================

/// Shared preamble: resolve headers and fail the whole file if a required
/// column is missing. Returns None (with the dataset already populated with
/// the schema issue) when the file cannot be cleaned at all.
fn resolve_or_abort<T>(
    table: &RawTable,
    resolver: &HeaderResolver,
    kind: DatasetKind,
    data: &mut CleanedDataset<T>,
) -> Option<crate::headers::ResolvedHeaders> {
    let resolved = resolver.resolve(&table.headers);
    data.header_warnings = resolved.unmapped.clone();

    let missing = resolved.missing_required(kind);
    if !missing.is_empty() {
        data.total_rows = table.rows.iter().filter(|r| !r.iter().all(Cell::is_empty)).count();
        for field in missing {
            data.issues.push(ValidationIssue::new(
                0,
                field,
                None,
                "required column missing: no header matched any known synonym",
            ));
        }
        return None;
    }
    Some(resolved)
}

fn cell_at<'a>(row: &'a [Cell], pos: Option<usize>) -> &'a Cell {
    pos.and_then(|p| row.get(p)).unwrap_or(&Cell::Empty)
}

/// Clean a timecard table into time entries.
pub fn clean_timecard(table: &RawTable, resolver: &HeaderResolver) -> CleanedDataset<TimeEntry> {
    let mut data = CleanedDataset::empty();
    let Some(resolved) = resolve_or_abort(table, resolver, DatasetKind::Timecard, &mut data) else {
        return data;
    };

    let id_col = resolved.position("employee_id");
    let name_col = resolved.position("employee_name");
    let date_col = resolved.position("work_date");
    let hours_col = resolved.position("hours_worked");
    let project_col = resolved.position("project_name");
    let status_col = resolved.position("status");
    let task_col = resolved.position("task_type");

    for (idx, row) in table.rows.iter().enumerate() {
        if row.iter().all(Cell::is_empty) {
            continue;
        }
        let row_num = idx + 2;
        data.total_rows += 1;
        let mut row_issues = Vec::new();

        let employee_id = apply_rules(
            row_num,
            "employee_id",
            cell_at(row, id_col),
            &[Rule::Required, Rule::MaxLength(10), Rule::Pattern(id_pattern())],
            true,
            &mut row_issues,
        );
        let employee_name = apply_rules(
            row_num,
            "employee_name",
            cell_at(row, name_col),
            &[Rule::Required, Rule::MaxLength(120)],
            false,
            &mut row_issues,
        );
        let work_date = apply_rules(
            row_num,
            "work_date",
            cell_at(row, date_col),
            &[Rule::Required, Rule::Date { max_today: true }],
            false,
            &mut row_issues,
        );
        let hours_worked = apply_rules(
            row_num,
            "hours_worked",
            cell_at(row, hours_col),
            &[Rule::Required, Rule::Numeric { min: Some(0.1), max: Some(999.9), exclusive_min: true }],
            false,
            &mut row_issues,
        );
        let project_name = apply_rules(
            row_num,
            "project_name",
            cell_at(row, project_col),
            &[Rule::Required, Rule::MaxLength(200)],
            true,
            &mut row_issues,
        );
        let status = apply_rules(row_num, "status", cell_at(row, status_col), &[Rule::MaxLength(40)], false, &mut row_issues);
        let task_type = apply_rules(row_num, "task_type", cell_at(row, task_col), &[Rule::MaxLength(40)], false, &mut row_issues);

        if !row_issues.is_empty() {
            data.issues.extend(row_issues);
            continue;
        }
        let (Some(employee_id), Some(employee_name), Some(work_date), Some(hours_worked), Some(project_name)) = (
            employee_id.and_then(FieldValue::into_text),
            employee_name.and_then(FieldValue::into_text),
            work_date.and_then(FieldValue::into_date),
            hours_worked.and_then(FieldValue::into_number),
            project_name.and_then(FieldValue::into_text),
        ) else {
            continue;
        };

        data.records.push(Numbered {
            row: row_num,
            record: TimeEntry {
                employee_id,
                employee_name,
                work_date,
                hours_worked,
                project_name,
                status: status.and_then(FieldValue::into_text),
                task_type: task_type.and_then(FieldValue::into_text),
            },
        });
    }

    data
}

/// Clean an employee cost table. `divisor` is the annual-hours constant used
/// to derive the hourly cost when the file does not supply one; the config
/// layer guarantees it is non-zero before any request runs.
pub fn clean_employee(
    table: &RawTable,
    resolver: &HeaderResolver,
    divisor: f64,
) -> CleanedDataset<EmployeeCost> {
    let mut data = CleanedDataset::empty();
    let Some(resolved) = resolve_or_abort(table, resolver, DatasetKind::Employee, &mut data) else {
        return data;
    };

    let id_col = resolved.position("employee_id");
    let name_col = resolved.position("employee_name");
    let annual_col = resolved.position("annual_cost");
    let hourly_col = resolved.position("hourly_cost");

    for (idx, row) in table.rows.iter().enumerate() {
        if row.iter().all(Cell::is_empty) {
            continue;
        }
        let row_num = idx + 2;
        data.total_rows += 1;
        let mut row_issues = Vec::new();

        let employee_id = apply_rules(
            row_num,
            "employee_id",
            cell_at(row, id_col),
            &[Rule::Required, Rule::MaxLength(10), Rule::Pattern(id_pattern())],
            true,
            &mut row_issues,
        );
        let employee_name = apply_rules(
            row_num,
            "employee_name",
            cell_at(row, name_col),
            &[Rule::Required, Rule::MaxLength(120)],
            false,
            &mut row_issues,
        );
        let annual_cost = apply_rules(
            row_num,
            "annual_cost",
            cell_at(row, annual_col),
            &[Rule::Required, Rule::Numeric { min: Some(0.0), max: None, exclusive_min: false }],
            false,
            &mut row_issues,
        );
        let hourly_cost = apply_rules(
            row_num,
            "hourly_cost",
            cell_at(row, hourly_col),
            &[Rule::Numeric { min: Some(0.0), max: None, exclusive_min: false }],
            false,
            &mut row_issues,
        );

        if !row_issues.is_empty() {
            data.issues.extend(row_issues);
            continue;
        }
        let (Some(employee_id), Some(employee_name), Some(annual_cost)) = (
            employee_id.and_then(FieldValue::into_text),
            employee_name.and_then(FieldValue::into_text),
            annual_cost.and_then(FieldValue::into_number),
        ) else {
            continue;
        };

        let hourly_cost = match hourly_cost.and_then(FieldValue::into_number) {
            Some(h) => h,
            None => round_hourly(annual_cost / divisor),
        };

        data.records.push(Numbered {
            row: row_num,
            record: EmployeeCost {
                employee_id,
                employee_name,
                annual_cost,
                hourly_cost,
            },
        });
    }

    data
}

/// Clean a project budget table.
pub fn clean_project(table: &RawTable, resolver: &HeaderResolver) -> CleanedDataset<ProjectBudget> {
    let mut data = CleanedDataset::empty();
    let Some(resolved) = resolve_or_abort(table, resolver, DatasetKind::Project, &mut data) else {
        return data;
    };

    let name_col = resolved.position("project_name");
    let budget_col = resolved.position("budget");
    let id_col = resolved.position("project_id");

    for (idx, row) in table.rows.iter().enumerate() {
        if row.iter().all(Cell::is_empty) {
            continue;
        }
        let row_num = idx + 2;
        data.total_rows += 1;
        let mut row_issues = Vec::new();

        let project_name = apply_rules(
            row_num,
            "project_name",
            cell_at(row, name_col),
            &[Rule::Required, Rule::MaxLength(200)],
            true,
            &mut row_issues,
        );
        let budget = apply_rules(
            row_num,
            "budget",
            cell_at(row, budget_col),
            &[Rule::Required, Rule::Numeric { min: Some(0.0), max: None, exclusive_min: false }],
            false,
            &mut row_issues,
        );
        let project_id = apply_rules(
            row_num,
            "project_id",
            cell_at(row, id_col),
            &[Rule::Numeric { min: Some(0.0), max: None, exclusive_min: false }],
            false,
            &mut row_issues,
        );

        if !row_issues.is_empty() {
            data.issues.extend(row_issues);
            continue;
        }
        let (Some(project_name), Some(budget)) = (
            project_name.and_then(FieldValue::into_text),
            budget.and_then(FieldValue::into_number),
        ) else {
            continue;
        };

        data.records.push(Numbered {
            row: row_num,
            record: ProjectBudget {
                project_name,
                budget,
                project_id: project_id.and_then(FieldValue::into_number).map(|n| n as i64),
            },
        });
    }

    data
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::headers::HeaderResolver;
    use crate::reader::RawTable;

    fn table(headers: &[&str], rows: &[&[&str]]) -> RawTable {
        RawTable {
            headers: headers.iter().map(|h| h.to_string()).collect(),
            rows: rows
                .iter()
                .map(|r| {
                    r.iter()
                        .map(|c| {
                            if c.is_empty() {
                                Cell::Empty
                            } else {
                                Cell::Text(c.to_string())
                            }
                        })
                        .collect()
                })
                .collect(),
        }
    }

    fn timecard_resolver() -> HeaderResolver {
        HeaderResolver::new(DatasetKind::Timecard).unwrap()
    }
    fn employee_resolver() -> HeaderResolver {
        HeaderResolver::new(DatasetKind::Employee).unwrap()
    }
    fn project_resolver() -> HeaderResolver {
        HeaderResolver::new(DatasetKind::Project).unwrap()
    }

    // -------------------------------------------------------------------------
    // TIMECARD CLEANING
    // -------------------------------------------------------------------------

    #[test]
    fn test_clean_timecard_valid_row() {
        let t = table(
            &["EMP_ID", "Name", "DATE", "HOURS", "PROJECT"],
            &[&["e001", "Ana Perez", "2024-01-15", "8", "apollo"]],
        );
        let data = clean_timecard(&t, &timecard_resolver());
        assert_eq!(data.records.len(), 1);
        assert!(data.issues.is_empty());
        let rec = &data.records[0].record;
        assert_eq!(rec.employee_id, "E001");
        assert_eq!(rec.project_name, "APOLLO");
        assert_eq!(rec.hours_worked, 8.0);
        assert_eq!(data.records[0].row, 2);
    }

    #[test]
    fn test_clean_timecard_invalid_date_excludes_row() {
        let t = table(
            &["EMP_ID", "Name", "DATE", "HOURS", "PROJECT"],
            &[&["e001", "Ana", "2024-13-01", "8", "apollo"]],
        );
        let data = clean_timecard(&t, &timecard_resolver());
        assert_eq!(data.records.len(), 0);
        assert_eq!(data.total_rows, 1);
        assert_eq!(data.issues.len(), 1);
        assert_eq!(data.issues[0].column, "work_date");
        assert_eq!(data.issues[0].row, 2);
        assert!(data.issues[0].error.contains("invalid date format"));
    }

    #[test]
    fn test_clean_timecard_future_date_rejected() {
        let future = Local::now().date_naive() + chrono::Duration::days(30);
        let binding = future.format("%Y-%m-%d").to_string();
        let t = table(
            &["EMP_ID", "Name", "DATE", "HOURS", "PROJECT"],
            &[&["e001", "Ana", binding.as_str(), "8", "apollo"]],
        );
        let data = clean_timecard(&t, &timecard_resolver());
        assert!(data.records.is_empty());
        assert!(data.issues[0].error.contains("future"));
    }

    #[test]
    fn test_clean_timecard_hours_bounds() {
        let t = table(
            &["EMP_ID", "Name", "DATE", "HOURS", "PROJECT"],
            &[
                &["e001", "Ana", "2024-01-15", "0.1", "apollo"],
                &["e002", "Bo", "2024-01-15", "1000", "apollo"],
                &["e003", "Cy", "2024-01-15", "999.9", "apollo"],
            ],
        );
        let data = clean_timecard(&t, &timecard_resolver());
        // 0.1 is below the exclusive lower bound, 1000 above the max.
        assert_eq!(data.records.len(), 1);
        assert_eq!(data.records[0].record.employee_id, "E003");
        assert_eq!(data.issues.len(), 2);
    }

    #[test]
    fn test_clean_timecard_all_issues_reported_in_one_pass() {
        let t = table(
            &["EMP_ID", "Name", "DATE", "HOURS", "PROJECT"],
            &[&["toolongid1234", "Ana", "not-a-date", "abc", ""]],
        );
        let data = clean_timecard(&t, &timecard_resolver());
        assert!(data.records.is_empty());
        // One issue per broken field: id length, date, hours, missing project.
        assert_eq!(data.issues.len(), 4);
        let cols: Vec<&str> = data.issues.iter().map(|i| i.column.as_str()).collect();
        assert!(cols.contains(&"employee_id"));
        assert!(cols.contains(&"work_date"));
        assert!(cols.contains(&"hours_worked"));
        assert!(cols.contains(&"project_name"));
    }

    #[test]
    fn test_clean_timecard_missing_required_column_aborts_file() {
        let t = table(&["EMP_ID", "Name", "HOURS", "PROJECT"], &[&["e001", "Ana", "8", "apollo"]]);
        let data = clean_timecard(&t, &timecard_resolver());
        assert!(data.records.is_empty());
        assert_eq!(data.issues.len(), 1);
        assert_eq!(data.issues[0].row, 0);
        assert_eq!(data.issues[0].column, "work_date");
    }

    #[test]
    fn test_clean_timecard_unknown_header_is_warning() {
        let t = table(
            &["EMP_ID", "Name", "DATE", "HOURS", "PROJECT", "NOTES"],
            &[&["e001", "Ana", "2024-01-15", "8", "apollo", "fine"]],
        );
        let data = clean_timecard(&t, &timecard_resolver());
        assert_eq!(data.header_warnings, vec!["NOTES".to_string()]);
        assert_eq!(data.records.len(), 1);
        assert!(data.issues.is_empty());
    }

    #[test]
    fn test_clean_timecard_blank_rows_skipped() {
        let t = table(
            &["EMP_ID", "Name", "DATE", "HOURS", "PROJECT"],
            &[
                &["", "", "", "", ""],
                &["e001", "Ana", "2024-01-15", "8", "apollo"],
            ],
        );
        let data = clean_timecard(&t, &timecard_resolver());
        assert_eq!(data.total_rows, 1);
        assert_eq!(data.records.len(), 1);
        // Physical row numbering is preserved: blank row 2, data row 3.
        assert_eq!(data.records[0].row, 3);
    }

    #[test]
    fn test_clean_timecard_optional_fields() {
        let t = table(
            &["EMP_ID", "Name", "DATE", "HOURS", "PROJECT", "Status", "Task"],
            &[&["e001", "Ana", "2024-01-15", "8", "apollo", "Approved", "Dev"]],
        );
        let data = clean_timecard(&t, &timecard_resolver());
        let rec = &data.records[0].record;
        assert_eq!(rec.status.as_deref(), Some("Approved"));
        assert_eq!(rec.task_type.as_deref(), Some("Dev"));
    }

    #[test]
    fn test_canonicalization_is_idempotent() {
        let t = table(
            &["EMP_ID", "Name", "DATE", "HOURS", "PROJECT"],
            &[&["e001", "Ana", "2024-01-15", "8", "apollo"]],
        );
        let once = clean_timecard(&t, &timecard_resolver());
        let rec = &once.records[0].record;
        // Re-clean the already-canonical record.
        let hours = rec.hours_worked.to_string();
        let date = rec.work_date.to_string();
        let t2 = table(
            &["employee_id", "employee_name", "work_date", "hours_worked", "project_name"],
            &[&[
                rec.employee_id.as_str(),
                rec.employee_name.as_str(),
                date.as_str(),
                hours.as_str(),
                rec.project_name.as_str(),
            ]],
        );
        let twice = clean_timecard(&t2, &timecard_resolver());
        assert_eq!(twice.records[0].record, *rec);
    }

    // -------------------------------------------------------------------------
    // EMPLOYEE CLEANING
    // -------------------------------------------------------------------------

    #[test]
    fn test_clean_employee_derives_hourly_cost() {
        let t = table(&["EMPLOYEE_ID", "Name", "CTC"], &[&["E001", "Ana", "1920000"]]);
        let data = clean_employee(&t, &employee_resolver(), 1920.0);
        assert_eq!(data.records.len(), 1);
        assert_eq!(data.records[0].record.hourly_cost, 1000.0);
    }

    #[test]
    fn test_clean_employee_keeps_supplied_hourly_cost() {
        let t = table(
            &["EMPLOYEE_ID", "Name", "CTC", "CTCPHR"],
            &[&["E001", "Ana", "1920000", "950.5"]],
        );
        let data = clean_employee(&t, &employee_resolver(), 1920.0);
        assert_eq!(data.records[0].record.hourly_cost, 950.5);
    }

    #[test]
    fn test_clean_employee_hourly_rounding() {
        let t = table(&["EMPLOYEE_ID", "Name", "CTC"], &[&["E001", "Ana", "1000000"]]);
        let data = clean_employee(&t, &employee_resolver(), 1920.0);
        // 1000000 / 1920 = 520.833333...
        assert_eq!(data.records[0].record.hourly_cost, 520.833333);
    }

    #[test]
    fn test_clean_employee_negative_ctc_rejected() {
        let t = table(&["EMPLOYEE_ID", "Name", "CTC"], &[&["E001", "Ana", "-5"]]);
        let data = clean_employee(&t, &employee_resolver(), 1920.0);
        assert!(data.records.is_empty());
        assert_eq!(data.issues[0].column, "annual_cost");
    }

    #[test]
    fn test_clean_employee_id_pattern() {
        let t = table(&["EMPLOYEE_ID", "Name", "CTC"], &[&["e-001", "Ana", "1000"]]);
        let data = clean_employee(&t, &employee_resolver(), 1920.0);
        assert!(data.records.is_empty());
        assert_eq!(data.issues[0].column, "employee_id");
    }

    #[test]
    fn test_clean_employee_comma_separated_number() {
        let t = table(&["EMPLOYEE_ID", "Name", "CTC"], &[&["E001", "Ana", "1,920,000"]]);
        let data = clean_employee(&t, &employee_resolver(), 1920.0);
        assert_eq!(data.records[0].record.annual_cost, 1920000.0);
    }

    // -------------------------------------------------------------------------
    // PROJECT CLEANING
    // -------------------------------------------------------------------------

    #[test]
    fn test_clean_project_basic() {
        let t = table(&["Name", "SOW", "ID"], &[&["apollo", "50000", "7"]]);
        let data = clean_project(&t, &project_resolver());
        let rec = &data.records[0].record;
        assert_eq!(rec.project_name, "APOLLO");
        assert_eq!(rec.budget, 50000.0);
        assert_eq!(rec.project_id, Some(7));
    }

    #[test]
    fn test_clean_project_missing_budget_value() {
        let t = table(&["Name", "SOW"], &[&["apollo", ""]]);
        let data = clean_project(&t, &project_resolver());
        assert!(data.records.is_empty());
        assert_eq!(data.issues[0].column, "budget");
        assert!(data.issues[0].error.contains("required"));
    }

    #[test]
    fn test_clean_project_optional_id_absent() {
        let t = table(&["Name", "SOW"], &[&["apollo", "100"]]);
        let data = clean_project(&t, &project_resolver());
        assert_eq!(data.records[0].record.project_id, None);
    }
}

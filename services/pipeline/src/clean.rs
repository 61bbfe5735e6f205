//! Cleaning orchestration: read, resolve, validate, and deduplicate each
//! provided file, then cross-check and assemble the validation report.
//!
//! A file that fails to read or lacks a required column is fatal for that
//! file only; the others still process. Row-level problems never abort a
//! file. No step here talks to the database; rosters for the referential
//! check are passed in by the caller.

use std::collections::HashSet;
use std::path::Path;

use crate::config::PipelineConfig;
use crate::dedup;
use crate::headers::HeaderResolver;
use crate::integrity::{self, Rosters};
use crate::model::{CleanedBundle, CleanedDataset, DatasetKind};
use crate::reader;
use crate::report::{build_report, FileReport, ValidationIssue, ValidationReport};
use crate::validate;

/// Paths of the files that arrived with one upload. All optional, but at
/// least one should be present.
#[derive(Debug, Default)]
pub struct UploadFiles<'a> {
    pub timecard: Option<&'a Path>,
    pub employee: Option<&'a Path>,
    pub project: Option<&'a Path>,
}

impl UploadFiles<'_> {
    pub fn is_empty(&self) -> bool {
        self.timecard.is_none() && self.employee.is_none() && self.project.is_none()
    }
}

/// Persisted rosters, used for the referential check when the matching file
/// is not part of the upload. `None` fields skip that side of the check.
#[derive(Debug, Default)]
pub struct PersistedRosters {
    pub employee_ids: Option<HashSet<String>>,
    pub project_names: Option<HashSet<String>>,
}

fn filename(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

/// A dataset whose file could not be read at all: one file-level issue,
/// zero rows.
fn unreadable<T>(err: &anyhow::Error) -> CleanedDataset<T> {
    let mut data = CleanedDataset::empty();
    data.issues.push(ValidationIssue::new(
        0,
        "FILE",
        None,
        format!("file could not be processed: {:#}", err),
    ));
    data
}

/// Clean every provided file and build the upload's validation report.
///
/// Returns the cleaned bundle (for the loader) and the report (for the
/// caller). The bundle and report are consistent: records excluded by an
/// issue never appear in the bundle.
pub fn clean_all_files(
    files: &UploadFiles<'_>,
    persisted: &PersistedRosters,
    config: &PipelineConfig,
) -> anyhow::Result<(CleanedBundle, ValidationReport)> {
    let mut bundle = CleanedBundle::default();
    let mut file_reports = Vec::new();

    if let Some(path) = files.timecard {
        let resolver = HeaderResolver::new(DatasetKind::Timecard)?;
        let mut data = match reader::read_table(path) {
            Ok(table) => validate::clean_timecard(&table, &resolver),
            Err(e) => unreadable(&e),
        };
        let (kept, dup_issues) = dedup::dedup(
            std::mem::take(&mut data.records),
            dedup::timecard_key,
            "employee_id+work_date+project_name",
        );
        data.records = kept;
        data.issues.extend(dup_issues);
        file_reports.push(FileReport::from_counts(
            &filename(path),
            DatasetKind::Timecard,
            data.total_rows,
            data.records.len(),
            data.issues.clone(),
            data.header_warnings.clone(),
        ));
        bundle.timecard = Some(data);
    }

    if let Some(path) = files.employee {
        let resolver = HeaderResolver::new(DatasetKind::Employee)?;
        let mut data = match reader::read_table(path) {
            Ok(table) => validate::clean_employee(&table, &resolver, config.annual_hours_divisor),
            Err(e) => unreadable(&e),
        };
        let (kept, dup_issues) = dedup::dedup(
            std::mem::take(&mut data.records),
            dedup::employee_key,
            "employee_id",
        );
        data.records = kept;
        data.issues.extend(dup_issues);
        file_reports.push(FileReport::from_counts(
            &filename(path),
            DatasetKind::Employee,
            data.total_rows,
            data.records.len(),
            data.issues.clone(),
            data.header_warnings.clone(),
        ));
        bundle.employee = Some(data);
    }

    if let Some(path) = files.project {
        let resolver = HeaderResolver::new(DatasetKind::Project)?;
        let mut data = match reader::read_table(path) {
            Ok(table) => validate::clean_project(&table, &resolver),
            Err(e) => unreadable(&e),
        };
        let (kept, dup_issues) = dedup::dedup(
            std::mem::take(&mut data.records),
            dedup::project_key,
            "project_name",
        );
        data.records = kept;
        data.issues.extend(dup_issues);
        file_reports.push(FileReport::from_counts(
            &filename(path),
            DatasetKind::Project,
            data.total_rows,
            data.records.len(),
            data.issues.clone(),
            data.header_warnings.clone(),
        ));
        bundle.project = Some(data);
    }

    // Referential check: prefer keys from this upload; fall back to the
    // persisted roster for whichever file is absent.
    let referential_issues = match &bundle.timecard {
        Some(timecard) if !timecard.records.is_empty() => {
            let employee_ids = match &bundle.employee {
                Some(d) => Some(d.records.iter().map(|r| r.record.employee_id.clone()).collect()),
                None => persisted.employee_ids.clone(),
            };
            let project_names = match &bundle.project {
                Some(d) => Some(d.records.iter().map(|r| r.record.project_name.clone()).collect()),
                None => persisted.project_names.clone(),
            };
            let rosters = Rosters { employee_ids, project_names };
            integrity::check_references(&timecard.records, &rosters)
        }
        _ => Vec::new(),
    };

    let report = build_report(file_reports, referential_issues);
    Ok((bundle, report))
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn temp_csv(content: &str) -> tempfile::NamedTempFile {
        let mut f = tempfile::Builder::new().suffix(".csv").tempfile().unwrap();
        f.write_all(content.as_bytes()).unwrap();
        f.flush().unwrap();
        f
    }

    #[test]
    fn test_clean_all_three_files_consistent() {
        let timecard = temp_csv(
            "EMP_ID,Name,DATE,HOURS,PROJECT\n\
             e001,Ana,2024-01-15,8,apollo\n\
             e001,Ana,2024-01-15,8,apollo\n",
        );
        let employee = temp_csv("EMPLOYEE_ID,Name,CTC\nE001,Ana,1920000\n");
        let project = temp_csv("Name,SOW\napollo,50000\n");

        let files = UploadFiles {
            timecard: Some(timecard.path()),
            employee: Some(employee.path()),
            project: Some(project.path()),
        };
        let (bundle, report) =
            clean_all_files(&files, &PersistedRosters::default(), &PipelineConfig::default()).unwrap();

        assert_eq!(report.total_files, 3);
        // The duplicate timecard row was dropped and reported.
        assert_eq!(bundle.timecard.as_ref().unwrap().records.len(), 1);
        assert_eq!(report.files[0].valid_rows, 1);
        assert_eq!(report.files[0].invalid_rows, 1);
        assert!(report.referential_issues.is_empty());
        assert!(report.has_errors); // the duplicate issue
    }

    #[test]
    fn test_referential_issue_against_batch_rosters() {
        let timecard = temp_csv("EMP_ID,Name,DATE,HOURS,PROJECT\ne999,Ana,2024-01-15,8,apollo\n");
        let employee = temp_csv("EMPLOYEE_ID,Name,CTC\nE001,Ana,1920000\n");
        let project = temp_csv("Name,SOW\napollo,50000\n");

        let files = UploadFiles {
            timecard: Some(timecard.path()),
            employee: Some(employee.path()),
            project: Some(project.path()),
        };
        let (_, report) =
            clean_all_files(&files, &PersistedRosters::default(), &PipelineConfig::default()).unwrap();

        assert_eq!(report.referential_issues.len(), 1);
        assert_eq!(report.referential_issues[0].value.as_deref(), Some("E999"));
        assert!(report.blocks_load(0));
    }

    #[test]
    fn test_timecard_only_upload_uses_persisted_rosters() {
        let timecard = temp_csv("EMP_ID,Name,DATE,HOURS,PROJECT\ne001,Ana,2024-01-15,8,apollo\n");
        let files = UploadFiles {
            timecard: Some(timecard.path()),
            ..UploadFiles::default()
        };
        let persisted = PersistedRosters {
            employee_ids: Some(["E001".to_string()].into_iter().collect()),
            project_names: Some(["APOLLO".to_string()].into_iter().collect()),
        };
        let (_, report) =
            clean_all_files(&files, &persisted, &PipelineConfig::default()).unwrap();
        assert!(report.referential_issues.is_empty());
        assert!(!report.has_errors);
    }

    #[test]
    fn test_unreadable_file_is_fatal_for_that_file_only() {
        let employee = temp_csv("EMPLOYEE_ID,Name,CTC\nE001,Ana,1920000\n");
        let files = UploadFiles {
            timecard: Some(Path::new("/nonexistent/file.csv")),
            employee: Some(employee.path()),
            ..UploadFiles::default()
        };
        let (bundle, report) =
            clean_all_files(&files, &PersistedRosters::default(), &PipelineConfig::default()).unwrap();

        assert!(bundle.timecard.as_ref().unwrap().records.is_empty());
        assert_eq!(report.files[0].issues[0].column, "FILE");
        // The employee file still processed.
        assert_eq!(bundle.employee.as_ref().unwrap().records.len(), 1);
        assert_eq!(report.files[1].valid_rows, 1);
    }

    #[test]
    fn test_scenario_invalid_date_counts() {
        let timecard = temp_csv("EMP_ID,Name,DATE,HOURS,PROJECT\ne001,Ana,2024-13-01,8,apollo\n");
        let files = UploadFiles {
            timecard: Some(timecard.path()),
            ..UploadFiles::default()
        };
        let (_, report) =
            clean_all_files(&files, &PersistedRosters::default(), &PipelineConfig::default()).unwrap();

        let file = &report.files[0];
        assert_eq!(file.total_rows, 1);
        assert_eq!(file.valid_rows, 0);
        assert_eq!(file.invalid_rows, 1);
        assert_eq!(file.issues[0].column, "work_date");
        assert!(file.issues[0].error.contains("invalid date format"));
    }
}

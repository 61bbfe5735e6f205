//! Validation report types and the pure aggregation that builds them.
//!
//! Nothing here touches files or the database; the report is assembled from
//! the per-file cleaning results and the referential issue list so its shape
//! can be tested on its own.

use serde::Serialize;

use crate::model::DatasetKind;

/// One problem found while cleaning: where, what, and why.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValidationIssue {
    /// Row number in the source file (1-indexed, header is row 1).
    /// Row 0 means a file-level problem (unreadable file, missing column).
    pub row: usize,
    pub column: String,
    pub value: Option<String>,
    pub error: String,
}

impl ValidationIssue {
    pub fn new(row: usize, column: &str, value: Option<String>, error: impl Into<String>) -> Self {
        Self {
            row,
            column: column.to_string(),
            value,
            error: error.into(),
        }
    }
}

/// Per-file cleaning result.
#[derive(Debug, Clone, Serialize)]
pub struct FileReport {
    pub filename: String,
    pub kind: String,
    pub total_rows: usize,
    pub valid_rows: usize,
    pub invalid_rows: usize,
    pub issues: Vec<ValidationIssue>,
    /// Raw headers that matched no known synonym. Informational only.
    pub header_warnings: Vec<String>,
}

impl FileReport {
    pub fn from_counts(
        filename: &str,
        kind: DatasetKind,
        total_rows: usize,
        valid_rows: usize,
        issues: Vec<ValidationIssue>,
        header_warnings: Vec<String>,
    ) -> Self {
        Self {
            filename: filename.to_string(),
            kind: kind.as_str().to_string(),
            total_rows,
            valid_rows,
            invalid_rows: total_rows.saturating_sub(valid_rows),
            issues,
            header_warnings,
        }
    }
}

/// Everything the caller needs to know about one upload's validation.
#[derive(Debug, Clone, Serialize)]
pub struct ValidationReport {
    pub files: Vec<FileReport>,
    pub total_files: usize,
    pub total_valid_rows: usize,
    pub total_invalid_rows: usize,
    pub referential_issues: Vec<ValidationIssue>,
    pub has_errors: bool,
}

/// Aggregate per-file results and the cross-file issues into one report.
/// Header warnings do not count as errors.
pub fn build_report(files: Vec<FileReport>, referential_issues: Vec<ValidationIssue>) -> ValidationReport {
    let total_files = files.len();
    let total_valid_rows = files.iter().map(|f| f.valid_rows).sum();
    let total_invalid_rows = files.iter().map(|f| f.invalid_rows).sum();
    let has_errors =
        files.iter().any(|f| !f.issues.is_empty()) || !referential_issues.is_empty();

    ValidationReport {
        files,
        total_files,
        total_valid_rows,
        total_invalid_rows,
        referential_issues,
        has_errors,
    }
}

impl ValidationReport {
    /// Whether this report should stop the batch loader from running.
    /// Row-level issues never block (their rows are already excluded);
    /// referential violations block once they exceed the configured
    /// threshold.
    pub fn blocks_load(&self, max_referential_violations: usize) -> bool {
        self.referential_issues.len() > max_referential_violations
    }
}

// =============================================================================
// TESTS
// =============================================================================

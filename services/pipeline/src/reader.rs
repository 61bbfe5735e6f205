//! File reading: turns an uploaded .csv/.xls/.xlsx file into a uniform
//! header row + grid of cells. No validation happens here; cells keep
//! whatever the file gave us and the validator sorts it out.

use std::path::Path;

use anyhow::{bail, Context, Result};
use calamine::{open_workbook_auto, Data, Reader};
use chrono::{Duration, NaiveDate};

/// One cell, as close to the source representation as practical.
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Empty,
    Text(String),
    Number(f64),
    Date(NaiveDate),
    Bool(bool),
}

impl Cell {
    pub fn is_empty(&self) -> bool {
        match self {
            Cell::Empty => true,
            Cell::Text(s) => s.trim().is_empty(),
            _ => false,
        }
    }

    /// Display form for error messages.
    pub fn display(&self) -> Option<String> {
        match self {
            Cell::Empty => None,
            Cell::Text(s) => Some(s.clone()),
            Cell::Number(n) => Some(format!("{}", n)),
            Cell::Date(d) => Some(d.to_string()),
            Cell::Bool(b) => Some(b.to_string()),
        }
    }
}

/// Raw content of one file: the header row plus all data rows.
#[derive(Debug)]
pub struct RawTable {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<Cell>>,
}

/// Read a spreadsheet file, dispatching on extension.
pub fn read_table(path: &Path) -> Result<RawTable> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .unwrap_or_default();

    match ext.as_str() {
        "csv" => read_csv(path),
        "xls" | "xlsx" => read_excel(path),
        other => bail!("unsupported file extension '{}' (expected .csv, .xls or .xlsx)", other),
    }
}

/// Parse CSV content. Tolerates ragged rows, trims every field, strips a
/// UTF-8 BOM, and falls back to Windows-1252 for non-UTF-8 exports.
fn read_csv(path: &Path) -> Result<RawTable> {
    let bytes = std::fs::read(path)
        .with_context(|| format!("failed to read {}", path.display()))?;

    let content = match std::str::from_utf8(&bytes) {
        Ok(s) => s.to_string(),
        Err(_) => {
            let (decoded, _, _) = encoding_rs::WINDOWS_1252.decode(&bytes);
            decoded.into_owned()
        }
    };
    let content = content.strip_prefix('\u{feff}').unwrap_or(&content);

    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(content.as_bytes());

    let headers: Vec<String> = reader
        .headers()
        .context("failed to read CSV header row")?
        .iter()
        .map(|h| h.to_string())
        .collect();

    let mut rows = Vec::new();
    for result in reader.records() {
        let record = result.context("CSV parse error")?;
        let row: Vec<Cell> = record
            .iter()
            .map(|field| {
                if field.is_empty() {
                    Cell::Empty
                } else {
                    Cell::Text(field.to_string())
                }
            })
            .collect();
        rows.push(row);
    }

    Ok(RawTable { headers, rows })
}

/// Read the first sheet of an Excel workbook.
fn read_excel(path: &Path) -> Result<RawTable> {
    let mut workbook = open_workbook_auto(path)
        .with_context(|| format!("failed to open {}", path.display()))?;

    let sheet_names = workbook.sheet_names().to_vec();
    let sheet_name = sheet_names
        .first()
        .context("workbook has no sheets")?
        .clone();

    let range = workbook
        .worksheet_range(&sheet_name)
        .context("failed to read sheet")?;

    let mut row_iter = range.rows();
    let headers: Vec<String> = row_iter
        .next()
        .context("sheet has no header row")?
        .iter()
        .map(|cell| match cell {
            Data::String(s) => s.trim().to_string(),
            Data::Empty => String::new(),
            other => format!("{}", other),
        })
        .collect();

    let rows: Vec<Vec<Cell>> = row_iter
        .map(|row| row.iter().map(convert_cell).collect())
        .collect();

    Ok(RawTable { headers, rows })
}

fn convert_cell(data: &Data) -> Cell {
    match data {
        Data::Empty => Cell::Empty,
        Data::String(s) => {
            if s.trim().is_empty() {
                Cell::Empty
            } else {
                Cell::Text(s.trim().to_string())
            }
        }
        Data::Float(f) => Cell::Number(*f),
        Data::Int(i) => Cell::Number(*i as f64),
        Data::Bool(b) => Cell::Bool(*b),
        Data::DateTime(dt) => match excel_serial_to_date(dt.as_f64()) {
            Some(date) => Cell::Date(date),
            None => Cell::Text(format!("{}", dt.as_f64())),
        },
        Data::DateTimeIso(s) | Data::DurationIso(s) => Cell::Text(s.clone()),
        Data::Error(e) => Cell::Text(format!("{:?}", e)),
    }
}

/// Excel serial day numbers count from 1899-12-30.
pub fn excel_serial_to_date(serial: f64) -> Option<NaiveDate> {
    if !serial.is_finite() || serial < 1.0 || serial > 2_958_465.0 {
        return None;
    }
    NaiveDate::from_ymd_opt(1899, 12, 30)
        .and_then(|base| base.checked_add_signed(Duration::days(serial.trunc() as i64)))
}

// =============================================================================
// TESTS
// =============================================================================

//! Pipeline CLI - Cleans and loads margin-portal spreadsheets
//!
//! Responsibilities:
//! - Read timecard / employee / project files (.csv, .xls, .xlsx)
//! - Resolve headers, validate rows, deduplicate, cross-check references
//! - Print the validation report
//! - Load cleaned data into Postgres in one atomic batch
//!
//! Usage:
//!   # Validate and load all three files:
//!   cargo run --bin pipeline -- --timecard tc.xlsx --employee emp.xlsx --project proj.xlsx
//!
//!   # Validate only, nothing written:
//!   cargo run --bin pipeline -- --timecard tc.xlsx --dry-run

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;

use pipeline::clean::{clean_all_files, PersistedRosters, UploadFiles};
use pipeline::config::PipelineConfig;
use pipeline::load::{BatchLoader, LoadStatus};
use pipeline::report::{ValidationIssue, ValidationReport};
use pipeline::store::{PgStore, Store};

#[derive(Parser, Debug)]
#[command(name = "pipeline", about = "Cleans and loads margin-portal spreadsheets")]
struct Args {
    /// Timecard file (.csv, .xls, .xlsx)
    #[arg(long)]
    timecard: Option<PathBuf>,

    /// Employee cost file (.csv, .xls, .xlsx)
    #[arg(long)]
    employee: Option<PathBuf>,

    /// Project budget file (.csv, .xls, .xlsx)
    #[arg(long)]
    project: Option<PathBuf>,

    /// Dry run - validate only, don't load to database
    #[arg(long, default_value = "false")]
    dry_run: bool,
}

fn print_issues(issues: &[ValidationIssue]) {
    for issue in issues.iter().take(5) {
        let value = issue
            .value
            .as_deref()
            .map(|v| format!(" value='{}'", v))
            .unwrap_or_default();
        println!("    row {} [{}]{}: {}", issue.row, issue.column, value, issue.error);
    }
    if issues.len() > 5 {
        println!("    ... and {} more", issues.len() - 5);
    }
}

fn print_report(report: &ValidationReport) {
    println!("\n=== Validation Report ===");
    for file in &report.files {
        println!("\n[{}] {}", file.kind, file.filename);
        println!(
            "  Rows: {} total, {} valid, {} invalid",
            file.total_rows, file.valid_rows, file.invalid_rows
        );
        if !file.header_warnings.is_empty() {
            println!("  Unrecognized columns: {}", file.header_warnings.join(", "));
        }
        if !file.issues.is_empty() {
            println!("  Issues ({}):", file.issues.len());
            print_issues(&file.issues);
        }
    }
    if !report.referential_issues.is_empty() {
        println!("\nReferential issues ({}):", report.referential_issues.len());
        print_issues(&report.referential_issues);
    }
    println!(
        "\nTotals: {} files, {} valid rows, {} invalid rows, errors: {}",
        report.total_files, report.total_valid_rows, report.total_invalid_rows, report.has_errors
    );
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let args = Args::parse();
    let config = PipelineConfig::from_env()?;

    let files = UploadFiles {
        timecard: args.timecard.as_deref(),
        employee: args.employee.as_deref(),
        project: args.project.as_deref(),
    };
    if files.is_empty() {
        anyhow::bail!(
            "No input files. Provide at least one of --timecard, --employee, --project"
        );
    }

    println!("=== Margin Portal Pipeline ===");
    println!("Mode: {}", if args.dry_run { "dry-run" } else { "live" });
    for (label, path) in [
        ("Timecard", files.timecard),
        ("Employee", files.employee),
        ("Project", files.project),
    ] {
        if let Some(p) = path {
            println!("{}: {}", label, p.display());
        }
    }

    // The store is needed to load, and to fetch rosters when a timecard
    // arrives without its companion files. Dry runs without DB_URL still
    // validate; the affected referential check is skipped with a warning.
    let store: Option<Arc<dyn Store>> = match std::env::var("DB_URL") {
        Ok(db_url) => {
            println!("Connecting to database...");
            let store: Arc<dyn Store> = Arc::new(PgStore::connect(&db_url, 5).await?);
            Some(store)
        }
        Err(_) if args.dry_run => None,
        Err(_) => anyhow::bail!("DB_URL env var missing (required unless --dry-run)"),
    };

    let mut persisted = PersistedRosters::default();
    if files.timecard.is_some() {
        if let Some(store) = &store {
            if files.employee.is_none() {
                persisted.employee_ids = Some(store.employee_roster().await?);
            }
            if files.project.is_none() {
                persisted.project_names = Some(store.project_roster().await?);
            }
        } else if files.employee.is_none() || files.project.is_none() {
            eprintln!("Warning: no database connection; referential check against persisted data skipped");
        }
    }

    let (bundle, report) = clean_all_files(&files, &persisted, &config)?;
    print_report(&report);

    if args.dry_run {
        println!("\nDry run - nothing loaded");
        return Ok(());
    }

    if report.blocks_load(config.max_referential_violations) {
        anyhow::bail!(
            "load blocked: {} referential violations exceed the allowed {}",
            report.referential_issues.len(),
            config.max_referential_violations
        );
    }

    if bundle.is_empty() {
        println!("\nNo valid rows to load");
        return Ok(());
    }

    let store = store.context("store unavailable")?;
    let loader = BatchLoader::new(store, config.chunk_size);

    println!("\n=== Loading ===");
    let result = loader.load_all(&bundle, None).await;

    println!("Batch: {}", result.batch_id);
    println!("Status: {}", result.status.as_str());
    for dataset in &result.datasets {
        println!("  {}: {} rows", dataset.dataset, dataset.rows_processed);
        for err in &dataset.errors {
            println!("    ! {}", err);
        }
    }
    println!(
        "Total: {} rows in {:.2}s",
        result.total_rows_processed, result.duration_seconds
    );
    for err in &result.errors {
        eprintln!("Error: {}", err);
    }

    if result.status == LoadStatus::Failed {
        anyhow::bail!("load failed, transaction rolled back");
    }

    println!("\n=== Load Complete ===");
    Ok(())
}

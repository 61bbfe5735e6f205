//! Margin Portal ingestion pipeline
//!
//! Turns user-supplied timecard / employee-cost / project-budget spreadsheets
//! into validated, deduplicated, referentially-consistent records and loads
//! them into Postgres in one atomic, chunked, batch-tracked transaction.
//!
//! Stages:
//! - Resolve synonymous column headers to canonical fields
//! - Validate and coerce each row (all problems reported, bad rows excluded)
//! - Deduplicate within each file (exact rows, then business keys)
//! - Cross-check time entries against the employee and project rosters
//! - Load in dependency order: employees and projects upsert, timecards append
//!
//! Read paths (margins, projects, ask) route every outgoing row through
//! redaction so compensation figures never leave the system.

pub mod clean;
pub mod config;
pub mod dedup;
pub mod headers;
pub mod integrity;
pub mod load;
pub mod margins;
pub mod model;
pub mod reader;
pub mod redact;
pub mod report;
pub mod sqlguard;
pub mod store;
pub mod validate;

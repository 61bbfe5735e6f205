//! Margin aggregation: per-project margin rows and fleet-wide summary,
//! with a short-lived cache and redaction-routed output.
//!
//! The aggregator only reads persisted data. Its cache is the one piece of
//! mutable state it owns; expiry is decided against a caller-supplied
//! instant so it can be tested without waiting.

use std::sync::{Arc, RwLock};
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::redact;
use crate::store::Store;

/// Per-project margin figures. Payload keys are camelCase for the dashboard.
/// This shape carries no employee-level cost fields.
#[derive(Debug, Clone, PartialEq, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct MarginRow {
    pub project_name: String,
    pub total_hours: f64,
    pub budget: f64,
    pub gross_margin_percentage: f64,
}

/// Fleet-wide rollup.
#[derive(Debug, Clone, PartialEq, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct MarginSummary {
    pub total_projects: i64,
    pub total_hours: f64,
    pub total_budget: f64,
    pub average_margin_percentage: f64,
}

/// Optional filters applied to the cached row set.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MarginFilter {
    pub project_name: Option<String>,
    pub min_margin: Option<f64>,
    pub max_margin: Option<f64>,
    pub min_hours: Option<f64>,
    pub max_hours: Option<f64>,
}

impl MarginFilter {
    fn matches(&self, row: &MarginRow) -> bool {
        if let Some(name) = &self.project_name {
            if !row.project_name.to_uppercase().contains(&name.to_uppercase()) {
                return false;
            }
        }
        if matches!(self.min_margin, Some(m) if row.gross_margin_percentage < m) {
            return false;
        }
        if matches!(self.max_margin, Some(m) if row.gross_margin_percentage > m) {
            return false;
        }
        if matches!(self.min_hours, Some(h) if row.total_hours < h) {
            return false;
        }
        if matches!(self.max_hours, Some(h) if row.total_hours > h) {
            return false;
        }
        true
    }
}

/// Single-slot cache with a time-to-live, expiry judged against the instant
/// the caller passes in. A poisoned lock degrades to a miss, never a stale
/// or partial read.
pub struct TtlCache<T> {
    ttl: Duration,
    slot: RwLock<Option<(Instant, T)>>,
}

impl<T: Clone> TtlCache<T> {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            slot: RwLock::new(None),
        }
    }

    pub fn get(&self, now: Instant) -> Option<T> {
        let guard = self.slot.read().ok()?;
        match guard.as_ref() {
            Some((at, value)) if now.duration_since(*at) < self.ttl => Some(value.clone()),
            _ => None,
        }
    }

    pub fn put(&self, now: Instant, value: T) {
        if let Ok(mut guard) = self.slot.write() {
            *guard = Some((now, value));
        }
    }

    pub fn invalidate(&self) {
        if let Ok(mut guard) = self.slot.write() {
            *guard = None;
        }
    }
}

pub struct MarginService {
    store: Arc<dyn Store>,
    rows_cache: TtlCache<Vec<MarginRow>>,
    summary_cache: TtlCache<MarginSummary>,
}

impl MarginService {
    pub fn new(store: Arc<dyn Store>, cache_ttl: Duration) -> Self {
        Self {
            store,
            rows_cache: TtlCache::new(cache_ttl),
            summary_cache: TtlCache::new(cache_ttl),
        }
    }

    /// Redacted, filtered margin rows. The redaction pass is mandatory even
    /// though the row shape carries no cost fields; if it errors the error
    /// is returned, not the rows.
    pub async fn project_margins(&self, filter: &MarginFilter) -> Result<Vec<Value>> {
        let rows = self.rows(Instant::now()).await?;
        let filtered: Vec<MarginRow> = rows.into_iter().filter(|r| filter.matches(r)).collect();
        redacted_values(&filtered)
    }

    /// Redacted summary statistics.
    pub async fn margin_summary(&self) -> Result<Value> {
        let now = Instant::now();
        let summary = match self.summary_cache.get(now) {
            Some(s) => s,
            None => {
                let s = self.store.margin_summary().await?;
                self.summary_cache.put(now, s.clone());
                s
            }
        };
        let mut values = redacted_values(&[summary])?;
        values.pop().context("summary redaction produced no row")
    }

    /// Drop both caches; the next read recomputes from the store.
    pub fn refresh(&self) {
        self.rows_cache.invalidate();
        self.summary_cache.invalidate();
    }

    async fn rows(&self, now: Instant) -> Result<Vec<MarginRow>> {
        if let Some(rows) = self.rows_cache.get(now) {
            return Ok(rows);
        }
        let rows = self.store.margin_rows().await?;
        self.rows_cache.put(now, rows.clone());
        Ok(rows)
    }
}

/// Serialize rows and pass them through redaction. Anything that is not a
/// JSON object after serialization is an internal error, surfaced as such.
fn redacted_values<T: Serialize>(rows: &[T]) -> Result<Vec<Value>> {
    let mut maps = Vec::with_capacity(rows.len());
    for row in rows {
        match serde_json::to_value(row).context("failed to serialize margin row")? {
            Value::Object(map) => maps.push(map),
            other => anyhow::bail!("expected object row, got {}", other),
        }
    }
    Ok(redact::redact_rows(maps)?
        .into_iter()
        .map(Value::Object)
        .collect())
}

// =============================================================================
// TESTS
// =============================================================================

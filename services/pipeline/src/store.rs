//! Transactional store port and its Postgres implementation.
//!
//! The loader and read paths depend on these traits, not on sqlx directly;
//! every statement in the Postgres implementation uses bind parameters, and
//! the upserts key on the datasets' business keys. Time entries additionally
//! carry a natural-key uniqueness constraint in the schema
//! (employee_id, work_date, project_name), so a replayed append cannot
//! double-apply.

use std::collections::HashSet;

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::PgPoolOptions;
use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

use crate::margins::{MarginRow, MarginSummary};
use crate::model::{EmployeeCost, ProjectBudget, TimeEntry};

/// One row of the append-only batch audit.
#[derive(Debug, Clone)]
pub struct BatchRecord {
    pub batch_id: Uuid,
    pub status: String,
    pub detail: serde_json::Value,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

/// Basic project listing row.
#[derive(Debug, Clone, serde::Serialize, sqlx::FromRow)]
pub struct ProjectInfo {
    pub project_name: String,
    pub budget: f64,
    pub project_id: Option<i64>,
}

/// Read side plus transaction entry point.
#[async_trait]
pub trait Store: Send + Sync {
    async fn begin(&self) -> Result<Box<dyn StoreTx>>;

    /// Canonical employee ids currently persisted.
    async fn employee_roster(&self) -> Result<HashSet<String>>;
    /// Canonical project names currently persisted.
    async fn project_roster(&self) -> Result<HashSet<String>>;

    /// Append one row to the batch audit, outside any load transaction, so
    /// failed loads leave a trail too.
    async fn record_batch(&self, batch: &BatchRecord) -> Result<()>;

    async fn margin_rows(&self) -> Result<Vec<MarginRow>>;
    async fn margin_summary(&self) -> Result<MarginSummary>;
    async fn projects(&self) -> Result<Vec<ProjectInfo>>;
}

/// One load transaction. All writes go through here; nothing is visible
/// until `commit`.
#[async_trait]
pub trait StoreTx: Send {
    /// Upsert a chunk of employees keyed on employee_id. Returns rows
    /// processed.
    async fn upsert_employees(&mut self, chunk: &[EmployeeCost]) -> Result<u64>;
    /// Upsert a chunk of projects keyed on project_name. Returns rows
    /// processed.
    async fn upsert_projects(&mut self, chunk: &[ProjectBudget]) -> Result<u64>;
    /// Append a chunk of time entries. Rows whose natural key is already
    /// persisted are skipped, not overwritten. Returns rows actually
    /// inserted.
    async fn append_time_entries(&mut self, batch_id: Uuid, chunk: &[TimeEntry]) -> Result<u64>;

    async fn commit(self: Box<Self>) -> Result<()>;
    async fn rollback(self: Box<Self>) -> Result<()>;
}

// =============================================================================
// Postgres implementation
// =============================================================================

const MARGIN_QUERY: &str = r#"
SELECT p.project_name,
       COALESCE(SUM(t.hours_worked), 0)::float8 AS total_hours,
       p.budget,
       (CASE WHEN p.budget > 0
             THEN ((p.budget - COALESCE(SUM(t.hours_worked * e.hourly_cost), 0)) / p.budget) * 100
             ELSE 0
        END)::float8 AS gross_margin_percentage
FROM project p
LEFT JOIN timecard t ON t.project_name = p.project_name
LEFT JOIN employee e ON e.employee_id = t.employee_id
GROUP BY p.project_name, p.budget
ORDER BY p.project_name
"#;

pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub async fn connect(db_url: &str, max_connections: u32) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(db_url)
            .await
            .context("Failed to connect to database")?;
        Ok(Self { pool })
    }
}

#[async_trait]
impl Store for PgStore {
    async fn begin(&self) -> Result<Box<dyn StoreTx>> {
        let tx = self.pool.begin().await.context("failed to begin transaction")?;
        Ok(Box::new(PgTx { tx }))
    }

    async fn employee_roster(&self) -> Result<HashSet<String>> {
        let ids: Vec<String> = sqlx::query_scalar("SELECT employee_id FROM employee")
            .fetch_all(&self.pool)
            .await?;
        Ok(ids.into_iter().collect())
    }

    async fn project_roster(&self) -> Result<HashSet<String>> {
        let names: Vec<String> = sqlx::query_scalar("SELECT project_name FROM project")
            .fetch_all(&self.pool)
            .await?;
        Ok(names.into_iter().collect())
    }

    async fn record_batch(&self, batch: &BatchRecord) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO load_batches (batch_id, status, detail, started_at, finished_at)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(batch.batch_id)
        .bind(&batch.status)
        .bind(&batch.detail)
        .bind(batch.started_at)
        .bind(batch.finished_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn margin_rows(&self) -> Result<Vec<MarginRow>> {
        let rows: Vec<MarginRow> = sqlx::query_as(MARGIN_QUERY).fetch_all(&self.pool).await?;
        Ok(rows)
    }

    async fn margin_summary(&self) -> Result<MarginSummary> {
        let summary: MarginSummary = sqlx::query_as(&format!(
            r#"
            SELECT COUNT(*)::bigint AS total_projects,
                   COALESCE(SUM(total_hours), 0)::float8 AS total_hours,
                   COALESCE(SUM(budget), 0)::float8 AS total_budget,
                   COALESCE(AVG(gross_margin_percentage), 0)::float8 AS average_margin_percentage
            FROM ({}) m
            "#,
            MARGIN_QUERY
        ))
        .fetch_one(&self.pool)
        .await?;
        Ok(summary)
    }

    async fn projects(&self) -> Result<Vec<ProjectInfo>> {
        let rows: Vec<ProjectInfo> = sqlx::query_as(
            "SELECT project_name, budget, project_id FROM project ORDER BY project_name",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }
}

struct PgTx {
    tx: Transaction<'static, Postgres>,
}

#[async_trait]
impl StoreTx for PgTx {
    async fn upsert_employees(&mut self, chunk: &[EmployeeCost]) -> Result<u64> {
        let mut processed = 0;
        for rec in chunk {
            sqlx::query(
                r#"
                INSERT INTO employee (employee_id, employee_name, annual_cost, hourly_cost)
                VALUES ($1, $2, $3, $4)
                ON CONFLICT (employee_id) DO UPDATE
                SET employee_name = EXCLUDED.employee_name,
                    annual_cost = EXCLUDED.annual_cost,
                    hourly_cost = EXCLUDED.hourly_cost
                "#,
            )
            .bind(&rec.employee_id)
            .bind(&rec.employee_name)
            .bind(rec.annual_cost)
            .bind(rec.hourly_cost)
            .execute(&mut *self.tx)
            .await
            .with_context(|| format!("employee upsert failed for {}", rec.employee_id))?;
            processed += 1;
        }
        Ok(processed)
    }

    async fn upsert_projects(&mut self, chunk: &[ProjectBudget]) -> Result<u64> {
        let mut processed = 0;
        for rec in chunk {
            sqlx::query(
                r#"
                INSERT INTO project (project_name, budget, project_id)
                VALUES ($1, $2, $3)
                ON CONFLICT (project_name) DO UPDATE
                SET budget = EXCLUDED.budget,
                    project_id = COALESCE(EXCLUDED.project_id, project.project_id)
                "#,
            )
            .bind(&rec.project_name)
            .bind(rec.budget)
            .bind(rec.project_id)
            .execute(&mut *self.tx)
            .await
            .with_context(|| format!("project upsert failed for {}", rec.project_name))?;
            processed += 1;
        }
        Ok(processed)
    }

    async fn append_time_entries(&mut self, batch_id: Uuid, chunk: &[TimeEntry]) -> Result<u64> {
        let mut inserted = 0;
        for rec in chunk {
            let result = sqlx::query(
                r#"
                INSERT INTO timecard
                (employee_id, employee_name, work_date, hours_worked, project_name, status, task_type, batch_id)
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
                ON CONFLICT (employee_id, work_date, project_name) DO NOTHING
                "#,
            )
            .bind(&rec.employee_id)
            .bind(&rec.employee_name)
            .bind(rec.work_date)
            .bind(rec.hours_worked)
            .bind(&rec.project_name)
            .bind(&rec.status)
            .bind(&rec.task_type)
            .bind(batch_id)
            .execute(&mut *self.tx)
            .await
            .with_context(|| format!("timecard insert failed for {}", rec.employee_id))?;
            inserted += result.rows_affected();
        }
        Ok(inserted)
    }

    async fn commit(self: Box<Self>) -> Result<()> {
        self.tx.commit().await.context("commit failed")
    }

    async fn rollback(self: Box<Self>) -> Result<()> {
        self.tx.rollback().await.context("rollback failed")
    }
}

// =============================================================================
// In-memory store for tests
// =============================================================================

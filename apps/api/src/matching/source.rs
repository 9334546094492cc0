//! Storage collaborator port: where candidate jobs come from.
//!
//! `PgJobSource` reads the scraped `job_listings` table; `InMemoryJobSource`
//! serves tests and demos without a database.

use anyhow::Context;
use async_trait::async_trait;
use chrono::{DateTime, Duration, NaiveDateTime, Utc};
use sqlx::PgPool;
use tracing::debug;

use crate::matching::filters::SearchFilters;
use crate::models::{JobRecord, JobRow};

/// Read-only access to the job corpus. Errors propagate to the caller as-is.
#[async_trait]
pub trait JobSource: Send + Sync {
    /// Returns a finite candidate set. Implementations may pre-filter cheaply
    /// on `filters`, but the Filter Evaluator is always applied afterwards.
    async fn fetch_candidates(
        &self,
        filters: Option<&SearchFilters>,
    ) -> anyhow::Result<Vec<JobRecord>>;

    async fn get_job(&self, id: &str) -> anyhow::Result<Option<JobRecord>>;

    async fn count(&self) -> anyhow::Result<i64>;
}

// ────────────────────────────────────────────────────────────────────────────
// Postgres
// ────────────────────────────────────────────────────────────────────────────

const JOB_COLUMNS: &str = "id, title, company, description, location, requirements, \
    skills_required, experience_level, salary_min, salary_max, remote_type, job_type, posted_date";

pub struct PgJobSource {
    pool: PgPool,
    candidate_limit: i64,
}

impl PgJobSource {
    pub fn new(pool: PgPool, candidate_limit: i64) -> Self {
        Self {
            pool,
            candidate_limit,
        }
    }
}

#[async_trait]
impl JobSource for PgJobSource {
    async fn fetch_candidates(
        &self,
        filters: Option<&SearchFilters>,
    ) -> anyhow::Result<Vec<JobRecord>> {
        // Only the age bound is pushed down; undated postings are kept.
        let cutoff = age_cutoff(filters, Utc::now());

        let rows = sqlx::query_as::<_, JobRow>(&format!(
            "SELECT {JOB_COLUMNS} FROM job_listings \
             WHERE ($1::timestamp IS NULL OR posted_date IS NULL OR posted_date >= $1) \
             ORDER BY posted_date DESC NULLS LAST, id ASC \
             LIMIT $2"
        ))
        .bind(cutoff)
        .bind(self.candidate_limit)
        .fetch_all(&self.pool)
        .await
        .context("fetching candidate jobs")?;

        debug!("Fetched {} candidate jobs", rows.len());
        Ok(rows.into_iter().map(JobRecord::from).collect())
    }

    async fn get_job(&self, id: &str) -> anyhow::Result<Option<JobRecord>> {
        let row = sqlx::query_as::<_, JobRow>(&format!(
            "SELECT {JOB_COLUMNS} FROM job_listings WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .with_context(|| format!("fetching job {id}"))?;

        Ok(row.map(JobRecord::from))
    }

    async fn count(&self) -> anyhow::Result<i64> {
        sqlx::query_scalar("SELECT COUNT(*) FROM job_listings")
            .fetch_one(&self.pool)
            .await
            .context("counting jobs")
    }
}

/// Oldest `posted_date` a candidate may carry. An age bound reaching past
/// chrono's range means no cutoff at all.
fn age_cutoff(filters: Option<&SearchFilters>, now: DateTime<Utc>) -> Option<NaiveDateTime> {
    let days = filters?.max_age_days?;
    now.checked_sub_signed(Duration::days(i64::from(days)))
        .map(|cutoff| cutoff.naive_utc())
}

// ────────────────────────────────────────────────────────────────────────────
// In-memory
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default)]
pub struct InMemoryJobSource {
    jobs: Vec<JobRecord>,
}

impl InMemoryJobSource {
    pub fn new(jobs: Vec<JobRecord>) -> Self {
        Self { jobs }
    }
}

#[async_trait]
impl JobSource for InMemoryJobSource {
    async fn fetch_candidates(
        &self,
        _filters: Option<&SearchFilters>,
    ) -> anyhow::Result<Vec<JobRecord>> {
        Ok(self.jobs.clone())
    }

    async fn get_job(&self, id: &str) -> anyhow::Result<Option<JobRecord>> {
        Ok(self.jobs.iter().find(|j| j.id == id).cloned())
    }

    async fn count(&self) -> anyhow::Result<i64> {
        Ok(self.jobs.len() as i64)
    }
}

//! Database operations for the `yearly_stats` table.

use chrono::{DateTime, Utc};
use serde_json::Value;
use sqlx::PgPool;

use crate::DbError;

// ---------------------------------------------------------------------------
// Row type
// ---------------------------------------------------------------------------

/// A row from the `yearly_stats` table.
///
/// `stats` holds the serialized aggregate exactly as it was written; decoding
/// it into a typed value is left to the caller.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct YearlyStatsRow {
    pub id: i64,
    pub subject: String,
    pub year: i32,
    pub stats: Value,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Queries
// ---------------------------------------------------------------------------

/// Return the stored stats for `(subject, year)`, or `None` if absent.
///
/// `subject` must already be lower-cased.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn find_yearly_stats(
    pool: &PgPool,
    subject: &str,
    year: i32,
) -> Result<Option<YearlyStatsRow>, DbError> {
    let row = sqlx::query_as::<_, YearlyStatsRow>(
        "SELECT id, subject, year, stats, created_at, updated_at \
         FROM yearly_stats \
         WHERE subject = $1 AND year = $2",
    )
    .bind(subject)
    .bind(year)
    .fetch_optional(pool)
    .await?;

    Ok(row)
}

/// Return `true` when stats are stored for `(subject, year)`.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn stats_exist(pool: &PgPool, subject: &str, year: i32) -> Result<bool, DbError> {
    let exists: bool = sqlx::query_scalar(
        "SELECT EXISTS (SELECT 1 FROM yearly_stats WHERE subject = $1 AND year = $2)",
    )
    .bind(subject)
    .bind(year)
    .fetch_one(pool)
    .await?;

    Ok(exists)
}

/// Insert or replace the stats for `(subject, year)` and return the stored row.
///
/// Concurrent writers for the same key serialize on the unique constraint;
/// the last one to commit wins. `created_at` is preserved on replace.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the upsert fails.
pub async fn upsert_yearly_stats(
    pool: &PgPool,
    subject: &str,
    year: i32,
    stats: Value,
) -> Result<YearlyStatsRow, DbError> {
    let row = sqlx::query_as::<_, YearlyStatsRow>(
        "INSERT INTO yearly_stats (subject, year, stats) \
         VALUES ($1, $2, $3) \
         ON CONFLICT (subject, year) DO UPDATE \
         SET stats = EXCLUDED.stats, updated_at = NOW() \
         RETURNING id, subject, year, stats, created_at, updated_at",
    )
    .bind(subject)
    .bind(year)
    .bind(stats)
    .fetch_one(pool)
    .await?;

    Ok(row)
}

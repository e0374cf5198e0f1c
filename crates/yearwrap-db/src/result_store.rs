//! Postgres-backed [`ResultStore`] over the `yearly_stats` table.

use async_trait::async_trait;
use sqlx::PgPool;
use yearwrap_core::AggregateResult;
use yearwrap_ingest::{ResultStore, StoreError};

#[derive(Debug, Clone)]
pub struct PgResultStore {
    pool: PgPool,
}

impl PgResultStore {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ResultStore for PgResultStore {
    async fn find(&self, subject: &str, year: i32) -> Result<Option<AggregateResult>, StoreError> {
        let Some(row) = crate::find_yearly_stats(&self.pool, subject, year)
            .await
            .map_err(StoreError::new)?
        else {
            return Ok(None);
        };

        // A row we cannot read back is treated as absent so a fresh fetch
        // overwrites it.
        match serde_json::from_value::<AggregateResult>(row.stats) {
            Ok(result) => Ok(Some(result)),
            Err(e) => {
                tracing::warn!(
                    subject,
                    year,
                    row_id = row.id,
                    error = %e,
                    "stored stats could not be decoded; ignoring"
                );
                Ok(None)
            }
        }
    }

    async fn upsert(&self, result: &AggregateResult) -> Result<AggregateResult, StoreError> {
        let stats = serde_json::to_value(result).map_err(StoreError::new)?;
        let row =
            crate::upsert_yearly_stats(&self.pool, &result.subject, result.year, stats)
                .await
                .map_err(StoreError::new)?;
        serde_json::from_value(row.stats).map_err(StoreError::new)
    }
}

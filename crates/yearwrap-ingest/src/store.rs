//! Persistence boundary for aggregated results.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;
use yearwrap_core::AggregateResult;

use crate::error::StoreError;

/// Read-by-key and upsert-by-key storage for [`AggregateResult`]s, keyed by
/// `(subject, year)`. Subjects are always lower-cased before they get here.
#[async_trait]
pub trait ResultStore: Send + Sync {
    /// # Errors
    ///
    /// Backend failures. A missing key is `Ok(None)`.
    async fn find(&self, subject: &str, year: i32) -> Result<Option<AggregateResult>, StoreError>;

    /// Insert or replace the result for `(result.subject, result.year)` and
    /// return what was stored. Concurrent writers for one key: last wins.
    ///
    /// # Errors
    ///
    /// Backend failures.
    async fn upsert(&self, result: &AggregateResult) -> Result<AggregateResult, StoreError>;
}

/// In-process [`ResultStore`]. Used by tests and dry runs.
#[derive(Debug, Default)]
pub struct MemoryResultStore {
    results: RwLock<HashMap<(String, i32), AggregateResult>>,
}

impl MemoryResultStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.results.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.results.read().await.is_empty()
    }
}

#[async_trait]
impl ResultStore for MemoryResultStore {
    async fn find(&self, subject: &str, year: i32) -> Result<Option<AggregateResult>, StoreError> {
        Ok(self
            .results
            .read()
            .await
            .get(&(subject.to_string(), year))
            .cloned())
    }

    async fn upsert(&self, result: &AggregateResult) -> Result<AggregateResult, StoreError> {
        self.results
            .write()
            .await
            .insert((result.subject.clone(), result.year), result.clone());
        Ok(result.clone())
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::*;
    use crate::aggregate::aggregate;

    fn result(subject: &str, year: i32) -> AggregateResult {
        aggregate(
            subject,
            year,
            &[],
            NaiveDate::from_ymd_opt(year, 1, 3).unwrap(),
        )
    }

    #[tokio::test]
    async fn find_returns_none_when_absent() {
        let store = MemoryResultStore::new();
        assert!(store.find("jack", 2024).await.unwrap().is_none());
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn upsert_replaces_same_key() {
        let store = MemoryResultStore::new();
        store.upsert(&result("jack", 2024)).await.unwrap();

        let mut newer = result("jack", 2024);
        newer.total_likes = 9;
        store.upsert(&newer).await.unwrap();

        assert_eq!(store.len().await, 1);
        let found = store.find("jack", 2024).await.unwrap().unwrap();
        assert_eq!(found.total_likes, 9);
    }

    #[tokio::test]
    async fn years_are_separate_keys() {
        let store = MemoryResultStore::new();
        store.upsert(&result("jack", 2023)).await.unwrap();
        store.upsert(&result("jack", 2024)).await.unwrap();
        assert_eq!(store.len().await, 2);
    }
}

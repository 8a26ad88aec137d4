use async_trait::async_trait;
use serde_json::Value;

use crate::models::error::StoreError;

/// Equality filter and ordering for `RecordStore::select`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecordQuery {
    pub filters: Vec<(String, String)>,
    /// Column to order by and whether the order is descending.
    pub order_by: Option<(String, bool)>,
    pub limit: Option<usize>,
}

impl RecordQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn eq(mut self, column: impl Into<String>, value: impl Into<String>) -> Self {
        self.filters.push((column.into(), value.into()));
        self
    }

    pub fn order_desc(mut self, column: impl Into<String>) -> Self {
        self.order_by = Some((column.into(), true));
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }
}

/// Row-oriented record storage.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Insert one record and return it as stored.
    async fn insert(&self, collection: &str, record: Value) -> Result<Value, StoreError>;

    /// Apply `patch` to every record matching `query`, returning the updated rows.
    async fn update(
        &self,
        collection: &str,
        query: &RecordQuery,
        patch: Value,
    ) -> Result<Vec<Value>, StoreError>;

    async fn select(&self, collection: &str, query: &RecordQuery) -> Result<Vec<Value>, StoreError>;
}

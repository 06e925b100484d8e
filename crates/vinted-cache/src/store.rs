//! The persistence seam and its Postgres implementation.

use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use vinted_core::ItemCollection;
use vinted_db::DbError;

#[async_trait]
pub trait ItemStore: Send + Sync {
    /// Idempotent under concurrent callers with the same `name`.
    async fn lookup_or_create_topic(&self, name: &str) -> Result<i64, DbError>;

    /// Writes the whole batch in one transaction; returns the number of items written.
    async fn upsert_items(&self, topic_id: i64, items: &ItemCollection) -> Result<usize, DbError>;

    async fn items_for_topic(&self, topic_id: i64) -> Result<ItemCollection, DbError>;

    /// When the topic's last batch committed, `None` if never.
    async fn topic_refreshed_at(&self, topic_id: i64) -> Result<Option<DateTime<Utc>>, DbError>;

    async fn health(&self) -> BTreeMap<String, String>;
}

/// [`ItemStore`] over an explicitly constructed Postgres pool.
///
/// Built once at startup and closed once at shutdown via [`PgStore::close`].
#[derive(Debug, Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    #[must_use]
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }
}

#[async_trait]
impl ItemStore for PgStore {
    async fn lookup_or_create_topic(&self, name: &str) -> Result<i64, DbError> {
        vinted_db::lookup_or_create_topic(&self.pool, name).await
    }

    async fn upsert_items(&self, topic_id: i64, items: &ItemCollection) -> Result<usize, DbError> {
        vinted_db::upsert_items(&self.pool, topic_id, items).await
    }

    async fn items_for_topic(&self, topic_id: i64) -> Result<ItemCollection, DbError> {
        vinted_db::items_for_topic(&self.pool, topic_id).await
    }

    async fn topic_refreshed_at(&self, topic_id: i64) -> Result<Option<DateTime<Utc>>, DbError> {
        let topic = vinted_db::get_topic(&self.pool, topic_id).await?;
        Ok(topic.and_then(|t| t.refreshed_at))
    }

    async fn health(&self) -> BTreeMap<String, String> {
        vinted_db::pool_health(&self.pool).await
    }
}

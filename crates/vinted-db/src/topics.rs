//! Database operations for the `topics` table.

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use vinted_core::Topic;

use crate::DbError;

/// A row from the `topics` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct TopicRow {
    pub id: i64,
    pub name: String,
    pub created_at: DateTime<Utc>,
    /// `NULL` until the first batch of items commits under this topic.
    pub refreshed_at: Option<DateTime<Utc>>,
}

impl From<TopicRow> for Topic {
    fn from(row: TopicRow) -> Self {
        Self {
            id: row.id,
            name: row.name,
            created_at: row.created_at,
            refreshed_at: row.refreshed_at,
        }
    }
}

/// Returns the `id` of the topic named `name`, creating it if absent.
///
/// A single `INSERT … ON CONFLICT (name) DO UPDATE … RETURNING id` so that
/// concurrent callers with the same name all receive the one surviving row.
/// The no-op `DO UPDATE` is what makes `RETURNING` yield the existing row.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the statement fails.
pub async fn lookup_or_create_topic(pool: &PgPool, name: &str) -> Result<i64, DbError> {
    let id = sqlx::query_scalar::<_, i64>(
        "INSERT INTO topics (name) VALUES ($1) \
         ON CONFLICT (name) DO UPDATE SET name = EXCLUDED.name \
         RETURNING id",
    )
    .bind(name)
    .fetch_one(pool)
    .await?;

    Ok(id)
}

/// Fetches one topic by `id`.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn get_topic(pool: &PgPool, id: i64) -> Result<Option<TopicRow>, DbError> {
    let row = sqlx::query_as::<_, TopicRow>(
        "SELECT id, name, created_at, refreshed_at FROM topics WHERE id = $1",
    )
    .bind(id)
    .fetch_optional(pool)
    .await?;

    Ok(row)
}

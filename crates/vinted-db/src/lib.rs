use std::collections::BTreeMap;
use std::time::Duration;

use sqlx::{postgres::PgPoolOptions, PgPool};
use thiserror::Error;

const DEFAULT_MAX_CONNECTIONS: u32 = 10;
const DEFAULT_MIN_CONNECTIONS: u32 = 1;
const DEFAULT_ACQUIRE_TIMEOUT_SECS: u64 = 10;
const HEALTH_PING_TIMEOUT: Duration = Duration::from_secs(1);

// Path relative to crates/vinted-db/Cargo.toml; resolves to <workspace-root>/migrations/
static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("../../migrations");

#[derive(Debug, Clone, Copy)]
pub struct PoolConfig {
    pub max_connections: u32,
    pub min_connections: u32,
    pub acquire_timeout_secs: u64,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            max_connections: DEFAULT_MAX_CONNECTIONS,
            min_connections: DEFAULT_MIN_CONNECTIONS,
            acquire_timeout_secs: DEFAULT_ACQUIRE_TIMEOUT_SECS,
        }
    }
}

impl PoolConfig {
    #[must_use]
    pub fn from_app_config(config: &vinted_core::AppConfig) -> Self {
        Self {
            max_connections: config.db_max_connections,
            min_connections: config.db_min_connections,
            acquire_timeout_secs: config.db_acquire_timeout_secs,
        }
    }
}

#[derive(Debug, Error)]
pub enum DbError {
    #[error("failed to upsert item {item_id}: {source}")]
    ItemUpsert {
        item_id: i64,
        #[source]
        source: sqlx::Error,
    },
    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
    #[error(transparent)]
    Migration(#[from] sqlx::migrate::MigrateError),
}

/// Connect to a Postgres pool using explicit URL and config.
///
/// # Errors
///
/// Returns [`sqlx::Error`] if the connection cannot be established.
pub async fn connect_pool(database_url: &str, config: PoolConfig) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(config.max_connections)
        .min_connections(config.min_connections)
        .acquire_timeout(Duration::from_secs(config.acquire_timeout_secs))
        .connect(database_url)
        .await
}

/// Run all pending migrations against the pool.
///
/// # Errors
///
/// Returns [`sqlx::migrate::MigrateError`] if any migration fails.
pub async fn run_migrations(pool: &PgPool) -> Result<(), sqlx::migrate::MigrateError> {
    MIGRATOR.run(pool).await
}

/// Send a `SELECT 1` to verify the pool has a live connection.
///
/// # Errors
///
/// Returns [`sqlx::Error`] if the query fails.
pub async fn ping(pool: &PgPool) -> Result<(), sqlx::Error> {
    sqlx::query_scalar::<_, i32>("SELECT 1")
        .fetch_one(pool)
        .await?;
    Ok(())
}

/// Run a full health check: ping the pool and return a typed error on failure.
///
/// # Errors
///
/// Returns [`DbError`] if the ping fails.
pub async fn health_check(pool: &PgPool) -> Result<(), DbError> {
    ping(pool).await?;
    Ok(())
}

/// Ping the database and report pool statistics as string key/value pairs.
///
/// Keys: `status` (`up`/`down`), `message`, `open_connections`, `idle`,
/// `in_use`, `max_connections`, plus `error` when the ping fails. The ping is
/// capped at one second so a saturated pool degrades the report instead of
/// blocking it.
///
/// There are no `wait_count` or `wait_duration` keys: `sqlx::Pool` keeps no
/// acquire-wait counters, so saturation shows up as `in_use` approaching
/// `max_connections` and as the heavy-load `message`.
pub async fn pool_health(pool: &PgPool) -> BTreeMap<String, String> {
    let mut stats = BTreeMap::new();

    match tokio::time::timeout(HEALTH_PING_TIMEOUT, ping(pool)).await {
        Ok(Ok(())) => {
            stats.insert("status".to_string(), "up".to_string());
            stats.insert("message".to_string(), "It's healthy".to_string());
        }
        Ok(Err(e)) => {
            tracing::warn!(error = %e, "database ping failed");
            stats.insert("status".to_string(), "down".to_string());
            stats.insert("error".to_string(), format!("db down: {e}"));
        }
        Err(_) => {
            tracing::warn!("database ping timed out");
            stats.insert("status".to_string(), "down".to_string());
            stats.insert(
                "error".to_string(),
                format!("db ping timed out after {}s", HEALTH_PING_TIMEOUT.as_secs()),
            );
        }
    }

    let open = pool.size();
    let idle = u32::try_from(pool.num_idle()).unwrap_or(u32::MAX);
    let in_use = open.saturating_sub(idle);
    let max = pool.options().get_max_connections();

    stats.insert("open_connections".to_string(), open.to_string());
    stats.insert("idle".to_string(), idle.to_string());
    stats.insert("in_use".to_string(), in_use.to_string());
    stats.insert("max_connections".to_string(), max.to_string());

    if stats.get("status").map(String::as_str) == Some("up") && is_heavy_load(in_use, max) {
        stats.insert(
            "message".to_string(),
            "The database is experiencing heavy load.".to_string(),
        );
    }

    stats
}

/// Four fifths or more of the pool checked out.
fn is_heavy_load(in_use: u32, max: u32) -> bool {
    max > 0 && u64::from(in_use) * 5 >= u64::from(max) * 4
}


pub mod items;
pub mod topics;

pub use items::{items_for_topic, upsert_items, ItemRow, PhotoRow, ThumbnailRow};
pub use topics::{get_topic, lookup_or_create_topic, TopicRow};

use std::sync::Arc;

use thiserror::Error;
use vinted_db::DbError;
use vinted_scraper::ScraperError;

/// Failures surfaced by [`crate::Orchestrator::get_topic`].
///
/// Cloneable so every caller coalesced onto one in-flight fetch receives the
/// same failure; the underlying errors are shared behind `Arc`.
#[derive(Debug, Clone, Error)]
pub enum CacheError {
    #[error("topic must not be empty")]
    InvalidTopic,

    #[error("fetch failed: {0}")]
    Fetch(#[source] Arc<ScraperError>),

    #[error("persistence failed: {0}")]
    Persistence(#[source] Arc<DbError>),

    #[error("{operation} timed out after {after_secs}s")]
    Timeout {
        operation: &'static str,
        after_secs: u64,
    },

    #[error("cache is shutting down")]
    ShuttingDown,

    #[error("internal error: {0}")]
    Internal(String),
}

impl CacheError {
    /// `true` when another fetch attempt may succeed.
    #[must_use]
    pub fn is_retriable(&self) -> bool {
        match self {
            Self::Fetch(e) => e.is_transient(),
            Self::Timeout { operation, .. } => *operation == "fetch",
            _ => false,
        }
    }
}

impl From<ScraperError> for CacheError {
    fn from(err: ScraperError) -> Self {
        Self::Fetch(Arc::new(err))
    }
}

impl From<DbError> for CacheError {
    fn from(err: DbError) -> Self {
        Self::Persistence(Arc::new(err))
    }
}

//! Resolve / hit / miss routing for topic requests.

use std::collections::BTreeMap;
use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use vinted_core::{AppConfig, ItemCollection, SearchOrder};

use crate::flight::{FlightResult, SingleFlight};
use crate::refresh::RefreshRegistry;
use crate::retry::retry_with_backoff;
use crate::{CacheError, ItemStore, ListingSource};

#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    /// Currency requested from the source.
    pub currency: String,
    /// Bound on each fetch attempt.
    pub fetch_timeout: Duration,
    /// Bound on each store call.
    pub persist_timeout: Duration,
    /// Bound on a whole background refresh.
    pub refresh_timeout: Duration,
    pub fetch_max_retries: u32,
    pub fetch_backoff_base_secs: u64,
    pub max_concurrent_refreshes: usize,
    pub shutdown_grace: Duration,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            currency: "GBP".to_owned(),
            fetch_timeout: Duration::from_secs(30),
            persist_timeout: Duration::from_secs(15),
            refresh_timeout: Duration::from_secs(60),
            fetch_max_retries: 1,
            fetch_backoff_base_secs: 1,
            max_concurrent_refreshes: 4,
            shutdown_grace: Duration::from_secs(5),
        }
    }
}

impl OrchestratorConfig {
    #[must_use]
    pub fn from_app_config(config: &AppConfig) -> Self {
        Self {
            currency: config.source_currency.clone(),
            fetch_timeout: Duration::from_secs(config.source_request_timeout_secs),
            persist_timeout: Duration::from_secs(config.persist_timeout_secs),
            refresh_timeout: Duration::from_secs(config.refresh_timeout_secs),
            fetch_max_retries: config.fetch_max_retries,
            fetch_backoff_base_secs: config.fetch_backoff_base_secs,
            max_concurrent_refreshes: config.max_concurrent_refreshes,
            shutdown_grace: Duration::from_secs(config.shutdown_grace_secs),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ServedFrom {
    /// Read from the store; a background refresh was scheduled.
    Cache,
    /// Fetched from the source and persisted during this request.
    Source,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TopicResponse {
    pub topic: String,
    pub topic_id: i64,
    pub order: SearchOrder,
    pub served_from: ServedFrom,
    pub refreshed_at: Option<DateTime<Utc>>,
    pub items: ItemCollection,
}

/// A batch that was fetched and committed.
#[derive(Debug)]
struct Refreshed {
    items: ItemCollection,
    refreshed_at: DateTime<Utc>,
}

type FlightKey = (String, SearchOrder);

/// The fetch-then-persist path shared by misses and background refreshes.
#[derive(Clone)]
struct Pipeline {
    source: Arc<dyn ListingSource>,
    store: Arc<dyn ItemStore>,
    config: Arc<OrchestratorConfig>,
}

impl Pipeline {
    async fn fetch(&self, topic: &str, order: SearchOrder) -> Result<ItemCollection, CacheError> {
        let config = &*self.config;
        let source = &*self.source;
        retry_with_backoff(
            config.fetch_max_retries,
            config.fetch_backoff_base_secs,
            CacheError::is_retriable,
            move || async move {
                bounded(
                    "fetch",
                    config.fetch_timeout,
                    source.search(topic, order, &config.currency),
                )
                .await
            },
        )
        .await
    }

    async fn refresh(
        self,
        topic: String,
        topic_id: i64,
        order: SearchOrder,
    ) -> FlightResult<Arc<Refreshed>> {
        let items = self.fetch(&topic, order).await?;
        let written = bounded(
            "persist",
            self.config.persist_timeout,
            self.store.upsert_items(topic_id, &items),
        )
        .await?;

        tracing::info!(topic, %order, topic_id, written, "topic refreshed from source");
        Ok(Arc::new(Refreshed {
            items,
            refreshed_at: Utc::now(),
        }))
    }
}

/// Serves topic searches from the store, falling back to the source.
///
/// Construct once with explicit source and store handles; call
/// [`Orchestrator::shutdown`] before closing the store.
pub struct Orchestrator {
    pipeline: Pipeline,
    flights: SingleFlight<FlightKey, Arc<Refreshed>>,
    refreshes: RefreshRegistry,
    shutting_down: AtomicBool,
}

impl Orchestrator {
    #[must_use]
    pub fn new(
        source: Arc<dyn ListingSource>,
        store: Arc<dyn ItemStore>,
        config: OrchestratorConfig,
    ) -> Self {
        let refreshes = RefreshRegistry::new(config.max_concurrent_refreshes, config.refresh_timeout);
        Self {
            pipeline: Pipeline {
                source,
                store,
                config: Arc::new(config),
            },
            flights: SingleFlight::new(),
            refreshes,
            shutting_down: AtomicBool::new(false),
        }
    }

    /// Returns the items for `topic` under the order named by `order`.
    ///
    /// Unrecognized order names fall back to [`SearchOrder::NewestFirst`].
    /// A topic with items on record is served from the store and refreshed
    /// in the background; otherwise the source is queried, the batch is
    /// persisted and the fresh items are returned.
    ///
    /// # Errors
    ///
    /// Returns [`CacheError::InvalidTopic`] for a blank topic,
    /// [`CacheError::Fetch`] or [`CacheError::Persistence`] when the miss path
    /// fails, [`CacheError::Timeout`] when a bounded step elapses, and
    /// [`CacheError::ShuttingDown`] once [`Orchestrator::shutdown`] has begun.
    pub async fn get_topic(&self, topic: &str, order: &str) -> Result<TopicResponse, CacheError> {
        if self.shutting_down.load(Ordering::Acquire) {
            return Err(CacheError::ShuttingDown);
        }
        let topic = topic.trim();
        if topic.is_empty() {
            return Err(CacheError::InvalidTopic);
        }
        let order = SearchOrder::parse_lossy(order);

        let store = &self.pipeline.store;
        let limit = self.pipeline.config.persist_timeout;
        let topic_id = bounded("topic lookup", limit, store.lookup_or_create_topic(topic)).await?;
        let stored = bounded("read", limit, store.items_for_topic(topic_id)).await?;

        if stored.is_empty() {
            tracing::debug!(topic, %order, topic_id, "cache miss");
            let refreshed = self.refresh_now(topic, topic_id, order).await?;
            return Ok(TopicResponse {
                topic: topic.to_owned(),
                topic_id,
                order,
                served_from: ServedFrom::Source,
                refreshed_at: Some(refreshed.refreshed_at),
                items: refreshed.items.clone(),
            });
        }

        let refreshed_at = bounded("read", limit, store.topic_refreshed_at(topic_id)).await?;
        tracing::debug!(topic, %order, topic_id, items = stored.len(), "cache hit");
        self.schedule_refresh(topic, topic_id, order);

        Ok(TopicResponse {
            topic: topic.to_owned(),
            topic_id,
            order,
            served_from: ServedFrom::Cache,
            refreshed_at,
            items: stored,
        })
    }

    async fn refresh_now(
        &self,
        topic: &str,
        topic_id: i64,
        order: SearchOrder,
    ) -> FlightResult<Arc<Refreshed>> {
        let pipeline = self.pipeline.clone();
        let owned = topic.to_owned();
        let (result, leader) = self
            .flights
            .run((topic.to_owned(), order), move || {
                pipeline.refresh(owned, topic_id, order)
            })
            .await;
        if !leader {
            tracing::debug!(topic, %order, "joined in-flight fetch");
        }
        result
    }

    fn schedule_refresh(&self, topic: &str, topic_id: i64, order: SearchOrder) {
        let flights = self.flights.clone();
        let pipeline = self.pipeline.clone();
        let topic = topic.to_owned();
        let span = tracing::info_span!("refresh", topic = %topic, %order, topic_id);

        // When the refresh starts the flight, the slot and its timeout move
        // into the flight task. Joining a running flight frees the slot.
        self.refreshes.spawn(span, move |slot| async move {
            let key = (topic.clone(), order);
            let (result, _) = flights
                .run(key, move || slot.run(pipeline.refresh(topic, topic_id, order)))
                .await;
            result.map(|_| ())
        });
    }

    /// Background refreshes currently holding a slot.
    #[must_use]
    pub fn in_flight_refreshes(&self) -> usize {
        self.refreshes.in_flight()
    }

    /// Distinct `(topic, order)` fetches currently running.
    #[must_use]
    pub fn in_flight_fetches(&self) -> usize {
        self.flights.len()
    }

    /// Store health plus `refreshes_in_flight` and `fetches_in_flight`.
    pub async fn health(&self) -> BTreeMap<String, String> {
        let mut stats = self.pipeline.store.health().await;
        stats.insert(
            "refreshes_in_flight".to_owned(),
            self.in_flight_refreshes().to_string(),
        );
        stats.insert(
            "fetches_in_flight".to_owned(),
            self.in_flight_fetches().to_string(),
        );
        stats
    }

    /// Rejects new requests, drains background refreshes for up to the grace
    /// period, then aborts whatever is still running.
    pub async fn shutdown(&self) {
        if self.shutting_down.swap(true, Ordering::AcqRel) {
            return;
        }
        let aborted_refreshes = self
            .refreshes
            .shutdown(self.pipeline.config.shutdown_grace)
            .await;
        let aborted_fetches = self.flights.abort_all();
        tracing::info!(aborted_refreshes, aborted_fetches, "cache orchestrator stopped");
    }
}

async fn bounded<T, E, Fut>(
    operation: &'static str,
    limit: Duration,
    work: Fut,
) -> Result<T, CacheError>
where
    Fut: Future<Output = Result<T, E>>,
    CacheError: From<E>,
{
    match tokio::time::timeout(limit, work).await {
        Ok(result) => result.map_err(CacheError::from),
        Err(_) => Err(CacheError::Timeout {
            operation,
            after_secs: limit.as_secs(),
        }),
    }
}

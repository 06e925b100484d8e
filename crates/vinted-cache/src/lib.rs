//! Read-through cache for Vinted catalog searches.
//!
//! [`Orchestrator`] serves a topic from Postgres when items are on record and
//! refreshes it in the background; on a cold topic it fetches from the
//! source, persists the batch and returns the fresh items. Concurrent fetches
//! for the same `(topic, order)` key share one in-flight task.

pub mod error;
mod flight;
pub mod orchestrator;
mod refresh;
mod retry;
pub mod source;
pub mod store;

pub use error::CacheError;
pub use orchestrator::{Orchestrator, OrchestratorConfig, ServedFrom, TopicResponse};
pub use source::ListingSource;
pub use store::{ItemStore, PgStore};

//! The external listing source seam.

use async_trait::async_trait;
use vinted_core::{ItemCollection, SearchOrder};
use vinted_scraper::{ScraperError, VintedClient};

/// Fetches one page of normalized search results.
///
/// Implementations must not touch persistent state and must not retry;
/// the orchestrator owns the retry policy.
#[async_trait]
pub trait ListingSource: Send + Sync {
    async fn search(
        &self,
        topic: &str,
        order: SearchOrder,
        currency: &str,
    ) -> Result<ItemCollection, ScraperError>;
}

#[async_trait]
impl ListingSource for VintedClient {
    async fn search(
        &self,
        topic: &str,
        order: SearchOrder,
        currency: &str,
    ) -> Result<ItemCollection, ScraperError> {
        self.search_items(topic, order, currency).await
    }
}

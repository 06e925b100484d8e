pub mod client;
pub mod error;
pub mod normalize;
pub mod types;

pub use client::{ClientConfig, VintedClient};
pub use error::ScraperError;
pub use normalize::{normalize_item, normalize_response};
pub use types::{VintedItem, VintedSearchResponse};

//! Response types for the marketplace catalog search endpoint
//! (`GET /api/v2/catalog/items`).
//!
//! ## Observed shape
//!
//! ### Money
//! Older responses carry `price`, `service_fee` and `total_item_price` as
//! plain decimal strings (`"12.0"`). Newer ones wrap them in an object:
//! `{"amount": "12.0", "currency_code": "GBP"}`. [`Money`] accepts both, plus
//! a bare JSON number, and the amount is always kept as a string.
//!
//! ### Nullable fields
//! `discount`, `badge`, `conversion`, `total_item_price_rounded`, `user.photo`
//! and `dominant_brand` are routinely `null`. Their inner shape is not stable
//! across marketplace releases, so they are kept as raw JSON.
//!
//! ### `is_visible`
//! Sent as `1`/`0` by most locales and as a boolean by some. [`Flag`] accepts
//! either.
//!
//! ### Arrays
//! `icon_badges`, `thumbnails` and `matched_queries` are sometimes `null`
//! instead of `[]`; they deserialize to an empty `Vec`.

use serde::{Deserialize, Deserializer};
use serde_json::Value;

/// Top-level response from the catalog search endpoint.
#[derive(Debug, Deserialize)]
pub struct VintedSearchResponse {
    #[serde(default, deserialize_with = "null_as_default")]
    pub items: Vec<VintedItem>,
    #[serde(default)]
    pub dominant_brand: Option<Value>,
    #[serde(default)]
    pub search_tracking_params: Option<SearchSessionTracking>,
    #[serde(default)]
    pub pagination: Option<Pagination>,
    #[serde(default)]
    pub code: Option<i64>,
}

/// Session-level tracking identifiers. Not persisted.
#[derive(Debug, Default, Deserialize)]
pub struct SearchSessionTracking {
    #[serde(default)]
    pub search_correlation_id: Option<String>,
    #[serde(default)]
    pub search_session_id: Option<String>,
    #[serde(default)]
    pub global_search_session_id: Option<String>,
}

/// Pagination metadata. Not persisted.
#[derive(Debug, Default, Deserialize)]
pub struct Pagination {
    #[serde(default)]
    pub current_page: u32,
    #[serde(default)]
    pub total_pages: u32,
    #[serde(default)]
    pub total_entries: u64,
    #[serde(default)]
    pub per_page: u32,
    #[serde(default)]
    pub time: Option<i64>,
}

/// A single listing as returned by the search endpoint.
#[derive(Debug, Deserialize)]
pub struct VintedItem {
    pub id: i64,
    pub title: String,
    pub price: Money,
    #[serde(default)]
    pub is_visible: Option<Flag>,
    #[serde(default)]
    pub discount: Option<Value>,
    #[serde(default)]
    pub currency: Option<String>,
    #[serde(default)]
    pub brand_title: Option<String>,
    #[serde(default)]
    pub user: Option<VintedUser>,
    pub url: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub promoted: bool,
    #[serde(default)]
    pub photo: Option<VintedPhoto>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub favourite_count: i32,
    #[serde(default, deserialize_with = "null_as_default")]
    pub is_favourite: bool,
    #[serde(default)]
    pub badge: Option<Value>,
    #[serde(default)]
    pub conversion: Option<Value>,
    #[serde(default)]
    pub service_fee: Option<Money>,
    #[serde(default)]
    pub total_item_price: Option<Money>,
    #[serde(default)]
    pub total_item_price_rounded: Option<Value>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub view_count: i32,
    #[serde(default)]
    pub size_title: Option<String>,
    #[serde(default)]
    pub content_source: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub icon_badges: Vec<Value>,
    #[serde(default)]
    pub search_tracking_params: Option<ItemSearchTracking>,
}

/// Seller summary embedded in each listing.
#[derive(Debug, Deserialize)]
pub struct VintedUser {
    pub id: i64,
    #[serde(default)]
    pub login: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub business: bool,
    #[serde(default)]
    pub profile_url: Option<String>,
    #[serde(default)]
    pub photo: Option<Value>,
}

#[derive(Debug, Deserialize)]
pub struct VintedPhoto {
    pub id: i64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub image_no: i32,
    #[serde(default, deserialize_with = "null_as_default")]
    pub width: i32,
    #[serde(default, deserialize_with = "null_as_default")]
    pub height: i32,
    #[serde(default)]
    pub dominant_color: Option<String>,
    #[serde(default)]
    pub dominant_color_opaque: Option<String>,
    pub url: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub is_main: bool,
    #[serde(default, deserialize_with = "null_as_default")]
    pub thumbnails: Vec<VintedThumbnail>,
    #[serde(default)]
    pub high_resolution: Option<HighResolution>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub is_suspicious: bool,
    #[serde(default)]
    pub full_size_url: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub is_hidden: bool,
    #[serde(default)]
    pub extra: Option<Value>,
}

#[derive(Debug, Deserialize)]
pub struct VintedThumbnail {
    #[serde(rename = "type")]
    pub thumb_type: String,
    pub url: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub width: i32,
    #[serde(default, deserialize_with = "null_as_default")]
    pub height: i32,
    #[serde(default)]
    pub original_size: Option<Value>,
}

#[derive(Debug, Deserialize)]
pub struct HighResolution {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub timestamp: Option<i64>,
    #[serde(default)]
    pub orientation: Option<Value>,
}

/// Per-listing relevance data. Not persisted.
#[derive(Debug, Default, Deserialize)]
pub struct ItemSearchTracking {
    #[serde(default)]
    pub score: Option<f64>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub matched_queries: Vec<String>,
}

/// A monetary amount in either of the shapes the endpoint has used.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum Money {
    Plain(String),
    Number(serde_json::Number),
    Amount {
        amount: String,
        #[serde(default)]
        currency_code: Option<String>,
    },
}

impl Money {
    /// The decimal amount as sent, without reformatting.
    #[must_use]
    pub fn amount(&self) -> String {
        match self {
            Money::Plain(s) => s.clone(),
            Money::Number(n) => n.to_string(),
            Money::Amount { amount, .. } => amount.clone(),
        }
    }

    #[must_use]
    pub fn currency_code(&self) -> Option<&str> {
        match self {
            Money::Amount { currency_code, .. } => currency_code.as_deref(),
            Money::Plain(_) | Money::Number(_) => None,
        }
    }
}

/// A boolean sent either as `true`/`false` or as `1`/`0`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum Flag {
    Bool(bool),
    Int(i64),
}

impl Flag {
    #[must_use]
    pub fn as_bool(self) -> bool {
        match self {
            Flag::Bool(b) => b,
            Flag::Int(n) => n != 0,
        }
    }
}

/// Deserializes `null` as `T::default()`.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

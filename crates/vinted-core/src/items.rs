//! Listing entities shared by the scraper, the store, and the orchestrator.
//!
//! Money fields (`price`, `service_fee`, `total_item_price`) are decimal
//! strings exactly as the marketplace returns them, e.g. `"12.50"`. Nothing
//! in this workspace parses or rounds them.
//!
//! Fields the marketplace sends as `null` (or omits) are `None` here. They are
//! never defaulted to `0` or `""`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A named search query whose results are cached as a unit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Topic {
    pub id: i64,
    pub name: String,
    pub created_at: DateTime<Utc>,
    /// Last time a batch of items was committed under this topic.
    pub refreshed_at: Option<DateTime<Utc>>,
}

/// A single listing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Item {
    /// Marketplace listing ID; the natural key for upserts.
    pub id: i64,
    pub title: String,
    pub price: String,
    pub is_visible: bool,
    pub discount: Option<Value>,
    /// ISO 4217 code, e.g. `"GBP"`.
    pub currency: String,
    pub brand_title: Option<String>,
    pub user_id: Option<i64>,
    pub url: String,
    pub promoted: bool,
    pub photo: Option<Photo>,
    pub favourite_count: i32,
    pub is_favourite: bool,
    pub badge: Option<Value>,
    pub conversion: Option<Value>,
    pub service_fee: Option<String>,
    pub total_item_price: Option<String>,
    pub total_item_price_rounded: Option<Value>,
    pub view_count: i32,
    pub size_title: Option<String>,
    pub content_source: Option<String>,
    pub status: Option<String>,
    pub icon_badges: Vec<Value>,
}

impl Item {
    #[must_use]
    pub fn photo_id(&self) -> Option<i64> {
        self.photo.as_ref().map(|p| p.id)
    }
}

/// The main photo of a listing. Owns its thumbnails.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Photo {
    pub id: i64,
    pub image_no: i32,
    pub width: i32,
    pub height: i32,
    pub dominant_color: Option<String>,
    pub dominant_color_opaque: Option<String>,
    pub url: String,
    pub is_main: bool,
    pub is_suspicious: bool,
    pub full_size_url: Option<String>,
    pub is_hidden: bool,
    pub thumbnails: Vec<Thumbnail>,
}

/// A resized rendition of a [`Photo`], unique per `(photo, thumb_type)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Thumbnail {
    /// Rendition name, e.g. `"thumb150x210"`.
    #[serde(rename = "type")]
    pub thumb_type: String,
    pub url: String,
    pub width: i32,
    pub height: i32,
}

/// An ordered set of listings for one topic.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ItemCollection {
    pub items: Vec<Item>,
}

impl ItemCollection {
    #[must_use]
    pub fn new(items: Vec<Item>) -> Self {
        Self { items }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Item> {
        self.items.iter()
    }
}

impl FromIterator<Item> for ItemCollection {
    fn from_iter<I: IntoIterator<Item = Item>>(iter: I) -> Self {
        Self {
            items: iter.into_iter().collect(),
        }
    }
}

impl<'a> IntoIterator for &'a ItemCollection {
    type Item = &'a Item;
    type IntoIter = std::slice::Iter<'a, Item>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}

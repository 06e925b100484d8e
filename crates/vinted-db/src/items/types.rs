use chrono::{DateTime, Utc};
use serde_json::Value;
use sqlx::types::Json;
use vinted_core::{Item, Photo, Thumbnail};

/// A row from the `items` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ItemRow {
    pub id: i64,
    pub title: String,
    pub price: String,
    pub is_visible: bool,
    pub discount: Option<Value>,
    pub currency: String,
    pub brand_title: Option<String>,
    pub user_id: Option<i64>,
    pub url: String,
    pub promoted: bool,
    pub photo_id: Option<i64>,
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
    pub icon_badges: Json<Vec<Value>>,
    pub topic_id: i64,
    pub position: i32,
    pub updated_at: DateTime<Utc>,
}

impl ItemRow {
    /// Builds the domain item, attaching `photo` when the row references one.
    #[must_use]
    pub fn into_item(self, photo: Option<Photo>) -> Item {
        Item {
            id: self.id,
            title: self.title,
            price: self.price,
            is_visible: self.is_visible,
            discount: self.discount,
            currency: self.currency,
            brand_title: self.brand_title,
            user_id: self.user_id,
            url: self.url,
            promoted: self.promoted,
            photo,
            favourite_count: self.favourite_count,
            is_favourite: self.is_favourite,
            badge: self.badge,
            conversion: self.conversion,
            service_fee: self.service_fee,
            total_item_price: self.total_item_price,
            total_item_price_rounded: self.total_item_price_rounded,
            view_count: self.view_count,
            size_title: self.size_title,
            content_source: self.content_source,
            status: self.status,
            icon_badges: self.icon_badges.0,
        }
    }
}

/// A row from the `photos` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct PhotoRow {
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
}

impl PhotoRow {
    #[must_use]
    pub fn into_photo(self, thumbnails: Vec<Thumbnail>) -> Photo {
        Photo {
            id: self.id,
            image_no: self.image_no,
            width: self.width,
            height: self.height,
            dominant_color: self.dominant_color,
            dominant_color_opaque: self.dominant_color_opaque,
            url: self.url,
            is_main: self.is_main,
            is_suspicious: self.is_suspicious,
            full_size_url: self.full_size_url,
            is_hidden: self.is_hidden,
            thumbnails,
        }
    }
}

/// A row from the `thumbnails` table. Unique on `(photo_id, thumb_type)`.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ThumbnailRow {
    pub photo_id: i64,
    pub thumb_type: String,
    pub url: String,
    pub width: i32,
    pub height: i32,
}

impl From<ThumbnailRow> for Thumbnail {
    fn from(row: ThumbnailRow) -> Self {
        Self {
            thumb_type: row.thumb_type,
            url: row.url,
            width: row.width,
            height: row.height,
        }
    }
}

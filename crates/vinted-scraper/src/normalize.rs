//! Normalization from raw search-endpoint types to [`vinted_core::ItemCollection`].
//!
//! Pure and infallible: every shape variation the endpoint is known to send is
//! absorbed by the raw types in [`crate::types`], so this module only maps
//! fields.

use vinted_core::{Item, ItemCollection, Photo, Thumbnail};

use crate::types::{Money, VintedItem, VintedPhoto, VintedSearchResponse, VintedThumbnail};

/// Normalizes a full search response, preserving item order.
///
/// `requested_currency` fills `Item::currency` for listings that carry no
/// currency of their own; the search was issued in that currency.
#[must_use]
pub fn normalize_response(
    response: VintedSearchResponse,
    requested_currency: &str,
) -> ItemCollection {
    response
        .items
        .into_iter()
        .map(|item| normalize_item(item, requested_currency))
        .collect()
}

/// Normalizes one listing.
#[must_use]
pub fn normalize_item(item: VintedItem, requested_currency: &str) -> Item {
    let currency = non_empty(item.currency)
        .or_else(|| item.price.currency_code().map(str::to_owned))
        .unwrap_or_else(|| requested_currency.to_owned());

    // Listings returned by a search are visible unless the flag says otherwise.
    let is_visible = item.is_visible.is_none_or(|flag| flag.as_bool());

    Item {
        id: item.id,
        title: item.title,
        price: item.price.amount(),
        is_visible,
        discount: item.discount,
        currency,
        brand_title: non_empty(item.brand_title),
        user_id: item.user.map(|u| u.id),
        url: item.url,
        promoted: item.promoted,
        photo: item.photo.map(normalize_photo),
        favourite_count: item.favourite_count,
        is_favourite: item.is_favourite,
        badge: item.badge,
        conversion: item.conversion,
        service_fee: item.service_fee.as_ref().map(Money::amount),
        total_item_price: item.total_item_price.as_ref().map(Money::amount),
        total_item_price_rounded: item.total_item_price_rounded,
        view_count: item.view_count,
        size_title: non_empty(item.size_title),
        content_source: non_empty(item.content_source),
        status: non_empty(item.status),
        icon_badges: item.icon_badges,
    }
}

fn normalize_photo(photo: VintedPhoto) -> Photo {
    Photo {
        id: photo.id,
        image_no: photo.image_no,
        width: photo.width,
        height: photo.height,
        dominant_color: non_empty(photo.dominant_color),
        dominant_color_opaque: non_empty(photo.dominant_color_opaque),
        url: photo.url,
        is_main: photo.is_main,
        is_suspicious: photo.is_suspicious,
        full_size_url: non_empty(photo.full_size_url),
        is_hidden: photo.is_hidden,
        thumbnails: dedupe_thumbnails(photo.thumbnails),
    }
}

/// Keeps the last rendition for each thumbnail type, in first-seen order.
fn dedupe_thumbnails(thumbnails: Vec<VintedThumbnail>) -> Vec<Thumbnail> {
    let mut out: Vec<Thumbnail> = Vec::with_capacity(thumbnails.len());
    for thumb in thumbnails {
        let normalized = Thumbnail {
            thumb_type: thumb.thumb_type,
            url: thumb.url,
            width: thumb.width,
            height: thumb.height,
        };
        match out
            .iter_mut()
            .find(|t| t.thumb_type == normalized.thumb_type)
        {
            Some(existing) => *existing = normalized,
            None => out.push(normalized),
        }
    }
    out
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|s| !s.trim().is_empty())
}

#[cfg(test)]
#[path = "normalize_test.rs"]
mod tests;

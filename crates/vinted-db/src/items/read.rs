//! Read operations for cached items.

use std::collections::HashMap;

use sqlx::PgPool;
use vinted_core::{ItemCollection, Photo, Thumbnail};

use super::types::{ItemRow, PhotoRow, ThumbnailRow};
use crate::DbError;

/// Returns every item currently attributed to `topic_id`, hydrated with its
/// photo and thumbnails.
///
/// Ordered newest batch first, then by position within the batch, so a topic
/// read right after ingestion comes back in the order the source returned it.
///
/// The three queries share one `REPEATABLE READ` read-only transaction so a
/// concurrent ingestion cannot leave an item pointing at a photo that this
/// read has not seen.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if any query fails.
pub async fn items_for_topic(pool: &PgPool, topic_id: i64) -> Result<ItemCollection, DbError> {
    let mut tx = pool.begin().await?;
    sqlx::query("SET TRANSACTION ISOLATION LEVEL REPEATABLE READ READ ONLY")
        .execute(&mut *tx)
        .await?;

    let item_rows = sqlx::query_as::<_, ItemRow>(
        "SELECT id, title, price, is_visible, discount, currency, brand_title, user_id, url, \
                promoted, photo_id, favourite_count, is_favourite, badge, conversion, \
                service_fee, total_item_price, total_item_price_rounded, view_count, \
                size_title, content_source, status, icon_badges, topic_id, position, updated_at \
         FROM items \
         WHERE topic_id = $1 \
         ORDER BY updated_at DESC, position, id",
    )
    .bind(topic_id)
    .fetch_all(&mut *tx)
    .await?;

    let photo_ids: Vec<i64> = item_rows.iter().filter_map(|r| r.photo_id).collect();

    let mut photos: HashMap<i64, Photo> = HashMap::new();
    if !photo_ids.is_empty() {
        let photo_rows = sqlx::query_as::<_, PhotoRow>(
            "SELECT id, image_no, width, height, dominant_color, dominant_color_opaque, url, \
                    is_main, is_suspicious, full_size_url, is_hidden \
             FROM photos \
             WHERE id = ANY($1::bigint[])",
        )
        .bind(&photo_ids)
        .fetch_all(&mut *tx)
        .await?;

        let thumbnail_rows = sqlx::query_as::<_, ThumbnailRow>(
            "SELECT photo_id, thumb_type, url, width, height \
             FROM thumbnails \
             WHERE photo_id = ANY($1::bigint[]) \
             ORDER BY photo_id, id",
        )
        .bind(&photo_ids)
        .fetch_all(&mut *tx)
        .await?;

        let mut thumbnails: HashMap<i64, Vec<Thumbnail>> = HashMap::new();
        for row in thumbnail_rows {
            thumbnails
                .entry(row.photo_id)
                .or_default()
                .push(Thumbnail::from(row));
        }

        for row in photo_rows {
            let thumbs = thumbnails.remove(&row.id).unwrap_or_default();
            photos.insert(row.id, row.into_photo(thumbs));
        }
    }

    tx.commit().await?;

    // Photos are cloned rather than moved: two listings may share one photo row.
    Ok(item_rows
        .into_iter()
        .map(|row| {
            let photo = row.photo_id.and_then(|id| photos.get(&id).cloned());
            row.into_item(photo)
        })
        .collect())
}

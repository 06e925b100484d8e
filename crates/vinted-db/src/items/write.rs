//! Transactional ingestion of item batches.

use sqlx::types::Json;
use sqlx::{PgConnection, PgPool};
use vinted_core::{Item, ItemCollection, Photo};

use crate::DbError;

/// Attempts made when Postgres picks this batch as a deadlock victim.
const DEADLOCK_ATTEMPTS: u32 = 2;

/// SQLSTATE `deadlock_detected`.
const DEADLOCK_SQLSTATE: &str = "40P01";

/// Upserts every item in `items` under `topic_id` inside one transaction.
///
/// For each item: the photo (by `id`), each of its thumbnails (by
/// `(photo_id, thumb_type)`), then the item itself (by `id`), which is
/// re-pointed at `topic_id`. Once all items are written the topic's
/// `refreshed_at` is stamped and the transaction commits.
///
/// Rows are written in ascending item `id` order, thumbnails in ascending
/// `thumb_type` order, so concurrent batches that share listings take row
/// locks in the same order. `position` still records the source order. A
/// batch aborted as a deadlock victim is retried once from scratch.
///
/// If any statement fails the transaction is dropped uncommitted, so none of
/// the batch (items, photos, thumbnails, or the timestamp) persists.
///
/// Returns the number of items written.
///
/// # Errors
///
/// Returns [`DbError::ItemUpsert`] naming the first item that failed, or
/// [`DbError::Sqlx`] if the transaction cannot begin or commit.
pub async fn upsert_items(
    pool: &PgPool,
    topic_id: i64,
    items: &ItemCollection,
) -> Result<usize, DbError> {
    let mut write_order: Vec<(i32, &Item)> = items
        .iter()
        .enumerate()
        .map(|(idx, item)| (i32::try_from(idx).unwrap_or(i32::MAX), item))
        .collect();
    write_order.sort_by_key(|(_, item)| item.id);

    let mut attempt = 1;
    loop {
        match write_batch(pool, topic_id, &write_order).await {
            Err(e) if attempt < DEADLOCK_ATTEMPTS && is_deadlock(&e) => {
                tracing::warn!(topic_id, attempt, error = %e, "item batch deadlocked, retrying");
                attempt += 1;
            }
            Err(e) => return Err(e),
            Ok(()) => break,
        }
    }

    tracing::debug!(topic_id, count = items.len(), "item batch committed");
    Ok(items.len())
}

async fn write_batch(
    pool: &PgPool,
    topic_id: i64,
    write_order: &[(i32, &Item)],
) -> Result<(), DbError> {
    let mut tx = pool.begin().await?;

    for (position, item) in write_order {
        upsert_item(&mut tx, topic_id, *position, item)
            .await
            .map_err(|source| DbError::ItemUpsert {
                item_id: item.id,
                source,
            })?;
    }

    sqlx::query("UPDATE topics SET refreshed_at = NOW() WHERE id = $1")
        .bind(topic_id)
        .execute(&mut *tx)
        .await?;

    tx.commit().await?;
    Ok(())
}

fn is_deadlock(err: &DbError) -> bool {
    let source = match err {
        DbError::ItemUpsert { source, .. } | DbError::Sqlx(source) => source,
        DbError::Migration(_) => return false,
    };
    matches!(
        source,
        sqlx::Error::Database(db) if db.code().as_deref() == Some(DEADLOCK_SQLSTATE)
    )
}

async fn upsert_item(
    conn: &mut PgConnection,
    topic_id: i64,
    position: i32,
    item: &Item,
) -> Result<(), sqlx::Error> {
    if let Some(photo) = &item.photo {
        upsert_photo(conn, photo).await?;
        upsert_thumbnails(conn, photo).await?;
    }

    sqlx::query(
        "INSERT INTO items \
             (id, title, price, is_visible, discount, currency, brand_title, user_id, url, \
              promoted, photo_id, favourite_count, is_favourite, badge, conversion, \
              service_fee, total_item_price, total_item_price_rounded, view_count, \
              size_title, content_source, status, icon_badges, topic_id, position) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, \
                 $10, $11, $12, $13, $14, $15, \
                 $16, $17, $18, $19, \
                 $20, $21, $22, $23, $24, $25) \
         ON CONFLICT (id) DO UPDATE SET \
             title                    = EXCLUDED.title, \
             price                    = EXCLUDED.price, \
             is_visible               = EXCLUDED.is_visible, \
             discount                 = EXCLUDED.discount, \
             currency                 = EXCLUDED.currency, \
             brand_title              = EXCLUDED.brand_title, \
             user_id                  = EXCLUDED.user_id, \
             url                      = EXCLUDED.url, \
             promoted                 = EXCLUDED.promoted, \
             photo_id                 = EXCLUDED.photo_id, \
             favourite_count          = EXCLUDED.favourite_count, \
             is_favourite             = EXCLUDED.is_favourite, \
             badge                    = EXCLUDED.badge, \
             conversion               = EXCLUDED.conversion, \
             service_fee              = EXCLUDED.service_fee, \
             total_item_price         = EXCLUDED.total_item_price, \
             total_item_price_rounded = EXCLUDED.total_item_price_rounded, \
             view_count               = EXCLUDED.view_count, \
             size_title               = EXCLUDED.size_title, \
             content_source           = EXCLUDED.content_source, \
             status                   = EXCLUDED.status, \
             icon_badges              = EXCLUDED.icon_badges, \
             topic_id                 = EXCLUDED.topic_id, \
             position                 = EXCLUDED.position, \
             updated_at               = NOW()",
    )
    .bind(item.id)
    .bind(&item.title)
    .bind(&item.price)
    .bind(item.is_visible)
    .bind(&item.discount)
    .bind(&item.currency)
    .bind(&item.brand_title)
    .bind(item.user_id)
    .bind(&item.url)
    .bind(item.promoted)
    .bind(item.photo_id())
    .bind(item.favourite_count)
    .bind(item.is_favourite)
    .bind(&item.badge)
    .bind(&item.conversion)
    .bind(&item.service_fee)
    .bind(&item.total_item_price)
    .bind(&item.total_item_price_rounded)
    .bind(item.view_count)
    .bind(&item.size_title)
    .bind(&item.content_source)
    .bind(&item.status)
    .bind(Json(&item.icon_badges))
    .bind(topic_id)
    .bind(position)
    .execute(&mut *conn)
    .await?;

    Ok(())
}

async fn upsert_photo(conn: &mut PgConnection, photo: &Photo) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT INTO photos \
             (id, image_no, width, height, dominant_color, dominant_color_opaque, url, \
              is_main, is_suspicious, full_size_url, is_hidden) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11) \
         ON CONFLICT (id) DO UPDATE SET \
             image_no              = EXCLUDED.image_no, \
             width                 = EXCLUDED.width, \
             height                = EXCLUDED.height, \
             dominant_color        = EXCLUDED.dominant_color, \
             dominant_color_opaque = EXCLUDED.dominant_color_opaque, \
             url                   = EXCLUDED.url, \
             is_main               = EXCLUDED.is_main, \
             is_suspicious         = EXCLUDED.is_suspicious, \
             full_size_url         = EXCLUDED.full_size_url, \
             is_hidden             = EXCLUDED.is_hidden, \
             updated_at            = NOW()",
    )
    .bind(photo.id)
    .bind(photo.image_no)
    .bind(photo.width)
    .bind(photo.height)
    .bind(&photo.dominant_color)
    .bind(&photo.dominant_color_opaque)
    .bind(&photo.url)
    .bind(photo.is_main)
    .bind(photo.is_suspicious)
    .bind(&photo.full_size_url)
    .bind(photo.is_hidden)
    .execute(&mut *conn)
    .await?;

    Ok(())
}

async fn upsert_thumbnails(conn: &mut PgConnection, photo: &Photo) -> Result<(), sqlx::Error> {
    let mut thumbnails: Vec<_> = photo.thumbnails.iter().collect();
    thumbnails.sort_by(|a, b| a.thumb_type.cmp(&b.thumb_type));

    for thumb in thumbnails {
        sqlx::query(
            "INSERT INTO thumbnails (photo_id, thumb_type, url, width, height) \
             VALUES ($1, $2, $3, $4, $5) \
             ON CONFLICT (photo_id, thumb_type) DO UPDATE SET \
                 url        = EXCLUDED.url, \
                 width      = EXCLUDED.width, \
                 height     = EXCLUDED.height, \
                 updated_at = NOW()",
        )
        .bind(photo.id)
        .bind(&thumb.thumb_type)
        .bind(&thumb.url)
        .bind(thumb.width)
        .bind(thumb.height)
        .execute(&mut *conn)
        .await?;
    }

    Ok(())
}

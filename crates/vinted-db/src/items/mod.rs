//! Database operations for `items`, `photos`, and `thumbnails`.

mod read;
mod types;
mod write;

pub use read::items_for_topic;
pub use types::{ItemRow, PhotoRow, ThumbnailRow};
pub use write::upsert_items;

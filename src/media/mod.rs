// Media module - storage, scanning, ingestion and listing of uploaded images
pub mod cache;
pub mod error;
pub mod ingest;
pub mod scanner;
pub mod slug;
pub mod store;
pub mod types;

pub use cache::ListingCache;
pub use error::MediaError;
pub use ingest::{Ingested, Ingestor, Upload};
pub use scanner::FilesystemScanner;
pub use store::MediaStore;
pub use types::*;

use async_trait::async_trait;
use std::sync::Arc;

pub type SharedMediaSource = Arc<dyn MediaSource>;

/// A newest-first collection of media that can be read one page at a time.
#[async_trait]
pub trait MediaSource: Send + Sync {
    /// Returns the 1-based `page` of at most `limit` items and the collection size.
    async fn list(&self, page: usize, limit: usize) -> Result<MediaPage, MediaError>;
}

/// Slices an ordered collection into a 1-based page.
///
/// Pages past the end yield an empty slice. `page == 0` is treated as page 1.
pub fn paginate(items: &[MediaItem], page: usize, limit: usize) -> MediaPage {
    let start = page.saturating_sub(1).saturating_mul(limit);
    let total = items.len();
    let items = items.iter().skip(start).take(limit).cloned().collect();

    MediaPage { items, total }
}

/// Whether more items exist after `page` when pages hold `limit` items.
pub fn has_more(total: usize, page: usize, limit: usize) -> bool {
    total > page.saturating_mul(limit)
}

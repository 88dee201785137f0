use super::{MediaError, MediaPage, SharedMediaSource};
use std::{
    collections::HashMap,
    sync::{
        Arc,
        atomic::{AtomicU64, Ordering},
    },
    time::Duration,
};
use tokio::sync::RwLock;
use tracing::{debug, error, info};

/// Upper bound on memoized `(page, limit)` entries between invalidations.
pub const MAX_CACHED_PAGES: usize = 256;

/// Memoizes listing pages in front of a [`MediaSource`](super::MediaSource).
///
/// An unreadable or corrupt source is served as an empty page, which is never
/// memoized, so the listing recovers as soon as the source does.
pub struct ListingCache {
    source: SharedMediaSource,
    pages: RwLock<HashMap<(usize, usize), MediaPage>>,
    // Bumped under the `pages` write lock by every invalidation
    generation: AtomicU64,
}

pub type SharedListingCache = Arc<ListingCache>;

impl ListingCache {
    pub fn new(source: SharedMediaSource) -> Self {
        Self {
            source,
            pages: RwLock::new(HashMap::new()),
            generation: AtomicU64::new(0),
        }
    }

    pub async fn list(&self, page: usize, limit: usize) -> Result<MediaPage, MediaError> {
        if let Some(cached) = self.pages.read().await.get(&(page, limit)) {
            debug!("Listing cache hit for page {} limit {}", page, limit);
            return Ok(cached.clone());
        }

        let generation = self.generation.load(Ordering::Acquire);
        let result = match self.source.list(page, limit).await {
            Ok(result) => result,
            Err(e) if e.is_unreadable() => {
                error!("Error reading media data: {}", e);
                return Ok(MediaPage::default());
            }
            Err(e) => return Err(e),
        };

        // Pages past the end are cheap to recompute and unbounded in number
        if page > 1 && result.items.is_empty() {
            return Ok(result);
        }

        let mut pages = self.pages.write().await;
        if self.generation.load(Ordering::Acquire) != generation {
            debug!(
                "Listing invalidated while reading page {} limit {}, not caching",
                page, limit
            );
        } else if pages.len() >= MAX_CACHED_PAGES {
            debug!("Listing cache full, not caching page {} limit {}", page, limit);
        } else {
            pages.insert((page, limit), result.clone());
        }
        Ok(result)
    }

    pub async fn invalidate(&self) {
        let mut pages = self.pages.write().await;
        self.generation.fetch_add(1, Ordering::AcqRel);
        if !pages.is_empty() {
            debug!("Invalidating {} cached listing pages", pages.len());
        }
        pages.clear();
    }

    pub fn start_background_refresh(cache: SharedListingCache, interval_seconds: u64) {
        tokio::spawn(async move {
            let mut interval =
                tokio::time::interval(Duration::from_secs(interval_seconds.max(1)));
            interval.tick().await; // Skip the first immediate tick

            loop {
                interval.tick().await;
                debug!("Scheduled listing cache refresh");
                cache.invalidate().await;
            }
        });
        info!(
            "Listing cache will be refreshed every {} seconds",
            interval_seconds
        );
    }
}

// Client-side paging over the listing endpoint
mod controller;
mod error;
mod fetcher;

pub use controller::{
    LoadOutcome, MIN_REFRESH_INTERVAL, PagingController, PagingOptions, PagingSnapshot,
    PagingState,
};
pub use error::ClientError;
pub use fetcher::{HttpPageFetcher, PageFetcher};

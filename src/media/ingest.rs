use super::{
    MediaError, MediaItem, MediaStore, NewMediaItem,
    cache::SharedListingCache,
    slug::{file_extension, storage_file_name},
};
use axum::body::Bytes;
use std::{path::PathBuf, sync::Arc};
use tracing::{error, info, warn};

/// One uploaded file as received from a client.
#[derive(Debug, Clone, Default)]
pub struct Upload {
    pub bytes: Option<Bytes>,
    pub file_name: String,
    pub content_type: Option<String>,
    pub title: Option<String>,
}

#[derive(Debug, Clone)]
pub struct Ingested {
    pub path: String,
    pub title: String,
    pub item: MediaItem,
}

/// Stores uploaded binaries and records their metadata.
pub struct Ingestor {
    upload_directory: PathBuf,
    url_prefix: String,
    store: Arc<MediaStore>,
    listing_cache: Option<SharedListingCache>,
}

impl Ingestor {
    pub fn new(
        upload_directory: impl Into<PathBuf>,
        url_prefix: impl Into<String>,
        store: Arc<MediaStore>,
    ) -> Self {
        Self {
            upload_directory: upload_directory.into(),
            url_prefix: url_prefix.into().trim_end_matches('/').to_string(),
            store,
            listing_cache: None,
        }
    }

    pub fn with_listing_cache(mut self, cache: SharedListingCache) -> Self {
        self.listing_cache = Some(cache);
        self
    }

    pub async fn ingest(&self, upload: Upload) -> Result<Ingested, MediaError> {
        let bytes = upload
            .bytes
            .filter(|b| !b.is_empty())
            .ok_or_else(|| MediaError::Validation("No file uploaded".to_string()))?;
        let title = upload
            .title
            .filter(|t| !t.trim().is_empty())
            .ok_or_else(|| MediaError::Validation("No title provided".to_string()))?;

        tokio::fs::create_dir_all(&self.upload_directory)
            .await
            .map_err(|e| MediaError::write(&self.upload_directory, e))?;
        self.store.initialize().await?;

        let extension = file_extension(&upload.file_name, upload.content_type.as_deref());
        let file_name = storage_file_name(&title, &extension);
        let file_path = self.upload_directory.join(&file_name);

        tokio::fs::write(&file_path, &bytes)
            .await
            .map_err(|e| MediaError::write(&file_path, e))?;

        let public_path = format!("{}/{}", self.url_prefix, file_name);

        let item = match self
            .store
            .append(NewMediaItem {
                title: title.clone(),
                path: public_path.clone(),
            })
            .await
        {
            Ok(item) => item,
            Err(e) => {
                error!("Failed to record metadata for {:?}: {}", file_path, e);
                warn!("Orphaned upload left on disk: {:?}", file_path);
                return Err(e);
            }
        };

        if let Some(cache) = &self.listing_cache {
            cache.invalidate().await;
        }

        info!(
            "Stored upload '{}' as {} ({} bytes)",
            title,
            public_path,
            bytes.len()
        );

        Ok(Ingested {
            path: public_path,
            title,
            item,
        })
    }
}

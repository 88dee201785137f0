use super::{
    MediaError, MediaSource, paginate,
    types::{MediaDocument, MediaItem, MediaPage, NewMediaItem},
};
use async_trait::async_trait;
use chrono::{SubsecRound, Utc};
use rand::Rng;
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;
use tracing::{debug, info};

const ID_ALPHABET: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";
const ID_SUFFIX_LEN: usize = 9;

/// Media metadata persisted as a single newest-first JSON document.
pub struct MediaStore {
    metadata_file: PathBuf,
    write_lock: Mutex<()>,
}

impl MediaStore {
    pub fn new(metadata_file: impl Into<PathBuf>) -> Self {
        Self {
            metadata_file: metadata_file.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn metadata_file(&self) -> &Path {
        &self.metadata_file
    }

    /// Creates an empty document if none exists. Existing documents are left untouched.
    pub async fn initialize(&self) -> Result<(), MediaError> {
        let _guard = self.write_lock.lock().await;

        if tokio::fs::try_exists(&self.metadata_file)
            .await
            .map_err(|e| MediaError::read(&self.metadata_file, e))?
        {
            debug!("Metadata file already exists: {:?}", self.metadata_file);
            return Ok(());
        }

        if let Some(parent) = self.metadata_file.parent()
            && !parent.as_os_str().is_empty()
        {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| MediaError::write(parent, e))?;
        }

        info!("Creating empty metadata file at {:?}", self.metadata_file);
        self.persist(&MediaDocument::default()).await
    }

    /// Inserts a new record at the head of the collection and persists it.
    ///
    /// The record is only returned once the whole document has been written.
    pub async fn append(&self, item: NewMediaItem) -> Result<MediaItem, MediaError> {
        let _guard = self.write_lock.lock().await;

        let mut document = self.load().await?;

        let new_item = MediaItem {
            id: generate_id(),
            title: item.title,
            path: item.path,
            created_at: Utc::now().trunc_subsecs(3),
        };
        document.items.insert(0, new_item.clone());

        self.persist(&document).await?;
        debug!(
            "Appended media item {} ({} total)",
            new_item.id,
            document.items.len()
        );

        Ok(new_item)
    }

    async fn load(&self) -> Result<MediaDocument, MediaError> {
        let content = tokio::fs::read_to_string(&self.metadata_file)
            .await
            .map_err(|e| MediaError::read(&self.metadata_file, e))?;

        serde_json::from_str(&content).map_err(|source| MediaError::Corrupt {
            path: self.metadata_file.clone(),
            source,
        })
    }

    // Writes to a sibling file first so readers never see a partial document
    async fn persist(&self, document: &MediaDocument) -> Result<(), MediaError> {
        let json = serde_json::to_string_pretty(document)?;

        let mut tmp_name = self.metadata_file.as_os_str().to_owned();
        tmp_name.push(".tmp");
        let tmp_file = PathBuf::from(tmp_name);

        tokio::fs::write(&tmp_file, json)
            .await
            .map_err(|e| MediaError::write(&tmp_file, e))?;

        if let Err(e) = tokio::fs::rename(&tmp_file, &self.metadata_file).await {
            let _ = tokio::fs::remove_file(&tmp_file).await;
            return Err(MediaError::write(&self.metadata_file, e));
        }

        Ok(())
    }
}

#[async_trait]
impl MediaSource for MediaStore {
    async fn list(&self, page: usize, limit: usize) -> Result<MediaPage, MediaError> {
        let document = self.load().await?;
        Ok(paginate(&document.items, page, limit))
    }
}

fn generate_id() -> String {
    let mut rng = rand::rng();
    let suffix: String = (0..ID_SUFFIX_LEN)
        .map(|_| ID_ALPHABET[rng.random_range(0..ID_ALPHABET.len())] as char)
        .collect();
    format!("{}-{}", Utc::now().timestamp_millis(), suffix)
}

use super::{
    MediaError, MediaSource, paginate,
    types::{MediaItem, MediaPage},
};
use async_trait::async_trait;
use chrono::{DateTime, SubsecRound, Utc};
use std::path::{Path, PathBuf};
use tracing::debug;

const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "gif", "webp"];

/// Lists media straight from the upload directory, deriving metadata from file names.
pub struct FilesystemScanner {
    upload_directory: PathBuf,
    url_prefix: String,
}

impl FilesystemScanner {
    pub fn new(upload_directory: impl Into<PathBuf>, url_prefix: impl Into<String>) -> Self {
        Self {
            upload_directory: upload_directory.into(),
            url_prefix: url_prefix.into().trim_end_matches('/').to_string(),
        }
    }

    /// All recognized images in the upload directory, newest first.
    pub async fn scan(&self) -> Result<Vec<MediaItem>, MediaError> {
        let mut entries = tokio::fs::read_dir(&self.upload_directory)
            .await
            .map_err(|e| MediaError::read(&self.upload_directory, e))?;

        let mut items = Vec::new();
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| MediaError::read(&self.upload_directory, e))?
        {
            let Some(file_name) = entry.file_name().to_str().map(str::to_string) else {
                continue;
            };
            if !is_listed_image(&file_name) {
                continue;
            }

            let metadata = match entry.metadata().await {
                Ok(metadata) if metadata.is_file() => metadata,
                Ok(_) => continue,
                Err(e) => {
                    debug!("Skipping {:?}: {}", entry.path(), e);
                    continue;
                }
            };

            let created_at = metadata
                .created()
                .or_else(|_| metadata.modified())
                .map(DateTime::<Utc>::from)
                .unwrap_or_else(|_| Utc::now())
                .trunc_subsecs(3);

            items.push(MediaItem {
                id: file_name.clone(),
                title: title_from_file_name(&file_name),
                path: format!("{}/{}", self.url_prefix, file_name),
                created_at,
            });
        }

        items.sort_by(|a, b| b.created_at.cmp(&a.created_at).then_with(|| a.id.cmp(&b.id)));
        Ok(items)
    }
}

#[async_trait]
impl MediaSource for FilesystemScanner {
    async fn list(&self, page: usize, limit: usize) -> Result<MediaPage, MediaError> {
        let items = self.scan().await?;
        Ok(paginate(&items, page, limit))
    }
}

fn is_listed_image(file_name: &str) -> bool {
    if file_name.starts_with('.') {
        return false;
    }
    Path::new(file_name)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| {
            IMAGE_EXTENSIONS
                .iter()
                .any(|known| ext.eq_ignore_ascii_case(known))
        })
        .unwrap_or(false)
}

/// Recovers a display title from a stored name such as `my-cat-1700000000000-42.png`.
pub fn title_from_file_name(file_name: &str) -> String {
    let segments: Vec<&str> = file_name.split('-').collect();

    let base = if segments.len() > 2 {
        segments[..segments.len() - 2].join("-")
    } else {
        file_name.to_string()
    };
    let base = match base.rsplit_once('.') {
        Some((stem, _)) if !stem.is_empty() => stem.to_string(),
        _ => base,
    };

    base.split('-')
        .filter(|word| !word.is_empty())
        .map(capitalize)
        .collect::<Vec<_>>()
        .join(" ")
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

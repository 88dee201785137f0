use crate::{Config, media::MediaError};
use std::path::Path;
use thiserror::Error;
use tracing::{error, info, warn};

#[derive(Debug, Error)]
pub enum StartupCheckError {
    #[error("Failed to create upload directory: {0}")]
    UploadDirectoryCreationFailed(#[source] std::io::Error),

    #[error("Upload directory is not accessible: {0}")]
    UploadDirectoryUnreadable(#[source] std::io::Error),

    #[error("Failed to initialize metadata store: {0}")]
    MetadataStoreInitFailed(#[from] MediaError),

    #[error("Invalid upload URL prefix: {0}")]
    InvalidUrlPrefix(String),
}

impl StartupCheckError {
    pub fn is_critical(&self) -> bool {
        matches!(
            self,
            StartupCheckError::UploadDirectoryCreationFailed(_)
                | StartupCheckError::InvalidUrlPrefix(_)
        )
    }
}

pub async fn perform_startup_checks(config: &Config) -> Result<(), Vec<StartupCheckError>> {
    let mut errors = Vec::new();

    info!("Performing startup checks...");

    let prefix = &config.storage.url_prefix;
    if !prefix.starts_with('/') || prefix.trim_end_matches('/').is_empty() {
        error!("Upload URL prefix must be a non-root absolute path: {:?}", prefix);
        errors.push(StartupCheckError::InvalidUrlPrefix(prefix.clone()));
    }

    let upload_dir = Path::new(&config.storage.upload_directory);
    if !upload_dir.exists() {
        info!("Upload directory does not exist, creating: {:?}", upload_dir);
        if let Err(e) = tokio::fs::create_dir_all(upload_dir).await {
            error!("Failed to create upload directory: {}", e);
            errors.push(StartupCheckError::UploadDirectoryCreationFailed(e));
        } else {
            info!("Upload directory created successfully");
        }
    } else {
        match tokio::fs::read_dir(upload_dir).await {
            Ok(_) => info!("Upload directory is accessible: {:?}", upload_dir),
            Err(e) => {
                warn!("Upload directory is not accessible: {}", e);
                errors.push(StartupCheckError::UploadDirectoryUnreadable(e));
            }
        }
    }

    // The metadata document is only authoritative for store-backed listings,
    // but uploads always record to it
    let store = crate::media::MediaStore::new(config.storage.metadata_file.clone());
    match store.initialize().await {
        Ok(()) => info!("Metadata store ready: {:?}", store.metadata_file()),
        Err(e) => {
            error!("Failed to initialize metadata store: {}", e);
            errors.push(e.into());
        }
    }

    if errors.is_empty() {
        info!("All startup checks passed");
        Ok(())
    } else {
        error!("Startup checks failed with {} errors", errors.len());
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn config_in(temp_dir: &TempDir) -> Config {
        let mut config = Config::default();
        config.storage.upload_directory = temp_dir.path().join("public/uploads");
        config.storage.metadata_file = temp_dir.path().join("data/media.json");
        config
    }

    #[tokio::test]
    async fn test_startup_creates_directories_and_store() {
        let temp_dir = TempDir::new().unwrap();
        let config = config_in(&temp_dir);

        perform_startup_checks(&config).await.unwrap();

        assert!(config.storage.upload_directory.is_dir());
        let content = std::fs::read_to_string(&config.storage.metadata_file).unwrap();
        assert!(content.contains("\"items\""));
    }

    #[tokio::test]
    async fn test_startup_keeps_existing_metadata() {
        let temp_dir = TempDir::new().unwrap();
        let config = config_in(&temp_dir);
        std::fs::create_dir_all(temp_dir.path().join("data")).unwrap();
        let existing = r#"{"items":[{"id":"1","title":"Kept","path":"/uploads/kept.png","createdAt":"2024-01-01T00:00:00.000Z"}]}"#;
        std::fs::write(&config.storage.metadata_file, existing).unwrap();

        perform_startup_checks(&config).await.unwrap();

        assert_eq!(
            std::fs::read_to_string(&config.storage.metadata_file).unwrap(),
            existing
        );
    }

    #[tokio::test]
    async fn test_root_prefix_is_critical() {
        let temp_dir = TempDir::new().unwrap();
        let mut config = config_in(&temp_dir);
        config.storage.url_prefix = "/".to_string();

        let errors = perform_startup_checks(&config).await.unwrap_err();
        assert!(errors.iter().any(|e| e.is_critical()));
    }
}

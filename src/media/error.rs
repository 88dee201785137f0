use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum MediaError {
    #[error("{0}")]
    Validation(String),

    #[error("Failed to write {path:?}: {source}")]
    StorageWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to read {path:?}: {source}")]
    StorageRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Corrupt metadata in {path:?}: {source}")]
    Corrupt {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Serialization error: {0}")]
    SerdeError(#[from] serde_json::Error),
}

impl MediaError {
    pub(crate) fn write(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        MediaError::StorageWrite {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn read(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        MediaError::StorageRead {
            path: path.into(),
            source,
        }
    }

    pub fn is_validation(&self) -> bool {
        matches!(self, MediaError::Validation(_))
    }

    /// The backing document or directory could not be read or parsed.
    pub fn is_unreadable(&self) -> bool {
        matches!(
            self,
            MediaError::StorageRead { .. } | MediaError::Corrupt { .. }
        )
    }
}

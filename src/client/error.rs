use reqwest::StatusCode;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Unexpected status: {0}")]
    Status(StatusCode),

    #[error("Server error ({status}): {message}")]
    Server { status: StatusCode, message: String },
}

use super::ClientError;
use crate::media::{ErrorResponse, MediaResponse};
use async_trait::async_trait;
use tracing::debug;

/// Retrieves one page of the media listing.
#[async_trait]
pub trait PageFetcher: Send + Sync + 'static {
    async fn fetch(&self, page: usize, limit: usize) -> Result<MediaResponse, ClientError>;
}

/// Fetches pages from a running server's `/api/media` endpoint.
pub struct HttpPageFetcher {
    client: reqwest::Client,
    endpoint: String,
}

impl HttpPageFetcher {
    pub fn new(base_url: &str) -> Result<Self, ClientError> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("mediagrid/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self::with_client(client, base_url))
    }

    pub fn with_client(client: reqwest::Client, base_url: &str) -> Self {
        Self {
            client,
            endpoint: format!("{}/api/media", base_url.trim_end_matches('/')),
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl PageFetcher for HttpPageFetcher {
    async fn fetch(&self, page: usize, limit: usize) -> Result<MediaResponse, ClientError> {
        debug!("Fetching {} page {} limit {}", self.endpoint, page, limit);

        let response = self
            .client
            .get(&self.endpoint)
            .query(&[("page", page), ("limit", limit)])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(match response.json::<ErrorResponse>().await {
                Ok(body) => ClientError::Server {
                    status,
                    message: body.error,
                },
                Err(_) => ClientError::Status(status),
            });
        }

        Ok(response.json::<MediaResponse>().await?)
    }
}

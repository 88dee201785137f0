use serde::{Deserialize, Serialize};
use std::path::PathBuf;

pub mod api;
pub mod client;
pub mod media;
pub mod startup_checks;

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub app: AppConfig,
    pub storage: StorageConfig,
    pub listing: ListingConfig,
    pub client: ClientConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AppConfig {
    pub name: String,
    pub log_level: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StorageConfig {
    pub upload_directory: PathBuf,
    pub metadata_file: PathBuf,
    pub url_prefix: String,
    pub max_upload_bytes: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ListingSourceKind {
    /// Metadata document written at upload time
    Store,
    /// Derived from the files in the upload directory
    Scan,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ListingConfig {
    pub source: ListingSourceKind,
    pub default_limit: usize,
    pub max_limit: usize,
    pub cache_refresh_interval_seconds: Option<u64>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ClientConfig {
    pub base_url: String,
    pub page_size: usize,
    pub refresh_interval_seconds: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 3000,
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            name: "Media Grid".to_string(),
            log_level: "info".to_string(),
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            upload_directory: PathBuf::from("uploads"),
            metadata_file: PathBuf::from("data/media.json"),
            url_prefix: "/uploads".to_string(),
            max_upload_bytes: 20 * 1024 * 1024,
        }
    }
}

impl Default for ListingConfig {
    fn default() -> Self {
        Self {
            source: ListingSourceKind::Store,
            default_limit: 20,
            max_limit: 100,
            cache_refresh_interval_seconds: Some(60),
        }
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:3000".to_string(),
            page_size: 20,
            refresh_interval_seconds: 30,
        }
    }
}

use axum::{Router, extract::DefaultBodyLimit, routing::get, routing::post};
use media::{
    FilesystemScanner, Ingestor, ListingCache, MediaStore, SharedMediaSource,
    cache::SharedListingCache,
};
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::{services::ServeDir, trace::TraceLayer};

#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub store: Arc<MediaStore>,
    pub listing: SharedListingCache,
    pub ingestor: Arc<Ingestor>,
}

impl AppState {
    pub fn new(config: Config) -> Self {
        let store = Arc::new(MediaStore::new(config.storage.metadata_file.clone()));

        let source: SharedMediaSource = match config.listing.source {
            ListingSourceKind::Store => store.clone() as SharedMediaSource,
            ListingSourceKind::Scan => Arc::new(FilesystemScanner::new(
                config.storage.upload_directory.clone(),
                config.storage.url_prefix.clone(),
            )),
        };
        let listing = Arc::new(ListingCache::new(source));

        let ingestor = Arc::new(
            Ingestor::new(
                config.storage.upload_directory.clone(),
                config.storage.url_prefix.clone(),
                store.clone(),
            )
            .with_listing_cache(listing.clone()),
        );

        Self {
            config,
            store,
            listing,
            ingestor,
        }
    }
}

pub async fn create_app(config: Config) -> Router {
    create_app_with_state(AppState::new(config))
}

pub fn create_app_with_state(app_state: AppState) -> Router {
    let storage = &app_state.config.storage;
    let uploads = ServeDir::new(storage.upload_directory.clone());

    let upload_routes = Router::new()
        .route("/api/upload", post(api::upload_handler))
        .route_layer(DefaultBodyLimit::max(storage.max_upload_bytes));

    Router::new()
        .route("/api/media", get(api::list_media_handler))
        .route("/health", get(api::health_handler))
        .merge(upload_routes)
        .nest_service(&storage.url_prefix, uploads)
        .layer(
            ServiceBuilder::new().layer(
                TraceLayer::new_for_http()
                    .make_span_with(|request: &axum::http::Request<_>| {
                        let method = request.method();
                        let uri = request.uri();
                        let matched_path = request
                            .extensions()
                            .get::<axum::extract::MatchedPath>()
                            .map(|matched_path| matched_path.as_str());

                        tracing::info_span!(
                            "http_request",
                            method = %method,
                            uri = %uri,
                            matched_path,
                        )
                    })
                    .on_request(|request: &axum::http::Request<_>, _span: &tracing::Span| {
                        let user_agent = request
                            .headers()
                            .get("user-agent")
                            .and_then(|h| h.to_str().ok())
                            .unwrap_or("-");

                        tracing::info!(
                            target: "access_log",
                            method = %request.method(),
                            path = %request.uri().path(),
                            query = ?request.uri().query(),
                            user_agent = %user_agent,
                            "request"
                        );
                    })
                    .on_response(
                        |response: &axum::http::Response<_>,
                         latency: std::time::Duration,
                         _span: &tracing::Span| {
                            tracing::info!(
                                target: "access_log",
                                status = %response.status(),
                                latency_ms = %latency.as_millis(),
                                "response"
                            );
                        },
                    ),
            ),
        )
        .with_state(app_state)
}

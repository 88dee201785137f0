use crate::{
    AppState,
    media::{ErrorResponse, MediaError, MediaQuery, MediaResponse, Upload, UploadResponse, has_more},
};
use axum::{
    extract::{Multipart, Query, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use tracing::{error, warn};

pub async fn list_media_handler(
    State(app_state): State<AppState>,
    Query(query): Query<MediaQuery>,
) -> Response {
    let listing = &app_state.config.listing;
    let page = query.page();
    let limit = query.limit(listing.default_limit, listing.max_limit);

    match app_state.listing.list(page, limit).await {
        Ok(result) => Json(MediaResponse {
            has_more: has_more(result.total, page, limit),
            total: result.total,
            items: result.items,
        })
        .into_response(),
        Err(e) => {
            error!("Failed to fetch media items: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse {
                    error: "Failed to fetch media items".to_string(),
                }),
            )
                .into_response()
        }
    }
}

pub async fn upload_handler(State(app_state): State<AppState>, multipart: Multipart) -> Response {
    let upload = match read_upload(multipart).await {
        Ok(upload) => upload,
        Err(message) => {
            warn!("Rejected malformed upload: {}", message);
            return upload_failure(StatusCode::BAD_REQUEST, message);
        }
    };

    match app_state.ingestor.ingest(upload).await {
        Ok(ingested) => Json(UploadResponse {
            success: true,
            path: Some(ingested.path),
            title: Some(ingested.title),
            error: None,
        })
        .into_response(),
        Err(e @ MediaError::Validation(_)) => {
            warn!("Upload rejected: {}", e);
            upload_failure(StatusCode::BAD_REQUEST, e.to_string())
        }
        Err(e) => {
            error!("Error uploading file: {}", e);
            upload_failure(
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to upload file".to_string(),
            )
        }
    }
}

pub async fn health_handler() -> &'static str {
    "ok"
}

async fn read_upload(mut multipart: Multipart) -> Result<Upload, String> {
    let mut upload = Upload::default();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| format!("Invalid multipart data: {e}"))?
    {
        let field_name = field.name().unwrap_or_default().to_string();

        match field_name.as_str() {
            "file" => {
                upload.file_name = field.file_name().unwrap_or_default().to_string();
                upload.content_type = field.content_type().map(str::to_string);
                upload.bytes = Some(
                    field
                        .bytes()
                        .await
                        .map_err(|e| format!("Failed to read file: {e}"))?,
                );
            }
            "title" => {
                upload.title = Some(
                    field
                        .text()
                        .await
                        .map_err(|e| format!("Failed to read title: {e}"))?,
                );
            }
            _ => {}
        }
    }

    Ok(upload)
}

fn upload_failure(status: StatusCode, message: String) -> Response {
    (
        status,
        Json(UploadResponse {
            success: false,
            error: Some(message),
            ..Default::default()
        }),
    )
        .into_response()
}

use axum::extract::{DefaultBodyLimit, Multipart, State};
use axum::http::StatusCode;
use axum::routing::post;
use axum::{Json, Router};
use std::sync::Arc;
use tracing::{error, info, warn};

use crate::app::AppState;
use crate::models::api::MessageResponse;
use crate::models::upload::{UploadMessage, UploadRecord};
use crate::parser::{file_extension, sanitize_file_name};
use crate::storage::content_type_for;

/// Largest accepted request body.
const MAX_UPLOAD_BYTES: usize = 50 * 1024 * 1024;

/// File upload routes.
pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/upload", post(upload_file))
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
}

/// POST /api/upload - Store a file and queue it for indexing.
async fn upload_file(
    State(state): State<Arc<AppState>>,
    mut multipart: Multipart,
) -> Result<Json<MessageResponse>, (StatusCode, String)> {
    let mut upload: Option<(String, Vec<u8>)> = None;

    while let Some(field) = multipart.next_field().await.map_err(|e| {
        (
            StatusCode::BAD_REQUEST,
            format!("Failed to read multipart field: {e}"),
        )
    })? {
        if field.name() != Some("file") {
            continue;
        }
        let file_name = field.file_name().map(sanitize_file_name).unwrap_or_default();
        let bytes = field.bytes().await.map_err(|e| {
            (
                StatusCode::BAD_REQUEST,
                format!("Failed to read file: {e}"),
            )
        })?;
        upload = Some((file_name, bytes.to_vec()));
    }

    let Some((file_name, data)) = upload else {
        return Err((StatusCode::BAD_REQUEST, "No file provided".to_string()));
    };
    if file_name.is_empty() {
        return Err((StatusCode::BAD_REQUEST, "No file selected".to_string()));
    }

    let document_id = store_upload(&state, &file_name, &data).await.map_err(|e| {
        error!("Upload of {file_name} failed: {e}");
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            format!("Failed to upload file: {e}"),
        )
    })?;

    info!("Uploaded {file_name} ({} bytes) as {document_id}", data.len());
    Ok(Json(MessageResponse {
        message: "File uploaded successfully!".to_string(),
    }))
}

/// Store the object, record it and announce it to the worker.
async fn store_upload(state: &AppState, file_name: &str, data: &[u8]) -> anyhow::Result<String> {
    let extension = file_extension(file_name);
    let bucket = state.storage.default_bucket();

    state
        .storage
        .upload_bytes(data, file_name, content_type_for(extension), bucket)
        .await?;

    let record = UploadRecord::new(file_name, extension);
    if let Err(e) = state.database.insert_upload(&record).await {
        if let Err(cleanup) = state.storage.delete_file(bucket, file_name).await {
            warn!("Could not remove {file_name} after failed insert: {cleanup}");
        }
        return Err(e);
    }

    state
        .queue
        .publish(&UploadMessage::uploaded(&record.id))
        .await?;

    Ok(record.id)
}

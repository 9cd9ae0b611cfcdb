use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use serde::Deserialize;
use std::sync::Arc;
use tracing::error;

use crate::app::AppState;
use crate::models::api::{FilesResponse, HealthResponse};

/// Health and upload listing routes.
pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/health", get(health))
        .route("/api/files", get(list_files))
}

/// GET /health
async fn health(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: state.settings.environment.clone(),
    })
}

#[derive(Debug, Deserialize)]
struct ListParams {
    #[serde(default = "default_limit")]
    limit: i64,
}

fn default_limit() -> i64 {
    10
}

/// GET /api/files - Most recent uploads first.
async fn list_files(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ListParams>,
) -> Result<Json<FilesResponse>, (StatusCode, String)> {
    let files = state
        .database
        .list_uploads(Some(params.limit))
        .await
        .map_err(|e| {
            error!("Database error: {e}");
            (StatusCode::INTERNAL_SERVER_ERROR, format!("Database error: {e}"))
        })?;

    Ok(Json(FilesResponse { files }))
}

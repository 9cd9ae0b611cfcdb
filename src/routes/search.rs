use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::post;
use axum::{Json, Router};
use std::sync::Arc;
use tracing::error;

use crate::app::AppState;
use crate::models::api::{SearchAnswer, SearchRequest};

/// Question answering routes.
pub fn routes() -> Router<Arc<AppState>> {
    Router::new().route("/api/search", post(search))
}

/// POST /api/search - Answer a question from the indexed uploads.
async fn search(
    State(state): State<Arc<AppState>>,
    Json(req): Json<SearchRequest>,
) -> Result<Json<SearchAnswer>, (StatusCode, String)> {
    if req.query_msg.trim().is_empty() {
        return Err((
            StatusCode::BAD_REQUEST,
            "No query message provided".to_string(),
        ));
    }

    let file_selection = req
        .file_selection
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty());

    let answer = state
        .search
        .answer_query(&req.query_msg, file_selection)
        .await
        .map_err(|e| {
            error!("Search error: {e}");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Error occurred: {e}"),
            )
        })?;

    Ok(Json(answer))
}

pub mod files;
pub mod search;
pub mod upload;

use axum::Router;
use std::sync::Arc;

use crate::app::AppState;

/// Build all API routes.
pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .merge(files::routes())
        .merge(upload::routes())
        .merge(search::routes())
        .with_state(state)
}

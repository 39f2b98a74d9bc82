//! Tag search and removal.

use std::convert::Infallible;

use axum::response::sse::{Event, KeepAlive};
use axum::{Json, Router, extract::State, response::Sse, routing::post};
use futures::StreamExt;
use serde::{Deserialize, Serialize};

use super::sse_event;
use crate::error::AppError;
use crate::services::TagFilter;
use crate::state::AppState;

/// Build the tags router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/tags/search", post(search))
        .route("/api/tags/remove-all", post(remove_all))
}

#[derive(Debug, Serialize)]
pub struct TagSearchResponse {
    pub tags: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub struct RemoveAllRequest {
    pub tags: Vec<String>,
}

/// POST /api/tags/search
async fn search(
    State(state): State<AppState>,
    Json(filter): Json<TagFilter>,
) -> Result<Json<TagSearchResponse>, AppError> {
    let tags = state.tags().search(&filter).await?;
    Ok(Json(TagSearchResponse { tags }))
}

/// POST /api/tags/remove-all
async fn remove_all(
    State(state): State<AppState>,
    Json(request): Json<RemoveAllRequest>,
) -> Result<Sse<impl futures::Stream<Item = Result<Event, Infallible>>>, AppError> {
    if request.tags.iter().all(|t| t.trim().is_empty()) {
        return Err(AppError::BadRequest("No tags given".to_string()));
    }
    let sse_stream = state
        .tags()
        .remove_everywhere(request.tags)
        .map(|event| sse_event(&event));

    Ok(Sse::new(sse_stream).keep_alive(KeepAlive::default()))
}

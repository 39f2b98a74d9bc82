//! Metafield-wide operations.

use std::convert::Infallible;

use axum::response::sse::{Event, KeepAlive};
use axum::{Json, Router, extract::State, response::Sse, routing::post};
use futures::StreamExt;
use serde::Deserialize;
use tagfield_core::ResourceType;

use super::sse_event;
use crate::error::AppError;
use crate::state::AppState;

/// Build the metafields router.
pub fn router() -> Router<AppState> {
    Router::new().route("/api/metafields/delete-all", post(delete_all))
}

/// Request to remove one metafield from every resource of a type.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteAllRequest {
    pub resource_type: ResourceType,
    pub namespace: String,
    pub key: String,
}

/// POST /api/metafields/delete-all
///
/// Streams progress after every page fetch and delete pass.
async fn delete_all(
    State(state): State<AppState>,
    Json(request): Json<DeleteAllRequest>,
) -> Result<Sse<impl futures::Stream<Item = Result<Event, Infallible>>>, AppError> {
    let namespace = request.namespace.trim();
    let key = request.key.trim();
    if namespace.is_empty() || key.is_empty() {
        return Err(AppError::BadRequest(
            "namespace and key are required".to_string(),
        ));
    }

    let progress = state
        .bulk_delete()
        .stream(request.resource_type, namespace, key);
    let sse_stream = progress.map(|p| sse_event(&p));

    Ok(Sse::new(sse_stream).keep_alive(KeepAlive::default()))
}

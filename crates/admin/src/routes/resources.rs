//! Resource counts and metafield definitions.

use axum::{
    Json, Router,
    extract::{Path, State},
    routing::get,
};
use serde::Serialize;
use tagfield_core::ResourceType;

use crate::error::AppError;
use crate::shopify::MetafieldDefinition;
use crate::state::AppState;

/// Build the resources router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/resources/{type}/count", get(count))
        .route(
            "/api/resources/{type}/metafield-definitions",
            get(definitions),
        )
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CountResponse {
    pub resource_type: ResourceType,
    pub count: u64,
}

pub(crate) fn parse_resource_type(raw: &str) -> Result<ResourceType, AppError> {
    raw.parse().map_err(AppError::BadRequest)
}

/// GET /api/resources/{type}/count
async fn count(
    State(state): State<AppState>,
    Path(resource_type): Path<String>,
) -> Result<Json<CountResponse>, AppError> {
    let resource_type = parse_resource_type(&resource_type)?;
    let count = state.scanner().count(resource_type).await;
    Ok(Json(CountResponse {
        resource_type,
        count,
    }))
}

/// GET /api/resources/{type}/metafield-definitions
async fn definitions(
    State(state): State<AppState>,
    Path(resource_type): Path<String>,
) -> Result<Json<Vec<MetafieldDefinition>>, AppError> {
    let resource_type = parse_resource_type(&resource_type)?;
    Ok(Json(state.scanner().definitions(resource_type).await?))
}

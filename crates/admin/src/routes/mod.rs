//! HTTP route handlers.
//!
//! # Route Structure
//!
//! ```text
//! GET  /health                                   - Health check
//!
//! # Resources
//! GET  /api/resources/{type}/count               - Resource count
//! GET  /api/resources/{type}/metafield-definitions - Metafield definitions
//!
//! # Batches (multipart CSV upload, SSE progress)
//! POST /api/batches                              - Run a batch operation
//!
//! # Metafields
//! POST /api/metafields/delete-all                - Remove a metafield everywhere (SSE)
//!
//! # Tags
//! POST /api/tags/search                          - Distinct tags matching conditions
//! POST /api/tags/remove-all                      - Remove tags everywhere (SSE)
//!
//! # History
//! GET  /api/history                              - Sweep, then one page
//! POST /api/history/setup                        - Create the history definition
//! POST /api/history/sweep                        - Retention sweep
//! POST /api/history/{id}/undo                    - Undo a record (SSE)
//!
//! # Export
//! POST /api/export                               - CSV download
//! ```

use std::convert::Infallible;

use axum::Router;
use axum::response::sse::Event;
use serde::Serialize;

use crate::state::AppState;

pub mod batches;
pub mod export;
pub mod history;
pub mod metafields;
pub mod resources;
pub mod tags;

/// Build the API router.
pub fn routes() -> Router<AppState> {
    Router::new()
        .merge(resources::router())
        .merge(batches::router())
        .merge(metafields::router())
        .merge(tags::router())
        .merge(history::router())
        .merge(export::router())
}

/// Serialize one value into an SSE `data:` event.
fn sse_event<T: Serialize>(event: &T) -> Result<Event, Infallible> {
    let json = serde_json::to_string(event).unwrap_or_else(|_| {
        r#"{"event":"error","message":"Failed to serialize event"}"#.to_string()
    });
    Ok(Event::default().data(json))
}

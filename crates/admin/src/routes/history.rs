//! History listing, maintenance and undo.

use std::convert::Infallible;

use axum::response::sse::{Event, KeepAlive};
use axum::{
    Json, Router,
    extract::{Path, Query, State},
    response::Sse,
    routing::{get, post},
};
use futures::StreamExt;
use serde::{Deserialize, Serialize};
use tracing::warn;

use super::sse_event;
use crate::error::AppError;
use crate::services::{HistoryPage, PageDirection, SweepReport};
use crate::state::AppState;

/// Build the history router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/history", get(list))
        .route("/api/history/setup", post(setup))
        .route("/api/history/sweep", post(sweep))
        .route("/api/history/{id}/undo", post(undo))
}

#[derive(Debug, Deserialize)]
pub struct HistoryQuery {
    pub cursor: Option<String>,
    #[serde(default)]
    pub direction: PageDirection,
}

#[derive(Debug, Serialize)]
pub struct SetupResponse {
    pub created: bool,
}

#[derive(Debug, Serialize)]
#[serde(tag = "event", rename = "error")]
struct UndoFailed {
    message: String,
}

/// GET /api/history
///
/// Expired records are swept before the page is read. A failed sweep is
/// logged and does not block listing.
async fn list(
    State(state): State<AppState>,
    Query(query): Query<HistoryQuery>,
) -> Result<Json<HistoryPage>, AppError> {
    let ledger = state.ledger();
    if ledger.is_configured().await?
        && let Err(e) = ledger.sweep().await
    {
        warn!(error = %e, "History sweep failed");
    }
    let cursor = query.cursor.filter(|c| !c.is_empty());
    Ok(Json(ledger.page(cursor, query.direction).await?))
}

/// POST /api/history/setup
async fn setup(State(state): State<AppState>) -> Result<Json<SetupResponse>, AppError> {
    let created = state.ledger().ensure_definition().await?;
    Ok(Json(SetupResponse { created }))
}

/// POST /api/history/sweep
async fn sweep(State(state): State<AppState>) -> Result<Json<SweepReport>, AppError> {
    Ok(Json(state.ledger().sweep().await?))
}

/// POST /api/history/{id}/undo
///
/// Streams one event per replayed row and a final summary. A record that
/// is missing or already restored yields a single error event.
async fn undo(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Sse<impl futures::Stream<Item = Result<Event, Infallible>>> {
    let sse_stream = state.undo().replay(id).map(|event| match event {
        Ok(event) => sse_event(&event),
        Err(e) => {
            warn!(error = %e, "Undo failed");
            sse_event(&UndoFailed {
                message: e.to_string(),
            })
        }
    });

    Sse::new(sse_stream).keep_alive(KeepAlive::default())
}

//! CSV export downloads.

use axum::{
    Json, Router,
    extract::State,
    http::header,
    response::{IntoResponse, Response},
    routing::post,
};

use crate::error::AppError;
use crate::services::ExportTarget;
use crate::state::AppState;

/// Build the export router.
pub fn router() -> Router<AppState> {
    Router::new().route("/api/export", post(export))
}

fn file_name(target: &ExportTarget) -> String {
    match target {
        ExportTarget::Resources { resource_type } => format!("{resource_type}-export.csv"),
        ExportTarget::Metaobjects { type_name } => format!("{type_name}-metaobjects.csv"),
    }
}

/// POST /api/export
async fn export(
    State(state): State<AppState>,
    Json(target): Json<ExportTarget>,
) -> Result<Response, AppError> {
    let csv = state.export().export(&target).await?;
    let disposition = format!("attachment; filename=\"{}\"", file_name(&target));

    Ok((
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        csv,
    )
        .into_response())
}

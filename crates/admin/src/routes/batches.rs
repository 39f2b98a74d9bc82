//! CSV batch uploads.

use std::convert::Infallible;

use axum::response::sse::{Event, KeepAlive};
use axum::{
    Router,
    extract::{Multipart, State},
    response::Sse,
    routing::post,
};
use futures::StreamExt;
use serde_json::Value;
use tagfield_core::{ListMode, MatchField, MetafieldDescriptor, ResourceType};
use tracing::info;

use super::resources::parse_resource_type;
use super::sse_event;
use crate::csv::{parse_batch, report};
use crate::error::AppError;
use crate::services::{BatchDriver, BatchEvent, BatchOperation, OperationKind};
use crate::state::AppState;

/// Build the batches router.
pub fn router() -> Router<AppState> {
    Router::new().route("/api/batches", post(run_batch))
}

/// Multipart form of a batch upload.
#[derive(Debug, Default)]
struct BatchForm {
    file: Option<Vec<u8>>,
    resource_type: Option<String>,
    operation: Option<String>,
    namespace: Option<String>,
    key: Option<String>,
    metafield_type: Option<String>,
    mode: Option<String>,
    partial: bool,
    tags: Vec<String>,
}

impl BatchForm {
    async fn read(mut multipart: Multipart) -> Result<Self, AppError> {
        let mut form = Self::default();
        while let Some(field) = multipart
            .next_field()
            .await
            .map_err(|e| AppError::BadRequest(e.to_string()))?
        {
            let name = field.name().unwrap_or_default().to_string();
            if name == "file" {
                let data = field
                    .bytes()
                    .await
                    .map_err(|e| AppError::BadRequest(e.to_string()))?;
                form.file = Some(data.to_vec());
                continue;
            }
            let text = field
                .text()
                .await
                .map_err(|e| AppError::BadRequest(e.to_string()))?;
            match name.as_str() {
                "resourceType" => form.resource_type = Some(text),
                "operation" => form.operation = Some(text),
                "namespace" => form.namespace = Some(text),
                "key" => form.key = Some(text),
                "type" => form.metafield_type = Some(text),
                "mode" => form.mode = Some(text),
                "partial" => form.partial = matches!(text.trim(), "true" | "1" | "on"),
                "tags" => form.tags = text.split(',').map(str::to_string).collect(),
                _ => {}
            }
        }
        Ok(form)
    }

    fn resource_type(&self) -> Result<ResourceType, AppError> {
        let raw = self
            .resource_type
            .as_deref()
            .ok_or_else(|| AppError::BadRequest("resourceType is required".to_string()))?;
        parse_resource_type(raw)
    }

    fn operation(&self) -> Result<BatchOperation, AppError> {
        let kind: OperationKind = self
            .operation
            .as_deref()
            .ok_or_else(|| AppError::BadRequest("operation is required".to_string()))?
            .parse()
            .map_err(AppError::BadRequest)?;
        let descriptor = match (&self.namespace, &self.key, &self.metafield_type) {
            (Some(ns), Some(key), Some(ty)) if !ns.trim().is_empty() && !key.trim().is_empty() => {
                Some(MetafieldDescriptor::new(ns.trim(), key.trim(), ty.trim()))
            }
            _ => None,
        };
        let mode = match self.mode.as_deref().map(str::trim) {
            None | Some("" | "replace") => ListMode::Replace,
            Some("merge") => ListMode::Merge,
            Some(other) => return Err(AppError::BadRequest(format!("invalid mode: {other}"))),
        };
        BatchOperation::build(kind, descriptor, mode, self.partial, self.tags.clone())
            .map_err(|e| AppError::BadRequest(e.to_string()))
    }
}

/// The final event with the outcome report attached.
fn with_report(event: &BatchEvent, field: MatchField) -> Result<Event, Infallible> {
    let BatchEvent::Finished { results, .. } = event else {
        return sse_event(event);
    };
    let mut value = serde_json::to_value(event).unwrap_or(Value::Null);
    if let Value::Object(map) = &mut value {
        map.insert("report".to_string(), Value::String(report(field, results)));
    }
    sse_event(&value)
}

/// POST /api/batches
///
/// Validates the whole file before streaming. Each row result is sent as it
/// completes; the final event carries the summary and a CSV report.
async fn run_batch(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<Sse<impl futures::Stream<Item = Result<Event, Infallible>>>, AppError> {
    let form = BatchForm::read(multipart).await?;
    let resource_type = form.resource_type()?;
    let operation = form.operation()?;
    let data = form
        .file
        .as_deref()
        .ok_or_else(|| AppError::BadRequest("file is required".to_string()))?;
    let parsed = parse_batch(data, resource_type, operation.needs_value_column())?;

    info!(
        resource = %resource_type,
        rows = parsed.rows.len(),
        field = %parsed.field,
        "Starting batch"
    );

    let field = parsed.field;
    let driver = BatchDriver::new(
        state.batch().clone(),
        resource_type,
        field,
        operation,
        parsed.rows,
    );
    let sse_stream = driver.stream().map(move |event| with_report(&event, field));

    Ok(Sse::new(sse_stream).keep_alive(KeepAlive::default()))
}

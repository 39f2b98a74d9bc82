//! Unified error handling for the HTTP API.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;

use crate::csv::CsvError;
use crate::services::{HistoryError, UndoError};
use crate::shopify::AdminShopifyError;

/// Application-level error type for the API.
#[derive(Debug, Error)]
pub enum AppError {
    /// Shopify API operation failed.
    #[error("Shopify error: {0}")]
    Shopify(#[from] AdminShopifyError),

    /// History storage failed.
    #[error("History error: {0}")]
    History(#[from] HistoryError),

    /// The uploaded file was rejected as a whole.
    #[error("{0}")]
    Csv(#[from] CsvError),

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Request conflicts with stored state.
    #[error("{0}")]
    Conflict(String),

    /// Bad request from client.
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Internal server error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<UndoError> for AppError {
    fn from(error: UndoError) -> Self {
        let message = error.to_string();
        match error {
            UndoError::AlreadyRestored => Self::Conflict(message),
            UndoError::UnknownObjectType(_) => Self::BadRequest(message),
            UndoError::History(HistoryError::NotFound(id)) => Self::NotFound(id),
            UndoError::History(e) => Self::History(e),
        }
    }
}

#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        // Log server errors with Sentry
        if matches!(self, Self::Internal(_) | Self::Shopify(_) | Self::History(_)) {
            let event_id = sentry::capture_error(&self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "API request error"
            );
        }

        let status = match &self {
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Shopify(_) | Self::History(_) => StatusCode::BAD_GATEWAY,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::Csv(_) | Self::BadRequest(_) => StatusCode::BAD_REQUEST,
        };

        // Don't expose internal error details to clients
        let message = match &self {
            Self::Internal(_) => "Internal server error".to_string(),
            Self::Shopify(_) | Self::History(_) => "External service error".to_string(),
            _ => self.to_string(),
        };

        (status, Json(ErrorResponse { error: message })).into_response()
    }
}

//! Shopify Admin API client (HIGH PRIVILEGE).
//!
//! # Security
//!
//! **This module holds the store's Admin API access token.** The token can
//! write metafields, tags and metaobjects on every resource in the store.
//!
//! # Architecture
//!
//! - GraphQL documents live in [`queries`] as named [`Operation`]s
//! - [`GraphQLTransport`] is the seam between typed calls and the wire;
//!   [`HttpTransport`] posts to Shopify with `reqwest`
//! - [`AdminClient`] wraps a transport with typed, instrumented methods
//! - [`ResourceTypeCatalog`] maps each resource type to its documents
//!
//! # Example
//!
//! ```rust,ignore
//! use tagfield_admin::shopify::AdminClient;
//!
//! let client = AdminClient::new(&config.shopify);
//! let id = client.lookup(catalog.entry(ResourceType::Product), MatchField::Handle, "red-shirt").await?;
//! client.metafields_set(&id, &descriptor, "Red").await?;
//! ```

mod admin;
pub mod catalog;
#[cfg(test)]
pub mod fake;
pub mod queries;
pub mod types;

pub use admin::{AdminClient, HistoryPageRequest, HttpTransport};
pub use catalog::{CatalogEntry, ResourceTypeCatalog};
pub use queries::Operation;
pub use types::*;

use async_trait::async_trait;
use thiserror::Error;

/// Errors that can occur when interacting with Shopify Admin API.
#[derive(Debug, Error)]
pub enum AdminShopifyError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// GraphQL query returned errors.
    #[error("GraphQL errors: {}", format_graphql_errors(.0))]
    GraphQL(Vec<GraphQLError>),

    /// JSON parsing failed.
    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Rate limited by Shopify.
    #[error("Rate limited, retry after {0} seconds")]
    RateLimited(u64),

    /// Authentication/authorization failed.
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// User error from mutation (e.g., invalid input).
    #[error("User error: {0}")]
    UserError(String),
}

impl AdminShopifyError {
    /// Build the error returned when a response is missing an expected field.
    #[must_use]
    pub fn missing(what: &str) -> Self {
        Self::GraphQL(vec![GraphQLError {
            message: format!("No {what} in response"),
            locations: vec![],
            path: vec![],
        }])
    }
}

/// A GraphQL error returned by the Shopify Admin API.
#[derive(Debug, Clone)]
pub struct GraphQLError {
    /// Error message.
    pub message: String,
    /// Source locations in the query.
    pub locations: Vec<GraphQLErrorLocation>,
    /// Path to the error in the response.
    pub path: Vec<serde_json::Value>,
}

/// Location in a GraphQL query where an error occurred.
#[derive(Debug, Clone)]
pub struct GraphQLErrorLocation {
    /// Line number (1-indexed).
    pub line: i64,
    /// Column number (1-indexed).
    pub column: i64,
}

fn format_graphql_errors(errors: &[GraphQLError]) -> String {
    errors
        .iter()
        .map(|e| e.message.clone())
        .collect::<Vec<_>>()
        .join("; ")
}

/// Sends one GraphQL operation and returns its `data` object.
///
/// Implementations must map `errors` to [`AdminShopifyError::GraphQL`] and a
/// missing `data` object to an error; callers only ever see usable data.
#[async_trait]
pub trait GraphQLTransport: Send + Sync {
    async fn execute(
        &self,
        operation: Operation,
        variables: serde_json::Value,
    ) -> Result<serde_json::Value, AdminShopifyError>;
}

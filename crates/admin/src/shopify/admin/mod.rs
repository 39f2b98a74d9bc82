//! Shopify Admin API GraphQL client authenticated with an access token.
//!
//! [`HttpTransport`] speaks HTTP; [`AdminClient`] adds typed methods on top of
//! any [`GraphQLTransport`]. Methods are grouped by concern in the submodules.

use std::sync::Arc;

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, de::DeserializeOwned};
use serde_json::Value;
use tracing::instrument;

use crate::config::ShopifyAdminConfig;

use super::{
    AdminShopifyError, GraphQLError, GraphQLErrorLocation, GraphQLTransport, Operation, UserError,
};

mod metafields;
mod metaobjects;
mod resources;
mod tags;

pub use metaobjects::HistoryPageRequest;

/// HTTP transport for the Shopify Admin GraphQL API.
///
/// # Security
///
/// Holds the HIGH PRIVILEGE Admin API access token.
#[derive(Clone)]
pub struct HttpTransport {
    inner: Arc<HttpTransportInner>,
}

struct HttpTransportInner {
    client: reqwest::Client,
    endpoint: String,
    access_token: SecretString,
}

/// GraphQL response wrapper.
#[derive(Debug, Deserialize)]
struct GraphQLResponse<T> {
    data: Option<T>,
    errors: Option<Vec<GraphQLErrorResponse>>,
}

#[derive(Debug, Deserialize)]
struct GraphQLErrorResponse {
    message: String,
    #[serde(default)]
    locations: Vec<GraphQLErrorLocationResponse>,
    #[serde(default)]
    path: Vec<Value>,
}

#[derive(Debug, Deserialize)]
struct GraphQLErrorLocationResponse {
    line: i64,
    column: i64,
}

impl HttpTransport {
    /// Create a transport for the configured store.
    #[must_use]
    pub fn new(config: &ShopifyAdminConfig) -> Self {
        Self::with_endpoint(config.graphql_endpoint(), config.access_token.clone())
    }

    /// Create a transport for an explicit endpoint URL.
    #[must_use]
    pub fn with_endpoint(endpoint: impl Into<String>, access_token: SecretString) -> Self {
        Self {
            inner: Arc::new(HttpTransportInner {
                client: reqwest::Client::new(),
                endpoint: endpoint.into(),
                access_token,
            }),
        }
    }
}

#[async_trait]
impl GraphQLTransport for HttpTransport {
    #[instrument(skip(self, variables), fields(operation = operation.name))]
    async fn execute(
        &self,
        operation: Operation,
        variables: Value,
    ) -> Result<Value, AdminShopifyError> {
        let body = operation.body(variables);

        let response = self
            .inner
            .client
            .post(&self.inner.endpoint)
            .header("X-Shopify-Access-Token", self.inner.access_token.expose_secret())
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await?;

        // Check for rate limiting
        if response.status() == reqwest::StatusCode::TOO_MANY_REQUESTS {
            let retry_after = response
                .headers()
                .get("Retry-After")
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.parse().ok())
                .unwrap_or(60);
            return Err(AdminShopifyError::RateLimited(retry_after));
        }

        // Check for unauthorized
        if response.status() == reqwest::StatusCode::UNAUTHORIZED {
            return Err(AdminShopifyError::Unauthorized(
                "Invalid or expired access token".to_string(),
            ));
        }

        let graphql_response: GraphQLResponse<Value> = response.json().await?;

        // Check for GraphQL errors
        if let Some(errors) = graphql_response.errors
            && !errors.is_empty()
        {
            let converted_errors: Vec<GraphQLError> = errors
                .into_iter()
                .map(|e| GraphQLError {
                    message: e.message,
                    locations: e
                        .locations
                        .into_iter()
                        .map(|l| GraphQLErrorLocation {
                            line: l.line,
                            column: l.column,
                        })
                        .collect(),
                    path: e.path,
                })
                .collect();
            return Err(AdminShopifyError::GraphQL(converted_errors));
        }

        match graphql_response.data {
            Some(data) if !data.is_null() => Ok(data),
            _ => Err(AdminShopifyError::missing("data")),
        }
    }
}

/// Typed Shopify Admin API client.
///
/// Cheap to clone; every clone shares the same transport.
#[derive(Clone)]
pub struct AdminClient {
    transport: Arc<dyn GraphQLTransport>,
}

impl AdminClient {
    /// Create a client that talks to the configured store over HTTP.
    #[must_use]
    pub fn new(config: &ShopifyAdminConfig) -> Self {
        Self::with_transport(Arc::new(HttpTransport::new(config)))
    }

    /// Create a client over any transport.
    #[must_use]
    pub fn with_transport(transport: Arc<dyn GraphQLTransport>) -> Self {
        Self { transport }
    }

    // =========================================================================
    // GraphQL Execution
    // =========================================================================

    /// Execute an operation and deserialize its `data`.
    async fn execute<T: DeserializeOwned>(
        &self,
        operation: Operation,
        variables: Value,
    ) -> Result<T, AdminShopifyError> {
        let data = self.transport.execute(operation, variables).await?;
        Ok(serde_json::from_value(data)?)
    }

    /// Execute an operation and return its raw `data`.
    async fn execute_raw(
        &self,
        operation: Operation,
        variables: Value,
    ) -> Result<Value, AdminShopifyError> {
        self.transport.execute(operation, variables).await
    }
}

/// Turn a mutation's `userErrors` into an error when non-empty.
fn check_user_errors(errors: &[UserError]) -> Result<(), AdminShopifyError> {
    if errors.is_empty() {
        Ok(())
    } else {
        Err(AdminShopifyError::UserError(UserError::join(errors)))
    }
}

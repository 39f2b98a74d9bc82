//! Integration tests for tagfield.
//!
//! Every test stands up a `wiremock` server in place of the Shopify Admin
//! GraphQL endpoint and drives the real [`AdminClient`] over HTTP. Requests
//! are matched on their `operationName`, so each mock answers exactly one
//! GraphQL document.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p tagfield-integration-tests
//! ```

use std::sync::Arc;

use secrecy::SecretString;
use serde_json::{Value, json};
use tagfield_admin::routes;
use tagfield_admin::shopify::{AdminClient, HttpTransport};
use tagfield_admin::state::AppState;
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Path the mock GraphQL endpoint is served on.
pub const GRAPHQL_PATH: &str = "/admin/api/2026-01/graphql.json";

/// Token sent by test clients.
pub const TEST_TOKEN: &str = "shpat_integration_test_token";

/// A client pointed at the mock server.
#[must_use]
pub fn client(server: &MockServer) -> AdminClient {
    let transport = HttpTransport::with_endpoint(
        format!("{}{GRAPHQL_PATH}", server.uri()),
        SecretString::from(TEST_TOKEN),
    );
    AdminClient::with_transport(Arc::new(transport))
}

/// A mock answering one operation with `{"data": data}`.
#[must_use]
pub fn operation(name: &str, data: Value) -> Mock {
    Mock::given(method("POST"))
        .and(path(GRAPHQL_PATH))
        .and(body_partial_json(json!({ "operationName": name })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "data": data })))
}

/// A mock answering one operation only when its variables contain `variables`.
#[must_use]
pub fn operation_with(name: &str, variables: Value, data: Value) -> Mock {
    Mock::given(method("POST"))
        .and(path(GRAPHQL_PATH))
        .and(body_partial_json(
            json!({ "operationName": name, "variables": variables }),
        ))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "data": data })))
}

/// Mount the documents the history ledger needs to store one record.
///
/// The record is created as `gid://shopify/Metaobject/{record_id}`.
pub async fn mount_history(server: &MockServer, record_id: u64) {
    operation(
        "HistoryDefinition",
        json!({ "metaobjectDefinitionByType": {
            "id": "gid://shopify/MetaobjectDefinition/1",
            "type": "__tag_metafield_app_database"
        }}),
    )
    .mount(server)
    .await;
    operation(
        "ShopIdentity",
        json!({ "shop": { "email": "ops@example.com", "myshopifyDomain": "example.myshopify.com" } }),
    )
    .mount(server)
    .await;
    operation(
        "HistoryCreate",
        json!({ "metaobjectCreate": {
            "metaobject": {
                "id": format!("gid://shopify/Metaobject/{record_id}"),
                "handle": format!("history-{record_id}"),
                "fields": []
            },
            "userErrors": []
        }}),
    )
    .mount(server)
    .await;
}

/// Bodies of every request received for one operation.
pub async fn requests_for(server: &MockServer, name: &str) -> Vec<Value> {
    server
        .received_requests()
        .await
        .unwrap_or_default()
        .iter()
        .filter_map(|r| serde_json::from_slice::<Value>(&r.body).ok())
        .filter(|body| body["operationName"] == name)
        .collect()
}

/// Serve the API router on an ephemeral port and return its base URL.
///
/// # Panics
///
/// Panics if the listener cannot be bound.
pub async fn serve(server: &MockServer) -> String {
    let app = routes::routes().with_state(AppState::new(client(server)));
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind test listener");
    let addr = listener.local_addr().expect("Failed to read local address");
    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("Test server error");
    });
    format!("http://{addr}")
}

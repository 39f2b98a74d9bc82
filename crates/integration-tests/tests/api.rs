//! HTTP API tests: the real router over a mocked Admin API.

#![allow(clippy::unwrap_used)]

use reqwest::{Client, StatusCode, multipart};
use serde_json::{Value, json};
use tagfield_integration_tests::{mount_history, operation, requests_for, serve};
use wiremock::MockServer;

/// `data:` payloads of an SSE body.
fn sse_events(body: &str) -> Vec<Value> {
    body.lines()
        .filter_map(|line| line.strip_prefix("data:"))
        .map(|data| serde_json::from_str(data.trim()).unwrap())
        .collect()
}

#[tokio::test]
async fn resource_count() {
    let server = MockServer::start().await;
    operation("CountCustomers", json!({ "customersCount": { "count": 42 } }))
        .mount(&server)
        .await;
    let base = serve(&server).await;

    let body: Value = Client::new()
        .get(format!("{base}/api/resources/customer/count"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body, json!({ "resourceType": "customer", "count": 42 }));
}

#[tokio::test]
async fn unknown_resource_type_is_bad_request() {
    let server = MockServer::start().await;
    let base = serve(&server).await;

    let resp = Client::new()
        .get(format!("{base}/api/resources/widget/count"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn batch_rejects_file_without_value_column() {
    let server = MockServer::start().await;
    let base = serve(&server).await;

    let form = multipart::Form::new()
        .text("resourceType", "product")
        .text("operation", "metafield-update")
        .text("namespace", "custom")
        .text("key", "color")
        .text("type", "single_line_text_field")
        .part(
            "file",
            multipart::Part::bytes(b"Handle\nred-shirt\n".to_vec()).file_name("rows.csv"),
        );
    let resp = Client::new()
        .post(format!("{base}/api/batches"))
        .multipart(form)
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["error"], "CSV has no value column");
    assert!(server.received_requests().await.unwrap().is_empty());
}

#[tokio::test]
async fn batch_streams_rows_and_report() {
    let server = MockServer::start().await;
    operation(
        "GetTags",
        json!({ "node": { "id": "gid://shopify/Product/3", "tags": ["old"] } }),
    )
    .mount(&server)
    .await;
    operation(
        "TagsAdd",
        json!({ "tagsAdd": { "node": { "id": "gid://shopify/Product/3" }, "userErrors": [] } }),
    )
    .expect(1)
    .mount(&server)
    .await;
    mount_history(&server, 700).await;
    let base = serve(&server).await;

    let form = multipart::Form::new()
        .text("resourceType", "product")
        .text("operation", "tags-add")
        .text("tags", "sale, new")
        .part(
            "file",
            multipart::Part::bytes(b"Id\ngid://shopify/Product/3\n".to_vec()).file_name("rows.csv"),
        );
    let body = Client::new()
        .post(format!("{base}/api/batches"))
        .multipart(form)
        .send()
        .await
        .unwrap()
        .text()
        .await
        .unwrap();

    let events = sse_events(&body);
    assert_eq!(events.len(), 2, "events: {events:?}");
    assert_eq!(events[0]["event"], "row");
    assert_eq!(events[0]["result"]["success"], true);
    assert_eq!(events[1]["event"], "finished");
    assert_eq!(events[1]["snapshot"]["state"], "done");
    assert_eq!(events[1]["snapshot"]["historyId"], "gid://shopify/Metaobject/700");
    assert_eq!(
        events[1]["report"],
        "\"Id\",\"success\",\"error\"\n\"gid://shopify/Product/3\",\"true\",\"\"\n"
    );

    let adds = requests_for(&server, "TagsAdd").await;
    assert_eq!(adds[0]["variables"]["tags"], json!(["sale", "new"]));
}

#[tokio::test]
async fn undo_of_missing_record_streams_error_event() {
    let server = MockServer::start().await;
    operation("HistoryRecord", json!({ "metaobject": null }))
        .mount(&server)
        .await;
    let base = serve(&server).await;

    let body = Client::new()
        .post(format!("{base}/api/history/gid:%2F%2Fshopify%2FMetaobject%2F9/undo"))
        .send()
        .await
        .unwrap()
        .text()
        .await
        .unwrap();

    let events = sse_events(&body);
    assert_eq!(events.len(), 1);
    assert_eq!(events[0]["event"], "error");
    assert_eq!(
        events[0]["message"],
        "History record not found: gid://shopify/Metaobject/9"
    );
}

#[tokio::test]
async fn export_downloads_csv() {
    let server = MockServer::start().await;
    operation(
        "ExportProducts",
        json!({ "products": {
            "edges": [{
                "cursor": "c1",
                "node": {
                    "id": "gid://shopify/Product/1",
                    "title": "Shirt",
                    "handle": "shirt",
                    "tags": ["sale"],
                    "metafields": { "edges": [
                        { "node": { "namespace": "custom", "key": "color", "value": "Red" } }
                    ]}
                }
            }],
            "pageInfo": { "hasNextPage": false, "endCursor": "c1" }
        }}),
    )
    .mount(&server)
    .await;
    let base = serve(&server).await;

    let resp = Client::new()
        .post(format!("{base}/api/export"))
        .json(&json!({ "kind": "resources", "resourceType": "product" }))
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(
        resp.headers()["content-type"].to_str().unwrap(),
        "text/csv; charset=utf-8"
    );
    assert_eq!(
        resp.headers()["content-disposition"].to_str().unwrap(),
        "attachment; filename=\"product-export.csv\""
    );
    let csv = resp.text().await.unwrap();
    assert_eq!(
        csv,
        "\"resource_id\",\"title\",\"handle\",\"tags\",\"custom.color\"\n\"gid://shopify/Product/1\",\"Shirt\",\"shirt\",\"sale\",\"Red\"\n"
    );
}

//! Undo of stored history records against a mocked Admin API.

#![allow(clippy::unwrap_used)]

use serde_json::{Value, json};
use chrono::{DateTime, Utc};
use tagfield_admin::services::UndoError;
use tagfield_admin::state::AppState;
use tagfield_core::{HistoryOperation, HistoryRecord, HistoryRow, ResourceType};
use tagfield_integration_tests::{client, operation, requests_for};
use wiremock::MockServer;

const RECORD_ID: &str = "gid://shopify/Metaobject/500";

fn stored(restore: bool) -> Value {
    let mut record = HistoryRecord::new(
        "AbC123xyz",
        "ops@example.com",
        HistoryOperation::TagsAdded,
        ResourceType::Product,
        vec![HistoryRow::tags_added(
            "gid://shopify/Product/5",
            &["sale".to_string(), "new".to_string()],
        )],
        recorded_at(),
    );
    record.restore = restore;
    let fields: Vec<Value> = record
        .to_fields()
        .unwrap()
        .into_iter()
        .map(|(key, value)| json!({ "key": key, "value": value }))
        .collect();
    json!({ "metaobject": { "id": RECORD_ID, "handle": "history-500", "fields": fields } })
}

fn recorded_at() -> DateTime<Utc> {
    DateTime::from_timestamp(1_760_000_000, 0).unwrap()
}

#[tokio::test]
async fn undo_tags_added_removes_them_and_clears_restore() {
    let server = MockServer::start().await;
    operation("HistoryRecord", stored(true)).mount(&server).await;
    operation(
        "TagsRemove",
        json!({ "tagsRemove": { "node": { "id": "gid://shopify/Product/5" }, "userErrors": [] } }),
    )
    .expect(1)
    .mount(&server)
    .await;
    operation(
        "HistoryUpdate",
        json!({ "metaobjectUpdate": { "metaobject": { "id": RECORD_ID }, "userErrors": [] } }),
    )
    .expect(1)
    .mount(&server)
    .await;

    let state = AppState::new(client(&server));
    let summary = state.undo().undo(RECORD_ID).await.unwrap();

    assert_eq!(summary.restored, 1);
    assert_eq!(summary.total, 1);
    assert_eq!(summary.operation, Some(HistoryOperation::TagsAdded));

    let removes = requests_for(&server, "TagsRemove").await;
    assert_eq!(removes[0]["variables"]["id"], "gid://shopify/Product/5");
    assert_eq!(removes[0]["variables"]["tags"], json!(["sale", "new"]));

    let updates = requests_for(&server, "HistoryUpdate").await;
    assert_eq!(updates[0]["variables"]["id"], RECORD_ID);
    assert_eq!(
        updates[0]["variables"]["metaobject"]["fields"],
        json!([{ "key": "restore", "value": "false" }])
    );
}

#[tokio::test]
async fn restored_record_is_refused_without_mutations() {
    let server = MockServer::start().await;
    operation("HistoryRecord", stored(false)).mount(&server).await;

    let state = AppState::new(client(&server));
    let err = state.undo().undo(RECORD_ID).await.unwrap_err();

    assert!(matches!(err, UndoError::AlreadyRestored));
    assert!(requests_for(&server, "TagsRemove").await.is_empty());
    assert!(requests_for(&server, "HistoryUpdate").await.is_empty());
}

#[tokio::test]
async fn missing_record_is_not_found() {
    let server = MockServer::start().await;
    operation("HistoryRecord", json!({ "metaobject": null }))
        .mount(&server)
        .await;

    let state = AppState::new(client(&server));
    let err = state.undo().undo(RECORD_ID).await.unwrap_err();
    assert!(err.to_string().contains(RECORD_ID), "got {err}");
}

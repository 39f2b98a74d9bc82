//! Remove one metafield from every resource of a type.
//!
//! The run is an explicit state machine:
//!
//! ```text
//! Idle -> FetchingPage -> DeletingPage -> FetchingPage ... -> Done
//!                    \____________________________________-> Failed
//! ```
//!
//! The resource count is read once when leaving `Idle`. Every deleted
//! metafield is recorded in one `Metafield-removed` history record when the
//! run ends, including a run that fails after some pages were deleted.

use async_stream::stream;
use futures::Stream;
use serde::Serialize;
use tagfield_core::{
    FailureKind, HistoryOperation, HistoryRow, MetafieldDescriptor, OperationResult, ResourceType,
};
use tracing::{info, warn};

use super::{Executor, HistoryLedger, Scanner};

/// Percentage reported while the resource count is unknown.
pub const UNKNOWN_TOTAL_PERCENT: u8 = 10;

/// Where a bulk delete run is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BulkDeleteState {
    Idle,
    FetchingPage,
    DeletingPage,
    Done,
    Failed,
}

impl BulkDeleteState {
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Done | Self::Failed)
    }
}

/// Snapshot emitted after every transition.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BulkDeleteProgress {
    pub state: BulkDeleteState,
    pub processed: usize,
    pub deleted: usize,
    /// Resources that never had the metafield.
    pub skipped: usize,
    pub failed: usize,
    pub total: Option<u64>,
    pub percent: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub history_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// One bulk delete run.
pub struct BulkDeleteRun {
    service: BulkDeleteService,
    resource_type: ResourceType,
    namespace: String,
    key: String,
    state: BulkDeleteState,
    cursor: Option<String>,
    has_more: bool,
    page: Vec<String>,
    total: Option<u64>,
    processed: usize,
    deleted: usize,
    skipped: usize,
    failed: usize,
    rows: Vec<HistoryRow>,
    history_id: Option<String>,
    error: Option<String>,
}

impl BulkDeleteRun {
    #[must_use]
    pub const fn state(&self) -> BulkDeleteState {
        self.state
    }

    /// Current progress.
    #[must_use]
    pub fn progress(&self) -> BulkDeleteProgress {
        BulkDeleteProgress {
            state: self.state,
            processed: self.processed,
            deleted: self.deleted,
            skipped: self.skipped,
            failed: self.failed,
            total: self.total,
            percent: percent(self.state, self.processed, self.total),
            history_id: self.history_id.clone(),
            error: self.error.clone(),
        }
    }

    /// Perform one transition. Terminal states stay put.
    pub async fn advance(&mut self) -> BulkDeleteState {
        self.state = match self.state {
            BulkDeleteState::Idle => {
                self.total = match self.service.scanner.try_count(self.resource_type).await {
                    Ok(total) => Some(total),
                    Err(e) => {
                        warn!(error = %e, "Count failed; progress will be approximate");
                        None
                    }
                };
                BulkDeleteState::FetchingPage
            }
            BulkDeleteState::FetchingPage => {
                match self
                    .service
                    .scanner
                    .ids_page(self.resource_type, self.cursor.as_deref())
                    .await
                {
                    Ok(page) => {
                        self.has_more = page.has_more && page.next_cursor != self.cursor;
                        self.cursor = page.next_cursor;
                        self.page = page.items;
                        BulkDeleteState::DeletingPage
                    }
                    Err(e) => {
                        warn!(error = %e, "Page fetch failed");
                        self.error = Some(e.to_string());
                        self.record_history().await;
                        BulkDeleteState::Failed
                    }
                }
            }
            BulkDeleteState::DeletingPage => {
                for id in std::mem::take(&mut self.page) {
                    let result = self
                        .service
                        .executor
                        .delete_metafield(&id, &self.namespace, &self.key)
                        .await;
                    self.tally(result);
                }
                if self.has_more {
                    BulkDeleteState::FetchingPage
                } else {
                    self.record_history().await;
                    info!(
                        resource = %self.resource_type,
                        deleted = self.deleted,
                        skipped = self.skipped,
                        failed = self.failed,
                        "Bulk delete finished"
                    );
                    BulkDeleteState::Done
                }
            }
            terminal @ (BulkDeleteState::Done | BulkDeleteState::Failed) => terminal,
        };
        self.state
    }

    fn tally(&mut self, result: OperationResult) {
        self.processed += 1;
        if result.success {
            self.deleted += 1;
            let data = result.data.unwrap_or_default();
            let type_name = data["type"].as_str().unwrap_or_default();
            let descriptor = MetafieldDescriptor::new(&self.namespace, &self.key, type_name);
            let value = data["value"].as_str().map(str::to_string);
            self.rows
                .push(HistoryRow::metafield(result.id, &descriptor, value));
        } else if result.error_kind == Some(FailureKind::Validation) {
            self.skipped += 1;
        } else {
            self.failed += 1;
            warn!(id = %result.id, error = ?result.error, "Metafield delete failed");
        }
    }

    /// Record what has been deleted so far. Nothing is written when no
    /// metafield was deleted.
    async fn record_history(&mut self) {
        let rows = std::mem::take(&mut self.rows);
        match self
            .service
            .ledger
            .record(HistoryOperation::MetafieldRemoved, self.resource_type, rows)
            .await
        {
            Ok(record) => self.history_id = record.map(|r| r.id),
            Err(e) => warn!(error = %e, "Failed to record bulk delete history"),
        }
    }
}

fn percent(state: BulkDeleteState, processed: usize, total: Option<u64>) -> u8 {
    if state == BulkDeleteState::Done {
        return 100;
    }
    match total {
        None => UNKNOWN_TOTAL_PERCENT,
        Some(0) => 0,
        Some(total) => {
            let pct = (processed as u64).saturating_mul(100) / total;
            u8::try_from(pct.min(100)).unwrap_or(100)
        }
    }
}

/// Starts bulk delete runs.
#[derive(Clone)]
pub struct BulkDeleteService {
    scanner: Scanner,
    executor: Executor,
    ledger: HistoryLedger,
}

impl BulkDeleteService {
    #[must_use]
    pub const fn new(scanner: Scanner, executor: Executor, ledger: HistoryLedger) -> Self {
        Self {
            scanner,
            executor,
            ledger,
        }
    }

    /// A new run in `Idle`.
    #[must_use]
    pub fn start(&self, resource_type: ResourceType, namespace: &str, key: &str) -> BulkDeleteRun {
        BulkDeleteRun {
            service: self.clone(),
            resource_type,
            namespace: namespace.to_string(),
            key: key.to_string(),
            state: BulkDeleteState::Idle,
            cursor: None,
            has_more: false,
            page: Vec::new(),
            total: None,
            processed: 0,
            deleted: 0,
            skipped: 0,
            failed: 0,
            rows: Vec::new(),
            history_id: None,
            error: None,
        }
    }

    /// Drive a run to completion, yielding progress after every transition.
    pub fn stream(
        &self,
        resource_type: ResourceType,
        namespace: &str,
        key: &str,
    ) -> impl Stream<Item = BulkDeleteProgress> + Send + 'static + use<> {
        let mut run = self.start(resource_type, namespace, key);
        stream! {
            loop {
                let state = run.advance().await;
                yield run.progress();
                if state.is_terminal() {
                    break;
                }
            }
        }
    }

    /// Drive a run to completion and return the final progress.
    pub async fn run(&self, resource_type: ResourceType, namespace: &str, key: &str) -> BulkDeleteProgress {
        let mut run = self.start(resource_type, namespace, key);
        while !run.advance().await.is_terminal() {}
        run.progress()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Arc;

    use futures::StreamExt;

    use super::*;
    use crate::shopify::{ResourceTypeCatalog, fake::FakeShop};

    fn service(shop: &Arc<FakeShop>) -> BulkDeleteService {
        let client = shop.client();
        let scanner =
            Scanner::new(client.clone(), Arc::new(ResourceTypeCatalog::new())).with_page_size(2);
        BulkDeleteService::new(scanner, Executor::new(client.clone()), HistoryLedger::new(client))
    }

    #[test]
    fn test_percent() {
        assert_eq!(percent(BulkDeleteState::DeletingPage, 5, None), UNKNOWN_TOTAL_PERCENT);
        assert_eq!(percent(BulkDeleteState::DeletingPage, 1, Some(4)), 25);
        assert_eq!(percent(BulkDeleteState::FetchingPage, 0, Some(0)), 0);
        assert_eq!(percent(BulkDeleteState::Done, 0, None), 100);
    }

    #[tokio::test]
    async fn test_state_transitions() {
        let shop = FakeShop::new();
        shop.state().counts.insert(ResourceType::Page, 1);
        let page = shop.add_owner(ResourceType::Page, 1);
        shop.set_metafield(&page, "custom", "banner", "single_line_text_field", "Hi");

        let mut run = service(&shop).start(ResourceType::Page, "custom", "banner");
        assert_eq!(run.state(), BulkDeleteState::Idle);
        assert_eq!(run.advance().await, BulkDeleteState::FetchingPage);
        assert_eq!(run.advance().await, BulkDeleteState::DeletingPage);
        assert_eq!(run.advance().await, BulkDeleteState::Done);
        assert_eq!(run.advance().await, BulkDeleteState::Done);
        assert_eq!(run.progress().total, Some(1));
        assert_eq!(shop.metafield(&page, "custom", "banner"), None);
    }

    #[tokio::test]
    async fn test_deletes_across_pages_and_records_history() {
        let shop = FakeShop::new();
        let mut owners = Vec::new();
        for id in 1..=5 {
            let owner = shop.add_owner(ResourceType::Collection, id);
            if id != 3 {
                shop.set_metafield(&owner, "custom", "badge", "single_line_text_field", "new");
            }
            owners.push(owner);
        }

        let events: Vec<BulkDeleteProgress> = service(&shop)
            .stream(ResourceType::Collection, "custom", "badge")
            .collect()
            .await;

        let last = events.last().unwrap();
        assert_eq!(last.state, BulkDeleteState::Done);
        assert_eq!((last.processed, last.deleted, last.skipped, last.failed), (5, 4, 1, 0));
        assert_eq!(last.percent, 100);
        // Count was never seeded, so progress falls back to the placeholder.
        assert!(events[..events.len() - 1].iter().all(|e| e.percent == UNKNOWN_TOTAL_PERCENT));
        assert_eq!(shop.calls("ScanCollectionIds"), 3);

        let history_id = last.history_id.clone().unwrap();
        assert_eq!(
            shop.record_field(&history_id, "operation").as_deref(),
            Some("Metafield-removed")
        );
        let value: serde_json::Value =
            serde_json::from_str(&shop.record_field(&history_id, "value").unwrap()).unwrap();
        assert_eq!(value.as_array().unwrap().len(), 4);
        assert_eq!(value[0]["data"]["type"], "single_line_text_field");
        assert_eq!(value[0]["data"]["value"], "new");
        assert!(owners.iter().all(|o| shop.metafield(o, "custom", "badge").is_none()));
    }

    #[tokio::test]
    async fn test_page_failure_ends_in_failed() {
        let shop = FakeShop::new();
        shop.fail("ScanOrderIds", "Throttled");

        let progress = service(&shop).run(ResourceType::Order, "custom", "x").await;
        assert_eq!(progress.state, BulkDeleteState::Failed);
        assert!(progress.error.unwrap().contains("Throttled"));
        assert!(shop.state().records.is_empty());
    }

    #[tokio::test]
    async fn test_failure_after_deleting_pages_records_history() {
        let shop = FakeShop::new();
        let mut owners = Vec::new();
        for id in 1..=3 {
            let owner = shop.add_owner(ResourceType::Collection, id);
            shop.set_metafield(&owner, "custom", "badge", "single_line_text_field", "new");
            owners.push(owner);
        }

        let mut run = service(&shop).start(ResourceType::Collection, "custom", "badge");
        assert_eq!(run.advance().await, BulkDeleteState::FetchingPage);
        assert_eq!(run.advance().await, BulkDeleteState::DeletingPage);
        assert_eq!(run.advance().await, BulkDeleteState::FetchingPage);

        shop.fail("ScanCollectionIds", "Throttled");
        assert_eq!(run.advance().await, BulkDeleteState::Failed);

        let progress = run.progress();
        assert_eq!(progress.deleted, 2);
        let history_id = progress.history_id.unwrap();
        assert_eq!(
            shop.record_field(&history_id, "operation").as_deref(),
            Some("Metafield-removed")
        );
        let value: serde_json::Value =
            serde_json::from_str(&shop.record_field(&history_id, "value").unwrap()).unwrap();
        assert_eq!(value.as_array().unwrap().len(), 2);
        assert_eq!(
            shop.metafield(&owners[2], "custom", "badge").as_deref(),
            Some("new")
        );
    }
}

//! CSV batch state machine.
//!
//! A [`BatchDriver`] walks its rows strictly in order:
//!
//! ```text
//! Idle -> ResolvingRow -> Normalizing -> Mutating -> NextRow -> ResolvingRow ...
//!                 \______________\___________________/
//!                  row failures skip straight to NextRow
//! NextRow (last row) -> Recording -> Done | Failed
//! ```
//!
//! Each call to [`BatchDriver::advance`] performs one transition and
//! publishes a [`BatchSnapshot`] on a `watch` channel. Row failures become
//! failed [`OperationResult`]s and never stop the batch. One history record
//! is written for the successful rows once every row has been attempted.

use async_stream::stream;
use futures::Stream;
use serde::{Deserialize, Serialize};
use tagfield_core::{
    FailureKind, Gid, HistoryOperation, HistoryRow, ListMode, MatchField, MetafieldDescriptor,
    OperationResult, ResourceType,
};
use tokio::sync::watch;
use tracing::{debug, info, instrument, warn};

use super::{Executor, HistoryLedger, Normalized, Normalizer, RawValue, RemovalPlan, Resolver};

/// What a batch does to each row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BatchOperation {
    /// Add tags. Each row's `value` holds its tags; `tags` applies to rows
    /// without one.
    AddTags { tags: Vec<String> },
    /// Remove tags, with the same row/default rule as `AddTags`.
    RemoveTags { tags: Vec<String> },
    /// Set a metafield from each row's `value`.
    UpdateMetafield {
        descriptor: MetafieldDescriptor,
        mode: ListMode,
    },
    /// Delete a metafield, or with `partial` remove only the row's values
    /// from a list metafield.
    RemoveMetafield {
        descriptor: MetafieldDescriptor,
        partial: bool,
    },
}

impl BatchOperation {
    /// The history label for this operation.
    #[must_use]
    pub const fn history_operation(&self) -> HistoryOperation {
        match self {
            Self::AddTags { .. } => HistoryOperation::TagsAdded,
            Self::RemoveTags { .. } => HistoryOperation::TagsRemoved,
            Self::UpdateMetafield { .. } => HistoryOperation::MetafieldUpdated,
            Self::RemoveMetafield { .. } => HistoryOperation::MetafieldRemoved,
        }
    }

    /// Build an operation from its parts.
    ///
    /// # Errors
    ///
    /// Returns a message when a metafield operation has no descriptor.
    pub fn build(
        kind: OperationKind,
        descriptor: Option<MetafieldDescriptor>,
        mode: ListMode,
        partial: bool,
        tags: Vec<String>,
    ) -> Result<Self, &'static str> {
        let tags: Vec<String> = tags
            .into_iter()
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty())
            .collect();
        Ok(match kind {
            OperationKind::TagsAdd => Self::AddTags { tags },
            OperationKind::TagsRemove => Self::RemoveTags { tags },
            OperationKind::MetafieldUpdate => Self::UpdateMetafield {
                descriptor: descriptor.ok_or("namespace, key and type are required")?,
                mode,
            },
            OperationKind::MetafieldRemove => Self::RemoveMetafield {
                descriptor: descriptor.ok_or("namespace, key and type are required")?,
                partial,
            },
        })
    }

    /// Whether every CSV row must carry a `value`.
    #[must_use]
    pub const fn needs_value(&self) -> bool {
        match self {
            Self::UpdateMetafield { .. } => true,
            Self::RemoveMetafield { descriptor, partial } => {
                *partial && descriptor.metafield_type.is_list()
            }
            Self::AddTags { .. } | Self::RemoveTags { .. } => false,
        }
    }

    /// Whether the CSV must have a `value` column.
    #[must_use]
    pub const fn needs_value_column(&self) -> bool {
        match self {
            Self::AddTags { tags } | Self::RemoveTags { tags } => tags.is_empty(),
            _ => self.needs_value(),
        }
    }
}

/// The operation names accepted by the API and CLI.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum OperationKind {
    TagsAdd,
    TagsRemove,
    MetafieldUpdate,
    MetafieldRemove,
}

impl std::str::FromStr for OperationKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "tags-add" => Ok(Self::TagsAdd),
            "tags-remove" => Ok(Self::TagsRemove),
            "metafield-update" => Ok(Self::MetafieldUpdate),
            "metafield-remove" => Ok(Self::MetafieldRemove),
            other => Err(format!("invalid operation: {other}")),
        }
    }
}

/// One CSV row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchRow {
    /// The match field's value (handle, SKU, GID...).
    pub key: String,
    pub value: Option<RawValue>,
}

impl BatchRow {
    #[must_use]
    pub fn new(key: impl Into<String>, value: Option<RawValue>) -> Self {
        Self {
            key: key.into(),
            value,
        }
    }
}

/// Where a batch is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BatchState {
    Idle,
    ResolvingRow,
    Normalizing,
    Mutating,
    NextRow,
    Recording,
    Done,
    Failed,
}

impl BatchState {
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Done | Self::Failed)
    }
}

/// Progress published after every transition.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchSnapshot {
    pub state: BatchState,
    /// Zero-based index of the row being worked on.
    pub row: usize,
    pub total: usize,
    pub succeeded: usize,
    pub failed: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub history_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Streamed batch progress.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum BatchEvent {
    Row {
        index: usize,
        total: usize,
        result: OperationResult,
    },
    Finished {
        snapshot: BatchSnapshot,
        results: Vec<OperationResult>,
    },
}

/// Per-row work carried between states.
enum Prepared {
    Tags(Vec<String>),
    Set(Normalized),
    Removal(RemovalPlan),
    Delete,
}

/// Collaborators a batch needs.
#[derive(Clone)]
pub struct BatchServices {
    pub resolver: Resolver,
    pub normalizer: Normalizer,
    pub executor: Executor,
    pub ledger: HistoryLedger,
}

/// Drives one batch.
pub struct BatchDriver {
    services: BatchServices,
    resource_type: ResourceType,
    field: MatchField,
    operation: BatchOperation,
    rows: Vec<BatchRow>,
    state: BatchState,
    index: usize,
    owner: Option<Gid>,
    prepared: Option<Prepared>,
    results: Vec<OperationResult>,
    history: Vec<HistoryRow>,
    history_id: Option<String>,
    error: Option<String>,
    tx: watch::Sender<BatchSnapshot>,
}

impl BatchDriver {
    #[must_use]
    pub fn new(
        services: BatchServices,
        resource_type: ResourceType,
        field: MatchField,
        operation: BatchOperation,
        rows: Vec<BatchRow>,
    ) -> Self {
        let (tx, _) = watch::channel(BatchSnapshot {
            state: BatchState::Idle,
            row: 0,
            total: rows.len(),
            succeeded: 0,
            failed: 0,
            history_id: None,
            error: None,
        });
        Self {
            services,
            resource_type,
            field,
            operation,
            rows,
            state: BatchState::Idle,
            index: 0,
            owner: None,
            prepared: None,
            results: Vec::new(),
            history: Vec::new(),
            history_id: None,
            error: None,
            tx,
        }
    }

    #[must_use]
    pub const fn state(&self) -> BatchState {
        self.state
    }

    /// Receive a snapshot after every transition.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<BatchSnapshot> {
        self.tx.subscribe()
    }

    #[must_use]
    pub fn results(&self) -> &[OperationResult] {
        &self.results
    }

    #[must_use]
    pub fn snapshot(&self) -> BatchSnapshot {
        let succeeded = self.results.iter().filter(|r| r.success).count();
        BatchSnapshot {
            state: self.state,
            row: self.index,
            total: self.rows.len(),
            succeeded,
            failed: self.results.len() - succeeded,
            history_id: self.history_id.clone(),
            error: self.error.clone(),
        }
    }

    /// Perform one transition. Terminal states stay put.
    pub async fn advance(&mut self) -> BatchState {
        self.state = match self.state {
            BatchState::Idle | BatchState::NextRow if self.index >= self.rows.len() => {
                BatchState::Recording
            }
            BatchState::Idle | BatchState::NextRow => BatchState::ResolvingRow,
            BatchState::ResolvingRow => self.resolve_row().await,
            BatchState::Normalizing => self.normalize_row().await,
            BatchState::Mutating => self.mutate_row().await,
            BatchState::Recording => self.record().await,
            terminal @ (BatchState::Done | BatchState::Failed) => terminal,
        };
        self.tx.send_replace(self.snapshot());
        self.state
    }

    /// Advance until the batch is done or failed.
    #[instrument(skip(self), fields(resource = %self.resource_type, rows = self.rows.len()))]
    pub async fn run(&mut self) -> BatchSnapshot {
        while !self.advance().await.is_terminal() {}
        self.snapshot()
    }

    /// Run the batch, yielding each row result and a final summary.
    pub fn stream(self) -> impl Stream<Item = BatchEvent> + Send + 'static {
        let mut driver = self;
        stream! {
            let total = driver.rows.len();
            loop {
                let index = driver.results.len();
                let state = driver.advance().await;
                if let Some(result) = driver.results.get(index).cloned() {
                    yield BatchEvent::Row { index, total, result };
                }
                if state.is_terminal() {
                    break;
                }
            }
            yield BatchEvent::Finished { snapshot: driver.snapshot(), results: driver.results };
        }
    }

    fn row(&self) -> Option<&BatchRow> {
        self.rows.get(self.index)
    }

    /// Record a row result and move on.
    fn finish_row(&mut self, mut result: OperationResult) -> BatchState {
        if let Some(row) = self.row() {
            result.id.clone_from(&row.key);
        }
        if !result.success {
            warn!(row = self.index, key = %result.id, error = ?result.error, "Row failed");
        }
        self.results.push(result);
        self.owner = None;
        self.prepared = None;
        self.index += 1;
        BatchState::NextRow
    }

    fn fail_row(&mut self, kind: FailureKind, error: impl Into<String>) -> BatchState {
        self.finish_row(OperationResult::failed(String::new(), kind, error))
    }

    async fn resolve_row(&mut self) -> BatchState {
        let Some(row) = self.row() else {
            return BatchState::Recording;
        };
        let key = row.key.clone();
        let blank_value = row.value.as_ref().is_none_or(RawValue::is_blank);
        if key.trim().is_empty() {
            return self.fail_row(FailureKind::Validation, "Missing identifier");
        }
        if self.operation.needs_value() && blank_value {
            return self.fail_row(FailureKind::Validation, format!("Value is empty: {key}"));
        }
        match self
            .services
            .resolver
            .resolve(self.resource_type, self.field, &key)
            .await
        {
            Ok(gid) => {
                debug!(row = self.index, gid = %gid, "Row resolved");
                self.owner = Some(gid);
                BatchState::Normalizing
            }
            Err(e) => self.fail_row(e.kind(), e.to_string()),
        }
    }

    async fn normalize_row(&mut self) -> BatchState {
        let Some(owner) = self.owner.clone() else {
            return self.fail_row(FailureKind::Validation, "Row was not resolved");
        };
        let value = self.row().and_then(|row| row.value.clone());
        let operation = self.operation.clone();
        let prepared = match &operation {
            BatchOperation::AddTags { tags } | BatchOperation::RemoveTags { tags } => {
                let tags = value
                    .as_ref()
                    .map(RawValue::items)
                    .filter(|items| !items.is_empty())
                    .unwrap_or_else(|| tags.clone());
                if tags.is_empty() {
                    return self.fail_row(FailureKind::Validation, "No tags given");
                }
                Ok(Prepared::Tags(tags))
            }
            BatchOperation::UpdateMetafield { descriptor, mode } => self
                .services
                .normalizer
                .normalize(
                    &owner,
                    self.resource_type,
                    descriptor,
                    &value.unwrap_or_else(|| RawValue::Text(String::new())),
                    *mode,
                )
                .await
                .map(Prepared::Set),
            BatchOperation::RemoveMetafield { descriptor, partial }
                if *partial && descriptor.metafield_type.is_list() =>
            {
                self.services
                    .normalizer
                    .plan_list_removal(
                        &owner,
                        self.resource_type,
                        descriptor,
                        &value.unwrap_or_else(|| RawValue::Text(String::new())),
                    )
                    .await
                    .map(Prepared::Removal)
            }
            BatchOperation::RemoveMetafield { .. } => Ok(Prepared::Delete),
        };
        match prepared {
            Ok(prepared) => {
                self.prepared = Some(prepared);
                BatchState::Mutating
            }
            Err(e) => self.fail_row(e.kind(), e.to_string()),
        }
    }

    async fn mutate_row(&mut self) -> BatchState {
        let (Some(owner), Some(prepared)) = (self.owner.clone(), self.prepared.take()) else {
            return self.fail_row(FailureKind::Validation, "Row was not prepared");
        };
        let executor = self.services.executor.clone();
        let operation = self.operation.clone();
        let id = owner.as_str();

        let (result, history) = match (&operation, prepared) {
            (BatchOperation::AddTags { .. }, Prepared::Tags(tags)) => {
                let result = executor.add_tags(id, &tags).await;
                let added = string_list(result.data.as_ref(), "addedTags");
                let row = HistoryRow::tags_added(id, &added);
                (result, row)
            }
            (BatchOperation::RemoveTags { .. }, Prepared::Tags(tags)) => {
                let result = executor.remove_tags(id, &tags).await;
                let removed = string_list(result.data.as_ref(), "removedTags");
                (result, HistoryRow::tags_removed(id, removed))
            }
            (BatchOperation::UpdateMetafield { descriptor, .. }, Prepared::Set(normalized)) => {
                let result = executor.set_metafield(id, descriptor, &normalized.value).await;
                let row = HistoryRow::metafield(id, descriptor, Some(normalized.recorded));
                (result, row)
            }
            (BatchOperation::RemoveMetafield { descriptor, .. }, Prepared::Removal(plan)) => {
                let removed = serde_json::Value::from(plan.removed().to_vec()).to_string();
                let result = executor.apply_removal(id, descriptor, plan).await;
                (result, HistoryRow::metafield(id, descriptor, Some(removed)))
            }
            (BatchOperation::RemoveMetafield { descriptor, .. }, Prepared::Delete) => {
                let result = executor
                    .delete_metafield(id, &descriptor.namespace, &descriptor.key)
                    .await;
                let data = result.data.clone().unwrap_or_default();
                let type_name = data["type"]
                    .as_str()
                    .map_or_else(|| descriptor.metafield_type.to_string(), str::to_string);
                let stored = MetafieldDescriptor::new(&descriptor.namespace, &descriptor.key, &type_name);
                let value = data["value"].as_str().map(str::to_string);
                (result, HistoryRow::metafield(id, &stored, value))
            }
            _ => {
                return self.fail_row(FailureKind::Validation, "Row was not prepared");
            }
        };

        if result.success {
            self.history.push(history);
        }
        self.finish_row(result)
    }

    async fn record(&mut self) -> BatchState {
        let rows = std::mem::take(&mut self.history);
        let succeeded = rows.len();
        match self
            .services
            .ledger
            .record(self.operation.history_operation(), self.resource_type, rows)
            .await
        {
            Ok(record) => {
                self.history_id = record.map(|r| r.id);
                info!(
                    resource = %self.resource_type,
                    total = self.rows.len(),
                    succeeded,
                    history_id = ?self.history_id,
                    "Batch finished"
                );
                BatchState::Done
            }
            Err(e) => {
                warn!(error = %e, "Failed to record batch history");
                self.error = Some(format!("Failed to record history: {e}"));
                BatchState::Failed
            }
        }
    }
}

fn string_list(data: Option<&serde_json::Value>, key: &str) -> Vec<String> {
    data.and_then(|d| d.get(key))
        .and_then(serde_json::Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(|v| v.as_str().map(str::to_string))
                .collect()
        })
        .unwrap_or_default()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Arc;

    use futures::StreamExt;

    use super::*;
    use crate::shopify::{ResourceTypeCatalog, fake::FakeShop};

    fn services(shop: &Arc<FakeShop>) -> BatchServices {
        let client = shop.client();
        let resolver = Resolver::new(client.clone(), Arc::new(ResourceTypeCatalog::new()));
        BatchServices {
            normalizer: Normalizer::new(client.clone(), resolver.clone()),
            resolver,
            executor: Executor::new(client.clone()),
            ledger: HistoryLedger::new(client),
        }
    }

    fn update(type_name: &str, key: &str) -> BatchOperation {
        BatchOperation::UpdateMetafield {
            descriptor: MetafieldDescriptor::new("custom", key, type_name),
            mode: ListMode::Merge,
        }
    }

    #[tokio::test]
    async fn test_scalar_update_round_trip() {
        let shop = FakeShop::new();
        let product = shop.add_resource(ResourceType::Product, MatchField::Handle, "red-shirt", 1);

        let mut driver = BatchDriver::new(
            services(&shop),
            ResourceType::Product,
            MatchField::Handle,
            update("single_line_text_field", "color"),
            vec![BatchRow::new("red-shirt", Some("Red".into()))],
        );
        let snapshot = driver.run().await;

        assert_eq!(snapshot.state, BatchState::Done);
        assert_eq!((snapshot.succeeded, snapshot.failed), (1, 0));
        assert_eq!(driver.results()[0].id, "red-shirt");
        assert_eq!(shop.metafield(&product, "custom", "color").as_deref(), Some("Red"));

        let history_id = snapshot.history_id.unwrap();
        assert_eq!(
            shop.record_field(&history_id, "operation").as_deref(),
            Some("Metafield-updated")
        );
    }

    #[tokio::test]
    async fn test_transitions_are_published() {
        let shop = FakeShop::new();
        shop.add_resource(ResourceType::Product, MatchField::Handle, "a", 1);

        let mut driver = BatchDriver::new(
            services(&shop),
            ResourceType::Product,
            MatchField::Handle,
            update("single_line_text_field", "color"),
            vec![BatchRow::new("a", Some("Blue".into()))],
        );
        let rx = driver.subscribe();

        let mut seen = vec![driver.state()];
        while !driver.state().is_terminal() {
            seen.push(driver.advance().await);
            assert_eq!(rx.borrow().state, driver.state());
        }
        assert_eq!(
            seen,
            vec![
                BatchState::Idle,
                BatchState::ResolvingRow,
                BatchState::Normalizing,
                BatchState::Mutating,
                BatchState::NextRow,
                BatchState::Recording,
                BatchState::Done,
            ]
        );
    }

    #[tokio::test]
    async fn test_reference_failure_makes_no_mutations() {
        let shop = FakeShop::new();
        shop.add_resource(ResourceType::Product, MatchField::Handle, "shirt", 1);

        let mut driver = BatchDriver::new(
            services(&shop),
            ResourceType::Product,
            MatchField::Handle,
            update("product_reference", "related"),
            vec![BatchRow::new("shirt", Some("nonexistent-handle".into()))],
        );
        let snapshot = driver.run().await;

        assert_eq!(snapshot.failed, 1);
        assert_eq!(
            driver.results()[0].error.as_deref(),
            Some("Could not find product for: nonexistent-handle")
        );
        assert_eq!(driver.results()[0].error_kind, Some(FailureKind::Resolution));
        assert_eq!(shop.resource_mutations(), 0);
        assert!(snapshot.history_id.is_none());
    }

    #[tokio::test]
    async fn test_gid_type_mismatch_makes_no_mutations() {
        let shop = FakeShop::new();
        let mut driver = BatchDriver::new(
            services(&shop),
            ResourceType::Product,
            MatchField::Id,
            BatchOperation::AddTags { tags: vec!["x".into()] },
            vec![BatchRow::new("gid://shopify/Customer/1", None)],
        );
        driver.run().await;

        assert_eq!(driver.results()[0].error_kind, Some(FailureKind::Validation));
        assert_eq!(shop.resource_mutations(), 0);
    }

    #[tokio::test]
    async fn test_partial_list_removal() {
        let shop = FakeShop::new();
        let product = shop.add_resource(ResourceType::Product, MatchField::Handle, "p", 1);
        shop.set_metafield(&product, "custom", "sizes", "list.single_line_text_field", r#"["a","b","c"]"#);

        let mut driver = BatchDriver::new(
            services(&shop),
            ResourceType::Product,
            MatchField::Handle,
            BatchOperation::RemoveMetafield {
                descriptor: MetafieldDescriptor::new("custom", "sizes", "list.single_line_text_field"),
                partial: true,
            },
            vec![BatchRow::new("p", Some(r#"["b","x"]"#.into()))],
        );
        driver.run().await;

        let result = &driver.results()[0];
        assert!(result.success);
        assert_eq!(result.data, Some(serde_json::json!(["b"])));
        assert_eq!(
            shop.metafield(&product, "custom", "sizes").as_deref(),
            Some(r#"["a","c"]"#)
        );
    }

    #[tokio::test]
    async fn test_failed_rows_do_not_stop_the_batch() {
        let shop = FakeShop::new();
        let a = shop.add_resource(ResourceType::Customer, MatchField::Email, "a@example.com", 1);
        let c = shop.add_resource(ResourceType::Customer, MatchField::Email, "c@example.com", 3);

        let driver = BatchDriver::new(
            services(&shop),
            ResourceType::Customer,
            MatchField::Email,
            BatchOperation::AddTags { tags: vec![] },
            vec![
                BatchRow::new("a@example.com", Some("vip".into())),
                BatchRow::new("missing@example.com", Some("vip".into())),
                BatchRow::new("c@example.com", Some("vip, wholesale".into())),
            ],
        );
        let events: Vec<BatchEvent> = driver.stream().collect().await;

        let rows = events
            .iter()
            .filter(|e| matches!(e, BatchEvent::Row { .. }))
            .count();
        assert_eq!(rows, 3);
        let Some(BatchEvent::Finished { snapshot, results }) = events.last() else {
            panic!("missing summary");
        };
        assert_eq!((snapshot.succeeded, snapshot.failed), (2, 1));
        assert_eq!(results[1].error.as_deref(), Some("Could not find customer for: missing@example.com"));
        assert_eq!(shop.tags_of(&a), vec!["vip"]);
        assert_eq!(shop.tags_of(&c), vec!["vip", "wholesale"]);

        let history_id = snapshot.history_id.clone().unwrap();
        let value: serde_json::Value =
            serde_json::from_str(&shop.record_field(&history_id, "value").unwrap()).unwrap();
        assert_eq!(value[1]["tagList"], "vip, wholesale");
    }

    #[test]
    fn test_build_operation() {
        let op = BatchOperation::build(
            "tags-add".parse().unwrap(),
            None,
            ListMode::Merge,
            false,
            vec![" a ".into(), String::new()],
        )
        .unwrap();
        assert_eq!(op, BatchOperation::AddTags { tags: vec!["a".into()] });
        assert!(!op.needs_value_column());

        let err = BatchOperation::build(OperationKind::MetafieldUpdate, None, ListMode::Merge, false, vec![]);
        assert!(err.is_err());

        let op = BatchOperation::build(
            OperationKind::MetafieldRemove,
            Some(MetafieldDescriptor::new("custom", "sizes", "list.single_line_text_field")),
            ListMode::Merge,
            true,
            vec![],
        )
        .unwrap();
        assert!(op.needs_value());
        assert!("bogus".parse::<OperationKind>().is_err());
    }

    #[tokio::test]
    async fn test_blank_value_is_validation_failure() {
        let shop = FakeShop::new();
        shop.add_resource(ResourceType::Product, MatchField::Handle, "p", 1);

        let mut driver = BatchDriver::new(
            services(&shop),
            ResourceType::Product,
            MatchField::Handle,
            update("number_integer", "n"),
            vec![BatchRow::new("p", None), BatchRow::new("p", Some("abc".into()))],
        );
        let snapshot = driver.run().await;

        assert_eq!(snapshot.failed, 2);
        assert!(driver.results().iter().all(|r| r.error_kind == Some(FailureKind::Validation)));
        assert_eq!(shop.resource_mutations(), 0);
    }
}

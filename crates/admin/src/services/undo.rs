//! Undo/replay of history records.
//!
//! Each row of a record is replayed sequentially with its own result; one
//! failing row never stops the rest. The record's `restore` flag is cleared
//! only when every row was restored, so a partial undo can be retried.
//!
//! Inverse operations:
//!
//! | recorded            | replay                                              |
//! |---------------------|-----------------------------------------------------|
//! | `Tags-Added`        | remove the recorded tags                            |
//! | `Tags-removed`      | add the removed tags back (existing ones skipped)   |
//! | `Metafield-removed` | lists: merge into the current value; else set it    |
//! | `Metafield-updated` | lists: subtract the recorded values; else delete    |
//!
//! Recorded list values may be JSON arrays or, in older records, plain
//! comma-separated text.

use async_stream::stream;
use futures::{Stream, StreamExt};
use serde::Serialize;
use tagfield_core::{
    BaseType, FailureKind, Gid, HistoryOperation, HistoryRecord, HistoryRow, MetafieldDescriptor,
    OperationResult, ResourceType, StoredMetafield,
};
use thiserror::Error;
use tracing::{info, instrument, warn};

use super::normalizer::{encode_list, merge_unique, parse_recorded_list, plan_removal};
use super::{Executor, HistoryError, HistoryLedger, NormalizeError, Normalizer, Resolver};

/// Why an undo was refused or could not finish.
#[derive(Debug, Error)]
pub enum UndoError {
    #[error("This history record has already been restored")]
    AlreadyRestored,

    #[error("Unknown object type: {0}")]
    UnknownObjectType(String),

    #[error(transparent)]
    History(#[from] HistoryError),
}

/// Progress of an undo.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum UndoEvent {
    /// One row was replayed.
    Row {
        index: usize,
        total: usize,
        result: OperationResult,
    },
    /// Every row has been attempted.
    Finished(UndoSummary),
}

/// Completion summary of an undo.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UndoSummary {
    pub record_id: String,
    pub operation: Option<HistoryOperation>,
    pub restored: usize,
    pub total: usize,
    /// Every row was restored and the record's flag has been cleared.
    pub complete: bool,
    pub results: Vec<OperationResult>,
}

/// Replays the inverse of history records.
#[derive(Clone)]
pub struct UndoService {
    resolver: Resolver,
    normalizer: Normalizer,
    executor: Executor,
    ledger: HistoryLedger,
}

impl UndoService {
    #[must_use]
    pub const fn new(
        resolver: Resolver,
        normalizer: Normalizer,
        executor: Executor,
        ledger: HistoryLedger,
    ) -> Self {
        Self {
            resolver,
            normalizer,
            executor,
            ledger,
        }
    }

    /// Load a record and check that it may be replayed.
    ///
    /// # Errors
    ///
    /// Returns `AlreadyRestored` for records whose flag is already cleared.
    pub async fn prepare(&self, id: &str) -> Result<(HistoryRecord, ResourceType), UndoError> {
        let record = self.ledger.get(id).await?;
        if !record.restore {
            return Err(UndoError::AlreadyRestored);
        }
        let resource_type = record
            .resource_type()
            .ok_or_else(|| UndoError::UnknownObjectType(record.object_type.clone()))?;
        Ok((record, resource_type))
    }

    /// Replay a record, streaming one event per row and a final summary.
    ///
    /// The stream yields an error (and ends) if the record is refused or the
    /// restore flag cannot be cleared. When any row fails the flag is left
    /// set so the record can be replayed again.
    pub fn replay(
        &self,
        id: String,
    ) -> impl Stream<Item = Result<UndoEvent, UndoError>> + Send + 'static + use<> {
        let service = self.clone();
        stream! {
            let (record, resource_type) = match service.prepare(&id).await {
                Ok(prepared) => prepared,
                Err(e) => {
                    warn!(id = %id, error = %e, "Undo refused");
                    yield Err(e);
                    return;
                }
            };

            let rows: Vec<&HistoryRow> = record
                .value
                .iter()
                .filter(|row| !row_is_empty(record.operation, row))
                .collect();
            let total = rows.len();
            let mut summary = UndoSummary {
                record_id: record.id.clone(),
                operation: Some(record.operation),
                total,
                ..UndoSummary::default()
            };

            for (index, row) in rows.into_iter().enumerate() {
                let result = service.replay_row(record.operation, resource_type, row).await;
                if result.success {
                    summary.restored += 1;
                } else {
                    warn!(id = %result.id, error = ?result.error, "Undo row failed");
                }
                summary.results.push(result.clone());
                yield Ok(UndoEvent::Row { index, total, result });
            }

            if summary.restored < summary.total {
                warn!(
                    id = %record.id,
                    restored = summary.restored,
                    total = summary.total,
                    "Undo incomplete, record stays restorable"
                );
            } else {
                if let Err(e) = service.ledger.mark_restored(&record.id).await {
                    yield Err(e.into());
                    return;
                }
                summary.complete = true;
                info!(id = %record.id, total = summary.total, "Undo finished");
            }
            yield Ok(UndoEvent::Finished(summary));
        }
    }

    /// Replay a record to completion.
    ///
    /// # Errors
    ///
    /// See [`Self::replay`].
    pub async fn undo(&self, id: &str) -> Result<UndoSummary, UndoError> {
        let mut events = std::pin::pin!(self.replay(id.to_string()));
        let mut summary = UndoSummary::default();
        while let Some(event) = events.next().await {
            if let UndoEvent::Finished(done) = event? {
                summary = done;
            }
        }
        Ok(summary)
    }

    async fn owner(&self, resource_type: ResourceType, raw: &str, for_tags: bool) -> Result<Gid, OperationResult> {
        self.resolver
            .resolve_default(resource_type, raw, for_tags)
            .await
            .map_err(|e| OperationResult::failed(raw, e.kind(), e.to_string()))
    }

    #[instrument(skip(self, row), fields(id = %row.id))]
    async fn replay_row(
        &self,
        operation: HistoryOperation,
        resource_type: ResourceType,
        row: &HistoryRow,
    ) -> OperationResult {
        let for_tags = matches!(
            operation,
            HistoryOperation::TagsAdded | HistoryOperation::TagsRemoved
        );
        let owner = match self.owner(resource_type, &row.id, for_tags).await {
            Ok(owner) => owner,
            Err(failed) => return failed,
        };
        let owner_id = owner.as_str();

        match operation {
            HistoryOperation::TagsAdded => self.executor.remove_tags(owner_id, &row.added_tags()).await,
            HistoryOperation::TagsRemoved => self.executor.add_tags(owner_id, row.removed_tags()).await,
            HistoryOperation::MetafieldRemoved | HistoryOperation::MetafieldUpdated => {
                let Some(stored) = row.stored_metafield() else {
                    return OperationResult::failed(
                        owner_id,
                        FailureKind::Validation,
                        "History row has no metafield data",
                    );
                };
                let outcome = if operation == HistoryOperation::MetafieldRemoved {
                    self.restore_metafield(&owner, resource_type, &stored).await
                } else {
                    self.revert_update(&owner, resource_type, &stored).await
                };
                outcome.unwrap_or_else(|e| OperationResult::failed(owner_id, e.kind(), e.to_string()))
            }
        }
    }

    /// Put a removed value back. Lists merge into whatever is stored now.
    async fn restore_metafield(
        &self,
        owner: &Gid,
        resource_type: ResourceType,
        stored: &StoredMetafield,
    ) -> Result<OperationResult, NormalizeError> {
        let descriptor = &stored.descriptor;
        let value = stored.value.as_deref().unwrap_or_default();
        if value.trim().is_empty() {
            return Err(NormalizeError::Empty(value.to_string()));
        }

        let wire = if descriptor.metafield_type.is_list() {
            let current = self
                .normalizer
                .existing_list(owner, descriptor)
                .await?
                .unwrap_or_default();
            encode_list(merge_unique(current, parse_recorded_list(value)?))
        } else if *descriptor.metafield_type.base() == BaseType::Metaobject {
            let mut metaobject_type = None;
            self.normalizer
                .resolve_metaobject(resource_type, descriptor, value, &mut metaobject_type)
                .await?
        } else {
            value.to_string()
        };

        Ok(self.executor.set_metafield(owner.as_str(), descriptor, &wire).await)
    }

    /// Undo an update. Lists lose exactly the recorded values; other types
    /// are deleted, and an already absent metafield counts as undone.
    async fn revert_update(
        &self,
        owner: &Gid,
        resource_type: ResourceType,
        stored: &StoredMetafield,
    ) -> Result<OperationResult, NormalizeError> {
        let descriptor = &stored.descriptor;
        if !descriptor.metafield_type.is_list() {
            return Ok(self
                .executor
                .clear_metafield(owner.as_str(), &descriptor.namespace, &descriptor.key)
                .await);
        }

        let Some(current) = self.normalizer.existing_list(owner, descriptor).await? else {
            return Ok(OperationResult::ok(owner.as_str()));
        };
        let recorded = self
            .recorded_elements(resource_type, descriptor, stored.value.as_deref().unwrap_or_default())
            .await?;
        match plan_removal(Some(current), &recorded, resource_type) {
            Ok(plan) => Ok(self.executor.apply_removal(owner.as_str(), descriptor, plan).await),
            Err(NormalizeError::NothingToRemove) => Ok(OperationResult::ok(owner.as_str())),
            Err(e) => Err(e),
        }
    }

    /// Recorded list values in stored form. Metaobject handles become GIDs
    /// so they compare against the current list.
    async fn recorded_elements(
        &self,
        resource_type: ResourceType,
        descriptor: &MetafieldDescriptor,
        raw: &str,
    ) -> Result<Vec<String>, NormalizeError> {
        let items = parse_recorded_list(raw)?;
        if *descriptor.metafield_type.base() != BaseType::Metaobject {
            return Ok(items);
        }
        let mut metaobject_type = None;
        let mut resolved = Vec::with_capacity(items.len());
        for item in &items {
            resolved.push(
                self.normalizer
                    .resolve_metaobject(resource_type, descriptor, item, &mut metaobject_type)
                    .await?,
            );
        }
        Ok(resolved)
    }
}

/// Rows with nothing to replay are skipped entirely.
fn row_is_empty(operation: HistoryOperation, row: &HistoryRow) -> bool {
    match operation {
        HistoryOperation::TagsAdded => row.added_tags().is_empty(),
        HistoryOperation::TagsRemoved => row.removed_tags().is_empty(),
        HistoryOperation::MetafieldRemoved | HistoryOperation::MetafieldUpdated => false,
    }
}

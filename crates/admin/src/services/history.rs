//! History ledger.
//!
//! Every completed batch is stored as one metaobject of type
//! [`HISTORY_METAOBJECT_TYPE`]. Records older than the retention window are
//! swept whenever the history list is loaded; the `restore` flag guards
//! against undoing a record twice.

use chrono::{DateTime, Duration, Utc};
use rand::{Rng, distr::Alphanumeric};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tagfield_core::{
    HISTORY_METAOBJECT_TYPE, HistoryOperation, HistoryParseError, HistoryRecord, HistoryRow,
    RETENTION_HOURS, ResourceType, Retention,
};
use thiserror::Error;
use tracing::{debug, info, instrument, warn};

use crate::shopify::{AdminClient, AdminShopifyError, HistoryPageRequest, Metaobject};

/// Records shown per history page.
pub const HISTORY_PAGE_SIZE: u32 = 10;

/// Records fetched per page while sweeping.
pub const SWEEP_PAGE_SIZE: u32 = 250;

const UNIQUE_ID_LEN: usize = 8;

/// Errors from the history ledger.
#[derive(Debug, Error)]
pub enum HistoryError {
    #[error(transparent)]
    Shopify(#[from] AdminShopifyError),

    #[error("History record not found: {0}")]
    NotFound(String),

    #[error("Invalid history record {id}: {source}")]
    Invalid {
        id: String,
        #[source]
        source: HistoryParseError,
    },

    #[error("Could not encode history record: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Which way to page from a cursor.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PageDirection {
    /// Older records.
    #[default]
    #[serde(alias = "next")]
    Forward,
    /// Newer records.
    #[serde(alias = "prev", alias = "previous")]
    Backward,
}

/// A record that was skipped while listing or sweeping.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkippedRecord {
    pub id: String,
    pub reason: String,
}

/// One page of history, newest first.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryPage {
    /// False when the history definition does not exist yet.
    pub configured: bool,
    pub records: Vec<HistoryRecord>,
    pub skipped: Vec<SkippedRecord>,
    pub has_next: bool,
    pub has_previous: bool,
    pub start_cursor: Option<String>,
    pub end_cursor: Option<String>,
}

/// Outcome of a retention sweep.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SweepReport {
    pub deleted: Vec<String>,
    pub skipped: Vec<SkippedRecord>,
    pub failed: Vec<SkippedRecord>,
    pub retained: usize,
}

fn unique_id() -> String {
    rand::rng()
        .sample_iter(Alphanumeric)
        .take(UNIQUE_ID_LEN)
        .map(char::from)
        .collect()
}

fn parse_record(node: &Metaobject) -> Result<HistoryRecord, HistoryError> {
    HistoryRecord::from_fields(node.id.clone(), node.field_pairs()).map_err(|source| {
        HistoryError::Invalid {
            id: node.id.clone(),
            source,
        }
    })
}

/// The ledger stored in Shopify metaobjects.
#[derive(Clone)]
pub struct HistoryLedger {
    client: AdminClient,
    retention: Duration,
}

impl HistoryLedger {
    #[must_use]
    pub fn new(client: AdminClient) -> Self {
        Self {
            client,
            retention: Duration::hours(RETENTION_HOURS),
        }
    }

    /// Whether the history metaobject definition exists.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    pub async fn is_configured(&self) -> Result<bool, HistoryError> {
        Ok(self
            .client
            .metaobject_definition_by_type(HISTORY_METAOBJECT_TYPE)
            .await?
            .is_some())
    }

    /// Create the history metaobject definition if it is missing.
    ///
    /// Returns `true` when the definition was created.
    ///
    /// # Errors
    ///
    /// Returns an error if the lookup or creation fails.
    #[instrument(skip(self))]
    pub async fn ensure_definition(&self) -> Result<bool, HistoryError> {
        if self.is_configured().await? {
            return Ok(false);
        }

        let field = |key: &str, name: &str, type_name: &str| {
            json!({ "key": key, "name": name, "type": type_name })
        };
        let definition = self
            .client
            .create_metaobject_definition(json!({
                "type": HISTORY_METAOBJECT_TYPE,
                "name": "Tag Metafield App Database",
                "fieldDefinitions": [
                    field("unique_id", "Unique ID", "single_line_text_field"),
                    field("username", "Username", "single_line_text_field"),
                    field("operation", "Operation", "single_line_text_field"),
                    field("objecttype", "Object Type", "single_line_text_field"),
                    field("value", "Value", "json"),
                    field("restore", "Restore", "boolean"),
                    field("time", "Time", "date_time"),
                ],
            }))
            .await?;
        info!(definition_id = %definition.id, "Created history definition");
        Ok(true)
    }

    /// Who the records are attributed to: the shop email, else its domain.
    ///
    /// # Errors
    ///
    /// Returns an error if the shop query fails.
    pub async fn username(&self) -> Result<String, HistoryError> {
        let shop = self.client.shop_identity().await?;
        Ok(shop
            .email
            .filter(|e| !e.trim().is_empty())
            .unwrap_or(shop.myshopify_domain))
    }

    /// Store one record for a finished batch.
    ///
    /// Returns `None` without writing anything when `rows` is empty.
    ///
    /// # Errors
    ///
    /// Returns an error if the definition, shop lookup or create fails.
    #[instrument(skip(self, rows), fields(operation = %operation, rows = rows.len()))]
    pub async fn record(
        &self,
        operation: HistoryOperation,
        resource_type: ResourceType,
        rows: Vec<HistoryRow>,
    ) -> Result<Option<HistoryRecord>, HistoryError> {
        if rows.is_empty() {
            debug!("No successful rows; skipping history record");
            return Ok(None);
        }

        self.ensure_definition().await?;
        let username = self.username().await?;
        let mut record = HistoryRecord::new(
            unique_id(),
            username,
            operation,
            resource_type,
            rows,
            Utc::now(),
        );
        let fields = record.to_fields()?;
        let created = self
            .client
            .create_metaobject(HISTORY_METAOBJECT_TYPE, &fields)
            .await?;
        record.id = created.id;
        info!(id = %record.id, unique_id = %record.unique_id, "Recorded history");
        Ok(Some(record))
    }

    /// One page of records, newest first.
    ///
    /// Records that cannot be parsed are reported in `skipped`.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self))]
    pub async fn page(
        &self,
        cursor: Option<String>,
        direction: PageDirection,
    ) -> Result<HistoryPage, HistoryError> {
        if !self.is_configured().await? {
            return Ok(HistoryPage::default());
        }

        let request = match direction {
            PageDirection::Forward => HistoryPageRequest {
                first: Some(HISTORY_PAGE_SIZE),
                after: cursor,
                reverse: true,
                ..HistoryPageRequest::default()
            },
            PageDirection::Backward => HistoryPageRequest {
                last: Some(HISTORY_PAGE_SIZE),
                before: cursor,
                reverse: true,
                ..HistoryPageRequest::default()
            },
        };
        let list = self
            .client
            .metaobjects(HISTORY_METAOBJECT_TYPE, &request)
            .await?;

        let mut page = HistoryPage {
            configured: true,
            has_next: list.page_info.has_next_page,
            has_previous: list.page_info.has_previous_page,
            start_cursor: list.page_info.start_cursor,
            end_cursor: list.page_info.end_cursor,
            ..HistoryPage::default()
        };
        for node in &list.nodes {
            match parse_record(node) {
                Ok(record) => page.records.push(record),
                Err(e) => {
                    warn!(error = %e, "Skipping unreadable history record");
                    page.skipped.push(SkippedRecord {
                        id: node.id.clone(),
                        reason: e.to_string(),
                    });
                }
            }
        }
        Ok(page)
    }

    /// A single record by metaobject id.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if the record does not exist and `Invalid` if it
    /// cannot be parsed.
    pub async fn get(&self, id: &str) -> Result<HistoryRecord, HistoryError> {
        let node = self
            .client
            .metaobject(id)
            .await?
            .ok_or_else(|| HistoryError::NotFound(id.to_string()))?;
        parse_record(&node)
    }

    /// Permanently mark a record as undone.
    ///
    /// # Errors
    ///
    /// Returns an error if the update fails.
    #[instrument(skip(self))]
    pub async fn mark_restored(&self, id: &str) -> Result<(), HistoryError> {
        self.client
            .update_metaobject_fields(id, &[("restore", "false".to_string())])
            .await?;
        Ok(())
    }

    /// Delete records older than the retention window.
    ///
    /// # Errors
    ///
    /// Returns an error if listing fails; individual delete failures are
    /// reported in [`SweepReport::failed`].
    pub async fn sweep(&self) -> Result<SweepReport, HistoryError> {
        self.sweep_at(Utc::now()).await
    }

    /// [`Self::sweep`] with an explicit clock.
    ///
    /// All pages are collected before anything is deleted so deletions do not
    /// shift the cursor window.
    ///
    /// # Errors
    ///
    /// See [`Self::sweep`].
    #[instrument(skip(self))]
    pub async fn sweep_at(&self, now: DateTime<Utc>) -> Result<SweepReport, HistoryError> {
        let mut nodes = Vec::new();
        let mut after: Option<String> = None;
        loop {
            let list = self
                .client
                .metaobjects(
                    HISTORY_METAOBJECT_TYPE,
                    &HistoryPageRequest {
                        first: Some(SWEEP_PAGE_SIZE),
                        after: after.clone(),
                        ..HistoryPageRequest::default()
                    },
                )
                .await?;
            nodes.extend(list.nodes);
            let next = list.page_info.end_cursor;
            if !list.page_info.has_next_page || next.is_none() || next == after {
                break;
            }
            after = next;
        }

        let mut report = SweepReport::default();
        for node in nodes {
            match Retention::classify(node.field("time"), now, self.retention) {
                Retention::Expired => match self.client.delete_metaobject(&node.id).await {
                    Ok(id) => report.deleted.push(id),
                    Err(e) => {
                        warn!(id = %node.id, error = %e, "Failed to delete expired history record");
                        report.failed.push(SkippedRecord {
                            id: node.id,
                            reason: e.to_string(),
                        });
                    }
                },
                Retention::Retained => report.retained += 1,
                skipped @ (Retention::MissingTime | Retention::InvalidTime) => {
                    report.skipped.push(SkippedRecord {
                        id: node.id,
                        reason: skipped.skip_reason().unwrap_or_default().to_string(),
                    });
                }
            }
        }

        info!(
            deleted = report.deleted.len(),
            skipped = report.skipped.len(),
            failed = report.failed.len(),
            retained = report.retained,
            "History sweep finished"
        );
        Ok(report)
    }
}

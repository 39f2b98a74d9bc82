//! Business logic services for admin.
//!
//! # Services
//!
//! - `resolver` - Business identifier to GID resolution
//! - `normalizer` - Metafield value normalization and list planning
//! - `executor` - Single-resource metafield and tag mutations
//! - `scanner` - Cursor pagination over catalog connections
//! - `bulk_delete` - Remove one metafield from every resource of a type
//! - `tags` - Tag scan, filter and bulk removal
//! - `history` - History ledger stored as metaobjects
//! - `undo` - Replays the inverse of a history record
//! - `batch` - CSV batch state machine
//! - `export` - CSV export of resources and metaobjects

pub mod batch;
pub mod bulk_delete;
pub mod executor;
pub mod export;
pub mod history;
pub mod normalizer;
pub mod resolver;
pub mod scanner;
pub mod tags;
pub mod undo;

pub use batch::{
    BatchDriver, BatchEvent, BatchOperation, BatchRow, BatchServices, BatchSnapshot, BatchState,
    OperationKind,
};
pub use bulk_delete::{BulkDeleteProgress, BulkDeleteRun, BulkDeleteService, BulkDeleteState};
pub use executor::Executor;
pub use export::{ExportService, ExportTarget};
pub use history::{HistoryError, HistoryLedger, HistoryPage, PageDirection, SweepReport};
pub use normalizer::{NormalizeError, Normalized, Normalizer, RawValue, RemovalPlan};
pub use resolver::{ResolveError, Resolver};
pub use scanner::Scanner;
pub use tags::{Combinator, TagCondition, TagFilter, TagMatch, TagRemovalEvent, TagService};
pub use undo::{UndoError, UndoEvent, UndoService, UndoSummary};

use tagfield_core::{FailureKind, OperationResult};

use crate::shopify::AdminShopifyError;

/// Classify a client error for a per-row result.
#[must_use]
pub const fn failure_kind(error: &AdminShopifyError) -> FailureKind {
    match error {
        AdminShopifyError::UserError(_) => FailureKind::Upstream,
        AdminShopifyError::Http(_)
        | AdminShopifyError::GraphQL(_)
        | AdminShopifyError::Parse(_)
        | AdminShopifyError::NotFound(_)
        | AdminShopifyError::RateLimited(_)
        | AdminShopifyError::Unauthorized(_) => FailureKind::Transport,
    }
}

/// Turn a client error into a failed per-row result.
///
/// User errors keep Shopify's joined message verbatim.
#[must_use]
pub fn failed_row(id: impl Into<String>, error: &AdminShopifyError) -> OperationResult {
    let message = match error {
        AdminShopifyError::UserError(message) => message.clone(),
        other => other.to_string(),
    };
    OperationResult::failed(id, failure_kind(error), message)
}

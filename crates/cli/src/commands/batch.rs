//! CSV batch command.

use std::path::PathBuf;

use futures::{StreamExt, pin_mut};
use tagfield_admin::csv::{CsvError, parse_batch, report};
use tagfield_admin::services::{BatchDriver, BatchEvent, BatchOperation, BatchState, OperationKind};
use tagfield_admin::state::AppState;
use tagfield_core::{ListMode, MetafieldDescriptor, ResourceType};
use thiserror::Error;
use tracing::{info, warn};

/// Errors that stop a batch before or after its rows run.
#[derive(Debug, Error)]
pub enum BatchError {
    #[error("Could not read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Could not write report {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{0}")]
    Operation(&'static str),

    #[error(transparent)]
    Csv(#[from] CsvError),

    #[error("Batch failed: {0}")]
    Failed(String),
}

/// Parsed `tagfield batch` arguments.
pub struct BatchArgs {
    pub kind: OperationKind,
    pub resource_type: ResourceType,
    pub csv: PathBuf,
    pub report: Option<PathBuf>,
    pub namespace: Option<String>,
    pub key: Option<String>,
    pub metafield_type: Option<String>,
    pub mode: ListMode,
    pub partial: bool,
    pub tags: Vec<String>,
}

impl BatchArgs {
    fn operation(&self) -> Result<BatchOperation, BatchError> {
        let descriptor = match (&self.namespace, &self.key, &self.metafield_type) {
            (Some(ns), Some(key), Some(ty)) => Some(MetafieldDescriptor::new(ns, key, ty)),
            _ => None,
        };
        BatchOperation::build(
            self.kind,
            descriptor,
            self.mode,
            self.partial,
            self.tags.clone(),
        )
        .map_err(BatchError::Operation)
    }
}

/// Run one batch, logging each row and writing the outcome report.
///
/// # Errors
///
/// Returns an error if the file is rejected, the report cannot be written or
/// the history record could not be stored.
pub async fn run(state: &AppState, args: BatchArgs) -> Result<(), BatchError> {
    let operation = args.operation()?;
    let data = tokio::fs::read(&args.csv)
        .await
        .map_err(|source| BatchError::Read {
            path: args.csv.clone(),
            source,
        })?;
    let parsed = parse_batch(&data, args.resource_type, operation.needs_value_column())?;
    let field = parsed.field;

    info!(
        resource = %args.resource_type,
        rows = parsed.rows.len(),
        field = %field,
        "Starting batch"
    );

    let driver = BatchDriver::new(
        state.batch().clone(),
        args.resource_type,
        field,
        operation,
        parsed.rows,
    );
    let events = driver.stream();
    pin_mut!(events);

    while let Some(event) = events.next().await {
        match event {
            BatchEvent::Row {
                index,
                total,
                result,
            } => {
                if result.success {
                    info!(row = index + 1, total, id = %result.id, "Row done");
                } else {
                    warn!(
                        row = index + 1,
                        total,
                        id = %result.id,
                        error = result.error.as_deref().unwrap_or_default(),
                        "Row failed"
                    );
                }
            }
            BatchEvent::Finished { snapshot, results } => {
                if let Some(path) = &args.report {
                    tokio::fs::write(path, report(field, &results))
                        .await
                        .map_err(|source| BatchError::Write {
                            path: path.clone(),
                            source,
                        })?;
                    info!(path = %path.display(), "Wrote report");
                }
                info!(
                    succeeded = snapshot.succeeded,
                    failed = snapshot.failed,
                    history_id = snapshot.history_id.as_deref().unwrap_or("none"),
                    "Batch finished"
                );
                if snapshot.state == BatchState::Failed {
                    return Err(BatchError::Failed(snapshot.error.unwrap_or_default()));
                }
            }
        }
    }
    Ok(())
}

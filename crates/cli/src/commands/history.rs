//! History ledger commands.

use futures::{StreamExt, pin_mut};
use tagfield_admin::services::{PageDirection, UndoEvent};
use tagfield_admin::state::AppState;
use tracing::{info, warn};

use super::print_json;

/// Create the history definition if it does not exist.
///
/// # Errors
///
/// Returns an error if the lookup or creation fails.
pub async fn setup(state: &AppState) -> Result<(), Box<dyn std::error::Error>> {
    if state.ledger().ensure_definition().await? {
        info!("History definition created");
    } else {
        info!("History definition already exists");
    }
    Ok(())
}

/// Print one page of history records.
///
/// # Errors
///
/// Returns an error if the page query fails.
pub async fn list(
    state: &AppState,
    cursor: Option<String>,
    direction: PageDirection,
) -> Result<(), Box<dyn std::error::Error>> {
    let page = state.ledger().page(cursor, direction).await?;
    if !page.configured {
        warn!("History is not set up; run `tagfield history setup`");
    }
    print_json(&page)?;
    Ok(())
}

/// Delete records past retention.
///
/// # Errors
///
/// Returns an error if listing fails.
pub async fn sweep(state: &AppState) -> Result<(), Box<dyn std::error::Error>> {
    let report = state.ledger().sweep().await?;
    info!(
        deleted = report.deleted.len(),
        retained = report.retained,
        failed = report.failed.len(),
        "Sweep finished"
    );
    print_json(&report)?;
    Ok(())
}

/// Replay the inverse of a record.
///
/// # Errors
///
/// Returns an error if the record is missing, unreadable or already restored.
pub async fn undo(state: &AppState, id: String) -> Result<(), Box<dyn std::error::Error>> {
    let events = state.undo().replay(id);
    pin_mut!(events);

    while let Some(event) = events.next().await {
        match event? {
            UndoEvent::Row { index, total, result } => {
                if result.success {
                    info!(row = index + 1, total, id = %result.id, "Restored");
                } else {
                    warn!(row = index + 1, total, id = %result.id, error = result.error.as_deref().unwrap_or_default(), "Restore failed");
                }
            }
            UndoEvent::Finished(summary) => {
                info!(
                    restored = summary.restored,
                    total = summary.total,
                    complete = summary.complete,
                    "Undo finished"
                );
                print_json(&summary)?;
            }
        }
    }
    Ok(())
}

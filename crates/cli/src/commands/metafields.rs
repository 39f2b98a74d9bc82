//! Metafield definition and delete-all commands.

use futures::{StreamExt, pin_mut};
use tagfield_admin::services::BulkDeleteState;
use tagfield_admin::state::AppState;
use tagfield_core::ResourceType;
use tracing::info;

use super::print_json;

/// Print every metafield definition for a resource type.
///
/// # Errors
///
/// Returns an error if a definitions page fails.
pub async fn definitions(
    state: &AppState,
    resource_type: ResourceType,
) -> Result<(), Box<dyn std::error::Error>> {
    let definitions = state.scanner().definitions(resource_type).await?;
    info!(resource = %resource_type, count = definitions.len(), "Loaded definitions");
    print_json(&definitions)?;
    Ok(())
}

/// Remove one metafield from every resource of a type.
///
/// # Errors
///
/// Returns an error if the run ends in `Failed`.
pub async fn delete_all(
    state: &AppState,
    resource_type: ResourceType,
    namespace: &str,
    key: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    let progress = state.bulk_delete().stream(resource_type, namespace, key);
    pin_mut!(progress);

    let mut last = None;
    while let Some(p) = progress.next().await {
        info!(
            state = ?p.state,
            processed = p.processed,
            deleted = p.deleted,
            percent = p.percent,
            "Progress"
        );
        last = Some(p);
    }

    let Some(last) = last else {
        return Ok(());
    };
    print_json(&last)?;
    if last.state == BulkDeleteState::Failed {
        return Err(last.error.unwrap_or_else(|| "Bulk delete failed".to_string()).into());
    }
    Ok(())
}

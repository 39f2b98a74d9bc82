//! Tag search and remove-all commands.

use futures::{StreamExt, pin_mut};
use tagfield_admin::services::{Combinator, TagCondition, TagFilter, TagMatch, TagRemovalEvent};
use tagfield_admin::state::AppState;
use tracing::{info, warn};

use super::print_json;

/// Print the distinct tags that pass the conditions.
///
/// # Errors
///
/// Returns an error if a tag scan fails.
pub async fn search(
    state: &AppState,
    kind: TagMatch,
    values: Vec<String>,
    combinator: Combinator,
) -> Result<(), Box<dyn std::error::Error>> {
    let filter = TagFilter {
        conditions: values
            .into_iter()
            .map(|v| TagCondition::new(kind, v))
            .collect(),
        combinator,
    };
    let tags = state.tags().search(&filter).await?;
    print_json(&tags)?;
    Ok(())
}

/// Remove tags from every resource that carries them.
///
/// # Errors
///
/// Returns an error if any resource type could not be scanned.
pub async fn remove_all(state: &AppState, tags: Vec<String>) -> Result<(), Box<dyn std::error::Error>> {
    let events = state.tags().remove_everywhere(tags);
    pin_mut!(events);

    let mut scan_errors = 0;
    while let Some(event) = events.next().await {
        match event {
            TagRemovalEvent::Row { resource_type, result } if !result.success => {
                warn!(resource = %resource_type, id = %result.id, error = result.error.as_deref().unwrap_or_default(), "Row failed");
            }
            TagRemovalEvent::Row { .. } => {}
            TagRemovalEvent::Recorded { resource_type, history_id } => {
                info!(resource = %resource_type, %history_id, "Recorded history");
            }
            TagRemovalEvent::Error { resource_type, message } => {
                warn!(resource = %resource_type, %message, "Scan failed");
                scan_errors += 1;
            }
            TagRemovalEvent::Finished { removed, failed } => {
                info!(removed, failed, "Tag removal finished");
            }
        }
    }

    if scan_errors > 0 {
        return Err(format!("{scan_errors} resource type(s) could not be scanned").into());
    }
    Ok(())
}

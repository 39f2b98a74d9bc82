//! CSV export command.

use std::path::Path;

use tagfield_admin::services::ExportTarget;
use tagfield_admin::state::AppState;
use tagfield_core::ResourceType;
use tracing::info;

/// Export a resource type, or metaobjects of a type, to `out`.
///
/// # Errors
///
/// Returns an error if neither target is given, a page fails or the file
/// cannot be written.
pub async fn run(
    state: &AppState,
    resource_type: Option<ResourceType>,
    metaobject_type: Option<String>,
    out: &Path,
) -> Result<(), Box<dyn std::error::Error>> {
    let target = match (metaobject_type, resource_type) {
        (Some(type_name), _) => ExportTarget::Metaobjects { type_name },
        (None, Some(resource_type)) => ExportTarget::Resources { resource_type },
        (None, None) => return Err("--resource or --metaobject-type is required".into()),
    };

    let csv = state.export().export(&target).await?;
    tokio::fs::write(out, &csv).await?;
    info!(path = %out.display(), rows = csv.lines().count().saturating_sub(1), "Export written");
    Ok(())
}

//! CLI command implementations.

pub mod batch;
pub mod export;
pub mod history;
pub mod metafields;
pub mod tags;

use serde::Serialize;
use tagfield_admin::config::{ConfigError, ShopifyAdminConfig};
use tagfield_admin::shopify::AdminClient;
use tagfield_admin::state::AppState;

/// Build the service graph from flags and the environment.
///
/// # Errors
///
/// Returns `ConfigError` if the store or token are missing or invalid.
pub fn connect(store: Option<String>, token: Option<String>) -> Result<AppState, ConfigError> {
    let config = ShopifyAdminConfig::load(store, token)?;
    tracing::info!(store = %config.store, "Connecting to Shopify");
    Ok(AppState::new(AdminClient::new(&config)))
}

/// Write a value to stdout as pretty JSON.
#[allow(clippy::print_stdout)]
pub fn print_json<T: Serialize>(value: &T) -> Result<(), serde_json::Error> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

//! Catalog-driven resource lookups, counts and scans.

use serde::Deserialize;
use serde_json::{Value, json};
use tracing::instrument;

use super::AdminClient;
use crate::shopify::{
    AdminShopifyError, CatalogEntry, Page, ShopIdentity, TaggedNode,
    catalog::Lookup,
    queries::SHOP_IDENTITY,
    types::{Connection, IdNode},
};

#[derive(Deserialize)]
struct ShopData {
    shop: ShopIdentity,
}

/// Deserialize the entry's root connection out of raw `data`.
///
/// A missing or null connection is treated as an exhausted scan.
fn connection_page<T: serde::de::DeserializeOwned>(
    data: &Value,
    connection: &str,
) -> Result<Page<T>, AdminShopifyError> {
    match data.get(connection) {
        None | Some(Value::Null) => Ok(Page::empty()),
        Some(value) => {
            let connection: Connection<T> = serde_json::from_value(value.clone())?;
            Ok(Page::from_connection(Some(connection)))
        }
    }
}

impl AdminClient {
    // =========================================================================
    // Resource lookups
    // =========================================================================

    /// Resolve an identifier with a catalog lookup.
    ///
    /// Returns `Ok(None)` when nothing matches.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self, lookup), fields(operation = lookup.operation.name))]
    pub async fn lookup(&self, lookup: &Lookup, raw: &str) -> Result<Option<String>, AdminShopifyError> {
        let data = self
            .execute_raw(lookup.operation, json!({ "value": lookup.filter.build(raw) }))
            .await?;
        Ok(data
            .pointer(lookup.id_pointer)
            .and_then(Value::as_str)
            .map(str::to_string))
    }

    /// Total number of resources of a type.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails or the count is missing.
    #[instrument(skip(self, entry), fields(resource = %entry.resource_type))]
    pub async fn count(&self, entry: &CatalogEntry) -> Result<u64, AdminShopifyError> {
        let data = self.execute_raw(entry.count, json!({})).await?;
        data.pointer(entry.count_pointer)
            .and_then(Value::as_u64)
            .ok_or_else(|| AdminShopifyError::missing("count"))
    }

    // =========================================================================
    // Scans
    // =========================================================================

    /// One page of resource GIDs.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self, entry), fields(resource = %entry.resource_type))]
    pub async fn scan_ids_page(
        &self,
        entry: &CatalogEntry,
        first: u32,
        after: Option<&str>,
    ) -> Result<Page<String>, AdminShopifyError> {
        let data = self
            .execute_raw(entry.scan_ids, json!({ "first": first, "after": after }))
            .await?;
        let page: Page<IdNode> = connection_page(&data, entry.connection)?;
        Ok(Page {
            items: page.items.into_iter().map(|n| n.id).collect(),
            next_cursor: page.next_cursor,
            has_more: page.has_more,
        })
    }

    /// One page of tagged resources, optionally narrowed by a search query.
    ///
    /// Non-taggable resource types yield an empty page.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self, entry), fields(resource = %entry.resource_type))]
    pub async fn scan_tags_page(
        &self,
        entry: &CatalogEntry,
        first: u32,
        after: Option<&str>,
        query: Option<&str>,
    ) -> Result<Page<TaggedNode>, AdminShopifyError> {
        let Some(operation) = entry.scan_tags else {
            return Ok(Page::empty());
        };
        let data = self
            .execute_raw(
                operation,
                json!({ "first": first, "after": after, "query": query }),
            )
            .await?;
        connection_page(&data, entry.connection)
    }

    /// One page of export rows as raw nodes.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self, entry), fields(resource = %entry.resource_type))]
    pub async fn export_page(
        &self,
        entry: &CatalogEntry,
        first: u32,
        after: Option<&str>,
    ) -> Result<Page<Value>, AdminShopifyError> {
        let data = self
            .execute_raw(entry.export, json!({ "first": first, "after": after }))
            .await?;
        connection_page(&data, entry.connection)
    }

    // =========================================================================
    // Shop
    // =========================================================================

    /// The shop's contact email and myshopify domain.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self))]
    pub async fn shop_identity(&self) -> Result<ShopIdentity, AdminShopifyError> {
        let data: ShopData = self.execute(SHOP_IDENTITY, json!({})).await?;
        Ok(data.shop)
    }
}

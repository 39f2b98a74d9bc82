//! Cursor pagination over catalog connections.

use std::future::Future;
use std::sync::Arc;

use tagfield_core::ResourceType;
use tracing::{debug, instrument, warn};

use crate::shopify::{
    AdminClient, AdminShopifyError, MetafieldDefinition, Page, ResourceTypeCatalog, TaggedNode,
};

/// Default page size for resource scans.
pub const PAGE_SIZE: u32 = 250;

/// Page size for metafield definition listings.
pub const DEFINITIONS_PAGE_SIZE: u32 = 200;

/// Fetch pages until one reports no more, collecting every item.
///
/// `fetch` receives the cursor to resume from (`None` for the first page).
/// A page that repeats the previous cursor ends the scan.
///
/// # Errors
///
/// Returns the first page error.
pub async fn collect_pages<T, F, Fut>(mut fetch: F) -> Result<Vec<T>, AdminShopifyError>
where
    F: FnMut(Option<String>) -> Fut,
    Fut: Future<Output = Result<Page<T>, AdminShopifyError>>,
{
    let mut items = Vec::new();
    let mut cursor: Option<String> = None;
    loop {
        let page = fetch(cursor.clone()).await?;
        items.extend(page.items);
        if !page.has_more || page.next_cursor == cursor {
            break;
        }
        cursor = page.next_cursor;
    }
    Ok(items)
}

/// Pages through resources, definitions and tags.
#[derive(Clone)]
pub struct Scanner {
    client: AdminClient,
    catalog: Arc<ResourceTypeCatalog>,
    page_size: u32,
}

impl Scanner {
    #[must_use]
    pub const fn new(client: AdminClient, catalog: Arc<ResourceTypeCatalog>) -> Self {
        Self {
            client,
            catalog,
            page_size: PAGE_SIZE,
        }
    }

    /// Override the scan page size.
    #[must_use]
    pub const fn with_page_size(mut self, page_size: u32) -> Self {
        self.page_size = page_size;
        self
    }

    #[must_use]
    pub const fn page_size(&self) -> u32 {
        self.page_size
    }

    /// One page of resource GIDs.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    pub async fn ids_page(
        &self,
        resource_type: ResourceType,
        after: Option<&str>,
    ) -> Result<Page<String>, AdminShopifyError> {
        self.client
            .scan_ids_page(self.catalog.entry(resource_type), self.page_size, after)
            .await
    }

    /// Every resource GID of a type.
    ///
    /// # Errors
    ///
    /// Returns the first page error.
    #[instrument(skip(self))]
    pub async fn all_ids(&self, resource_type: ResourceType) -> Result<Vec<String>, AdminShopifyError> {
        let ids = collect_pages(|cursor| async move {
            self.ids_page(resource_type, cursor.as_deref()).await
        })
        .await?;
        debug!(count = ids.len(), "Scanned resource ids");
        Ok(ids)
    }

    /// One page of tagged resources, optionally narrowed by a search query.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    pub async fn tagged_page(
        &self,
        resource_type: ResourceType,
        after: Option<&str>,
        query: Option<&str>,
    ) -> Result<Page<TaggedNode>, AdminShopifyError> {
        self.client
            .scan_tags_page(self.catalog.entry(resource_type), self.page_size, after, query)
            .await
    }

    /// Every tagged resource of a type.
    ///
    /// # Errors
    ///
    /// Returns the first page error.
    #[instrument(skip(self))]
    pub async fn all_tagged(
        &self,
        resource_type: ResourceType,
        query: Option<&str>,
    ) -> Result<Vec<TaggedNode>, AdminShopifyError> {
        collect_pages(|cursor| async move {
            self.tagged_page(resource_type, cursor.as_deref(), query).await
        })
        .await
    }

    /// Every metafield definition for a resource type's owner type.
    ///
    /// # Errors
    ///
    /// Returns the first page error.
    #[instrument(skip(self))]
    pub async fn definitions(
        &self,
        resource_type: ResourceType,
    ) -> Result<Vec<MetafieldDefinition>, AdminShopifyError> {
        let owner_type = resource_type.owner_type();
        collect_pages(|cursor| async move {
            self.client
                .metafield_definitions_page(owner_type, DEFINITIONS_PAGE_SIZE, cursor.as_deref())
                .await
        })
        .await
    }

    /// Resource count.
    ///
    /// # Errors
    ///
    /// Returns an error if the count query fails.
    pub async fn try_count(&self, resource_type: ResourceType) -> Result<u64, AdminShopifyError> {
        self.client.count(self.catalog.entry(resource_type)).await
    }

    /// Resource count; a failing count query counts as zero.
    #[instrument(skip(self))]
    pub async fn count(&self, resource_type: ResourceType) -> u64 {
        self.try_count(resource_type).await.unwrap_or_else(|e| {
            warn!(error = %e, "Count query failed");
            0
        })
    }
}

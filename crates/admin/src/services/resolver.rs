//! Identifier resolution.
//!
//! Turns the identifier a merchant typed in a CSV (SKU, handle, email, order
//! name, external ID or GID) into a Shopify GID using the catalog lookup for
//! the resource type. One upstream query per identifier; GIDs of the right
//! type never hit the network.

use std::sync::Arc;

use tagfield_core::{FailureKind, Gid, MatchField, ResourceType};
use thiserror::Error;
use tracing::{debug, instrument};

use super::failure_kind;
use crate::shopify::{AdminClient, AdminShopifyError, ResourceTypeCatalog};

/// Why an identifier could not be resolved.
#[derive(Debug, Error)]
pub enum ResolveError {
    /// The value is a GID of another resource type, or a malformed GID.
    #[error("Invalid Shopify ID: {value} is not a {expected} ID")]
    TypeMismatch { value: String, expected: &'static str },

    /// No resource matched the identifier.
    #[error("Could not find {kind} for: {value}")]
    NotFound { kind: &'static str, value: String },

    /// The resource type has no lookup for the match field.
    #[error("{resource} cannot be matched by {field}")]
    UnsupportedField {
        resource: ResourceType,
        field: MatchField,
    },

    /// The lookup query itself failed.
    #[error("Lookup failed for {value}: {source}")]
    Upstream {
        value: String,
        #[source]
        source: AdminShopifyError,
    },
}

impl ResolveError {
    /// Failure kind for a per-row result.
    #[must_use]
    pub const fn kind(&self) -> FailureKind {
        match self {
            Self::TypeMismatch { .. } | Self::UnsupportedField { .. } => FailureKind::Validation,
            Self::NotFound { .. } => FailureKind::Resolution,
            Self::Upstream { source, .. } => failure_kind(source),
        }
    }
}

/// Resolves business identifiers to GIDs.
#[derive(Clone)]
pub struct Resolver {
    client: AdminClient,
    catalog: Arc<ResourceTypeCatalog>,
}

impl Resolver {
    #[must_use]
    pub const fn new(client: AdminClient, catalog: Arc<ResourceTypeCatalog>) -> Self {
        Self { client, catalog }
    }

    /// Accept `raw` only if it is a GID of `resource_type`.
    ///
    /// # Errors
    ///
    /// Returns `ResolveError::TypeMismatch` for malformed GIDs and GIDs of
    /// another type.
    pub fn check_gid(resource_type: ResourceType, raw: &str) -> Result<Gid, ResolveError> {
        let expected = resource_type.gid_type();
        Gid::parse(raw)
            .ok()
            .filter(|gid| gid.is_type(expected))
            .ok_or_else(|| ResolveError::TypeMismatch {
                value: raw.trim().to_string(),
                expected,
            })
    }

    /// Resolve `raw` as `field` of `resource_type`.
    ///
    /// Values that look like GIDs are checked and passed through regardless
    /// of the match field.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` when nothing matches and `Upstream` when the lookup
    /// query fails.
    #[instrument(skip(self), fields(resource = %resource_type, field = %field))]
    pub async fn resolve(
        &self,
        resource_type: ResourceType,
        field: MatchField,
        raw: &str,
    ) -> Result<Gid, ResolveError> {
        let value = raw.trim();
        if field == MatchField::Id || Gid::looks_like_gid(value) {
            return Self::check_gid(resource_type, value);
        }

        let lookup = self
            .catalog
            .entry(resource_type)
            .lookup(field)
            .ok_or(ResolveError::UnsupportedField {
                resource: resource_type,
                field,
            })?;

        let not_found = || ResolveError::NotFound {
            kind: resource_type.as_str(),
            value: value.to_string(),
        };

        let found = self
            .client
            .lookup(lookup, value)
            .await
            .map_err(|source| ResolveError::Upstream {
                value: value.to_string(),
                source,
            })?;

        let gid = found
            .and_then(|id| Gid::parse(&id).ok())
            .ok_or_else(not_found)?;
        debug!(gid = %gid, "Resolved identifier");
        Ok(gid)
    }

    /// Resolve `raw` using the resource type's default match field.
    ///
    /// # Errors
    ///
    /// See [`Self::resolve`].
    pub async fn resolve_default(
        &self,
        resource_type: ResourceType,
        raw: &str,
        for_tags: bool,
    ) -> Result<Gid, ResolveError> {
        self.resolve(resource_type, resource_type.default_match_field(for_tags), raw)
            .await
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::shopify::fake::FakeShop;

    fn resolver(shop: &Arc<FakeShop>) -> Resolver {
        Resolver::new(shop.client(), Arc::new(ResourceTypeCatalog::new()))
    }

    #[tokio::test]
    async fn test_gid_passes_through_without_calls() {
        let shop = FakeShop::new();
        let gid = resolver(&shop)
            .resolve(ResourceType::Product, MatchField::Id, "gid://shopify/Product/42")
            .await
            .unwrap();
        assert_eq!(gid.numeric_id(), 42);
        assert_eq!(shop.calls("ProductByHandle"), 0);
    }

    #[tokio::test]
    async fn test_gid_type_mismatch() {
        let shop = FakeShop::new();
        let err = resolver(&shop)
            .resolve(ResourceType::Product, MatchField::Handle, "gid://shopify/Collection/1")
            .await
            .unwrap_err();
        assert!(matches!(err, ResolveError::TypeMismatch { expected: "Product", .. }));
        assert_eq!(err.kind(), FailureKind::Validation);
    }

    #[tokio::test]
    async fn test_blog_post_expects_article_gid() {
        let gid = Resolver::check_gid(ResourceType::BlogPost, "gid://shopify/Article/7").unwrap();
        assert_eq!(gid.resource_name(), "Article");
    }

    #[tokio::test]
    async fn test_lookup_by_sku_and_email() {
        let shop = FakeShop::new();
        shop.add_resource(ResourceType::ProductVariant, MatchField::Sku, "SKU-1", 11);
        shop.add_resource(ResourceType::Customer, MatchField::Email, "a@b.test", 12);
        let resolver = resolver(&shop);

        let variant = resolver
            .resolve(ResourceType::ProductVariant, MatchField::Sku, " SKU-1 ")
            .await
            .unwrap();
        assert_eq!(variant.as_str(), "gid://shopify/ProductVariant/11");

        let customer = resolver
            .resolve_default(ResourceType::Customer, "a@b.test", false)
            .await
            .unwrap();
        assert_eq!(customer.as_str(), "gid://shopify/Customer/12");
    }

    #[tokio::test]
    async fn test_not_found_is_distinct_from_upstream_failure() {
        let shop = FakeShop::new();
        let resolver = resolver(&shop);

        let err = resolver
            .resolve(ResourceType::Collection, MatchField::Handle, "missing")
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Could not find collection for: missing");
        assert_eq!(err.kind(), FailureKind::Resolution);

        shop.fail("CollectionByHandle", "Throttled");
        let err = resolver
            .resolve(ResourceType::Collection, MatchField::Handle, "missing")
            .await
            .unwrap_err();
        assert!(matches!(err, ResolveError::Upstream { .. }));
        assert_eq!(err.kind(), FailureKind::Transport);
    }

    #[tokio::test]
    async fn test_unsupported_field() {
        let shop = FakeShop::new();
        let err = resolver(&shop)
            .resolve(ResourceType::Market, MatchField::Email, "x")
            .await
            .unwrap_err();
        assert!(matches!(err, ResolveError::UnsupportedField { .. }));
    }
}

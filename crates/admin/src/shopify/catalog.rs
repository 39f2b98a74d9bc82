//! Per-resource-type lookup table.
//!
//! [`ResourceTypeCatalog`] holds one [`CatalogEntry`] per [`ResourceType`]:
//! which connection to page, how to look a resource up by each supported
//! match field, which count field to read and which columns to export. It is
//! built once at startup and only ever read.

use tagfield_core::{MatchField, ReferenceKind, ResourceType};

use super::queries::{
    Operation, count_document, export_document, scan_ids_document, search_document,
    tag_scan_document,
};

/// How the raw identifier is passed to a lookup document's `$value`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Filter {
    /// The identifier is passed as-is (e.g. `productByIdentifier(handle)`).
    Direct,
    /// The identifier is wrapped in a search query `field:"value"`.
    Search(&'static str),
}

impl Filter {
    /// Build the `$value` variable for a raw identifier.
    #[must_use]
    pub fn build(self, raw: &str) -> String {
        match self {
            Self::Direct => raw.to_string(),
            Self::Search(field) => {
                format!("{field}:\"{}\"", raw.replace('\\', "\\\\").replace('"', "\\\""))
            }
        }
    }
}

/// One way of resolving an identifier to a GID.
#[derive(Debug, Clone, Copy)]
pub struct Lookup {
    pub field: MatchField,
    pub operation: Operation,
    pub filter: Filter,
    /// JSON pointer to the GID within the response data.
    pub id_pointer: &'static str,
}

/// Everything needed to work with one resource type.
#[derive(Debug, Clone)]
pub struct CatalogEntry {
    pub resource_type: ResourceType,
    /// Root connection field, e.g. `products`.
    pub connection: &'static str,
    pub lookups: Vec<Lookup>,
    pub count: Operation,
    /// JSON pointer to the count within the response data.
    pub count_pointer: &'static str,
    pub scan_ids: Operation,
    /// Present only for taggable resources.
    pub scan_tags: Option<Operation>,
    pub export: Operation,
    /// `(header, field)` pairs exported after `resource_id`.
    pub export_columns: &'static [(&'static str, &'static str)],
}

impl CatalogEntry {
    /// The lookup for a match field, if this resource supports it.
    #[must_use]
    pub fn lookup(&self, field: MatchField) -> Option<&Lookup> {
        self.lookups.iter().find(|l| l.field == field)
    }
}

/// The immutable resource type catalog.
#[derive(Debug, Clone)]
pub struct ResourceTypeCatalog {
    product: CatalogEntry,
    product_variant: CatalogEntry,
    collection: CatalogEntry,
    customer: CatalogEntry,
    order: CatalogEntry,
    company: CatalogEntry,
    company_location: CatalogEntry,
    location: CatalogEntry,
    page: CatalogEntry,
    blog: CatalogEntry,
    blog_post: CatalogEntry,
    market: CatalogEntry,
}

impl Default for ResourceTypeCatalog {
    fn default() -> Self {
        Self::new()
    }
}

impl ResourceTypeCatalog {
    /// Build the catalog for every supported resource type.
    #[must_use]
    pub fn new() -> Self {
        Self {
            product: product(),
            product_variant: product_variant(),
            collection: collection(),
            customer: customer(),
            order: order(),
            company: company(),
            company_location: company_location(),
            location: location(),
            page: page(),
            blog: blog(),
            blog_post: blog_post(),
            market: market(),
        }
    }

    /// The entry for a resource type.
    #[must_use]
    pub const fn entry(&self, resource_type: ResourceType) -> &CatalogEntry {
        match resource_type {
            ResourceType::Product => &self.product,
            ResourceType::ProductVariant => &self.product_variant,
            ResourceType::Collection => &self.collection,
            ResourceType::Customer => &self.customer,
            ResourceType::Order => &self.order,
            ResourceType::Company => &self.company,
            ResourceType::CompanyLocation => &self.company_location,
            ResourceType::Location => &self.location,
            ResourceType::Page => &self.page,
            ResourceType::Blog => &self.blog,
            ResourceType::BlogPost => &self.blog_post,
            ResourceType::Market => &self.market,
        }
    }

    /// The resource type and match field used to resolve a reference value.
    #[must_use]
    pub const fn reference_lookup(kind: ReferenceKind) -> (ResourceType, MatchField) {
        let field = match kind {
            ReferenceKind::Product
            | ReferenceKind::Collection
            | ReferenceKind::Page
            | ReferenceKind::Article => MatchField::Handle,
            ReferenceKind::Variant => MatchField::Sku,
            ReferenceKind::Customer => MatchField::Email,
            ReferenceKind::Order => MatchField::Name,
            ReferenceKind::Company => MatchField::ExternalId,
        };
        (kind.resource_type(), field)
    }
}

// =============================================================================
// Entries
// =============================================================================

fn product() -> CatalogEntry {
    CatalogEntry {
        resource_type: ResourceType::Product,
        connection: "products",
        lookups: vec![
            Lookup {
                field: MatchField::Handle,
                operation: Operation::new(
                    "ProductByHandle",
                    "query ProductByHandle($value: String!) { productByIdentifier(identifier: { handle: $value }) { id } }",
                ),
                filter: Filter::Direct,
                id_pointer: "/productByIdentifier/id",
            },
            Lookup {
                field: MatchField::Sku,
                operation: search_document!("ProductBySku", "productVariants", "product { id }"),
                filter: Filter::Search("sku"),
                id_pointer: "/productVariants/edges/0/node/product/id",
            },
        ],
        count: count_document!("CountProducts", "productsCount"),
        count_pointer: "/productsCount/count",
        scan_ids: scan_ids_document!("ScanProductIds", "products"),
        scan_tags: Some(tag_scan_document!("ScanProductTags", "products")),
        export: export_document!("ExportProducts", "products", "title handle tags"),
        export_columns: &[("title", "title"), ("handle", "handle")],
    }
}

fn product_variant() -> CatalogEntry {
    CatalogEntry {
        resource_type: ResourceType::ProductVariant,
        connection: "productVariants",
        lookups: vec![Lookup {
            field: MatchField::Sku,
            operation: search_document!("VariantBySku", "productVariants", "id"),
            filter: Filter::Search("sku"),
            id_pointer: "/productVariants/edges/0/node/id",
        }],
        count: count_document!("CountProductVariants", "productVariantsCount"),
        count_pointer: "/productVariantsCount/count",
        scan_ids: scan_ids_document!("ScanProductVariantIds", "productVariants"),
        scan_tags: None,
        export: export_document!("ExportProductVariants", "productVariants", "sku title"),
        export_columns: &[("sku", "sku"), ("title", "title")],
    }
}

fn collection() -> CatalogEntry {
    CatalogEntry {
        resource_type: ResourceType::Collection,
        connection: "collections",
        lookups: vec![Lookup {
            field: MatchField::Handle,
            operation: Operation::new(
                "CollectionByHandle",
                "query CollectionByHandle($value: String!) { collectionByIdentifier(identifier: { handle: $value }) { id } }",
            ),
            filter: Filter::Direct,
            id_pointer: "/collectionByIdentifier/id",
        }],
        count: count_document!("CountCollections", "collectionsCount"),
        count_pointer: "/collectionsCount/count",
        scan_ids: scan_ids_document!("ScanCollectionIds", "collections"),
        scan_tags: None,
        export: export_document!("ExportCollections", "collections", "title handle"),
        export_columns: &[("title", "title"), ("handle", "handle")],
    }
}

fn customer() -> CatalogEntry {
    CatalogEntry {
        resource_type: ResourceType::Customer,
        connection: "customers",
        lookups: vec![Lookup {
            field: MatchField::Email,
            operation: search_document!("CustomerByEmail", "customers", "id"),
            filter: Filter::Search("email"),
            id_pointer: "/customers/edges/0/node/id",
        }],
        count: count_document!("CountCustomers", "customersCount"),
        count_pointer: "/customersCount/count",
        scan_ids: scan_ids_document!("ScanCustomerIds", "customers"),
        scan_tags: Some(tag_scan_document!("ScanCustomerTags", "customers")),
        export: export_document!("ExportCustomers", "customers", "firstName lastName email tags"),
        export_columns: &[
            ("first_name", "firstName"),
            ("last_name", "lastName"),
            ("email", "email"),
        ],
    }
}

fn order() -> CatalogEntry {
    CatalogEntry {
        resource_type: ResourceType::Order,
        connection: "orders",
        lookups: vec![Lookup {
            field: MatchField::Name,
            operation: search_document!("OrderByName", "orders", "id"),
            filter: Filter::Search("name"),
            id_pointer: "/orders/edges/0/node/id",
        }],
        count: count_document!("CountOrders", "ordersCount"),
        count_pointer: "/ordersCount/count",
        scan_ids: scan_ids_document!("ScanOrderIds", "orders"),
        scan_tags: Some(tag_scan_document!("ScanOrderTags", "orders")),
        export: export_document!("ExportOrders", "orders", "name tags"),
        export_columns: &[("order_name", "name")],
    }
}

fn company() -> CatalogEntry {
    CatalogEntry {
        resource_type: ResourceType::Company,
        connection: "companies",
        lookups: vec![Lookup {
            field: MatchField::ExternalId,
            operation: search_document!("CompanyByExternalId", "companies", "id"),
            filter: Filter::Search("external_id"),
            id_pointer: "/companies/edges/0/node/id",
        }],
        count: count_document!("CountCompanies", "companiesCount"),
        count_pointer: "/companiesCount/count",
        scan_ids: scan_ids_document!("ScanCompanyIds", "companies"),
        scan_tags: None,
        export: export_document!("ExportCompanies", "companies", "name externalId"),
        export_columns: &[("name", "name"), ("external_id", "externalId")],
    }
}

fn company_location() -> CatalogEntry {
    CatalogEntry {
        resource_type: ResourceType::CompanyLocation,
        connection: "companyLocations",
        lookups: vec![Lookup {
            field: MatchField::ExternalId,
            operation: search_document!(
                "CompanyLocationByExternalId",
                "companyLocations",
                "id"
            ),
            filter: Filter::Search("external_id"),
            id_pointer: "/companyLocations/edges/0/node/id",
        }],
        count: count_document!("CountCompanyLocations", "companyLocationsCount"),
        count_pointer: "/companyLocationsCount/count",
        scan_ids: scan_ids_document!("ScanCompanyLocationIds", "companyLocations"),
        scan_tags: None,
        export: export_document!(
            "ExportCompanyLocations",
            "companyLocations",
            "name externalId"
        ),
        export_columns: &[("name", "name"), ("external_id", "externalId")],
    }
}

fn location() -> CatalogEntry {
    CatalogEntry {
        resource_type: ResourceType::Location,
        connection: "locations",
        lookups: vec![Lookup {
            field: MatchField::Name,
            operation: search_document!("LocationByName", "locations", "id"),
            filter: Filter::Search("name"),
            id_pointer: "/locations/edges/0/node/id",
        }],
        count: count_document!("CountLocations", "locationsCount"),
        count_pointer: "/locationsCount/count",
        scan_ids: scan_ids_document!("ScanLocationIds", "locations"),
        scan_tags: None,
        export: export_document!("ExportLocations", "locations", "name"),
        export_columns: &[("name", "name")],
    }
}

fn page() -> CatalogEntry {
    CatalogEntry {
        resource_type: ResourceType::Page,
        connection: "pages",
        lookups: vec![Lookup {
            field: MatchField::Handle,
            operation: search_document!("PageByHandle", "pages", "id"),
            filter: Filter::Search("handle"),
            id_pointer: "/pages/edges/0/node/id",
        }],
        count: count_document!("CountPages", "pagesCount"),
        count_pointer: "/pagesCount/count",
        scan_ids: scan_ids_document!("ScanPageIds", "pages"),
        scan_tags: None,
        export: export_document!("ExportPages", "pages", "title handle"),
        export_columns: &[("title", "title"), ("handle", "handle")],
    }
}

fn blog() -> CatalogEntry {
    CatalogEntry {
        resource_type: ResourceType::Blog,
        connection: "blogs",
        lookups: vec![Lookup {
            field: MatchField::Handle,
            operation: search_document!("BlogByHandle", "blogs", "id"),
            filter: Filter::Search("handle"),
            id_pointer: "/blogs/edges/0/node/id",
        }],
        count: count_document!("CountBlogs", "blogsCount"),
        count_pointer: "/blogsCount/count",
        scan_ids: scan_ids_document!("ScanBlogIds", "blogs"),
        scan_tags: None,
        export: export_document!("ExportBlogs", "blogs", "title handle"),
        export_columns: &[("title", "title"), ("handle", "handle")],
    }
}

fn blog_post() -> CatalogEntry {
    CatalogEntry {
        resource_type: ResourceType::BlogPost,
        connection: "articles",
        lookups: vec![Lookup {
            field: MatchField::Handle,
            operation: search_document!("ArticleByHandle", "articles", "id"),
            filter: Filter::Search("handle"),
            id_pointer: "/articles/edges/0/node/id",
        }],
        count: count_document!("CountArticles", "articlesCount"),
        count_pointer: "/articlesCount/count",
        scan_ids: scan_ids_document!("ScanArticleIds", "articles"),
        scan_tags: Some(tag_scan_document!("ScanArticleTags", "articles")),
        export: export_document!("ExportArticles", "articles", "title handle tags"),
        export_columns: &[("title", "title"), ("handle", "handle")],
    }
}

fn market() -> CatalogEntry {
    CatalogEntry {
        resource_type: ResourceType::Market,
        connection: "markets",
        lookups: vec![Lookup {
            field: MatchField::Name,
            operation: search_document!("MarketByName", "markets", "id"),
            filter: Filter::Search("name"),
            id_pointer: "/markets/edges/0/node/id",
        }],
        count: count_document!("CountMarkets", "marketsCount"),
        count_pointer: "/marketsCount/count",
        scan_ids: scan_ids_document!("ScanMarketIds", "markets"),
        scan_tags: None,
        export: export_document!("ExportMarkets", "markets", "name"),
        export_columns: &[("name", "name")],
    }
}

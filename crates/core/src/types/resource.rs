//! Store resource types and the identifier fields used to match them.

use core::fmt;

use serde::{Deserialize, Serialize};

/// A store resource type that can carry metafields (and sometimes tags).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ResourceType {
    Product,
    #[serde(alias = "variant", alias = "product_variant")]
    ProductVariant,
    Collection,
    Customer,
    Order,
    Company,
    #[serde(alias = "company_location")]
    CompanyLocation,
    Location,
    Page,
    Blog,
    #[serde(alias = "article", alias = "blog_post")]
    BlogPost,
    Market,
}

impl ResourceType {
    /// Every supported resource type.
    pub const ALL: [Self; 12] = [
        Self::Product,
        Self::ProductVariant,
        Self::Collection,
        Self::Customer,
        Self::Order,
        Self::Company,
        Self::CompanyLocation,
        Self::Location,
        Self::Page,
        Self::Blog,
        Self::BlogPost,
        Self::Market,
    ];

    /// The identifier used in requests and history records.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Product => "product",
            Self::ProductVariant => "productVariant",
            Self::Collection => "collection",
            Self::Customer => "customer",
            Self::Order => "order",
            Self::Company => "company",
            Self::CompanyLocation => "companyLocation",
            Self::Location => "location",
            Self::Page => "page",
            Self::Blog => "blog",
            Self::BlogPost => "blogPost",
            Self::Market => "market",
        }
    }

    /// The type segment of this resource's GIDs.
    #[must_use]
    pub const fn gid_type(self) -> &'static str {
        match self {
            Self::Product => "Product",
            Self::ProductVariant => "ProductVariant",
            Self::Collection => "Collection",
            Self::Customer => "Customer",
            Self::Order => "Order",
            Self::Company => "Company",
            Self::CompanyLocation => "CompanyLocation",
            Self::Location => "Location",
            Self::Page => "Page",
            Self::Blog => "Blog",
            Self::BlogPost => "Article",
            Self::Market => "Market",
        }
    }

    /// The `MetafieldOwnerType` enum value for this resource.
    #[must_use]
    pub const fn owner_type(self) -> &'static str {
        match self {
            Self::Product => "PRODUCT",
            Self::ProductVariant => "PRODUCTVARIANT",
            Self::Collection => "COLLECTION",
            Self::Customer => "CUSTOMER",
            Self::Order => "ORDER",
            Self::Company => "COMPANY",
            Self::CompanyLocation => "COMPANY_LOCATION",
            Self::Location => "LOCATION",
            Self::Page => "PAGE",
            Self::Blog => "BLOG",
            Self::BlogPost => "ARTICLE",
            Self::Market => "MARKET",
        }
    }

    /// Whether the resource implements Shopify's `Taggable` interface.
    #[must_use]
    pub const fn supports_tags(self) -> bool {
        matches!(
            self,
            Self::Product | Self::Customer | Self::Order | Self::BlogPost
        )
    }

    /// The match field a CSV is expected to use when none is given.
    ///
    /// Products are matched by handle for metafield work and by SKU for tag
    /// work, since tag sheets are usually exported from inventory tools.
    #[must_use]
    pub const fn default_match_field(self, for_tags: bool) -> MatchField {
        match self {
            Self::Product if for_tags => MatchField::Sku,
            Self::Product
            | Self::Collection
            | Self::Page
            | Self::Blog
            | Self::BlogPost => MatchField::Handle,
            Self::ProductVariant => MatchField::Sku,
            Self::Customer => MatchField::Email,
            Self::Order | Self::Location | Self::Market => MatchField::Name,
            Self::Company | Self::CompanyLocation => MatchField::ExternalId,
        }
    }

    /// Resolve a resource type from a GID type segment.
    #[must_use]
    pub fn from_gid_type(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.gid_type() == name)
    }
}

impl fmt::Display for ResourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ResourceType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "product" => Ok(Self::Product),
            "productVariant" | "variant" | "product_variant" => Ok(Self::ProductVariant),
            "collection" => Ok(Self::Collection),
            "customer" => Ok(Self::Customer),
            "order" => Ok(Self::Order),
            "company" => Ok(Self::Company),
            "companyLocation" | "company_location" => Ok(Self::CompanyLocation),
            "location" => Ok(Self::Location),
            "page" => Ok(Self::Page),
            "blog" => Ok(Self::Blog),
            "blogPost" | "article" | "blog_post" => Ok(Self::BlogPost),
            "market" => Ok(Self::Market),
            _ => Err(format!("invalid resource type: {s}")),
        }
    }
}

/// The CSV column used to identify a resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MatchField {
    /// The value is a GID.
    Id,
    Sku,
    Email,
    Name,
    Handle,
    #[serde(rename = "External_ID")]
    ExternalId,
}

impl MatchField {
    /// The CSV header text for this field.
    #[must_use]
    pub const fn header(self) -> &'static str {
        match self {
            Self::Id => "Id",
            Self::Sku => "Sku",
            Self::Email => "Email",
            Self::Name => "Name",
            Self::Handle => "Handle",
            Self::ExternalId => "External_ID",
        }
    }

    /// Match a CSV header, ignoring case and surrounding whitespace.
    #[must_use]
    pub fn from_header(header: &str) -> Option<Self> {
        let header = header.trim();
        [
            Self::Id,
            Self::Sku,
            Self::Email,
            Self::Name,
            Self::Handle,
            Self::ExternalId,
        ]
        .into_iter()
        .find(|f| f.header().eq_ignore_ascii_case(header))
    }
}

impl fmt::Display for MatchField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.header())
    }
}

impl std::str::FromStr for MatchField {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_header(s).ok_or_else(|| format!("invalid match field: {s}"))
    }
}

//! Metafield type system.
//!
//! Shopify encodes a metafield's type as a string such as
//! `single_line_text_field`, `product_reference` or
//! `list.metaobject_reference`. [`MetafieldType`] parses that string once into
//! a tagged union so value handling can `match` on it instead of comparing
//! strings.

use core::fmt;

use serde::{Deserialize, Serialize};

use super::ResourceType;

/// Scalar (non-reference) metafield value kinds.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ScalarKind {
    SingleLineText,
    MultiLineText,
    RichText,
    NumberInteger,
    NumberDecimal,
    Boolean,
    Date,
    DateTime,
    Money,
    Url,
    Json,
    Link,
    Color,
    Rating,
    Weight,
    Volume,
    Dimension,
    /// Any type name this crate does not model; values pass through untouched.
    Other(String),
}

impl ScalarKind {
    fn parse(name: &str) -> Self {
        match name {
            "single_line_text_field" => Self::SingleLineText,
            "multi_line_text_field" => Self::MultiLineText,
            "rich_text_field" => Self::RichText,
            "number_integer" => Self::NumberInteger,
            "number_decimal" => Self::NumberDecimal,
            "boolean" => Self::Boolean,
            "date" => Self::Date,
            "date_time" => Self::DateTime,
            "money" => Self::Money,
            "url" => Self::Url,
            "json" => Self::Json,
            "link" => Self::Link,
            "color" => Self::Color,
            "rating" => Self::Rating,
            "weight" => Self::Weight,
            "volume" => Self::Volume,
            "dimension" => Self::Dimension,
            other => Self::Other(other.to_string()),
        }
    }

    /// The Shopify type name.
    #[must_use]
    pub fn name(&self) -> &str {
        match self {
            Self::SingleLineText => "single_line_text_field",
            Self::MultiLineText => "multi_line_text_field",
            Self::RichText => "rich_text_field",
            Self::NumberInteger => "number_integer",
            Self::NumberDecimal => "number_decimal",
            Self::Boolean => "boolean",
            Self::Date => "date",
            Self::DateTime => "date_time",
            Self::Money => "money",
            Self::Url => "url",
            Self::Json => "json",
            Self::Link => "link",
            Self::Color => "color",
            Self::Rating => "rating",
            Self::Weight => "weight",
            Self::Volume => "volume",
            Self::Dimension => "dimension",
            Self::Other(name) => name,
        }
    }
}

/// Metafield reference kinds that point at built-in store resources.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReferenceKind {
    Product,
    Variant,
    Collection,
    Customer,
    Order,
    Page,
    Article,
    Company,
}

impl ReferenceKind {
    const ALL: [Self; 8] = [
        Self::Product,
        Self::Variant,
        Self::Collection,
        Self::Customer,
        Self::Order,
        Self::Page,
        Self::Article,
        Self::Company,
    ];

    /// Short label used in type names and error messages.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Product => "product",
            Self::Variant => "variant",
            Self::Collection => "collection",
            Self::Customer => "customer",
            Self::Order => "order",
            Self::Page => "page",
            Self::Article => "article",
            Self::Company => "company",
        }
    }

    /// The resource type the reference points at.
    #[must_use]
    pub const fn resource_type(self) -> ResourceType {
        match self {
            Self::Product => ResourceType::Product,
            Self::Variant => ResourceType::ProductVariant,
            Self::Collection => ResourceType::Collection,
            Self::Customer => ResourceType::Customer,
            Self::Order => ResourceType::Order,
            Self::Page => ResourceType::Page,
            Self::Article => ResourceType::BlogPost,
            Self::Company => ResourceType::Company,
        }
    }

    fn from_type_name(name: &str) -> Option<Self> {
        let label = name.strip_suffix("_reference")?;
        Self::ALL.into_iter().find(|k| k.label() == label)
    }
}

/// The element type of a metafield, ignoring list-ness.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum BaseType {
    Scalar(ScalarKind),
    Reference(ReferenceKind),
    Metaobject,
}

impl BaseType {
    fn parse(name: &str) -> Self {
        if name == "metaobject_reference" {
            return Self::Metaobject;
        }
        ReferenceKind::from_type_name(name)
            .map_or_else(|| Self::Scalar(ScalarKind::parse(name)), Self::Reference)
    }

    /// The Shopify type name, without any `list.` prefix.
    #[must_use]
    pub fn name(&self) -> String {
        match self {
            Self::Scalar(kind) => kind.name().to_string(),
            Self::Reference(kind) => format!("{}_reference", kind.label()),
            Self::Metaobject => "metaobject_reference".to_string(),
        }
    }

    /// Whether the element is a resolvable reference (resource or metaobject).
    #[must_use]
    pub const fn is_reference(&self) -> bool {
        matches!(self, Self::Reference(_) | Self::Metaobject)
    }
}

/// A parsed metafield type.
///
/// ```
/// use tagfield_core::{BaseType, MetafieldType, ReferenceKind};
///
/// let t = MetafieldType::parse("list.product_reference");
/// assert_eq!(t, MetafieldType::List(BaseType::Reference(ReferenceKind::Product)));
/// assert!(t.is_list());
/// assert_eq!(t.to_string(), "list.product_reference");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum MetafieldType {
    Single(BaseType),
    List(BaseType),
}

impl MetafieldType {
    const LIST_PREFIX: &'static str = "list.";

    /// Parse a Shopify type name. Unknown names become [`ScalarKind::Other`].
    #[must_use]
    pub fn parse(name: &str) -> Self {
        let name = name.trim();
        name.strip_prefix(Self::LIST_PREFIX).map_or_else(
            || Self::Single(BaseType::parse(name)),
            |inner| Self::List(BaseType::parse(inner)),
        )
    }

    /// Whether this is a `list.` type.
    #[must_use]
    pub const fn is_list(&self) -> bool {
        matches!(self, Self::List(_))
    }

    /// The element type.
    #[must_use]
    pub const fn base(&self) -> &BaseType {
        match self {
            Self::Single(base) | Self::List(base) => base,
        }
    }
}

impl fmt::Display for MetafieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Single(base) => f.write_str(&base.name()),
            Self::List(base) => write!(f, "{}{}", Self::LIST_PREFIX, base.name()),
        }
    }
}

impl From<String> for MetafieldType {
    fn from(value: String) -> Self {
        Self::parse(&value)
    }
}

impl From<MetafieldType> for String {
    fn from(value: MetafieldType) -> Self {
        value.to_string()
    }
}

/// Identifies one metafield slot and its declared type.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MetafieldDescriptor {
    pub namespace: String,
    pub key: String,
    #[serde(rename = "type")]
    pub metafield_type: MetafieldType,
}

impl MetafieldDescriptor {
    /// Create a descriptor from a namespace, key and Shopify type name.
    #[must_use]
    pub fn new(namespace: impl Into<String>, key: impl Into<String>, type_name: &str) -> Self {
        Self {
            namespace: namespace.into(),
            key: key.into(),
            metafield_type: MetafieldType::parse(type_name),
        }
    }

    /// `namespace.key`, as used in export column headers.
    #[must_use]
    pub fn qualified_key(&self) -> String {
        format!("{}.{}", self.namespace, self.key)
    }
}

/// How an update combines incoming list values with the stored ones.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ListMode {
    /// Union of stored and incoming values, de-duplicated.
    Merge,
    /// Incoming values replace the stored list.
    #[default]
    Replace,
}

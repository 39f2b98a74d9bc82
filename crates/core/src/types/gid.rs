//! Shopify global identifier type.

use core::fmt;

use serde::{Deserialize, Serialize};

/// Errors that can occur when parsing a [`Gid`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum GidError {
    /// The input does not start with `gid://shopify/`.
    #[error("not a Shopify GID: {0}")]
    NotAGid(String),
    /// The type segment is empty.
    #[error("GID has no resource type: {0}")]
    MissingType(String),
    /// The id segment is empty or not numeric.
    #[error("GID has an invalid id segment: {0}")]
    InvalidId(String),
}

/// A Shopify global identifier, e.g. `gid://shopify/Product/123`.
///
/// ## Examples
///
/// ```
/// use tagfield_core::Gid;
///
/// let gid = Gid::parse("gid://shopify/Product/123").unwrap();
/// assert_eq!(gid.resource_name(), "Product");
/// assert_eq!(gid.numeric_id(), 123);
///
/// assert!(Gid::parse("my-handle").is_err());
/// assert!(Gid::parse("gid://shopify/Product/abc").is_err());
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(try_from = "String", into = "String")]
pub struct Gid {
    raw: String,
    numeric: u64,
    type_end: usize,
}

impl Gid {
    /// Prefix shared by every Shopify GID.
    pub const PREFIX: &'static str = "gid://shopify/";

    /// Parse a GID.
    ///
    /// Query strings (`?inventory_item=...`) are not accepted; the id segment
    /// must be all digits.
    ///
    /// # Errors
    ///
    /// Returns an error if the prefix, type, or numeric id is missing.
    pub fn parse(s: &str) -> Result<Self, GidError> {
        let s = s.trim();
        let rest = s
            .strip_prefix(Self::PREFIX)
            .ok_or_else(|| GidError::NotAGid(s.to_string()))?;

        let (type_name, id) = rest
            .split_once('/')
            .ok_or_else(|| GidError::InvalidId(s.to_string()))?;

        if type_name.is_empty() {
            return Err(GidError::MissingType(s.to_string()));
        }
        if id.is_empty() || !id.bytes().all(|b| b.is_ascii_digit()) {
            return Err(GidError::InvalidId(s.to_string()));
        }

        let numeric = id
            .parse::<u64>()
            .map_err(|_| GidError::InvalidId(s.to_string()))?;

        Ok(Self {
            raw: s.to_string(),
            numeric,
            type_end: Self::PREFIX.len() + type_name.len(),
        })
    }

    /// Whether a string looks like a GID at all (prefix check only).
    #[must_use]
    pub fn looks_like_gid(s: &str) -> bool {
        s.trim().starts_with(Self::PREFIX)
    }

    /// Build a GID from a resource name and numeric id.
    #[must_use]
    pub fn new(resource_name: &str, id: u64) -> Self {
        let raw = format!("{}{resource_name}/{id}", Self::PREFIX);
        Self {
            type_end: Self::PREFIX.len() + resource_name.len(),
            raw,
            numeric: id,
        }
    }

    /// The encoded resource name, e.g. `ProductVariant`.
    #[must_use]
    pub fn resource_name(&self) -> &str {
        self.raw
            .get(Self::PREFIX.len()..self.type_end)
            .unwrap_or_default()
    }

    /// The numeric id segment.
    #[must_use]
    pub const fn numeric_id(&self) -> u64 {
        self.numeric
    }

    /// Whether this GID encodes the given resource name.
    #[must_use]
    pub fn is_type(&self, resource_name: &str) -> bool {
        self.resource_name() == resource_name
    }

    /// Get the GID as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.raw
    }
}

impl fmt::Display for Gid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

impl AsRef<str> for Gid {
    fn as_ref(&self) -> &str {
        &self.raw
    }
}

impl TryFrom<String> for Gid {
    type Error = GidError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<Gid> for String {
    fn from(gid: Gid) -> Self {
        gid.raw
    }
}

impl std::str::FromStr for Gid {
    type Err = GidError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

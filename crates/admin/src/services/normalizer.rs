//! Metafield value normalization.
//!
//! Converts the raw value from a CSV cell (or API body) into the wire value
//! Shopify expects for the metafield's declared type. Scalars are validated
//! and canonicalized, references are resolved to GIDs and lists are encoded
//! as JSON arrays, optionally merged with the stored list.
//!
//! Normalization only ever reads from Shopify.

use core::fmt;

use serde::Deserialize;
use serde_json::{Value, json};
use tagfield_core::{
    BaseType, FailureKind, Gid, ListMode, MetafieldDescriptor, MetafieldType, ReferenceKind,
    ResourceType, ScalarKind,
};
use thiserror::Error;
use tracing::{debug, instrument};

use super::{ResolveError, Resolver, failure_kind};
use crate::shopify::{AdminClient, AdminShopifyError, ResourceTypeCatalog};

/// Validation key holding a metaobject reference's definition GID.
const METAOBJECT_DEFINITION_VALIDATION: &str = "metaobject_definition_id";

/// Why a value could not be normalized.
#[derive(Debug, Error)]
pub enum NormalizeError {
    #[error("Value is empty: {0}")]
    Empty(String),

    #[error("Invalid integer")]
    InvalidInteger,

    #[error("Invalid decimal")]
    InvalidDecimal,

    #[error("Invalid boolean")]
    InvalidBoolean,

    #[error("Invalid URL")]
    InvalidUrl,

    #[error("Invalid JSON")]
    InvalidJson,

    #[error("Invalid link value")]
    InvalidLink,

    #[error("Could not find {kind} for: {value}")]
    ReferenceNotFound { kind: &'static str, value: String },

    #[error("Could not resolve metaobject reference: {0}")]
    MetaobjectNotFound(String),

    /// A list element that is a reference could not be resolved.
    #[error("Could not resolve {kind} reference: {item}")]
    ListReference { kind: &'static str, item: String },

    #[error("Existing metafield value is not a valid list")]
    NotAList,

    #[error("None of the provided IDs exist in the metafield")]
    NothingToRemove,

    #[error("Metafield does not exist on {0}")]
    Absent(ResourceType),

    #[error(transparent)]
    Resolve(#[from] ResolveError),

    #[error("Lookup failed: {0}")]
    Upstream(#[from] AdminShopifyError),
}

impl NormalizeError {
    /// Failure kind for a per-row result.
    #[must_use]
    pub const fn kind(&self) -> FailureKind {
        match self {
            Self::ReferenceNotFound { .. }
            | Self::MetaobjectNotFound(_)
            | Self::ListReference { .. } => FailureKind::Resolution,
            Self::Resolve(e) => e.kind(),
            Self::Upstream(e) => failure_kind(e),
            _ => FailureKind::Validation,
        }
    }
}

/// A raw incoming value: one string, or an already-split list.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum RawValue {
    Items(Vec<String>),
    Text(String),
}

impl RawValue {
    /// The value as a single string; lists are joined with `, `.
    #[must_use]
    pub fn text(&self) -> String {
        match self {
            Self::Text(s) => s.clone(),
            Self::Items(items) => items.join(", "),
        }
    }

    /// The value as list elements.
    ///
    /// Text is read as a JSON array when it looks like one, otherwise split
    /// on commas. Blank elements are dropped.
    #[must_use]
    pub fn items(&self) -> Vec<String> {
        let items = match self {
            Self::Items(items) => items.clone(),
            Self::Text(s) => {
                let trimmed = s.trim();
                match serde_json::from_str::<Vec<Value>>(trimmed) {
                    Ok(values) if trimmed.starts_with('[') => values.iter().map(value_text).collect(),
                    _ => trimmed.split(',').map(str::to_string).collect(),
                }
            }
        };
        items
            .into_iter()
            .map(|item| item.trim().to_string())
            .filter(|item| !item.is_empty())
            .collect()
    }

    /// Whether there is nothing but whitespace.
    #[must_use]
    pub fn is_blank(&self) -> bool {
        match self {
            Self::Text(s) => s.trim().is_empty(),
            Self::Items(items) => items.iter().all(|i| i.trim().is_empty()),
        }
    }
}

impl fmt::Display for RawValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text())
    }
}

impl From<&str> for RawValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for RawValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<Vec<String>> for RawValue {
    fn from(value: Vec<String>) -> Self {
        Self::Items(value)
    }
}

fn value_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn is_http_url(value: &str) -> bool {
    url::Url::parse(value.trim()).is_ok_and(|u| matches!(u.scheme(), "http" | "https"))
}

fn normalize_link(value: &str) -> Result<String, NormalizeError> {
    if value.starts_with('{') {
        return Ok(value.to_string());
    }
    if is_http_url(value) {
        return Ok(json!({ "text": "View", "url": value }).to_string());
    }
    match value.split_once('|') {
        Some((link_type, id)) if id.trim().starts_with("gid://") => {
            Ok(json!({ "type": link_type.trim(), "id": id.trim() }).to_string())
        }
        _ => Err(NormalizeError::InvalidLink),
    }
}

/// Validate and canonicalize one scalar value.
///
/// # Errors
///
/// Returns the type's validation error, or `Empty` for blank input.
pub fn normalize_scalar(kind: &ScalarKind, raw: &str) -> Result<String, NormalizeError> {
    let value = raw.trim();
    if value.is_empty() {
        return Err(NormalizeError::Empty(raw.to_string()));
    }

    match kind {
        ScalarKind::NumberInteger => value
            .parse::<i64>()
            .map(|_| value.to_string())
            .map_err(|_| NormalizeError::InvalidInteger),
        ScalarKind::NumberDecimal => value
            .parse::<f64>()
            .ok()
            .filter(|n| n.is_finite())
            .map(|_| value.to_string())
            .ok_or(NormalizeError::InvalidDecimal),
        ScalarKind::Boolean => {
            if value.eq_ignore_ascii_case("true") {
                Ok("true".to_string())
            } else if value.eq_ignore_ascii_case("false") {
                Ok("false".to_string())
            } else {
                Err(NormalizeError::InvalidBoolean)
            }
        }
        ScalarKind::DateTime if !value.contains('T') => Ok(format!("{value}T00:00:00Z")),
        ScalarKind::Url if !is_http_url(value) => Err(NormalizeError::InvalidUrl),
        ScalarKind::Json => serde_json::from_str::<Value>(value)
            .map(|_| value.to_string())
            .map_err(|_| NormalizeError::InvalidJson),
        ScalarKind::Link => normalize_link(value),
        ScalarKind::MultiLineText => Ok(value.replace("\\n", "\n")),
        _ => Ok(value.to_string()),
    }
}

/// Parse a stored list value. An empty string is an empty list.
///
/// # Errors
///
/// Returns `NotAList` when the stored value is not a JSON array.
pub fn parse_list(raw: &str) -> Result<Vec<String>, NormalizeError> {
    if raw.trim().is_empty() {
        return Ok(Vec::new());
    }
    serde_json::from_str::<Vec<Value>>(raw)
        .map(|values| values.iter().map(value_text).collect())
        .map_err(|_| NormalizeError::NotAList)
}

/// Parse a list value read back from a history record.
///
/// Older records hold comma-separated text instead of a JSON array. Items
/// are trimmed and blanks dropped.
///
/// # Errors
///
/// Returns `NotAList` when the value looks like a JSON array but is not one.
pub fn parse_recorded_list(raw: &str) -> Result<Vec<String>, NormalizeError> {
    let trimmed = raw.trim();
    let items = if trimmed.starts_with('[') {
        parse_list(trimmed)?
    } else {
        trimmed.split(',').map(str::to_string).collect()
    };
    Ok(items
        .iter()
        .map(|item| item.trim())
        .filter(|item| !item.is_empty())
        .map(str::to_string)
        .collect())
}

/// Encode a list as the JSON array string Shopify stores.
#[must_use]
pub fn encode_list(items: Vec<String>) -> String {
    Value::from(items).to_string()
}

/// Union of two lists, keeping the first occurrence of each value.
#[must_use]
pub fn merge_unique(existing: Vec<String>, incoming: Vec<String>) -> Vec<String> {
    let mut merged: Vec<String> = Vec::with_capacity(existing.len() + incoming.len());
    for item in existing.into_iter().chain(incoming) {
        if !merged.contains(&item) {
            merged.push(item);
        }
    }
    merged
}

/// A normalized update.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Normalized {
    /// The wire value to store.
    pub value: String,
    /// What the history ledger records: the value itself for single types,
    /// the newly added elements for lists.
    pub recorded: String,
}

/// What to do with a list after removing some values from it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemovalPlan {
    /// Store the remainder (a JSON array string).
    Set { value: String, removed: Vec<String> },
    /// Nothing remains; delete the metafield.
    Delete { removed: Vec<String> },
}

impl RemovalPlan {
    /// The values that will actually be removed.
    #[must_use]
    pub fn removed(&self) -> &[String] {
        match self {
            Self::Set { removed, .. } | Self::Delete { removed } => removed,
        }
    }
}

/// Plan `existing - requested`.
///
/// # Errors
///
/// Returns `Absent` when there is no stored list and `NothingToRemove` when
/// none of the requested values are stored.
pub fn plan_removal(
    existing: Option<Vec<String>>,
    requested: &[String],
    resource_type: ResourceType,
) -> Result<RemovalPlan, NormalizeError> {
    let existing = existing.ok_or(NormalizeError::Absent(resource_type))?;

    let mut removed: Vec<String> = Vec::new();
    for item in requested {
        if existing.contains(item) && !removed.contains(item) {
            removed.push(item.clone());
        }
    }
    if removed.is_empty() {
        return Err(NormalizeError::NothingToRemove);
    }

    let remainder: Vec<String> = existing
        .into_iter()
        .filter(|v| !removed.contains(v))
        .collect();
    if remainder.is_empty() {
        Ok(RemovalPlan::Delete { removed })
    } else {
        Ok(RemovalPlan::Set {
            value: encode_list(remainder),
            removed,
        })
    }
}

const fn reference_label(base: &BaseType) -> Option<&'static str> {
    match base {
        BaseType::Reference(kind) => Some(kind.label()),
        BaseType::Metaobject => Some("metaobject"),
        BaseType::Scalar(_) => None,
    }
}

/// Normalizes raw values against metafield types.
#[derive(Clone)]
pub struct Normalizer {
    client: AdminClient,
    resolver: Resolver,
}

impl Normalizer {
    #[must_use]
    pub const fn new(client: AdminClient, resolver: Resolver) -> Self {
        Self { client, resolver }
    }

    /// Normalize `raw` into the wire value for `descriptor`.
    ///
    /// With [`ListMode::Merge`], list values are unioned with the value
    /// currently stored on `owner`.
    ///
    /// # Errors
    ///
    /// Returns a validation, resolution or upstream error; see
    /// [`NormalizeError::kind`].
    #[instrument(skip(self, owner, descriptor, raw), fields(owner = %owner, key = %descriptor.qualified_key()))]
    pub async fn normalize(
        &self,
        owner: &Gid,
        owner_type: ResourceType,
        descriptor: &MetafieldDescriptor,
        raw: &RawValue,
        mode: ListMode,
    ) -> Result<Normalized, NormalizeError> {
        if raw.is_blank() {
            return Err(NormalizeError::Empty(raw.text()));
        }

        let mut metaobject_type = None;
        match &descriptor.metafield_type {
            MetafieldType::Single(base) => {
                let value = self
                    .element(owner_type, descriptor, base, &raw.text(), &mut metaobject_type)
                    .await?;
                Ok(Normalized {
                    recorded: value.clone(),
                    value,
                })
            }
            MetafieldType::List(base) => {
                let incoming = self
                    .elements(owner_type, descriptor, base, &raw.items(), &mut metaobject_type)
                    .await?;
                let (items, added) = match mode {
                    ListMode::Replace => (incoming.clone(), incoming),
                    ListMode::Merge => {
                        let existing = self
                            .existing_list(owner, descriptor)
                            .await?
                            .unwrap_or_default();
                        let added = incoming
                            .iter()
                            .filter(|v| !existing.contains(v))
                            .cloned()
                            .collect();
                        (merge_unique(existing, incoming), added)
                    }
                };
                Ok(Normalized {
                    value: encode_list(items),
                    recorded: encode_list(added),
                })
            }
        }
    }

    /// Resolve the requested values and plan their removal from the stored list.
    ///
    /// # Errors
    ///
    /// See [`plan_removal`]; element resolution errors are also returned.
    #[instrument(skip(self, owner, descriptor, raw), fields(owner = %owner, key = %descriptor.qualified_key()))]
    pub async fn plan_list_removal(
        &self,
        owner: &Gid,
        owner_type: ResourceType,
        descriptor: &MetafieldDescriptor,
        raw: &RawValue,
    ) -> Result<RemovalPlan, NormalizeError> {
        if raw.is_blank() {
            return Err(NormalizeError::Empty(raw.text()));
        }
        let mut metaobject_type = None;
        let requested = self
            .elements(
                owner_type,
                descriptor,
                descriptor.metafield_type.base(),
                &raw.items(),
                &mut metaobject_type,
            )
            .await?;
        let existing = self.existing_list(owner, descriptor).await?;
        plan_removal(existing, &requested, owner_type)
    }

    /// The list currently stored on `owner`, or `None` when absent.
    ///
    /// # Errors
    ///
    /// Returns `NotAList` if the stored value is not a JSON array.
    pub async fn existing_list(
        &self,
        owner: &Gid,
        descriptor: &MetafieldDescriptor,
    ) -> Result<Option<Vec<String>>, NormalizeError> {
        let stored = self
            .client
            .get_metafield(owner.as_str(), &descriptor.namespace, &descriptor.key)
            .await?;
        stored.map(|m| parse_list(&m.value)).transpose()
    }

    async fn elements(
        &self,
        owner_type: ResourceType,
        descriptor: &MetafieldDescriptor,
        base: &BaseType,
        items: &[String],
        metaobject_type: &mut Option<String>,
    ) -> Result<Vec<String>, NormalizeError> {
        let mut out = Vec::with_capacity(items.len());
        for item in items {
            let value = self
                .element(owner_type, descriptor, base, item, metaobject_type)
                .await
                .map_err(|e| match (reference_label(base), e) {
                    (_, e @ NormalizeError::Upstream(_)) => e,
                    (Some(kind), _) => NormalizeError::ListReference {
                        kind,
                        item: item.clone(),
                    },
                    (None, e) => e,
                })?;
            if !out.contains(&value) {
                out.push(value);
            }
        }
        Ok(out)
    }

    async fn element(
        &self,
        owner_type: ResourceType,
        descriptor: &MetafieldDescriptor,
        base: &BaseType,
        item: &str,
        metaobject_type: &mut Option<String>,
    ) -> Result<String, NormalizeError> {
        match base {
            BaseType::Scalar(kind) => normalize_scalar(kind, item),
            BaseType::Reference(kind) => self.resolve_reference(*kind, item).await,
            BaseType::Metaobject => {
                self.resolve_metaobject(owner_type, descriptor, item, metaobject_type)
                    .await
            }
        }
    }

    async fn resolve_reference(
        &self,
        kind: ReferenceKind,
        item: &str,
    ) -> Result<String, NormalizeError> {
        let value = item.trim();
        if value.is_empty() {
            return Err(NormalizeError::Empty(item.to_string()));
        }
        let (resource_type, field) = ResourceTypeCatalog::reference_lookup(kind);
        match self.resolver.resolve(resource_type, field, value).await {
            Ok(gid) => Ok(gid.to_string()),
            Err(ResolveError::Upstream { source, .. }) => Err(NormalizeError::Upstream(source)),
            Err(_) => Err(NormalizeError::ReferenceNotFound {
                kind: kind.label(),
                value: value.to_string(),
            }),
        }
    }

    /// Resolve a metaobject reference: GIDs pass through, anything else is
    /// a handle looked up via the metafield definition's metaobject type.
    ///
    /// # Errors
    ///
    /// Returns `MetaobjectNotFound` when any hop is missing.
    pub async fn resolve_metaobject(
        &self,
        owner_type: ResourceType,
        descriptor: &MetafieldDescriptor,
        item: &str,
        metaobject_type: &mut Option<String>,
    ) -> Result<String, NormalizeError> {
        let value = item.trim();
        if value.is_empty() {
            return Err(NormalizeError::Empty(item.to_string()));
        }
        if Gid::parse(value).is_ok_and(|gid| gid.is_type("Metaobject")) {
            return Ok(value.to_string());
        }

        let not_found = || NormalizeError::MetaobjectNotFound(value.to_string());
        let type_name = if let Some(type_name) = metaobject_type.as_ref() {
            type_name.clone()
        } else {
            let type_name = self
                .metaobject_type(owner_type, descriptor)
                .await?
                .ok_or_else(not_found)?;
            *metaobject_type = Some(type_name.clone());
            type_name
        };

        let id = self
            .client
            .metaobject_by_handle(&type_name, value)
            .await?
            .ok_or_else(not_found)?;
        debug!(handle = value, id = %id, "Resolved metaobject handle");
        Ok(id)
    }

    /// Definition validations -> metaobject definition id -> metaobject type.
    async fn metaobject_type(
        &self,
        owner_type: ResourceType,
        descriptor: &MetafieldDescriptor,
    ) -> Result<Option<String>, NormalizeError> {
        let validations = self
            .client
            .metafield_definition_validations(
                owner_type.owner_type(),
                &descriptor.namespace,
                &descriptor.key,
            )
            .await?;
        let Some(definition_id) = validations
            .into_iter()
            .flatten()
            .find(|v| v.name == METAOBJECT_DEFINITION_VALIDATION)
            .and_then(|v| v.value)
        else {
            return Ok(None);
        };
        Ok(self.client.metaobject_definition_type(&definition_id).await?)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::shopify::fake::FakeShop;
    use tagfield_core::MatchField;

    fn normalizer(shop: &Arc<FakeShop>) -> Normalizer {
        let client = shop.client();
        let resolver = Resolver::new(client.clone(), Arc::new(ResourceTypeCatalog::new()));
        Normalizer::new(client, resolver)
    }

    fn scalar(name: &str) -> ScalarKind {
        match MetafieldType::parse(name) {
            MetafieldType::Single(BaseType::Scalar(kind)) => kind,
            other => panic!("not a scalar: {other}"),
        }
    }

    #[test]
    fn test_scalar_validation_messages() {
        let err = normalize_scalar(&scalar("number_integer"), "1.5").unwrap_err();
        assert_eq!(err.to_string(), "Invalid integer");
        assert_eq!(err.kind(), FailureKind::Validation);

        assert_eq!(
            normalize_scalar(&scalar("number_decimal"), "abc").unwrap_err().to_string(),
            "Invalid decimal"
        );
        assert_eq!(
            normalize_scalar(&scalar("url"), "ftp://x").unwrap_err().to_string(),
            "Invalid URL"
        );
        assert_eq!(
            normalize_scalar(&scalar("json"), "{oops").unwrap_err().to_string(),
            "Invalid JSON"
        );
        assert_eq!(
            normalize_scalar(&scalar("single_line_text_field"), "").unwrap_err().to_string(),
            "Value is empty: "
        );
    }

    #[test]
    fn test_scalar_canonical_forms() {
        assert_eq!(normalize_scalar(&scalar("boolean"), "TRUE").unwrap(), "true");
        assert_eq!(normalize_scalar(&scalar("boolean"), "False").unwrap(), "false");
        assert!(normalize_scalar(&scalar("boolean"), "yes").is_err());
        assert_eq!(
            normalize_scalar(&scalar("date_time"), "2024-05-01").unwrap(),
            "2024-05-01T00:00:00Z"
        );
        assert_eq!(
            normalize_scalar(&scalar("date_time"), "2024-05-01T10:00:00Z").unwrap(),
            "2024-05-01T10:00:00Z"
        );
        assert_eq!(
            normalize_scalar(&scalar("multi_line_text_field"), r"line one\nline two").unwrap(),
            "line one\nline two"
        );
        assert_eq!(normalize_scalar(&scalar("color"), " #ff0000 ").unwrap(), "#ff0000");
    }

    #[test]
    fn test_link_values() {
        let link = scalar("link");
        let v: Value =
            serde_json::from_str(&normalize_scalar(&link, "https://example.com").unwrap()).unwrap();
        assert_eq!(v, json!({ "text": "View", "url": "https://example.com" }));

        let v: Value = serde_json::from_str(
            &normalize_scalar(&link, "product | gid://shopify/Product/1").unwrap(),
        )
        .unwrap();
        assert_eq!(v, json!({ "type": "product", "id": "gid://shopify/Product/1" }));

        let object = r#"{"text":"Go","url":"https://a.test"}"#;
        assert_eq!(normalize_scalar(&link, object).unwrap(), object);
        assert_eq!(
            normalize_scalar(&link, "not a link").unwrap_err().to_string(),
            "Invalid link value"
        );
    }

    #[test]
    fn test_raw_value_items() {
        assert_eq!(RawValue::from(r#"["a", "b"]"#).items(), vec!["a", "b"]);
        assert_eq!(RawValue::from("a, b,,c ").items(), vec!["a", "b", "c"]);
        assert_eq!(RawValue::from("[1, 2]").items(), vec!["1", "2"]);
        assert_eq!(
            RawValue::from(vec![" x ".to_string(), String::new()]).items(),
            vec!["x"]
        );
        let raw: RawValue = serde_json::from_value(json!(["a"])).unwrap();
        assert_eq!(raw, RawValue::Items(vec!["a".into()]));
    }

    #[test]
    fn test_merge_unique_keeps_first_occurrence() {
        let merged = merge_unique(
            vec!["a".into(), "b".into()],
            vec!["b".into(), "c".into(), "a".into(), "c".into()],
        );
        assert_eq!(merged, vec!["a", "b", "c"]);
    }

    #[test]
    fn test_merge_unique_is_order_independent_as_a_set() {
        let existing: Vec<String> = vec!["a".into(), "b".into()];
        let incoming: Vec<String> = vec!["c".into(), "b".into(), "d".into(), "c".into()];
        let reversed: Vec<String> = incoming.iter().rev().cloned().collect();

        let forward = merge_unique(existing.clone(), incoming);
        let backward = merge_unique(existing, reversed);

        let as_set = |items: &[String]| items.iter().cloned().collect::<std::collections::BTreeSet<_>>();
        assert_eq!(as_set(&forward), as_set(&backward));
        assert_eq!(forward.len(), 4);
        assert_eq!(backward.len(), 4);
        assert_eq!(&forward[..2], ["a", "b"]);
        assert_eq!(&backward[..2], ["a", "b"]);
    }

    #[test]
    fn test_recorded_lists_accept_json_and_comma_text() {
        assert_eq!(parse_recorded_list(r#"["a", " b ", ""]"#).unwrap(), vec!["a", "b"]);
        assert_eq!(parse_recorded_list("a, b ,,c").unwrap(), vec!["a", "b", "c"]);
        assert!(parse_recorded_list("").unwrap().is_empty());
        assert!(matches!(parse_recorded_list("[oops"), Err(NormalizeError::NotAList)));
    }

    #[test]
    fn test_partial_list_removal() {
        let plan = plan_removal(
            Some(vec!["a".into(), "b".into(), "c".into()]),
            &["b".into(), "x".into()],
            ResourceType::Product,
        )
        .unwrap();
        assert_eq!(plan.removed(), ["b"]);
        assert_eq!(
            plan,
            RemovalPlan::Set {
                value: r#"["a","c"]"#.to_string(),
                removed: vec!["b".into()],
            }
        );
    }

    #[test]
    fn test_removal_edge_cases() {
        let err = plan_removal(Some(vec!["a".into()]), &["x".into()], ResourceType::Product)
            .unwrap_err();
        assert_eq!(err.to_string(), "None of the provided IDs exist in the metafield");

        let err = plan_removal(None, &["a".into()], ResourceType::Customer).unwrap_err();
        assert_eq!(err.to_string(), "Metafield does not exist on customer");

        let plan = plan_removal(Some(vec!["a".into()]), &["a".into()], ResourceType::Product)
            .unwrap();
        assert!(matches!(plan, RemovalPlan::Delete { .. }));
    }

    #[tokio::test]
    async fn test_list_merge_reads_existing_value() {
        let shop = FakeShop::new();
        let owner = shop.add_owner(ResourceType::Product, 1);
        shop.set_metafield(&owner, "custom", "sizes", "list.single_line_text_field", r#"["S","M"]"#);

        let descriptor = MetafieldDescriptor::new("custom", "sizes", "list.single_line_text_field");
        let gid = Gid::parse(&owner).unwrap();
        let value = normalizer(&shop)
            .normalize(&gid, ResourceType::Product, &descriptor, &"M, L".into(), ListMode::Merge)
            .await
            .unwrap();
        assert_eq!(value.value, r#"["S","M","L"]"#);
        assert_eq!(value.recorded, r#"["L"]"#);

        let value = normalizer(&shop)
            .normalize(&gid, ResourceType::Product, &descriptor, &"M, L".into(), ListMode::Replace)
            .await
            .unwrap();
        assert_eq!(value.value, r#"["M","L"]"#);
        assert_eq!(value.recorded, value.value);
        assert_eq!(shop.resource_mutations(), 0);
    }

    #[tokio::test]
    async fn test_reference_resolution() {
        let shop = FakeShop::new();
        shop.add_resource(ResourceType::Product, MatchField::Handle, "blue-shirt", 5);
        let owner = Gid::parse("gid://shopify/Product/1").unwrap();
        let normalizer = normalizer(&shop);

        let descriptor = MetafieldDescriptor::new("custom", "related", "product_reference");
        let value = normalizer
            .normalize(&owner, ResourceType::Product, &descriptor, &"blue-shirt".into(), ListMode::Replace)
            .await
            .unwrap();
        assert_eq!(value.value, "gid://shopify/Product/5");

        let err = normalizer
            .normalize(
                &owner,
                ResourceType::Product,
                &descriptor,
                &"nonexistent-handle".into(),
                ListMode::Replace,
            )
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Could not find product for: nonexistent-handle");
        assert_eq!(err.kind(), FailureKind::Resolution);

        let descriptor = MetafieldDescriptor::new("custom", "related", "list.product_reference");
        let err = normalizer
            .normalize(
                &owner,
                ResourceType::Product,
                &descriptor,
                &"blue-shirt, ghost".into(),
                ListMode::Replace,
            )
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Could not resolve product reference: ghost");
        assert_eq!(shop.resource_mutations(), 0);
    }

    #[tokio::test]
    async fn test_metaobject_handle_resolution() {
        let shop = FakeShop::new();
        {
            let mut state = shop.state();
            state.validations.insert(
                ("PRODUCT".into(), "custom".into(), "swatch".into()),
                vec![(
                    "metaobject_definition_id".into(),
                    "gid://shopify/MetaobjectDefinition/9".into(),
                )],
            );
            state
                .metaobject_definitions
                .insert("gid://shopify/MetaobjectDefinition/9".into(), "swatch".into());
            state.metaobject_handles.insert(
                ("swatch".into(), "red".into()),
                "gid://shopify/Metaobject/31".into(),
            );
        }
        let owner = Gid::parse("gid://shopify/Product/1").unwrap();
        let descriptor = MetafieldDescriptor::new("custom", "swatch", "list.metaobject_reference");

        let value = normalizer(&shop)
            .normalize(
                &owner,
                ResourceType::Product,
                &descriptor,
                &"red, gid://shopify/Metaobject/2".into(),
                ListMode::Replace,
            )
            .await
            .unwrap();
        assert_eq!(
            value.value,
            r#"["gid://shopify/Metaobject/31","gid://shopify/Metaobject/2"]"#
        );

        let single = MetafieldDescriptor::new("custom", "swatch", "metaobject_reference");
        let err = normalizer(&shop)
            .normalize(&owner, ResourceType::Product, &single, &"blue".into(), ListMode::Replace)
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Could not resolve metaobject reference: blue");
    }

    #[tokio::test]
    async fn test_removal_of_absent_metafield() {
        let shop = FakeShop::new();
        let owner = shop.add_owner(ResourceType::Product, 1);
        let descriptor = MetafieldDescriptor::new("custom", "sizes", "list.single_line_text_field");
        let err = normalizer(&shop)
            .plan_list_removal(
                &Gid::parse(&owner).unwrap(),
                ResourceType::Product,
                &descriptor,
                &"S".into(),
            )
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Metafield does not exist on product");
    }
}

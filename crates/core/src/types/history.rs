//! History ledger record types.
//!
//! A history record is stored as a Shopify metaobject whose fields are all
//! strings. The per-row payload (`value`) is a JSON array whose shape depends
//! on the operation; older records used slightly different shapes, so row
//! parsing is deliberately lenient.

use core::fmt;

use chrono::{DateTime, Duration, SecondsFormat, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use super::{MetafieldDescriptor, MetafieldType, ResourceType};

/// The kind of batch a history record describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum HistoryOperation {
    #[serde(rename = "Tags-Added")]
    TagsAdded,
    #[serde(rename = "Tags-removed")]
    TagsRemoved,
    #[serde(rename = "Metafield-updated")]
    MetafieldUpdated,
    #[serde(rename = "Metafield-removed")]
    MetafieldRemoved,
}

impl HistoryOperation {
    /// The stored operation label.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::TagsAdded => "Tags-Added",
            Self::TagsRemoved => "Tags-removed",
            Self::MetafieldUpdated => "Metafield-updated",
            Self::MetafieldRemoved => "Metafield-removed",
        }
    }
}

impl fmt::Display for HistoryOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for HistoryOperation {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Tags-Added" => Ok(Self::TagsAdded),
            "Tags-removed" => Ok(Self::TagsRemoved),
            "Metafield-updated" => Ok(Self::MetafieldUpdated),
            "Metafield-removed" => Ok(Self::MetafieldRemoved),
            _ => Err(format!("invalid history operation: {s}")),
        }
    }
}

/// The metafield envelope stored in a history row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RowMetafield {
    #[serde(default)]
    pub namespace: String,
    #[serde(default)]
    pub key: String,
    #[serde(
        rename = "type",
        default,
        deserialize_with = "type_name",
        skip_serializing_if = "Option::is_none"
    )]
    pub type_name: Option<String>,
    #[serde(default, deserialize_with = "value_text")]
    pub value: Option<String>,
}

/// One row of a history record's `value` array.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryRow {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tag_list: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub removed_tags: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<RowMetafield>,
    // Flat fields written by older versions.
    #[serde(default, skip_serializing)]
    namespace: Option<String>,
    #[serde(default, skip_serializing)]
    key: Option<String>,
    #[serde(rename = "type", default, deserialize_with = "type_name", skip_serializing)]
    type_name: Option<String>,
    #[serde(default, deserialize_with = "value_text", skip_serializing)]
    value: Option<String>,
}

/// A metafield row after legacy fields have been folded in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredMetafield {
    pub descriptor: MetafieldDescriptor,
    /// Wire value; a JSON array string for list types.
    pub value: Option<String>,
}

impl HistoryRow {
    fn empty(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            tag_list: None,
            removed_tags: None,
            data: None,
            namespace: None,
            key: None,
            type_name: None,
            value: None,
        }
    }

    /// Row for a Tags-Added record.
    #[must_use]
    pub fn tags_added(id: impl Into<String>, tags: &[String]) -> Self {
        Self {
            tag_list: Some(tags.join(", ")),
            ..Self::empty(id)
        }
    }

    /// Row for a Tags-removed record.
    #[must_use]
    pub fn tags_removed(id: impl Into<String>, removed: Vec<String>) -> Self {
        Self {
            removed_tags: Some(removed),
            ..Self::empty(id)
        }
    }

    /// Row for a metafield record.
    #[must_use]
    pub fn metafield(
        id: impl Into<String>,
        descriptor: &MetafieldDescriptor,
        value: Option<String>,
    ) -> Self {
        Self {
            data: Some(RowMetafield {
                namespace: descriptor.namespace.clone(),
                key: descriptor.key.clone(),
                type_name: Some(descriptor.metafield_type.to_string()),
                value,
            }),
            ..Self::empty(id)
        }
    }

    /// Tags recorded by a Tags-Added row.
    #[must_use]
    pub fn added_tags(&self) -> Vec<String> {
        self.tag_list
            .as_deref()
            .map(split_tags)
            .unwrap_or_default()
    }

    /// Tags recorded by a Tags-removed row.
    #[must_use]
    pub fn removed_tags(&self) -> &[String] {
        self.removed_tags.as_deref().unwrap_or_default()
    }

    /// The metafield this row touched, folding in legacy flat fields.
    ///
    /// Returns `None` when namespace, key or type are missing.
    #[must_use]
    pub fn stored_metafield(&self) -> Option<StoredMetafield> {
        let data = self.data.as_ref();
        let pick = |nested: Option<&str>, flat: Option<&str>| {
            nested
                .filter(|s| !s.is_empty())
                .or(flat)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
        };

        let namespace = pick(data.map(|d| d.namespace.as_str()), self.namespace.as_deref())?;
        let key = pick(data.map(|d| d.key.as_str()), self.key.as_deref())?;
        let type_name = pick(
            data.and_then(|d| d.type_name.as_deref()),
            self.type_name.as_deref(),
        )?;
        let value = data
            .and_then(|d| d.value.clone())
            .or_else(|| self.value.clone());

        Some(StoredMetafield {
            descriptor: MetafieldDescriptor {
                namespace,
                key,
                metafield_type: MetafieldType::parse(&type_name),
            },
            value,
        })
    }
}

/// Split a comma-separated tag string, dropping blanks.
#[must_use]
pub fn split_tags(s: &str) -> Vec<String> {
    s.split(',')
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect()
}

fn type_name<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum TypeField {
        Name(String),
        Object { name: String },
    }

    Ok(
        Option::<TypeField>::deserialize(deserializer)?.map(|t| match t {
            TypeField::Name(name) | TypeField::Object { name } => name,
        }),
    )
}

fn value_text<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::Null => None,
        Value::String(s) => Some(s),
        other => Some(other.to_string()),
    })
}

/// Metaobject type that holds history records.
pub const HISTORY_METAOBJECT_TYPE: &str = "__tag_metafield_app_database";

/// Records older than this are swept.
pub const RETENTION_HOURS: i64 = 48;

/// Errors that can occur when reading a stored history record.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum HistoryParseError {
    #[error("history record is missing field: {0}")]
    MissingField(&'static str),
    #[error("invalid history operation: {0}")]
    InvalidOperation(String),
    #[error("invalid history value: {0}")]
    InvalidValue(String),
}

/// A parsed history ledger entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryRecord {
    /// Metaobject GID.
    pub id: String,
    pub unique_id: String,
    pub username: String,
    pub operation: HistoryOperation,
    pub object_type: String,
    pub value: Vec<HistoryRow>,
    /// Whether the record may still be undone.
    pub restore: bool,
    pub time: Option<DateTime<Utc>>,
}

impl HistoryRecord {
    /// Build a new, restorable record stamped with `now`.
    #[must_use]
    pub fn new(
        unique_id: impl Into<String>,
        username: impl Into<String>,
        operation: HistoryOperation,
        object_type: ResourceType,
        value: Vec<HistoryRow>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: String::new(),
            unique_id: unique_id.into(),
            username: username.into(),
            operation,
            object_type: object_type.as_str().to_string(),
            value,
            restore: true,
            time: Some(now),
        }
    }

    /// The resource type named by `objecttype`, if recognised.
    #[must_use]
    pub fn resource_type(&self) -> Option<ResourceType> {
        self.object_type.parse().ok()
    }

    /// Metaobject fields in storage order.
    ///
    /// # Errors
    ///
    /// Returns an error if the rows cannot be serialized.
    pub fn to_fields(&self) -> Result<Vec<(&'static str, String)>, serde_json::Error> {
        Ok(vec![
            ("unique_id", self.unique_id.clone()),
            ("username", self.username.clone()),
            ("operation", self.operation.as_str().to_string()),
            ("objecttype", self.object_type.clone()),
            ("value", serde_json::to_string(&self.value)?),
            ("restore", self.restore.to_string()),
            (
                "time",
                self.time
                    .map(|t| t.to_rfc3339_opts(SecondsFormat::Millis, true))
                    .unwrap_or_default(),
            ),
        ])
    }

    /// Parse a record from metaobject `(key, value)` fields.
    ///
    /// # Errors
    ///
    /// Returns an error if `operation` or `value` are missing or malformed.
    pub fn from_fields<'a, I>(id: impl Into<String>, fields: I) -> Result<Self, HistoryParseError>
    where
        I: IntoIterator<Item = (&'a str, Option<&'a str>)>,
    {
        let mut record = Self {
            id: id.into(),
            unique_id: String::new(),
            username: String::new(),
            operation: HistoryOperation::TagsAdded,
            object_type: String::new(),
            value: Vec::new(),
            restore: false,
            time: None,
        };
        let mut operation = None;
        let mut value = None;

        for (key, field_value) in fields {
            let text = field_value.unwrap_or_default();
            match key {
                "unique_id" => record.unique_id = text.to_string(),
                "username" => record.username = text.to_string(),
                "operation" => {
                    operation = Some(
                        text.parse::<HistoryOperation>()
                            .map_err(|_| HistoryParseError::InvalidOperation(text.to_string()))?,
                    );
                }
                "objecttype" => record.object_type = text.to_string(),
                "value" => {
                    value = Some(
                        serde_json::from_str::<Vec<HistoryRow>>(text)
                            .map_err(|e| HistoryParseError::InvalidValue(e.to_string()))?,
                    );
                }
                "restore" => record.restore = text.eq_ignore_ascii_case("true"),
                "time" => record.time = parse_time(text),
                _ => {}
            }
        }

        record.operation = operation.ok_or(HistoryParseError::MissingField("operation"))?;
        record.value = value.ok_or(HistoryParseError::MissingField("value"))?;
        Ok(record)
    }
}

fn parse_time(text: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(text.trim())
        .ok()
        .map(|t| t.with_timezone(&Utc))
}

/// What the retention sweep should do with a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Retention {
    /// Older than the retention window; delete it.
    Expired,
    /// Still inside the window.
    Retained,
    /// No `time` field; leave it alone.
    MissingTime,
    /// `time` could not be parsed; leave it alone.
    InvalidTime,
}

impl Retention {
    /// Decide a record's fate from its raw `time` field.
    ///
    /// A record is expired only when strictly older than `retention`.
    #[must_use]
    pub fn classify(time: Option<&str>, now: DateTime<Utc>, retention: Duration) -> Self {
        let Some(text) = time.filter(|t| !t.trim().is_empty()) else {
            return Self::MissingTime;
        };
        match parse_time(text) {
            Some(created) if now - created > retention => Self::Expired,
            Some(_) => Self::Retained,
            None => Self::InvalidTime,
        }
    }

    /// The skip reason reported for records left in place.
    #[must_use]
    pub const fn skip_reason(self) -> Option<&'static str> {
        match self {
            Self::MissingTime => Some("Missing time field"),
            Self::InvalidTime => Some("Invalid time format"),
            Self::Expired | Self::Retained => None,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_tags_added_row_shape() {
        let row = HistoryRow::tags_added("gid://shopify/Product/1", &["a".into(), "b".into()]);
        assert_eq!(
            serde_json::to_value(&row).unwrap(),
            json!({"id": "gid://shopify/Product/1", "tagList": "a, b"})
        );
        assert_eq!(row.added_tags(), vec!["a", "b"]);
    }

    #[test]
    fn test_metafield_row_shape() {
        let d = MetafieldDescriptor::new("custom", "color", "single_line_text_field");
        let row = HistoryRow::metafield("gid://shopify/Product/1", &d, Some("Red".into()));
        assert_eq!(
            serde_json::to_value(&row).unwrap(),
            json!({
                "id": "gid://shopify/Product/1",
                "data": {
                    "namespace": "custom",
                    "key": "color",
                    "type": "single_line_text_field",
                    "value": "Red"
                }
            })
        );
    }

    #[test]
    fn test_legacy_rows_still_parse() {
        let rows: Vec<HistoryRow> = serde_json::from_value(json!([
            {"id": "1", "tagList": "x,  y ,", "success": true, "error": null},
            {"id": "2", "removedTags": ["old"]},
            {"id": "3", "namespace": "custom", "key": "k", "type": {"name": "list.single_line_text_field"}, "value": ["a", "b"]},
            {"id": "4", "data": {"namespace": "custom", "key": "k", "type": {"name": "number_integer"}, "value": "5"}}
        ]))
        .unwrap();

        assert_eq!(rows[0].added_tags(), vec!["x", "y"]);
        assert_eq!(rows[1].removed_tags(), ["old".to_string()]);

        let flat = rows[2].stored_metafield().unwrap();
        assert!(flat.descriptor.metafield_type.is_list());
        assert_eq!(flat.value.as_deref(), Some("[\"a\",\"b\"]"));

        let nested = rows[3].stored_metafield().unwrap();
        assert_eq!(nested.descriptor.metafield_type.to_string(), "number_integer");
        assert_eq!(nested.value.as_deref(), Some("5"));
    }

    #[test]
    fn test_row_without_metafield_identity() {
        let row: HistoryRow = serde_json::from_value(json!({"id": "1", "data": {"value": "x"}})).unwrap();
        assert!(row.stored_metafield().is_none());
    }

    #[test]
    fn test_record_fields_round_trip() {
        let now = DateTime::parse_from_rfc3339("2026-03-01T10:00:00Z")
            .unwrap()
            .with_timezone(&Utc);
        let record = HistoryRecord::new(
            "ab12cd34",
            "owner@example.com",
            HistoryOperation::TagsRemoved,
            ResourceType::Customer,
            vec![HistoryRow::tags_removed("gid://shopify/Customer/1", vec!["vip".into()])],
            now,
        );
        let fields = record.to_fields().unwrap();
        assert_eq!(fields[2], ("operation", "Tags-removed".to_string()));
        assert_eq!(fields[5], ("restore", "true".to_string()));
        assert_eq!(fields[6], ("time", "2026-03-01T10:00:00.000Z".to_string()));

        let parsed = HistoryRecord::from_fields(
            "gid://shopify/Metaobject/5",
            fields.iter().map(|(k, v)| (*k, Some(v.as_str()))),
        )
        .unwrap();
        assert_eq!(parsed.id, "gid://shopify/Metaobject/5");
        assert_eq!(parsed.operation, HistoryOperation::TagsRemoved);
        assert_eq!(parsed.resource_type(), Some(ResourceType::Customer));
        assert!(parsed.restore);
        assert_eq!(parsed.time, Some(now));
        assert_eq!(parsed.value, record.value);
    }

    #[test]
    fn test_from_fields_requires_operation_and_value() {
        let err = HistoryRecord::from_fields("x", [("value", Some("[]"))]).unwrap_err();
        assert_eq!(err, HistoryParseError::MissingField("operation"));

        let err = HistoryRecord::from_fields(
            "x",
            [("operation", Some("Tags-Added")), ("value", Some("not json"))],
        )
        .unwrap_err();
        assert!(matches!(err, HistoryParseError::InvalidValue(_)));
    }

    #[test]
    fn test_retention_boundary() {
        let now = Utc::now();
        let window = Duration::hours(RETENTION_HOURS);
        let stamp = |d: Duration| (now - d).to_rfc3339();

        let old = stamp(Duration::hours(48) + Duration::seconds(1));
        assert_eq!(Retention::classify(Some(&old), now, window), Retention::Expired);

        let fresh = stamp(Duration::hours(47) + Duration::minutes(59));
        assert_eq!(Retention::classify(Some(&fresh), now, window), Retention::Retained);

        assert_eq!(Retention::classify(None, now, window), Retention::MissingTime);
        assert_eq!(
            Retention::classify(Some("yesterday"), now, window),
            Retention::InvalidTime
        );
        assert_eq!(Retention::InvalidTime.skip_reason(), Some("Invalid time format"));
    }
}

//! Metafield and metafield definition types.

use serde::{Deserialize, Serialize};

/// A stored metafield value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Metafield {
    pub id: String,
    pub namespace: String,
    pub key: String,
    #[serde(rename = "type")]
    pub type_name: String,
    pub value: String,
}

/// A metafield definition, as listed for an owner type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetafieldDefinition {
    pub id: String,
    pub name: String,
    pub namespace: String,
    pub key: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(rename = "type")]
    pub type_ref: TypeRef,
}

/// `type { name }` selection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypeRef {
    pub name: String,
}

/// One validation rule on a metafield definition.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct DefinitionValidation {
    pub name: String,
    #[serde(default)]
    pub value: Option<String>,
}

/// A metafield removed by `metafieldsDelete`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeletedMetafield {
    pub owner_id: String,
    pub namespace: String,
    pub key: String,
}

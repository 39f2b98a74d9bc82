//! GraphQL documents for the Shopify Admin API.
//!
//! Documents are plain `&'static str`s sent through
//! [`graphql_client::QueryBody`]. Per-resource documents (lookups, scans,
//! counts, exports) are assembled in [`super::catalog`] with the macros below.

use graphql_client::QueryBody;
use serde_json::Value;

/// A named GraphQL document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Operation {
    /// Operation name; must match the name declared in `document`.
    pub name: &'static str,
    pub document: &'static str,
}

impl Operation {
    #[must_use]
    pub const fn new(name: &'static str, document: &'static str) -> Self {
        Self { name, document }
    }

    /// Whether the document is a mutation.
    #[must_use]
    pub fn is_mutation(&self) -> bool {
        self.document.trim_start().starts_with("mutation")
    }

    /// Build the request body for this operation.
    #[must_use]
    pub fn body(&self, variables: Value) -> QueryBody<Value> {
        QueryBody {
            variables,
            query: self.document,
            operation_name: self.name,
        }
    }
}

/// `query <Name>($first: Int!, $after: String) { <connection>(...) { ids } }`
macro_rules! scan_ids_document {
    ($name:literal, $connection:literal) => {
        $crate::shopify::queries::Operation::new(
            $name,
            concat!(
                "query ", $name, "($first: Int!, $after: String) { ",
                $connection, "(first: $first, after: $after) { ",
                "edges { cursor node { id } } ",
                "pageInfo { hasNextPage endCursor } } }"
            ),
        )
    };
}

/// `query <Name> { <countField> { count } }`
macro_rules! count_document {
    ($name:literal, $field:literal) => {
        $crate::shopify::queries::Operation::new(
            $name,
            concat!("query ", $name, " { ", $field, " { count } }"),
        )
    };
}

/// Pages `id tags` for a taggable connection, optionally filtered by a search query.
macro_rules! tag_scan_document {
    ($name:literal, $connection:literal) => {
        $crate::shopify::queries::Operation::new(
            $name,
            concat!(
                "query ", $name, "($first: Int!, $after: String, $query: String) { ",
                $connection, "(first: $first, after: $after, query: $query) { ",
                "edges { cursor node { id tags } } ",
                "pageInfo { hasNextPage endCursor } } }"
            ),
        )
    };
}

/// Pages export rows: base fields plus every metafield value.
macro_rules! export_document {
    ($name:literal, $connection:literal, $fields:literal) => {
        $crate::shopify::queries::Operation::new(
            $name,
            concat!(
                "query ", $name, "($first: Int!, $after: String) { ",
                $connection, "(first: $first, after: $after) { ",
                "edges { cursor node { id ", $fields, " ",
                "metafields(first: 200) { edges { node { namespace key value } } } } } ",
                "pageInfo { hasNextPage endCursor } } }"
            ),
        )
    };
}

/// Looks up the first node of a connection matching a search query.
macro_rules! search_document {
    ($name:literal, $connection:literal, $selection:literal) => {
        $crate::shopify::queries::Operation::new(
            $name,
            concat!(
                "query ", $name, "($value: String!) { ",
                $connection, "(first: 1, query: $value) { edges { node { ", $selection, " } } } }"
            ),
        )
    };
}

pub(crate) use count_document;
pub(crate) use export_document;
pub(crate) use scan_ids_document;
pub(crate) use search_document;
pub(crate) use tag_scan_document;

// =============================================================================
// Metafields
// =============================================================================

pub const GET_METAFIELD: Operation = Operation::new(
    "GetMetafield",
    r"query GetMetafield($ownerId: ID!, $namespace: String!, $key: String!) {
  node(id: $ownerId) {
    id
    ... on HasMetafields {
      metafield(namespace: $namespace, key: $key) { id namespace key type value }
    }
  }
}",
);

pub const METAFIELDS_SET: Operation = Operation::new(
    "MetafieldsSet",
    r"mutation MetafieldsSet($metafields: [MetafieldsSetInput!]!) {
  metafieldsSet(metafields: $metafields) {
    metafields { id namespace key type value }
    userErrors { field message code }
  }
}",
);

pub const METAFIELDS_DELETE: Operation = Operation::new(
    "MetafieldsDelete",
    r"mutation MetafieldsDelete($metafields: [MetafieldIdentifierInput!]!) {
  metafieldsDelete(metafields: $metafields) {
    deletedMetafields { ownerId namespace key }
    userErrors { field message }
  }
}",
);

pub const METAFIELD_DEFINITIONS: Operation = Operation::new(
    "MetafieldDefinitions",
    r"query MetafieldDefinitions($ownerType: MetafieldOwnerType!, $first: Int!, $after: String) {
  metafieldDefinitions(ownerType: $ownerType, first: $first, after: $after) {
    edges { cursor node { id name namespace key description type { name } } }
    pageInfo { hasNextPage endCursor }
  }
}",
);

pub const METAFIELD_DEFINITION_VALIDATIONS: Operation = Operation::new(
    "MetafieldDefinitionValidations",
    r"query MetafieldDefinitionValidations($ownerType: MetafieldOwnerType!, $namespace: String!, $key: String!) {
  metafieldDefinition(identifier: { ownerType: $ownerType, namespace: $namespace, key: $key }) {
    id
    validations { name value }
  }
}",
);

// =============================================================================
// Metaobjects
// =============================================================================

pub const METAOBJECT_DEFINITION_TYPE: Operation = Operation::new(
    "MetaobjectDefinitionType",
    r"query MetaobjectDefinitionType($id: ID!) {
  metaobjectDefinition(id: $id) { id type }
}",
);

pub const METAOBJECT_BY_HANDLE: Operation = Operation::new(
    "MetaobjectByHandle",
    r"query MetaobjectByHandle($type: String!, $handle: String!) {
  metaobjectByHandle(handle: { type: $type, handle: $handle }) { id }
}",
);

pub const EXPORT_METAOBJECTS: Operation = Operation::new(
    "ExportMetaobjects",
    r"query ExportMetaobjects($type: String!, $first: Int!, $after: String) {
  metaobjects(type: $type, first: $first, after: $after) {
    edges { cursor node { id type handle displayName fields { key value } } }
    pageInfo { hasNextPage endCursor }
  }
}",
);

// =============================================================================
// Tags
// =============================================================================

pub const GET_TAGS: Operation = Operation::new(
    "GetTags",
    r"query GetTags($id: ID!) {
  node(id: $id) {
    id
    ... on Product { tags }
    ... on Customer { tags }
    ... on Order { tags }
    ... on Article { tags }
  }
}",
);

pub const TAGS_ADD: Operation = Operation::new(
    "TagsAdd",
    r"mutation TagsAdd($id: ID!, $tags: [String!]!) {
  tagsAdd(id: $id, tags: $tags) {
    node { id }
    userErrors { field message }
  }
}",
);

pub const TAGS_REMOVE: Operation = Operation::new(
    "TagsRemove",
    r"mutation TagsRemove($id: ID!, $tags: [String!]!) {
  tagsRemove(id: $id, tags: $tags) {
    node { id }
    userErrors { field message }
  }
}",
);

// =============================================================================
// History ledger
// =============================================================================

pub const HISTORY_DEFINITION: Operation = Operation::new(
    "HistoryDefinition",
    r"query HistoryDefinition($type: String!) {
  metaobjectDefinitionByType(type: $type) { id type }
}",
);

pub const HISTORY_DEFINITION_CREATE: Operation = Operation::new(
    "HistoryDefinitionCreate",
    r"mutation HistoryDefinitionCreate($definition: MetaobjectDefinitionCreateInput!) {
  metaobjectDefinitionCreate(definition: $definition) {
    metaobjectDefinition { id type }
    userErrors { field message code }
  }
}",
);

pub const HISTORY_CREATE: Operation = Operation::new(
    "HistoryCreate",
    r"mutation HistoryCreate($metaobject: MetaobjectCreateInput!) {
  metaobjectCreate(metaobject: $metaobject) {
    metaobject { id handle fields { key value } }
    userErrors { field message code }
  }
}",
);

pub const HISTORY_PAGE: Operation = Operation::new(
    "HistoryPage",
    r"query HistoryPage($type: String!, $first: Int, $after: String, $last: Int, $before: String, $reverse: Boolean) {
  metaobjects(type: $type, first: $first, after: $after, last: $last, before: $before, reverse: $reverse) {
    nodes { id handle fields { key value } }
    pageInfo { hasNextPage hasPreviousPage startCursor endCursor }
  }
}",
);

pub const HISTORY_RECORD: Operation = Operation::new(
    "HistoryRecord",
    r"query HistoryRecord($id: ID!) {
  metaobject(id: $id) { id handle fields { key value } }
}",
);

pub const HISTORY_UPDATE: Operation = Operation::new(
    "HistoryUpdate",
    r"mutation HistoryUpdate($id: ID!, $metaobject: MetaobjectUpdateInput!) {
  metaobjectUpdate(id: $id, metaobject: $metaobject) {
    metaobject { id }
    userErrors { field message code }
  }
}",
);

pub const HISTORY_DELETE: Operation = Operation::new(
    "HistoryDelete",
    r"mutation HistoryDelete($id: ID!) {
  metaobjectDelete(id: $id) {
    deletedId
    userErrors { field message code }
  }
}",
);

// =============================================================================
// Shop
// =============================================================================

pub const SHOP_IDENTITY: Operation = Operation::new(
    "ShopIdentity",
    r"query ShopIdentity {
  shop { email myshopifyDomain }
}",
);

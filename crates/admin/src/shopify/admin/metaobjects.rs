//! Metaobject lookups and storage.
//!
//! Metaobjects serve two purposes here: targets of `metaobject_reference`
//! metafields, and the storage for history records.

use serde::Deserialize;
use serde_json::{Value, json};
use tracing::instrument;

use super::{AdminClient, check_user_errors};
use crate::shopify::{
    AdminShopifyError, Metaobject, MetaobjectDefinition, Page, UserError,
    queries::{
        EXPORT_METAOBJECTS, HISTORY_CREATE, HISTORY_DEFINITION, HISTORY_DEFINITION_CREATE,
        HISTORY_DELETE, HISTORY_PAGE, HISTORY_RECORD, HISTORY_UPDATE, METAOBJECT_BY_HANDLE,
        METAOBJECT_DEFINITION_TYPE,
    },
    types::{Connection, IdNode, NodeList},
};

/// Window of a metaobject listing.
///
/// Use `first`/`after` to page forward and `last`/`before` to page back.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HistoryPageRequest {
    pub first: Option<u32>,
    pub after: Option<String>,
    pub last: Option<u32>,
    pub before: Option<String>,
    /// Newest first.
    pub reverse: bool,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct DefinitionTypeData {
    metaobject_definition: Option<MetaobjectDefinition>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ByHandleData {
    metaobject_by_handle: Option<IdNode>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct DefinitionByTypeData {
    metaobject_definition_by_type: Option<MetaobjectDefinition>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct DefinitionCreateData {
    metaobject_definition_create: Option<DefinitionCreatePayload>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct DefinitionCreatePayload {
    #[serde(default)]
    metaobject_definition: Option<MetaobjectDefinition>,
    #[serde(default)]
    user_errors: Vec<UserError>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreateData {
    metaobject_create: Option<MetaobjectPayload>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct UpdateData {
    metaobject_update: Option<MetaobjectPayload>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct MetaobjectPayload {
    #[serde(default)]
    metaobject: Option<Metaobject>,
    #[serde(default)]
    user_errors: Vec<UserError>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct DeleteData {
    metaobject_delete: Option<DeletePayload>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct DeletePayload {
    #[serde(default)]
    deleted_id: Option<String>,
    #[serde(default)]
    user_errors: Vec<UserError>,
}

#[derive(Deserialize)]
struct ListData {
    metaobjects: Option<NodeList<Metaobject>>,
}

#[derive(Deserialize)]
struct ExportData {
    metaobjects: Option<Connection<Metaobject>>,
}

#[derive(Deserialize)]
struct RecordData {
    metaobject: Option<Metaobject>,
}

fn field_inputs(fields: &[(&str, String)]) -> Value {
    Value::Array(
        fields
            .iter()
            .map(|(key, value)| json!({ "key": key, "value": value }))
            .collect(),
    )
}

impl AdminClient {
    // =========================================================================
    // Metaobject reference resolution
    // =========================================================================

    /// The `type` of a metaobject definition.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self))]
    pub async fn metaobject_definition_type(
        &self,
        definition_id: &str,
    ) -> Result<Option<String>, AdminShopifyError> {
        let data: DefinitionTypeData = self
            .execute(METAOBJECT_DEFINITION_TYPE, json!({ "id": definition_id }))
            .await?;
        Ok(data.metaobject_definition.map(|d| d.type_name))
    }

    /// Look up a metaobject GID by `(type, handle)`.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self))]
    pub async fn metaobject_by_handle(
        &self,
        type_name: &str,
        handle: &str,
    ) -> Result<Option<String>, AdminShopifyError> {
        let data: ByHandleData = self
            .execute(
                METAOBJECT_BY_HANDLE,
                json!({ "type": type_name, "handle": handle }),
            )
            .await?;
        Ok(data.metaobject_by_handle.map(|n| n.id))
    }

    /// One page of metaobjects of a type, for export.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self))]
    pub async fn export_metaobjects_page(
        &self,
        type_name: &str,
        first: u32,
        after: Option<&str>,
    ) -> Result<Page<Metaobject>, AdminShopifyError> {
        let data: ExportData = self
            .execute(
                EXPORT_METAOBJECTS,
                json!({ "type": type_name, "first": first, "after": after }),
            )
            .await?;
        Ok(Page::from_connection(data.metaobjects))
    }

    // =========================================================================
    // Metaobject storage
    // =========================================================================

    /// A metaobject definition by type, if it exists.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self))]
    pub async fn metaobject_definition_by_type(
        &self,
        type_name: &str,
    ) -> Result<Option<MetaobjectDefinition>, AdminShopifyError> {
        let data: DefinitionByTypeData = self
            .execute(HISTORY_DEFINITION, json!({ "type": type_name }))
            .await?;
        Ok(data.metaobject_definition_by_type)
    }

    /// Create a metaobject definition.
    ///
    /// # Errors
    ///
    /// Returns `AdminShopifyError::UserError` if Shopify rejects the definition.
    #[instrument(skip(self, definition))]
    pub async fn create_metaobject_definition(
        &self,
        definition: Value,
    ) -> Result<MetaobjectDefinition, AdminShopifyError> {
        let data: DefinitionCreateData = self
            .execute(HISTORY_DEFINITION_CREATE, json!({ "definition": definition }))
            .await?;
        let payload = data
            .metaobject_definition_create
            .ok_or_else(|| AdminShopifyError::missing("metaobjectDefinitionCreate payload"))?;
        check_user_errors(&payload.user_errors)?;
        payload
            .metaobject_definition
            .ok_or_else(|| AdminShopifyError::missing("metaobjectDefinition"))
    }

    /// Create a metaobject.
    ///
    /// # Errors
    ///
    /// Returns `AdminShopifyError::UserError` if Shopify rejects the fields.
    #[instrument(skip(self, fields))]
    pub async fn create_metaobject(
        &self,
        type_name: &str,
        fields: &[(&str, String)],
    ) -> Result<Metaobject, AdminShopifyError> {
        let data: CreateData = self
            .execute(
                HISTORY_CREATE,
                json!({ "metaobject": { "type": type_name, "fields": field_inputs(fields) } }),
            )
            .await?;
        let payload = data
            .metaobject_create
            .ok_or_else(|| AdminShopifyError::missing("metaobjectCreate payload"))?;
        check_user_errors(&payload.user_errors)?;
        payload
            .metaobject
            .ok_or_else(|| AdminShopifyError::missing("metaobject"))
    }

    /// List metaobjects of a type.
    ///
    /// A missing connection yields an empty list.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self))]
    pub async fn metaobjects(
        &self,
        type_name: &str,
        request: &HistoryPageRequest,
    ) -> Result<NodeList<Metaobject>, AdminShopifyError> {
        let data: ListData = self
            .execute(
                HISTORY_PAGE,
                json!({
                    "type": type_name,
                    "first": request.first,
                    "after": request.after,
                    "last": request.last,
                    "before": request.before,
                    "reverse": request.reverse,
                }),
            )
            .await?;
        Ok(data.metaobjects.unwrap_or_else(|| NodeList {
            nodes: Vec::new(),
            page_info: crate::shopify::PageInfo::default(),
        }))
    }

    /// A single metaobject by GID.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self))]
    pub async fn metaobject(&self, id: &str) -> Result<Option<Metaobject>, AdminShopifyError> {
        let data: RecordData = self.execute(HISTORY_RECORD, json!({ "id": id })).await?;
        Ok(data.metaobject)
    }

    /// Overwrite some fields of a metaobject.
    ///
    /// # Errors
    ///
    /// Returns `AdminShopifyError::UserError` if Shopify rejects the update.
    #[instrument(skip(self, fields))]
    pub async fn update_metaobject_fields(
        &self,
        id: &str,
        fields: &[(&str, String)],
    ) -> Result<(), AdminShopifyError> {
        let data: UpdateData = self
            .execute(
                HISTORY_UPDATE,
                json!({ "id": id, "metaobject": { "fields": field_inputs(fields) } }),
            )
            .await?;
        let payload = data
            .metaobject_update
            .ok_or_else(|| AdminShopifyError::missing("metaobjectUpdate payload"))?;
        check_user_errors(&payload.user_errors)
    }

    /// Delete a metaobject, returning the deleted GID.
    ///
    /// # Errors
    ///
    /// Returns `AdminShopifyError::UserError` if Shopify rejects the delete.
    #[instrument(skip(self))]
    pub async fn delete_metaobject(&self, id: &str) -> Result<String, AdminShopifyError> {
        let data: DeleteData = self.execute(HISTORY_DELETE, json!({ "id": id })).await?;
        let payload = data
            .metaobject_delete
            .ok_or_else(|| AdminShopifyError::missing("metaobjectDelete payload"))?;
        check_user_errors(&payload.user_errors)?;
        Ok(payload.deleted_id.unwrap_or_else(|| id.to_string()))
    }
}

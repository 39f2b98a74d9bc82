//! Metafield reads, writes and definition lookups.

use serde::Deserialize;
use serde_json::json;
use tracing::instrument;

use super::{AdminClient, check_user_errors};
use crate::shopify::{
    AdminShopifyError, DefinitionValidation, DeletedMetafield, Metafield, MetafieldDefinition,
    Page, UserError,
    queries::{
        GET_METAFIELD, METAFIELD_DEFINITION_VALIDATIONS, METAFIELD_DEFINITIONS, METAFIELDS_DELETE,
        METAFIELDS_SET,
    },
    types::Connection,
};

#[derive(Deserialize)]
struct GetMetafieldData {
    node: Option<OwnerNode>,
}

#[derive(Deserialize)]
struct OwnerNode {
    #[serde(default)]
    metafield: Option<Metafield>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct MetafieldsSetData {
    metafields_set: Option<MetafieldsSetPayload>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct MetafieldsSetPayload {
    #[serde(default)]
    metafields: Option<Vec<Metafield>>,
    #[serde(default)]
    user_errors: Vec<UserError>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct MetafieldsDeleteData {
    metafields_delete: Option<MetafieldsDeletePayload>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct MetafieldsDeletePayload {
    #[serde(default)]
    deleted_metafields: Option<Vec<Option<DeletedMetafield>>>,
    #[serde(default)]
    user_errors: Vec<UserError>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct DefinitionsData {
    metafield_definitions: Option<Connection<MetafieldDefinition>>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct DefinitionValidationsData {
    metafield_definition: Option<DefinitionWithValidations>,
}

#[derive(Deserialize)]
struct DefinitionWithValidations {
    #[serde(default)]
    validations: Vec<DefinitionValidation>,
}

impl AdminClient {
    // =========================================================================
    // Metafield methods
    // =========================================================================

    /// Read one metafield from an owner.
    ///
    /// Returns `Ok(None)` when the owner exists but has no such metafield.
    ///
    /// # Errors
    ///
    /// Returns `AdminShopifyError::NotFound` if the owner does not exist, or
    /// any transport error.
    #[instrument(skip(self), fields(owner_id = %owner_id))]
    pub async fn get_metafield(
        &self,
        owner_id: &str,
        namespace: &str,
        key: &str,
    ) -> Result<Option<Metafield>, AdminShopifyError> {
        let data: GetMetafieldData = self
            .execute(
                GET_METAFIELD,
                json!({ "ownerId": owner_id, "namespace": namespace, "key": key }),
            )
            .await?;

        let node = data
            .node
            .ok_or_else(|| AdminShopifyError::NotFound(owner_id.to_string()))?;
        Ok(node.metafield)
    }

    /// Set one metafield value.
    ///
    /// # Errors
    ///
    /// Returns `AdminShopifyError::UserError` with the joined `userErrors` if
    /// Shopify rejects the value.
    #[instrument(skip(self, value), fields(owner_id = %owner_id))]
    pub async fn metafields_set(
        &self,
        owner_id: &str,
        namespace: &str,
        key: &str,
        type_name: &str,
        value: &str,
    ) -> Result<Option<Metafield>, AdminShopifyError> {
        let data: MetafieldsSetData = self
            .execute(
                METAFIELDS_SET,
                json!({
                    "metafields": [{
                        "ownerId": owner_id,
                        "namespace": namespace,
                        "key": key,
                        "type": type_name,
                        "value": value,
                    }]
                }),
            )
            .await?;

        let payload = data
            .metafields_set
            .ok_or_else(|| AdminShopifyError::missing("metafieldsSet payload"))?;
        check_user_errors(&payload.user_errors)?;

        Ok(payload.metafields.and_then(|m| m.into_iter().next()))
    }

    /// Delete one metafield.
    ///
    /// # Errors
    ///
    /// Returns `AdminShopifyError::UserError` if Shopify rejects the delete.
    #[instrument(skip(self), fields(owner_id = %owner_id))]
    pub async fn metafields_delete(
        &self,
        owner_id: &str,
        namespace: &str,
        key: &str,
    ) -> Result<Option<DeletedMetafield>, AdminShopifyError> {
        let data: MetafieldsDeleteData = self
            .execute(
                METAFIELDS_DELETE,
                json!({
                    "metafields": [{ "ownerId": owner_id, "namespace": namespace, "key": key }]
                }),
            )
            .await?;

        let payload = data
            .metafields_delete
            .ok_or_else(|| AdminShopifyError::missing("metafieldsDelete payload"))?;
        check_user_errors(&payload.user_errors)?;

        Ok(payload
            .deleted_metafields
            .and_then(|d| d.into_iter().flatten().next()))
    }

    /// Fetch one page of metafield definitions for an owner type.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self))]
    pub async fn metafield_definitions_page(
        &self,
        owner_type: &str,
        first: u32,
        after: Option<&str>,
    ) -> Result<Page<MetafieldDefinition>, AdminShopifyError> {
        let data: DefinitionsData = self
            .execute(
                METAFIELD_DEFINITIONS,
                json!({ "ownerType": owner_type, "first": first, "after": after }),
            )
            .await?;

        Ok(Page::from_connection(data.metafield_definitions))
    }

    /// Validation rules of a metafield definition.
    ///
    /// Returns `Ok(None)` when no definition exists for the identifier.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self))]
    pub async fn metafield_definition_validations(
        &self,
        owner_type: &str,
        namespace: &str,
        key: &str,
    ) -> Result<Option<Vec<DefinitionValidation>>, AdminShopifyError> {
        let data: DefinitionValidationsData = self
            .execute(
                METAFIELD_DEFINITION_VALIDATIONS,
                json!({ "ownerType": owner_type, "namespace": namespace, "key": key }),
            )
            .await?;

        Ok(data.metafield_definition.map(|d| d.validations))
    }
}

//! Tag reads and the `tagsAdd`/`tagsRemove` primitives.

use serde::Deserialize;
use serde_json::json;
use tracing::instrument;

use super::{AdminClient, check_user_errors};
use crate::shopify::{
    AdminShopifyError, UserError,
    queries::{GET_TAGS, TAGS_ADD, TAGS_REMOVE},
};

#[derive(Deserialize)]
struct GetTagsData {
    node: Option<TagsNode>,
}

#[derive(Deserialize)]
struct TagsNode {
    #[serde(default)]
    tags: Vec<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct TagsAddData {
    tags_add: Option<TagsPayload>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct TagsRemoveData {
    tags_remove: Option<TagsPayload>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct TagsPayload {
    #[serde(default)]
    user_errors: Vec<UserError>,
}

impl AdminClient {
    // =========================================================================
    // Tag methods
    // =========================================================================

    /// Current tags of a taggable resource.
    ///
    /// # Errors
    ///
    /// Returns `AdminShopifyError::NotFound` if the resource does not exist.
    #[instrument(skip(self), fields(id = %id))]
    pub async fn get_tags(&self, id: &str) -> Result<Vec<String>, AdminShopifyError> {
        let data: GetTagsData = self.execute(GET_TAGS, json!({ "id": id })).await?;
        data.node
            .map(|n| n.tags)
            .ok_or_else(|| AdminShopifyError::NotFound(id.to_string()))
    }

    /// Add tags to a resource.
    ///
    /// # Errors
    ///
    /// Returns `AdminShopifyError::UserError` if Shopify rejects the tags.
    #[instrument(skip(self, tags), fields(id = %id, count = tags.len()))]
    pub async fn tags_add(&self, id: &str, tags: &[String]) -> Result<(), AdminShopifyError> {
        let data: TagsAddData = self
            .execute(TAGS_ADD, json!({ "id": id, "tags": tags }))
            .await?;
        let payload = data
            .tags_add
            .ok_or_else(|| AdminShopifyError::missing("tagsAdd payload"))?;
        check_user_errors(&payload.user_errors)
    }

    /// Remove tags from a resource.
    ///
    /// # Errors
    ///
    /// Returns `AdminShopifyError::UserError` if Shopify rejects the request.
    #[instrument(skip(self, tags), fields(id = %id, count = tags.len()))]
    pub async fn tags_remove(&self, id: &str, tags: &[String]) -> Result<(), AdminShopifyError> {
        let data: TagsRemoveData = self
            .execute(TAGS_REMOVE, json!({ "id": id, "tags": tags }))
            .await?;
        let payload = data
            .tags_remove
            .ok_or_else(|| AdminShopifyError::missing("tagsRemove payload"))?;
        check_user_errors(&payload.user_errors)
    }
}

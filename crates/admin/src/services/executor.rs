//! Single-resource mutations.
//!
//! Each method applies one operation to one resource and always returns an
//! [`OperationResult`]; client errors are folded into failed results so a
//! batch loop never stops on them.

use serde_json::json;
use tagfield_core::{FailureKind, MetafieldDescriptor, OperationResult};
use tracing::{instrument, warn};

use super::{RemovalPlan, failed_row};
use crate::shopify::AdminClient;

/// Applies mutations to individual resources.
#[derive(Clone)]
pub struct Executor {
    client: AdminClient,
}

impl Executor {
    #[must_use]
    pub const fn new(client: AdminClient) -> Self {
        Self { client }
    }

    /// Set a metafield to an already-normalized wire value.
    #[instrument(skip(self, descriptor, value), fields(key = %descriptor.qualified_key()))]
    pub async fn set_metafield(
        &self,
        owner: &str,
        descriptor: &MetafieldDescriptor,
        value: &str,
    ) -> OperationResult {
        let type_name = descriptor.metafield_type.to_string();
        match self
            .client
            .metafields_set(owner, &descriptor.namespace, &descriptor.key, &type_name, value)
            .await
        {
            Ok(saved) => OperationResult::ok_with(
                owner,
                json!({
                    "namespace": descriptor.namespace,
                    "key": descriptor.key,
                    "type": type_name,
                    "value": saved.map_or_else(|| value.to_string(), |m| m.value),
                }),
            ),
            Err(e) => {
                warn!(owner, error = %e, "metafieldsSet failed");
                failed_row(owner, &e)
            }
        }
    }

    /// Delete a metafield, returning its previous value in `data`.
    #[instrument(skip(self))]
    pub async fn delete_metafield(&self, owner: &str, namespace: &str, key: &str) -> OperationResult {
        let existing = match self.client.get_metafield(owner, namespace, key).await {
            Ok(Some(metafield)) => metafield,
            Ok(None) => {
                return OperationResult::failed(
                    owner,
                    FailureKind::Validation,
                    "Metafield is not present",
                );
            }
            Err(e) => return failed_row(owner, &e),
        };

        let data = json!({
            "ownerId": owner,
            "namespace": namespace,
            "key": key,
            "metafieldId": existing.id,
            "type": existing.type_name,
            "value": existing.value,
        });

        match self.client.metafields_delete(owner, namespace, key).await {
            Ok(Some(_)) => OperationResult::ok_with(owner, data),
            Ok(None) => OperationResult::failed(owner, FailureKind::Upstream, "Failed"),
            Err(e) => {
                warn!(owner, error = %e, "metafieldsDelete failed");
                failed_row(owner, &e)
            }
        }
    }

    /// Delete a metafield without reading it first. An absent metafield is
    /// still a success; `data.deleted` says whether anything was removed.
    #[instrument(skip(self))]
    pub async fn clear_metafield(&self, owner: &str, namespace: &str, key: &str) -> OperationResult {
        match self.client.metafields_delete(owner, namespace, key).await {
            Ok(deleted) => OperationResult::ok_with(owner, json!({ "deleted": deleted.is_some() })),
            Err(e) => {
                warn!(owner, error = %e, "metafieldsDelete failed");
                failed_row(owner, &e)
            }
        }
    }

    /// Apply a planned list removal; `data` lists the removed values.
    #[instrument(skip(self, descriptor, plan), fields(key = %descriptor.qualified_key()))]
    pub async fn apply_removal(
        &self,
        owner: &str,
        descriptor: &MetafieldDescriptor,
        plan: RemovalPlan,
    ) -> OperationResult {
        let outcome = match &plan {
            RemovalPlan::Set { value, .. } => self
                .client
                .metafields_set(
                    owner,
                    &descriptor.namespace,
                    &descriptor.key,
                    &descriptor.metafield_type.to_string(),
                    value,
                )
                .await
                .map(|_| ()),
            RemovalPlan::Delete { .. } => self
                .client
                .metafields_delete(owner, &descriptor.namespace, &descriptor.key)
                .await
                .map(|_| ()),
        };
        match outcome {
            Ok(()) => OperationResult::ok_with(owner, json!(plan.removed())),
            Err(e) => failed_row(owner, &e),
        }
    }

    /// Add tags that are not already present.
    ///
    /// Tags are compared case-insensitively after trimming. When every tag is
    /// present the row fails with `data.existingTags`.
    #[instrument(skip(self, tags), fields(count = tags.len()))]
    pub async fn add_tags(&self, id: &str, tags: &[String]) -> OperationResult {
        let current = match self.client.get_tags(id).await {
            Ok(current) => current,
            Err(e) => return failed_row(id, &e),
        };
        let current: Vec<String> = current.iter().map(|t| t.trim().to_lowercase()).collect();

        let mut to_add: Vec<String> = Vec::new();
        let mut existing: Vec<String> = Vec::new();
        for tag in tags.iter().map(|t| t.trim()).filter(|t| !t.is_empty()) {
            let lower = tag.to_lowercase();
            let seen = |list: &[String]| list.iter().any(|t| t.to_lowercase() == lower);
            if seen(&to_add) || seen(&existing) {
                continue;
            }
            if current.contains(&lower) {
                existing.push(tag.to_string());
            } else {
                to_add.push(tag.to_string());
            }
        }

        if to_add.is_empty() {
            return OperationResult::failed(id, FailureKind::Validation, "All tags already exist")
                .with_data(json!({ "existingTags": existing }));
        }

        match self.client.tags_add(id, &to_add).await {
            Ok(()) => OperationResult::ok_with(
                id,
                json!({ "addedTags": to_add, "existingTags": existing }),
            ),
            Err(e) => {
                warn!(id, error = %e, "tagsAdd failed");
                failed_row(id, &e)
            }
        }
    }

    /// Remove tags; `data.removedTags` echoes the request.
    #[instrument(skip(self, tags), fields(count = tags.len()))]
    pub async fn remove_tags(&self, id: &str, tags: &[String]) -> OperationResult {
        let tags: Vec<String> = tags
            .iter()
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty())
            .collect();
        match self.client.tags_remove(id, &tags).await {
            Ok(()) => OperationResult::ok_with(id, json!({ "removedTags": tags })),
            Err(e) => {
                warn!(id, error = %e, "tagsRemove failed");
                failed_row(id, &e)
            }
        }
    }
}

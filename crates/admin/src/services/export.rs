//! CSV export of resources and metaobjects.

use std::collections::BTreeSet;
use std::sync::Arc;

use serde::Deserialize;
use serde_json::Value;
use tagfield_core::ResourceType;
use tracing::{info, instrument};

use super::scanner::collect_pages;
use crate::csv::csv_line;
use crate::shopify::{AdminClient, AdminShopifyError, Metaobject, ResourceTypeCatalog};

/// What to export.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum ExportTarget {
    Resources {
        #[serde(rename = "resourceType")]
        resource_type: ResourceType,
    },
    Metaobjects {
        #[serde(rename = "type")]
        type_name: String,
    },
}

/// Builds export files.
#[derive(Clone)]
pub struct ExportService {
    client: AdminClient,
    catalog: Arc<ResourceTypeCatalog>,
    page_size: u32,
}

impl ExportService {
    #[must_use]
    pub const fn new(client: AdminClient, catalog: Arc<ResourceTypeCatalog>, page_size: u32) -> Self {
        Self {
            client,
            catalog,
            page_size,
        }
    }

    /// Export a target as CSV text.
    ///
    /// # Errors
    ///
    /// Returns the first page error.
    #[instrument(skip(self))]
    pub async fn export(&self, target: &ExportTarget) -> Result<String, AdminShopifyError> {
        match target {
            ExportTarget::Resources { resource_type } => self.resources(*resource_type).await,
            ExportTarget::Metaobjects { type_name } => self.metaobjects(type_name).await,
        }
    }

    async fn resources(&self, resource_type: ResourceType) -> Result<String, AdminShopifyError> {
        let entry = self.catalog.entry(resource_type);
        let nodes = collect_pages(|cursor| async move {
            self.client
                .export_page(entry, self.page_size, cursor.as_deref())
                .await
        })
        .await?;

        let metafields: Vec<Vec<(String, String)>> = nodes.iter().map(node_metafields).collect();
        let keys: BTreeSet<&str> = metafields
            .iter()
            .flatten()
            .map(|(key, _)| key.as_str())
            .collect();
        let with_tags = resource_type.supports_tags();

        let mut header: Vec<&str> = vec!["resource_id"];
        header.extend(entry.export_columns.iter().map(|(h, _)| *h));
        if with_tags {
            header.push("tags");
        }
        header.extend(keys.iter().copied());

        let mut lines = vec![csv_line(header)];
        for (node, fields) in nodes.iter().zip(&metafields) {
            let mut row: Vec<String> = vec![cell(&node["id"])];
            row.extend(entry.export_columns.iter().map(|(_, f)| cell(&node[*f])));
            if with_tags {
                row.push(cell(&node["tags"]));
            }
            row.extend(keys.iter().map(|key| {
                fields
                    .iter()
                    .find(|(k, _)| k == key)
                    .map(|(_, v)| v.clone())
                    .unwrap_or_default()
            }));
            lines.push(csv_line(row));
        }

        info!(resource = %resource_type, rows = nodes.len(), "Exported resources");
        Ok(lines.join("\n") + "\n")
    }

    async fn metaobjects(&self, type_name: &str) -> Result<String, AdminShopifyError> {
        let objects: Vec<Metaobject> = collect_pages(|cursor| async move {
            self.client
                .export_metaobjects_page(type_name, self.page_size, cursor.as_deref())
                .await
        })
        .await?;

        let mut keys: Vec<&str> = Vec::new();
        for object in &objects {
            for (key, _) in object.field_pairs() {
                if !keys.contains(&key) {
                    keys.push(key);
                }
            }
        }

        let mut header = vec!["id", "handle"];
        header.extend(keys.iter().copied());
        let mut lines = vec![csv_line(header)];
        for object in &objects {
            let mut row = vec![
                object.id.clone(),
                object.handle.clone().unwrap_or_default(),
            ];
            row.extend(
                keys.iter()
                    .map(|key| object.field(key).unwrap_or_default().to_string()),
            );
            lines.push(csv_line(row));
        }

        info!(type_name, rows = objects.len(), "Exported metaobjects");
        Ok(lines.join("\n") + "\n")
    }
}

/// `namespace.key` and value pairs of an export node.
fn node_metafields(node: &Value) -> Vec<(String, String)> {
    node["metafields"]["edges"]
        .as_array()
        .map(|edges| {
            edges
                .iter()
                .map(|edge| {
                    let mf = &edge["node"];
                    (
                        format!(
                            "{}.{}",
                            mf["namespace"].as_str().unwrap_or_default(),
                            mf["key"].as_str().unwrap_or_default()
                        ),
                        cell(&mf["value"]),
                    )
                })
                .collect()
        })
        .unwrap_or_default()
}

fn cell(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Array(items) => items
            .iter()
            .map(cell)
            .collect::<Vec<_>>()
            .join(", "),
        other => other.to_string(),
    }
}

//! Tag scan, filter and bulk removal across taggable resources.

use std::collections::BTreeMap;

use async_stream::stream;
use futures::Stream;
use serde::{Deserialize, Serialize};
use tagfield_core::{HistoryOperation, HistoryRow, OperationResult, ResourceType};
use tracing::{info, instrument, warn};

use super::{Executor, HistoryLedger, Scanner};
use crate::shopify::AdminShopifyError;

/// How a condition compares against a tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TagMatch {
    Exact,
    StartsWith,
    EndsWith,
    Contains,
}

/// One filter condition. Comparison is case-insensitive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagCondition {
    #[serde(rename = "match")]
    pub kind: TagMatch,
    pub value: String,
}

impl TagCondition {
    #[must_use]
    pub fn new(kind: TagMatch, value: impl Into<String>) -> Self {
        Self {
            kind,
            value: value.into(),
        }
    }

    #[must_use]
    pub fn matches(&self, tag: &str) -> bool {
        let tag = tag.to_lowercase();
        let value = self.value.trim().to_lowercase();
        match self.kind {
            TagMatch::Exact => tag == value,
            TagMatch::StartsWith => tag.starts_with(&value),
            TagMatch::EndsWith => tag.ends_with(&value),
            TagMatch::Contains => tag.contains(&value),
        }
    }
}

/// How conditions combine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Combinator {
    #[default]
    And,
    Or,
}

/// A set of conditions. An empty filter matches every tag.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagFilter {
    #[serde(default)]
    pub conditions: Vec<TagCondition>,
    #[serde(default)]
    pub combinator: Combinator,
}

impl TagFilter {
    #[must_use]
    pub fn matches(&self, tag: &str) -> bool {
        if self.conditions.is_empty() {
            return true;
        }
        match self.combinator {
            Combinator::And => self.conditions.iter().all(|c| c.matches(tag)),
            Combinator::Or => self.conditions.iter().any(|c| c.matches(tag)),
        }
    }
}

/// Progress of a remove-everywhere run.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum TagRemovalEvent {
    Row {
        resource_type: ResourceType,
        result: OperationResult,
    },
    Recorded {
        resource_type: ResourceType,
        history_id: String,
    },
    Error {
        resource_type: ResourceType,
        message: String,
    },
    Finished {
        removed: usize,
        failed: usize,
    },
}

/// Shopify search query selecting resources carrying any of `tags`.
#[must_use]
pub fn tag_query(tags: &[String]) -> String {
    tags.iter()
        .map(|t| format!("tag:\"{}\"", t.replace('"', "\\\"")))
        .collect::<Vec<_>>()
        .join(" OR ")
}

/// Scans and removes tags.
#[derive(Clone)]
pub struct TagService {
    scanner: Scanner,
    executor: Executor,
    ledger: HistoryLedger,
}

impl TagService {
    #[must_use]
    pub const fn new(scanner: Scanner, executor: Executor, ledger: HistoryLedger) -> Self {
        Self {
            scanner,
            executor,
            ledger,
        }
    }

    /// Distinct tags used by the given resource types, sorted
    /// case-insensitively. The first spelling seen wins.
    ///
    /// # Errors
    ///
    /// Returns the first page error.
    #[instrument(skip(self))]
    pub async fn distinct_tags(&self, resource_types: &[ResourceType]) -> Result<Vec<String>, AdminShopifyError> {
        let mut seen: BTreeMap<String, String> = BTreeMap::new();
        for resource_type in resource_types.iter().copied().filter(|t| t.supports_tags()) {
            for node in self.scanner.all_tagged(resource_type, None).await? {
                for tag in node.tags {
                    let tag = tag.trim().to_string();
                    if !tag.is_empty() {
                        seen.entry(tag.to_lowercase()).or_insert(tag);
                    }
                }
            }
        }
        Ok(seen.into_values().collect())
    }

    /// Distinct tags across every taggable type that pass `filter`.
    ///
    /// # Errors
    ///
    /// Returns the first page error.
    pub async fn search(&self, filter: &TagFilter) -> Result<Vec<String>, AdminShopifyError> {
        let tags = self.distinct_tags(&ResourceType::ALL).await?;
        let matched: Vec<String> = tags.into_iter().filter(|t| filter.matches(t)).collect();
        info!(matched = matched.len(), "Tag search finished");
        Ok(matched)
    }

    /// Remove `tags` from every taggable resource that carries any of them.
    ///
    /// Each resource type gets its own `Tags-removed` record. A page error
    /// ends that type's scan and moves on to the next type.
    pub fn remove_everywhere(
        &self,
        tags: Vec<String>,
    ) -> impl Stream<Item = TagRemovalEvent> + Send + 'static + use<> {
        let service = self.clone();
        stream! {
            let wanted: Vec<String> = tags.iter().map(|t| t.trim().to_lowercase()).filter(|t| !t.is_empty()).collect();
            let query = tag_query(&tags);
            let mut removed = 0;
            let mut failed = 0;

            for resource_type in ResourceType::ALL.into_iter().filter(|t| t.supports_tags()) {
                let nodes = match service.scanner.all_tagged(resource_type, Some(&query)).await {
                    Ok(nodes) => nodes,
                    Err(e) => {
                        warn!(resource = %resource_type, error = %e, "Tag scan failed");
                        yield TagRemovalEvent::Error { resource_type, message: e.to_string() };
                        continue;
                    }
                };

                let mut rows = Vec::new();
                for node in nodes {
                    let present: Vec<String> = node
                        .tags
                        .iter()
                        .filter(|t| wanted.contains(&t.trim().to_lowercase()))
                        .cloned()
                        .collect();
                    if present.is_empty() {
                        continue;
                    }
                    let result = service.executor.remove_tags(&node.id, &present).await;
                    if result.success {
                        removed += 1;
                        rows.push(HistoryRow::tags_removed(node.id.clone(), present));
                    } else {
                        failed += 1;
                    }
                    yield TagRemovalEvent::Row { resource_type, result };
                }

                match service.ledger.record(HistoryOperation::TagsRemoved, resource_type, rows).await {
                    Ok(Some(record)) => {
                        yield TagRemovalEvent::Recorded { resource_type, history_id: record.id };
                    }
                    Ok(None) => {}
                    Err(e) => warn!(resource = %resource_type, error = %e, "Failed to record tag removal"),
                }
            }

            info!(removed, failed, "Tag removal finished");
            yield TagRemovalEvent::Finished { removed, failed };
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Arc;

    use futures::StreamExt;

    use super::*;
    use crate::shopify::{ResourceTypeCatalog, fake::FakeShop};

    fn service(shop: &Arc<FakeShop>) -> TagService {
        let client = shop.client();
        let scanner = Scanner::new(client.clone(), Arc::new(ResourceTypeCatalog::new()));
        TagService::new(scanner, Executor::new(client.clone()), HistoryLedger::new(client))
    }

    #[test]
    fn test_conditions_are_case_insensitive() {
        assert!(TagCondition::new(TagMatch::Exact, "Sale").matches("SALE"));
        assert!(TagCondition::new(TagMatch::StartsWith, "summer").matches("Summer-2024"));
        assert!(TagCondition::new(TagMatch::EndsWith, "-2024").matches("Summer-2024"));
        assert!(TagCondition::new(TagMatch::Contains, "MER").matches("summer"));
        assert!(!TagCondition::new(TagMatch::Exact, "sale").matches("sales"));
    }

    #[test]
    fn test_filter_combinators() {
        let mut filter = TagFilter {
            conditions: vec![
                TagCondition::new(TagMatch::StartsWith, "summer"),
                TagCondition::new(TagMatch::EndsWith, "2024"),
            ],
            combinator: Combinator::And,
        };
        assert!(filter.matches("summer-2024"));
        assert!(!filter.matches("summer-2023"));

        filter.combinator = Combinator::Or;
        assert!(filter.matches("summer-2023"));
        assert!(!filter.matches("winter-2023"));

        assert!(TagFilter::default().matches("anything"));
    }

    #[test]
    fn test_filter_deserializes() {
        let filter: TagFilter = serde_json::from_str(
            r#"{"conditions":[{"match":"contains","value":"x"}],"combinator":"OR"}"#,
        )
        .unwrap();
        assert_eq!(filter.combinator, Combinator::Or);
        assert_eq!(filter.conditions[0].kind, TagMatch::Contains);
    }

    #[test]
    fn test_tag_query() {
        assert_eq!(
            tag_query(&["a".into(), "b \"c\"".into()]),
            r#"tag:"a" OR tag:"b \"c\"""#
        );
    }

    #[tokio::test]
    async fn test_search_collects_distinct_tags() {
        let shop = FakeShop::new();
        let product = shop.add_owner(ResourceType::Product, 1);
        let customer = shop.add_owner(ResourceType::Customer, 2);
        shop.set_tags(&product, &["Sale", "summer-2024"]);
        shop.set_tags(&customer, &["sale", "VIP"]);

        let tags = service(&shop).search(&TagFilter::default()).await.unwrap();
        assert_eq!(tags, vec!["Sale", "summer-2024", "VIP"]);

        let filter = TagFilter {
            conditions: vec![TagCondition::new(TagMatch::StartsWith, "s")],
            combinator: Combinator::And,
        };
        let tags = service(&shop).search(&filter).await.unwrap();
        assert_eq!(tags, vec!["Sale", "summer-2024"]);
    }

    #[tokio::test]
    async fn test_remove_everywhere_records_per_type() {
        let shop = FakeShop::new();
        let product = shop.add_owner(ResourceType::Product, 1);
        let untouched = shop.add_owner(ResourceType::Product, 2);
        let order = shop.add_owner(ResourceType::Order, 3);
        shop.set_tags(&product, &["Old", "keep"]);
        shop.set_tags(&untouched, &["keep"]);
        shop.set_tags(&order, &["old"]);

        let events: Vec<TagRemovalEvent> = service(&shop)
            .remove_everywhere(vec!["old".into()])
            .collect()
            .await;

        assert_eq!(shop.tags_of(&product), vec!["keep"]);
        assert_eq!(shop.tags_of(&untouched), vec!["keep"]);
        assert!(shop.tags_of(&order).is_empty());
        assert_eq!(shop.calls("TagsRemove"), 2);

        let recorded = events
            .iter()
            .filter(|e| matches!(e, TagRemovalEvent::Recorded { .. }))
            .count();
        assert_eq!(recorded, 2);
        assert!(matches!(
            events.last(),
            Some(TagRemovalEvent::Finished { removed: 2, failed: 0 })
        ));
    }
}

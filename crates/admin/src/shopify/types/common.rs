//! Common shapes shared across Admin API responses.

use serde::{Deserialize, Serialize};

// =============================================================================
// Pagination Types
// =============================================================================

/// Pagination info for cursor-based pagination.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageInfo {
    /// Whether there are more items after this page.
    #[serde(default)]
    pub has_next_page: bool,
    /// Whether there are items before this page.
    #[serde(default)]
    pub has_previous_page: bool,
    /// Cursor for the first item.
    #[serde(default)]
    pub start_cursor: Option<String>,
    /// Cursor for the last item.
    #[serde(default)]
    pub end_cursor: Option<String>,
}

/// A Relay-style connection.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Connection<T> {
    #[serde(default = "Vec::new")]
    pub edges: Vec<Edge<T>>,
    #[serde(default)]
    pub page_info: PageInfo,
}

impl<T> Connection<T> {
    /// Consume the connection, keeping only the nodes.
    pub fn into_nodes(self) -> Vec<T> {
        self.edges.into_iter().map(|e| e.node).collect()
    }

    /// Cursor to resume after this page: `endCursor`, else the last edge's cursor.
    #[must_use]
    pub fn next_cursor(&self) -> Option<String> {
        self.page_info
            .end_cursor
            .clone()
            .or_else(|| self.edges.last().and_then(|e| e.cursor.clone()))
    }
}

/// One page of a scan: the items plus where to resume.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Page<T> {
    pub items: Vec<T>,
    pub next_cursor: Option<String>,
    pub has_more: bool,
}

impl<T> Page<T> {
    /// An exhausted, empty page.
    #[must_use]
    pub const fn empty() -> Self {
        Self {
            items: Vec::new(),
            next_cursor: None,
            has_more: false,
        }
    }

    /// Build a page from a connection that may be missing from the response.
    ///
    /// A missing connection is an empty, final page so scan loops terminate.
    #[must_use]
    pub fn from_connection(connection: Option<Connection<T>>) -> Self {
        let Some(connection) = connection else {
            return Self::empty();
        };
        let next_cursor = connection.next_cursor();
        // A page that claims more but gives no cursor would loop forever.
        let has_more = connection.page_info.has_next_page && next_cursor.is_some();
        Self {
            items: connection.into_nodes(),
            next_cursor,
            has_more,
        }
    }
}

/// A connection edge.
#[derive(Debug, Clone, Deserialize)]
pub struct Edge<T> {
    #[serde(default)]
    pub cursor: Option<String>,
    pub node: T,
}

/// A connection selected with `nodes { ... }` instead of edges.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeList<T> {
    #[serde(default = "Vec::new")]
    pub nodes: Vec<T>,
    #[serde(default)]
    pub page_info: PageInfo,
}

/// A node selected only for its ID.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct IdNode {
    pub id: String,
}

/// A node with its tag list.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct TaggedNode {
    pub id: String,
    #[serde(default)]
    pub tags: Vec<String>,
}

/// Result of a `*Count` query.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct Count {
    pub count: u64,
}

/// A mutation `userErrors` entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserError {
    #[serde(default)]
    pub field: Option<Vec<String>>,
    pub message: String,
}

impl UserError {
    /// Join user errors as `field.path: message; ...`.
    #[must_use]
    pub fn join(errors: &[Self]) -> String {
        errors
            .iter()
            .map(|e| match e.field.as_deref() {
                Some(field) if !field.is_empty() => format!("{}: {}", field.join("."), e.message),
                _ => e.message.clone(),
            })
            .collect::<Vec<_>>()
            .join("; ")
    }
}

/// Shop identity used to attribute history records.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShopIdentity {
    #[serde(default)]
    pub email: Option<String>,
    pub myshopify_domain: String,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_user_error_join() {
        let errors = vec![
            UserError {
                field: Some(vec!["metafields".into(), "0".into(), "value".into()]),
                message: "Value is invalid".into(),
            },
            UserError {
                field: None,
                message: "Something else".into(),
            },
        ];
        assert_eq!(
            UserError::join(&errors),
            "metafields.0.value: Value is invalid; Something else"
        );
    }

    #[test]
    fn test_connection_next_cursor_falls_back_to_edges() {
        let conn: Connection<IdNode> = serde_json::from_value(json!({
            "edges": [{"cursor": "c1", "node": {"id": "a"}}, {"cursor": "c2", "node": {"id": "b"}}],
            "pageInfo": {"hasNextPage": true}
        }))
        .unwrap();
        assert_eq!(conn.next_cursor().as_deref(), Some("c2"));
        assert_eq!(conn.into_nodes().len(), 2);
    }

    #[test]
    fn test_missing_connection_is_final_empty_page() {
        let page: Page<IdNode> = Page::from_connection(None);
        assert!(page.items.is_empty());
        assert!(!page.has_more);
    }

    #[test]
    fn test_page_without_cursor_stops() {
        let conn: Connection<IdNode> = serde_json::from_value(json!({
            "edges": [],
            "pageInfo": {"hasNextPage": true}
        }))
        .unwrap();
        assert!(!Page::from_connection(Some(conn)).has_more);
    }
}

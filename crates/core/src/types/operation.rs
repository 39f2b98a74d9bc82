//! Per-row operation outcomes.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Why a row failed.
///
/// Every failure ends up as `success: false`; the kind lets reports tell a
/// malformed value apart from an upstream rejection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// The input could not be normalized (bad integer, bad URL, ...).
    Validation,
    /// An identifier or reference could not be mapped to a GID.
    Resolution,
    /// Shopify answered with `userErrors`.
    Upstream,
    /// Network, auth, rate limiting or an unparseable response.
    Transport,
}

impl FailureKind {
    /// Lowercase label used in reports.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Validation => "validation",
            Self::Resolution => "resolution",
            Self::Upstream => "upstream",
            Self::Transport => "transport",
        }
    }
}

/// The outcome of applying one operation to one resource.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OperationResult {
    /// The resolved GID, or the raw identifier when resolution failed.
    pub id: String,
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_kind: Option<FailureKind>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl OperationResult {
    /// A successful result with no payload.
    #[must_use]
    pub fn ok(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            success: true,
            error: None,
            error_kind: None,
            data: None,
        }
    }

    /// A successful result carrying data.
    #[must_use]
    pub fn ok_with(id: impl Into<String>, data: Value) -> Self {
        Self {
            data: Some(data),
            ..Self::ok(id)
        }
    }

    /// A failed result.
    #[must_use]
    pub fn failed(id: impl Into<String>, kind: FailureKind, error: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            success: false,
            error: Some(error.into()),
            error_kind: Some(kind),
            data: None,
        }
    }

    /// Attach data to a result.
    #[must_use]
    pub fn with_data(mut self, data: Value) -> Self {
        self.data = Some(data);
        self
    }
}

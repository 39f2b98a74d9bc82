//! Core types for tagfield.
//!
//! This module provides typed wrappers for Shopify identifiers, resource
//! types, metafield types, operation outcomes and history records.

pub mod gid;
pub mod history;
pub mod metafield;
pub mod operation;
pub mod resource;

pub use gid::{Gid, GidError};
pub use history::*;
pub use metafield::*;
pub use operation::{FailureKind, OperationResult};
pub use resource::{MatchField, ResourceType};

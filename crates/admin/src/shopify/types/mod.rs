//! Domain types for Shopify Admin API responses.
//!
//! These mirror the selections made in [`super::queries`]; fields that a
//! document never selects are not modelled.

pub mod common;
pub mod metafield;
pub mod metaobject;

// Re-export all types for convenience
pub use common::*;
pub use metafield::*;
pub use metaobject::*;

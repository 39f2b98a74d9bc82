//! tagfield Core - Shared types library.
//!
//! This crate provides the types shared by the tagfield components:
//! - `admin` - Shopify client, batch engine and HTTP API
//! - `cli` - Command-line front end for batches, history and exports
//!
//! # Architecture
//!
//! The core crate contains only types - no I/O, no HTTP clients. Parsing of
//! GIDs, metafield type names and stored history records lives here so both
//! front ends agree on it.
//!
//! # Modules
//!
//! - [`types`] - GIDs, resource types, metafield types, results and history records

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;

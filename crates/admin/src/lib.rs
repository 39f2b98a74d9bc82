//! Tagfield admin library.
//!
//! Bulk tag and metafield management for a Shopify store: identifier
//! resolution, value normalization, batch mutation, paginated scans, a
//! history ledger stored in metaobjects and undo replay.
//!
//! # Security
//!
//! This crate holds a Shopify Admin API token with write access to
//! products, customers, orders and metaobjects. Run the server on a private
//! network only.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod config;
pub mod csv;
pub mod error;
pub mod routes;
pub mod services;
pub mod shopify;
pub mod state;

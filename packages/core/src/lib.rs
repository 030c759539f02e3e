//! PathTree Core - Materialized-Path Trees over Document Stores
//!
//! This crate maintains single-parent tree relationships between flat
//! documents. Every document stores its `parent` id and a materialized `path`
//! (the ancestor ids joined by a separator), which turns subtree questions into
//! prefix queries.
//!
//! # Architecture
//!
//! - **Path encoding**: `path = parent.path + sep + id`, roots have `path = id`
//! - **Store-agnostic**: all persistence goes through the async `DocumentStore` trait
//! - **Cascading writes**: moves rewrite descendant paths, deletes remove the subtree
//! - **Explicit configuration**: the separator travels in `TreeConfig`, never a global
//!
//! # Modules
//!
//! - [`config`] - Tree configuration (separator, stream page size)
//! - [`path_codec`] - Pure functions over materialized paths
//! - [`models`] - Documents, updates and the store query vocabulary
//! - [`db`] - `DocumentStore` trait, in-memory and SurrealDB stores, domain events
//! - [`services`] - `TreeService` and the components it is built from

pub mod config;
pub mod db;
pub mod models;
pub mod path_codec;
pub mod services;

// Re-export commonly used types
pub use config::TreeConfig;
pub use models::*;
pub use path_codec::PathCodec;
pub use services::*;

//! Database Layer
//!
//! This module holds everything the tree layer knows about persistence:
//!
//! - `DocumentStore` - the async collection trait the services are written against
//! - `InMemoryStore` - a `BTreeMap`-backed store for tests and tooling
//! - `SurrealDocumentStore` - an embedded SurrealDB store (feature `surrealdb`)
//! - `DomainEvent` - notifications broadcast after mutations
//!
//! # Architecture
//!
//! Stores only persist documents and answer filters. They know nothing about
//! paths beyond the `path_prefix` constraint; computing, rewriting and
//! interpreting materialized paths belongs to the service layer.

mod document_store;
mod error;
pub mod events;
mod memory_store;
#[cfg(feature = "surrealdb")]
mod surreal_store;

pub use document_store::{DocumentStore, NodeStream};
pub use error::{StoreError, StoreResult};
pub use events::DomainEvent;
pub use memory_store::InMemoryStore;
#[cfg(feature = "surrealdb")]
pub use surreal_store::SurrealDocumentStore;

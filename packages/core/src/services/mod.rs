//! Tree Services
//!
//! This module contains the tree logic layered over a `DocumentStore`:
//!
//! - `TreeService` - mutations, relative queries and nested subtree fetching
//! - `MutationCoordinator` - path computation and descendant cascades
//! - `QueryDerivation` - filters for children, parent and ancestors
//! - `TreeBuilder` - flat-to-nested reconstruction for `get_children_tree`

pub mod error;
pub mod mutation;
pub mod query;
pub mod tree_builder;
pub mod tree_service;


pub use error::{TreeError, TreeResult};
pub use mutation::{MutationCoordinator, SaveKind};
pub use query::QueryDerivation;
pub use tree_builder::{ChildrenTreeOptions, TreeBuilder, TreeEntry};
pub use tree_service::{TreeService, DOMAIN_EVENT_CHANNEL_CAPACITY};

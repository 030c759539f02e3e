//! DocumentStore Trait - Collection Abstraction
//!
//! The tree layer never talks to a database directly. Everything it needs from
//! the collection holding the nodes is expressed by this trait: point lookups,
//! filtered finds, an incremental stream of matches, partial updates and bulk
//! removal.
//!
//! # Design Decisions
//!
//! 1. **Async-First**: every call may suspend; embedded and networked backends
//!    share one interface
//! 2. **No transactions**: each call stands alone, multi-document atomicity is
//!    not assumed
//! 3. **Streams for cascades**: `stream` hands descendants over one at a time
//!    so a subtree rewrite never needs the whole subtree in memory
//!
//! # Examples
//!
//! ```rust
//! use pathtree_core::db::{DocumentStore, InMemoryStore};
//! use pathtree_core::models::{NodeFilter, TreeNode};
//! use serde_json::json;
//!
//! # tokio_test::block_on(async {
//! let store = InMemoryStore::new();
//! let mut node = TreeNode::new_with_id("A".to_string(), None, json!({}));
//! node.path = Some("A".to_string());
//! store.insert(node).await?;
//!
//! let found = store.find_one(&NodeFilter::by_id("A")).await?;
//! assert!(found.is_some());
//! # Ok::<(), pathtree_core::db::StoreError>(())
//! # });
//! ```

use crate::db::error::StoreResult;
use crate::models::{FindOptions, NodeFilter, NodePatch, Projection, TreeNode};
use async_trait::async_trait;
use std::pin::Pin;
use tokio_stream::Stream;

/// Incremental producer of matching documents
///
/// The stream ends when the producer closes; an `Err` item is the error
/// signal and callers stop consuming at the first one.
pub type NodeStream = Pin<Box<dyn Stream<Item = StoreResult<TreeNode>> + Send>>;

/// Abstraction over the collection that stores tree nodes
///
/// # Thread Safety
///
/// Implementations must be `Send + Sync` so a store can be shared between
/// tasks behind an `Arc`.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Insert a new document
    ///
    /// # Errors
    ///
    /// Returns `StoreError::DuplicateId` if a document with the same id exists.
    async fn insert(&self, node: TreeNode) -> StoreResult<TreeNode>;

    /// Return at most one document matching `filter`
    async fn find_one(&self, filter: &NodeFilter) -> StoreResult<Option<TreeNode>>;

    /// Return every document matching `filter`, sorted, paged and projected
    /// according to `options` and `projection`
    async fn find(
        &self,
        filter: &NodeFilter,
        projection: Option<&Projection>,
        options: &FindOptions,
    ) -> StoreResult<Vec<TreeNode>>;

    /// Open an incremental stream over every document matching `filter`
    ///
    /// Documents may be updated while the stream is being consumed.
    async fn stream(&self, filter: &NodeFilter) -> StoreResult<NodeStream>;

    /// Apply `patch` to every document matching `filter`
    ///
    /// Returns the number of documents updated.
    async fn update(&self, filter: &NodeFilter, patch: &NodePatch) -> StoreResult<u64>;

    /// Remove every document matching `filter`
    ///
    /// Returns the number of documents removed.
    async fn remove(&self, filter: &NodeFilter) -> StoreResult<u64>;
}

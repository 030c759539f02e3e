//! Tree Service - Materialized-Path Tree Operations
//!
//! `TreeService` is the entry point for working with a tree stored in a
//! `DocumentStore`. It keeps every node's `path` consistent with its `parent`,
//! cascades moves and deletions to descendants, and answers relative queries
//! (children, parent, ancestors, nested subtree) from the path encoding.
//!
//! # Consistency
//!
//! Each mutation runs its descendant cascade before writing the node itself.
//! There are no transactions and no locking: concurrent mutations of
//! overlapping subtrees may interleave, and a failing cascade leaves already
//! rewritten descendants in place.
//!
//! # Events
//!
//! Every successful mutation is announced on a broadcast channel, see
//! [`TreeService::subscribe_to_events`].

use crate::config::TreeConfig;
use crate::db::{DocumentStore, DomainEvent};
use crate::models::{
    DeleteResult, FindOptions, NodeFilter, NodePatch, NodeUpdate, TreeNode, ValidationError,
};
use crate::path_codec::PathCodec;
use crate::services::error::{TreeError, TreeResult};
use crate::services::mutation::{MutationCoordinator, SaveKind};
use crate::services::query::QueryDerivation;
use crate::services::tree_builder::{ChildrenTreeOptions, TreeBuilder, TreeEntry};
use std::sync::Arc;
use tokio::sync::broadcast;

/// Capacity of the domain event channel
pub const DOMAIN_EVENT_CHANNEL_CAPACITY: usize = 128;

/// Materialized-path tree over a document store
///
/// # Examples
///
/// ```rust
/// use pathtree_core::db::InMemoryStore;
/// use pathtree_core::models::TreeNode;
/// use pathtree_core::services::TreeService;
/// use serde_json::json;
/// use std::sync::Arc;
///
/// # tokio_test::block_on(async {
/// let service = TreeService::new(Arc::new(InMemoryStore::new()));
///
/// let root = service
///     .create_node(TreeNode::new_with_id("A".to_string(), None, json!({})))
///     .await?;
/// let child = service
///     .create_node(TreeNode::new_with_id("B".to_string(), Some("A".to_string()), json!({})))
///     .await?;
///
/// assert_eq!(root.path.as_deref(), Some("A"));
/// assert_eq!(child.path.as_deref(), Some("A#B"));
/// assert_eq!(service.level(&child), 2);
/// # Ok::<(), pathtree_core::services::TreeError>(())
/// # });
/// ```
#[derive(Clone)]
pub struct TreeService {
    store: Arc<dyn DocumentStore>,
    codec: PathCodec,
    coordinator: MutationCoordinator,
    queries: QueryDerivation,
    builder: TreeBuilder,

    /// Broadcast channel for domain events (128 subscriber capacity)
    event_tx: broadcast::Sender<DomainEvent>,
}

impl TreeService {
    /// Create a service with the default configuration (separator `#`)
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self::with_codec(store, PathCodec::default())
    }

    /// Create a service from an explicit configuration
    ///
    /// # Errors
    ///
    /// Returns `TreeError::Configuration` if the configuration is invalid.
    pub fn with_config(store: Arc<dyn DocumentStore>, config: &TreeConfig) -> TreeResult<Self> {
        config.validate()?;
        Ok(Self::with_codec(store, PathCodec::from_config(config)))
    }

    fn with_codec(store: Arc<dyn DocumentStore>, codec: PathCodec) -> Self {
        let (event_tx, _) = broadcast::channel(DOMAIN_EVENT_CHANNEL_CAPACITY);

        Self {
            coordinator: MutationCoordinator::new(store.clone(), codec.clone()),
            queries: QueryDerivation::new(codec.clone()),
            builder: TreeBuilder::new(codec.clone()),
            store,
            codec,
            event_tx,
        }
    }

    /// Get access to the underlying store
    pub fn store(&self) -> &Arc<dyn DocumentStore> {
        &self.store
    }

    pub fn codec(&self) -> &PathCodec {
        &self.codec
    }

    /// Subscribe to domain events
    ///
    /// Returns a broadcast receiver that sees every event emitted after the
    /// call: node created, updated and deleted, plus descendant cascades.
    pub fn subscribe_to_events(&self) -> broadcast::Receiver<DomainEvent> {
        self.event_tx.subscribe()
    }

    /// Ignores errors if no subscribers
    fn emit_event(&self, event: DomainEvent) {
        let _ = self.event_tx.send(event);
    }

    fn validate(&self, node: &TreeNode) -> TreeResult<()> {
        node.validate()?;

        if node.id.contains(self.codec.separator()) {
            return Err(ValidationError::InvalidId(format!(
                "'{}' contains the path separator '{}'",
                node.id,
                self.codec.separator()
            ))
            .into());
        }

        Ok(())
    }

    /// Create a node, computing its path from its parent
    ///
    /// Any `path` set on the input is replaced.
    ///
    /// # Errors
    ///
    /// - `TreeError::Validation` if the node is malformed
    /// - `TreeError::NotFound` if the parent does not exist
    /// - `TreeError::MissingPath` if the parent has no path
    /// - `TreeError::Store` if the insert fails (e.g. duplicate id)
    pub async fn create_node(&self, mut node: TreeNode) -> TreeResult<TreeNode> {
        self.validate(&node)?;

        self.coordinator.on_save(&mut node, SaveKind::Created).await?;
        let created = self.store.insert(node).await?;

        tracing::debug!(node_id = %created.id, path = ?created.path, "Created node");
        self.emit_event(DomainEvent::NodeCreated(created.clone()));
        Ok(created)
    }

    /// Update a node's parent and/or properties
    ///
    /// A genuine parent change rewrites the paths of all descendants before the
    /// node itself is written.
    ///
    /// # Errors
    ///
    /// - `TreeError::NotFound` if the node or the new parent does not exist
    /// - `TreeError::CircularReference` if the new parent is inside the node's subtree
    /// - `TreeError::Store` if the cascade or the final write fails
    pub async fn update_node(&self, id: &str, update: NodeUpdate) -> TreeResult<TreeNode> {
        let mut node = self
            .get_node(id)
            .await?
            .ok_or_else(|| TreeError::not_found(id))?;

        let old_path = node.path.clone();
        let old_parent = node.parent.clone();

        if let Some(parent) = update.parent {
            node.parent = parent;
        }
        if let Some(properties) = update.properties {
            node.properties = properties;
        }
        self.validate(&node)?;

        let kind = SaveKind::for_update(old_parent.as_deref(), node.parent.as_deref());
        let rewritten = self.coordinator.on_save(&mut node, kind).await?;

        let patch = NodePatch {
            parent: (kind == SaveKind::ParentChanged).then(|| node.parent.clone()),
            path: node.path.clone().filter(|_| node.path != old_path),
            properties: Some(node.properties.clone()),
        };
        self.store.update(&NodeFilter::by_id(id), &patch).await?;

        let updated = self
            .get_node(id)
            .await?
            .ok_or_else(|| TreeError::not_found(id))?;

        if rewritten > 0 {
            if let (Some(old_path), Some(new_path)) = (old_path, updated.path.as_deref()) {
                self.emit_event(DomainEvent::DescendantsRewritten {
                    ancestor_id: id.to_string(),
                    old_prefix: self.codec.descendant_prefix(&old_path),
                    new_prefix: self.codec.descendant_prefix(new_path),
                    count: rewritten,
                });
            }
        }
        self.emit_event(DomainEvent::NodeUpdated(updated.clone()));

        Ok(updated)
    }

    /// Move a node under `new_parent`, or make it a root with `None`
    pub async fn move_node(&self, id: &str, new_parent: Option<&str>) -> TreeResult<TreeNode> {
        self.update_node(
            id,
            NodeUpdate::new().with_parent(new_parent.map(str::to_string)),
        )
        .await
    }

    /// Delete a node together with its whole subtree
    ///
    /// Deleting a node that does not exist is not an error; the result
    /// reports `existed: false`.
    pub async fn delete_node(&self, id: &str) -> TreeResult<DeleteResult> {
        let Some(node) = self.get_node(id).await? else {
            return Ok(DeleteResult::not_found());
        };

        let descendants_removed = self.coordinator.on_remove(&node).await?;
        self.store.remove(&NodeFilter::by_id(id)).await?;

        tracing::debug!(node_id = %id, descendants_removed, "Deleted node");
        if descendants_removed > 0 {
            self.emit_event(DomainEvent::DescendantsRemoved {
                ancestor_id: id.to_string(),
                count: descendants_removed,
            });
        }
        self.emit_event(DomainEvent::NodeDeleted { id: id.to_string() });

        Ok(DeleteResult {
            existed: true,
            descendants_removed,
        })
    }

    pub async fn get_node(&self, id: &str) -> TreeResult<Option<TreeNode>> {
        Ok(self.store.find_one(&NodeFilter::by_id(id)).await?)
    }

    /// Direct children of `node`, or all descendants when `recursive`
    ///
    /// Results come back in the store's order.
    pub async fn get_children(&self, node: &TreeNode, recursive: bool) -> TreeResult<Vec<TreeNode>> {
        let filter = self.queries.children_filter(node, recursive)?;
        Ok(self.store.find(&filter, None, &FindOptions::new()).await?)
    }

    /// Parent of `node`; `None` for a root or a dangling parent reference
    pub async fn get_parent(&self, node: &TreeNode) -> TreeResult<Option<TreeNode>> {
        match self.queries.parent_filter(node) {
            Some(filter) => Ok(self.store.find_one(&filter).await?),
            None => Ok(None),
        }
    }

    /// Ancestors named in the node's path, in the store's order
    pub async fn get_ancestors(&self, node: &TreeNode) -> TreeResult<Vec<TreeNode>> {
        let filter = self.queries.ancestors_filter(node);
        Ok(self.store.find(&filter, None, &FindOptions::new()).await?)
    }

    /// Ancestors ordered root first
    pub async fn get_ancestors_ordered(&self, node: &TreeNode) -> TreeResult<Vec<TreeNode>> {
        let ancestors = self.get_ancestors(node).await?;
        Ok(self.queries.order_ancestors(node, ancestors))
    }

    /// Children or subtree of `node` as nested entries
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use pathtree_core::db::InMemoryStore;
    /// # use pathtree_core::models::TreeNode;
    /// # use pathtree_core::services::{ChildrenTreeOptions, TreeService};
    /// # use serde_json::json;
    /// # use std::sync::Arc;
    /// # tokio_test::block_on(async {
    /// # let service = TreeService::new(Arc::new(InMemoryStore::new()));
    /// let a = service.create_node(TreeNode::new_with_id("A".into(), None, json!({}))).await?;
    /// service.create_node(TreeNode::new_with_id("B".into(), Some("A".into()), json!({}))).await?;
    /// service.create_node(TreeNode::new_with_id("C".into(), Some("B".into()), json!({}))).await?;
    ///
    /// let tree = service.get_children_tree(&a, ChildrenTreeOptions::recursive()).await?;
    /// assert_eq!(tree[0].node.id, "B");
    /// assert_eq!(tree[0].children()[0].node.id, "C");
    /// # Ok::<(), pathtree_core::services::TreeError>(())
    /// # });
    /// ```
    pub async fn get_children_tree(
        &self,
        node: &TreeNode,
        options: ChildrenTreeOptions,
    ) -> TreeResult<Vec<TreeEntry>> {
        let ChildrenTreeOptions {
            filters,
            fields,
            options,
            min_level,
            recursive,
            empty_childs,
        } = options;

        let filter = self.builder.augment_filter(node, filters, recursive)?;
        let projection = self.builder.augment_projection(fields);
        let find_options = self.builder.augment_options(options);

        let results = self
            .store
            .find(&filter, projection.as_ref(), &find_options)
            .await?;

        let min_level = self.builder.effective_min_level(node, min_level);
        Ok(self.builder.build(results, min_level, empty_childs))
    }

    /// Depth of `node`: 1 for a root, 0 when the node has no path
    pub fn level(&self, node: &TreeNode) -> usize {
        self.codec.level(node.path.as_deref())
    }
}

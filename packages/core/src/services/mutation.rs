//! Mutation Coordinator
//!
//! Keeps materialized paths consistent when documents are saved or removed.
//! The coordinator runs before the caller persists its own change: it computes
//! the node's path from its parent, rewrites the paths of every stored
//! descendant when the node moves, and removes the subtree below a node that
//! is being deleted.
//!
//! Cascades are sequential and unbatched. The first failing store call aborts
//! the cascade and is returned; descendants already rewritten stay rewritten.

use crate::db::DocumentStore;
use crate::models::{NodeFilter, NodePatch, TreeNode};
use crate::path_codec::PathCodec;
use crate::services::error::{TreeError, TreeResult};
use std::sync::Arc;
use tokio_stream::StreamExt;

/// How a save relates to the stored version of the node
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveKind {
    /// The node has never been stored
    Created,
    /// The node exists and its parent is being replaced
    ParentChanged,
    /// The node exists and its parent is untouched
    Unchanged,
}

impl SaveKind {
    /// Classify an update of an existing node from its old and new parent
    pub fn for_update(old_parent: Option<&str>, new_parent: Option<&str>) -> Self {
        if old_parent == new_parent {
            SaveKind::Unchanged
        } else {
            SaveKind::ParentChanged
        }
    }
}

/// Computes paths and runs descendant cascades against a document store
#[derive(Clone)]
pub struct MutationCoordinator {
    store: Arc<dyn DocumentStore>,
    codec: PathCodec,
}

impl MutationCoordinator {
    pub fn new(store: Arc<dyn DocumentStore>, codec: PathCodec) -> Self {
        Self { store, codec }
    }

    /// Prepare `node` for persistence
    ///
    /// Sets `node.path` from the node's parent and, when an existing node moves,
    /// rewrites the path of every stored descendant. The node itself is not
    /// written; the caller persists it afterwards.
    ///
    /// Returns the number of descendants rewritten.
    ///
    /// # Errors
    ///
    /// - `TreeError::NotFound` if the parent does not exist
    /// - `TreeError::MissingPath` if the parent has never been materialized
    /// - `TreeError::CircularReference` if the parent lies inside the node's subtree
    /// - `TreeError::Store` if a lookup, stream item or descendant update fails
    pub async fn on_save(&self, node: &mut TreeNode, kind: SaveKind) -> TreeResult<u64> {
        if kind == SaveKind::Unchanged {
            return Ok(0);
        }

        let new_path = match node.parent.as_deref() {
            None => self.codec.root_path(&node.id),
            Some(parent_id) => {
                let parent = self
                    .store
                    .find_one(&NodeFilter::by_id(parent_id))
                    .await?
                    .ok_or_else(|| TreeError::not_found(parent_id))?;

                let parent_path = parent
                    .path
                    .as_deref()
                    .filter(|p| !p.is_empty())
                    .ok_or_else(|| TreeError::missing_path(parent_id))?;

                if self.codec.contains_segment(parent_path, &node.id) {
                    return Err(TreeError::circular_reference(format!(
                        "Cannot move node {} under its descendant {}",
                        node.id, parent_id
                    )));
                }

                self.codec.child_path(parent_path, &node.id)
            }
        };

        let mut rewritten = 0;
        if kind == SaveKind::ParentChanged {
            if let Some(old_path) = node.path.clone().filter(|p| !p.is_empty()) {
                if old_path != new_path {
                    rewritten = self.rewrite_descendants(&old_path, &new_path).await?;
                }
            }
        }

        node.path = Some(new_path);
        Ok(rewritten)
    }

    /// Remove every stored descendant of `node`
    ///
    /// Issues a single prefix removal; the node itself is left to the caller.
    /// A node without a path has no descendants on record.
    pub async fn on_remove(&self, node: &TreeNode) -> TreeResult<u64> {
        let Some(path) = node.path.as_deref().filter(|p| !p.is_empty()) else {
            return Ok(0);
        };

        let prefix = self.codec.descendant_prefix(path);
        let removed = self
            .store
            .remove(&NodeFilter::new().with_path_prefix(prefix.clone()))
            .await?;

        tracing::debug!(node_id = %node.id, %prefix, removed, "Removed descendants");
        Ok(removed)
    }

    async fn rewrite_descendants(&self, old_path: &str, new_path: &str) -> TreeResult<u64> {
        let prefix = self.codec.descendant_prefix(old_path);
        tracing::debug!(%old_path, %new_path, "Rewriting descendant paths");

        let mut descendants = self
            .store
            .stream(&NodeFilter::new().with_path_prefix(prefix))
            .await?;

        let mut rewritten = 0;
        while let Some(descendant) = descendants.next().await {
            let descendant = descendant?;

            let Some(rewritten_path) = descendant
                .path
                .as_deref()
                .and_then(|path| self.codec.rewrite_prefix(old_path, new_path, path))
            else {
                tracing::warn!(
                    "Skipping descendant {} with path {:?} outside subtree {}",
                    descendant.id,
                    descendant.path,
                    old_path
                );
                continue;
            };

            self.store
                .update(
                    &NodeFilter::by_id(&descendant.id),
                    &NodePatch::path(rewritten_path),
                )
                .await?;
            rewritten += 1;
        }

        tracing::info!(%old_path, %new_path, rewritten, "Rewrote descendant paths");
        Ok(rewritten)
    }
}

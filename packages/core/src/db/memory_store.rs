//! InMemoryStore - DocumentStore over a BTreeMap
//!
//! Keeps every document in a `BTreeMap` keyed by id behind a tokio `RwLock`.
//! Used by tests, benchmarks and the dev tools, and as the reference
//! implementation of the `DocumentStore` contract.
//!
//! `stream` snapshots the matching documents before returning, so the stream
//! holds no lock and callers can update documents while consuming it.

use crate::db::document_store::{DocumentStore, NodeStream};
use crate::db::error::{StoreError, StoreResult};
use crate::models::{FindOptions, NodeFilter, NodePatch, Projection, TreeNode};
use async_trait::async_trait;
use std::collections::BTreeMap;
use tokio::sync::RwLock;

#[derive(Debug, Default)]
pub struct InMemoryStore {
    docs: RwLock<BTreeMap<String, TreeNode>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store pre-populated with documents, stored as given
    pub fn with_documents(nodes: impl IntoIterator<Item = TreeNode>) -> Self {
        let docs = nodes
            .into_iter()
            .map(|node| (node.id.clone(), node))
            .collect();
        Self {
            docs: RwLock::new(docs),
        }
    }

    /// Number of stored documents
    pub async fn len(&self) -> usize {
        self.docs.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.docs.read().await.is_empty()
    }

    /// Copy of every stored document, ordered by id
    pub async fn snapshot(&self) -> Vec<TreeNode> {
        self.docs.read().await.values().cloned().collect()
    }

    async fn matching(&self, filter: &NodeFilter) -> Vec<TreeNode> {
        let docs = self.docs.read().await;

        // Point lookups skip the scan
        if let Some(id) = &filter.id {
            return docs
                .get(id)
                .filter(|node| filter.matches(node))
                .cloned()
                .into_iter()
                .collect();
        }

        docs.values()
            .filter(|node| filter.matches(node))
            .cloned()
            .collect()
    }
}

#[async_trait]
impl DocumentStore for InMemoryStore {
    async fn insert(&self, node: TreeNode) -> StoreResult<TreeNode> {
        let mut docs = self.docs.write().await;
        if docs.contains_key(&node.id) {
            return Err(StoreError::duplicate_id(node.id));
        }
        docs.insert(node.id.clone(), node.clone());
        Ok(node)
    }

    async fn find_one(&self, filter: &NodeFilter) -> StoreResult<Option<TreeNode>> {
        Ok(self.matching(filter).await.into_iter().next())
    }

    async fn find(
        &self,
        filter: &NodeFilter,
        projection: Option<&Projection>,
        options: &FindOptions,
    ) -> StoreResult<Vec<TreeNode>> {
        let nodes = self.matching(filter).await;
        Ok(options.apply(nodes, projection))
    }

    async fn stream(&self, filter: &NodeFilter) -> StoreResult<NodeStream> {
        let nodes = self.matching(filter).await;
        Ok(Box::pin(tokio_stream::iter(nodes.into_iter().map(Ok))))
    }

    async fn update(&self, filter: &NodeFilter, patch: &NodePatch) -> StoreResult<u64> {
        let mut docs = self.docs.write().await;
        let mut updated = 0;
        for node in docs.values_mut().filter(|node| filter.matches(node)) {
            node.apply_patch(patch);
            updated += 1;
        }
        Ok(updated)
    }

    async fn remove(&self, filter: &NodeFilter) -> StoreResult<u64> {
        let mut docs = self.docs.write().await;
        let before = docs.len();
        docs.retain(|_, node| !filter.matches(node));
        Ok((before - docs.len()) as u64)
    }
}

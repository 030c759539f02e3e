//! Shared helpers for integration tests
//!
//! Store wrappers that delegate to an `InMemoryStore` while recording or
//! sabotaging the calls the tree layer makes.

#![allow(dead_code)]

use async_trait::async_trait;
use pathtree_core::db::{DocumentStore, InMemoryStore, NodeStream, StoreError, StoreResult};
use pathtree_core::models::{FindOptions, NodeFilter, NodePatch, Projection, TreeNode};
use pathtree_core::services::TreeService;
use serde_json::json;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio_stream::StreamExt;

pub fn node(id: &str, parent: Option<&str>) -> TreeNode {
    TreeNode::new_with_id(id.to_string(), parent.map(str::to_string), json!({}))
}

pub fn named(id: &str, parent: Option<&str>, name: &str) -> TreeNode {
    TreeNode::new_with_id(
        id.to_string(),
        parent.map(str::to_string),
        json!({ "name": name }),
    )
}

/// Create `nodes` in order through `service`
pub async fn seed(service: &TreeService, nodes: Vec<TreeNode>) -> anyhow::Result<()> {
    for node in nodes {
        service.create_node(node).await?;
    }
    Ok(())
}

/// Stored path of `id`, `None` when the node is absent or unmaterialized
pub async fn stored_path(store: &dyn DocumentStore, id: &str) -> anyhow::Result<Option<String>> {
    Ok(store
        .find_one(&NodeFilter::by_id(id))
        .await?
        .and_then(|node| node.path))
}

/// Store that records every write it forwards
#[derive(Default)]
pub struct RecordingStore {
    pub inner: InMemoryStore,
    pub updates: Mutex<Vec<(NodeFilter, NodePatch)>>,
    pub removals: Mutex<Vec<NodeFilter>>,
}

impl RecordingStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn update_count(&self) -> usize {
        self.updates.lock().unwrap().len()
    }

    pub fn removals(&self) -> Vec<NodeFilter> {
        self.removals.lock().unwrap().clone()
    }

    pub fn clear(&self) {
        self.updates.lock().unwrap().clear();
        self.removals.lock().unwrap().clear();
    }
}

#[async_trait]
impl DocumentStore for RecordingStore {
    async fn insert(&self, node: TreeNode) -> StoreResult<TreeNode> {
        self.inner.insert(node).await
    }

    async fn find_one(&self, filter: &NodeFilter) -> StoreResult<Option<TreeNode>> {
        self.inner.find_one(filter).await
    }

    async fn find(
        &self,
        filter: &NodeFilter,
        projection: Option<&Projection>,
        options: &FindOptions,
    ) -> StoreResult<Vec<TreeNode>> {
        self.inner.find(filter, projection, options).await
    }

    async fn stream(&self, filter: &NodeFilter) -> StoreResult<NodeStream> {
        self.inner.stream(filter).await
    }

    async fn update(&self, filter: &NodeFilter, patch: &NodePatch) -> StoreResult<u64> {
        self.updates
            .lock()
            .unwrap()
            .push((filter.clone(), patch.clone()));
        self.inner.update(filter, patch).await
    }

    async fn remove(&self, filter: &NodeFilter) -> StoreResult<u64> {
        self.removals.lock().unwrap().push(filter.clone());
        self.inner.remove(filter).await
    }
}

/// Store that fails on demand
///
/// Updates start failing after `successful_updates` have passed. Streams can
/// be made to yield an error after a number of documents, and lookups of one
/// id can be made to fail.
pub struct FailingStore {
    pub inner: InMemoryStore,
    successful_updates: usize,
    updates: AtomicUsize,
    stream_items_before_error: Mutex<Option<usize>>,
    failing_lookup: Mutex<Option<String>>,
}

impl FailingStore {
    pub fn new(successful_updates: usize) -> Self {
        Self {
            inner: InMemoryStore::new(),
            successful_updates,
            updates: AtomicUsize::new(0),
            stream_items_before_error: Mutex::new(None),
            failing_lookup: Mutex::new(None),
        }
    }

    /// Reset the counter so the next `successful_updates` updates pass
    pub fn reset(&self) {
        self.updates.store(0, Ordering::SeqCst);
    }

    /// Make every later stream yield an error after `items` documents
    pub fn fail_streams_after(&self, items: usize) {
        *self.stream_items_before_error.lock().unwrap() = Some(items);
    }

    /// Make every later `find_one` for `id` fail
    pub fn fail_lookups_of(&self, id: &str) {
        *self.failing_lookup.lock().unwrap() = Some(id.to_string());
    }
}

#[async_trait]
impl DocumentStore for FailingStore {
    async fn insert(&self, node: TreeNode) -> StoreResult<TreeNode> {
        self.inner.insert(node).await
    }

    async fn find_one(&self, filter: &NodeFilter) -> StoreResult<Option<TreeNode>> {
        let failing = self.failing_lookup.lock().unwrap().clone();
        if failing.is_some() && filter.id == failing {
            return Err(StoreError::query_failed(format!(
                "lookup of {} rejected",
                filter.id.as_deref().unwrap_or_default()
            )));
        }
        self.inner.find_one(filter).await
    }

    async fn find(
        &self,
        filter: &NodeFilter,
        projection: Option<&Projection>,
        options: &FindOptions,
    ) -> StoreResult<Vec<TreeNode>> {
        self.inner.find(filter, projection, options).await
    }

    async fn stream(&self, filter: &NodeFilter) -> StoreResult<NodeStream> {
        let stream = self.inner.stream(filter).await?;
        let items = *self.stream_items_before_error.lock().unwrap();
        match items {
            None => Ok(stream),
            Some(items) => Ok(Box::pin(stream.take(items).chain(tokio_stream::once(Err(
                StoreError::query_failed("stream interrupted"),
            ))))),
        }
    }

    async fn update(&self, filter: &NodeFilter, patch: &NodePatch) -> StoreResult<u64> {
        let attempt = self.updates.fetch_add(1, Ordering::SeqCst);
        if attempt >= self.successful_updates {
            return Err(StoreError::query_failed(format!(
                "update #{} rejected",
                attempt + 1
            )));
        }
        self.inner.update(filter, patch).await
    }

    async fn remove(&self, filter: &NodeFilter) -> StoreResult<u64> {
        self.inner.remove(filter).await
    }
}

/// Service over a fresh `RecordingStore`
pub fn recording_service() -> (TreeService, Arc<RecordingStore>) {
    let store = Arc::new(RecordingStore::new());
    (TreeService::new(store.clone()), store)
}

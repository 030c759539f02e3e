//! SurrealDocumentStore - DocumentStore Implementation for SurrealDB
//!
//! Stores every tree node as one record of the SCHEMALESS `tree_nodes` table.
//!
//! # Design Principles
//!
//! 1. **Record IDs**: `tree_nodes:<uuid>`, with the plain id duplicated in a
//!    `uuid` field for filtering and keyset paging
//! 2. **Push-down**: structural constraints (`id`, `ids`, `parent`,
//!    `path_prefix`) become SurrealQL; property filters, sorting and
//!    projection run in Rust through the shared `models` helpers, so both
//!    stores answer queries identically
//! 3. **Bounded streams**: `stream` pages through matches by `uuid` and hands
//!    them over a bounded channel, so a subtree rewrite holds at most one
//!    page in memory and is not disturbed by the updates it performs
//!
//! # Examples
//!
//! ```rust,no_run
//! use pathtree_core::config::TreeConfig;
//! use pathtree_core::db::SurrealDocumentStore;
//! use std::path::PathBuf;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = TreeConfig::default();
//!     let store = SurrealDocumentStore::new_embedded(PathBuf::from("./data/tree.db"), &config).await?;
//!     Ok(())
//! }
//! ```

use crate::config::TreeConfig;
use crate::db::document_store::{DocumentStore, NodeStream};
use crate::db::error::{StoreError, StoreResult};
use crate::models::{FindOptions, NodeFilter, NodePatch, Projection, TreeNode};
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::PathBuf;
use std::sync::Arc;
use surrealdb::engine::local::{Db, Mem, RocksDb};
use surrealdb::{Connection, Surreal};
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;

const TABLE: &str = "tree_nodes";

/// Internal struct matching the record layout with the 'uuid' field
#[derive(Debug, Clone, Serialize, Deserialize)]
struct SurrealTreeNode {
    uuid: String,
    parent: Option<String>,
    path: Option<String>,
    properties: Value,
    created_at: String,
    modified_at: String,
}

impl From<SurrealTreeNode> for TreeNode {
    fn from(sn: SurrealTreeNode) -> Self {
        TreeNode {
            id: sn.uuid,
            parent: sn.parent,
            path: sn.path,
            properties: sn.properties,
            created_at: DateTime::parse_from_rfc3339(&sn.created_at)
                .map(|dt| dt.with_timezone(&Utc))
                .unwrap_or_else(|_| Utc::now()),
            modified_at: DateTime::parse_from_rfc3339(&sn.modified_at)
                .map(|dt| dt.with_timezone(&Utc))
                .unwrap_or_else(|_| Utc::now()),
        }
    }
}

impl From<&TreeNode> for SurrealTreeNode {
    fn from(node: &TreeNode) -> Self {
        SurrealTreeNode {
            uuid: node.id.clone(),
            parent: node.parent.clone(),
            path: node.path.clone(),
            properties: node.properties.clone(),
            created_at: node.created_at.to_rfc3339(),
            modified_at: node.modified_at.to_rfc3339(),
        }
    }
}

/// SurrealQL condition plus the parameters it binds
#[derive(Debug, Default)]
struct Condition {
    clauses: Vec<String>,
    bindings: Vec<(String, Value)>,
}

impl Condition {
    fn from_filter(filter: &NodeFilter) -> Self {
        let mut condition = Self::default();

        if let Some(id) = &filter.id {
            condition.push("uuid = $id", "id", Value::from(id.clone()));
        }

        if let Some(ids) = &filter.ids {
            condition.push("uuid INSIDE $ids", "ids", Value::from(ids.clone()));
        }

        match &filter.parent {
            Some(Some(parent)) => {
                condition.push("parent = $parent", "parent", Value::from(parent.clone()))
            }
            Some(None) => condition
                .clauses
                .push("(parent = NONE OR parent = NULL)".to_string()),
            None => {}
        }

        if let Some(prefix) = &filter.path_prefix {
            condition.push(
                "(path != NONE AND path != NULL AND string::starts_with(path, $path_prefix))",
                "path_prefix",
                Value::from(prefix.clone()),
            );
        }

        condition
    }

    fn push(&mut self, clause: &str, name: &str, value: Value) {
        self.clauses.push(clause.to_string());
        self.bindings.push((name.to_string(), value));
    }

    fn where_clause(&self) -> String {
        if self.clauses.is_empty() {
            String::new()
        } else {
            format!(" WHERE {}", self.clauses.join(" AND "))
        }
    }
}

/// SurrealDocumentStore implements DocumentStore for a SurrealDB connection
pub struct SurrealDocumentStore<C: Connection = Db> {
    db: Arc<Surreal<C>>,
    page_size: usize,
}

impl<C: Connection> Clone for SurrealDocumentStore<C> {
    fn clone(&self) -> Self {
        Self {
            db: self.db.clone(),
            page_size: self.page_size,
        }
    }
}

impl SurrealDocumentStore<Db> {
    /// Open an embedded RocksDB-backed store
    pub async fn new_embedded(db_path: PathBuf, config: &TreeConfig) -> Result<Self> {
        let db = Surreal::new::<RocksDb>(db_path)
            .await
            .context("Failed to initialize SurrealDB with RocksDB backend")?;
        Self::from_client(db, config).await
    }

    /// Open a store backed by SurrealDB's in-memory engine
    pub async fn new_in_memory(config: &TreeConfig) -> Result<Self> {
        let db = Surreal::new::<Mem>(())
            .await
            .context("Failed to initialize in-memory SurrealDB")?;
        Self::from_client(db, config).await
    }
}

impl<C: Connection> SurrealDocumentStore<C> {
    /// Wrap an existing client, selecting the namespace and defining the table
    pub async fn from_client(db: Surreal<C>, config: &TreeConfig) -> Result<Self> {
        config
            .validate()
            .context("Invalid tree configuration for SurrealDB store")?;

        db.use_ns("pathtree")
            .use_db("trees")
            .await
            .context("Failed to set namespace/database")?;

        Self::initialize_schema(&db).await?;

        Ok(Self {
            db: Arc::new(db),
            page_size: config.stream_page_size,
        })
    }

    async fn initialize_schema(db: &Surreal<C>) -> Result<()> {
        db.query(
            "
            DEFINE TABLE IF NOT EXISTS tree_nodes SCHEMALESS;
            DEFINE INDEX IF NOT EXISTS tree_nodes_uuid ON TABLE tree_nodes COLUMNS uuid UNIQUE;
            DEFINE INDEX IF NOT EXISTS tree_nodes_parent ON TABLE tree_nodes COLUMNS parent;
            DEFINE INDEX IF NOT EXISTS tree_nodes_path ON TABLE tree_nodes COLUMNS path;
            ",
        )
        .await
        .context("Failed to create tree_nodes table")?
        .check()
        .context("Failed to define tree_nodes schema")?;

        Ok(())
    }

    /// Run a SELECT for the structural part of `filter`
    async fn select(db: &Surreal<C>, filter: &NodeFilter) -> Result<Vec<TreeNode>> {
        let condition = Condition::from_filter(filter);
        let sql = format!("SELECT * FROM {}{};", TABLE, condition.where_clause());

        let mut query = db.query(sql);
        for binding in condition.bindings {
            query = query.bind(binding);
        }

        let mut response = query.await.context("Failed to query tree nodes")?;
        let rows: Vec<SurrealTreeNode> = response
            .take(0)
            .context("Failed to extract query results")?;

        Ok(rows
            .into_iter()
            .map(TreeNode::from)
            .filter(|node| filter.matches_properties(node))
            .collect())
    }

    /// Replace property filters by the ids they select, so writes can be
    /// expressed with structural conditions only
    async fn resolve_filter(&self, filter: &NodeFilter) -> Result<NodeFilter> {
        if filter.property_filters.is_none() {
            return Ok(filter.clone());
        }

        let ids = Self::select(&self.db, filter)
            .await?
            .into_iter()
            .map(|node| node.id)
            .collect();

        Ok(NodeFilter::new().with_ids(ids))
    }

    /// Fetch one keyset page of matches with `uuid` greater than `after`
    async fn page(db: &Surreal<C>, filter: &NodeFilter, after: &str, limit: usize) -> Result<Vec<TreeNode>> {
        let mut condition = Condition::from_filter(filter);
        condition.push("uuid > $after", "after", Value::from(after.to_string()));
        condition.bindings.push(("limit".to_string(), Value::from(limit)));

        let sql = format!(
            "SELECT * FROM {}{} ORDER BY uuid ASC LIMIT $limit;",
            TABLE,
            condition.where_clause()
        );

        let mut query = db.query(sql);
        for binding in condition.bindings {
            query = query.bind(binding);
        }

        let mut response = query.await.context("Failed to page tree nodes")?;
        let rows: Vec<SurrealTreeNode> = response
            .take(0)
            .context("Failed to extract page results")?;

        Ok(rows.into_iter().map(TreeNode::from).collect())
    }
}

#[async_trait]
impl<C: Connection + 'static> DocumentStore for SurrealDocumentStore<C> {
    async fn insert(&self, node: TreeNode) -> StoreResult<TreeNode> {
        if self.find_one(&NodeFilter::by_id(&node.id)).await?.is_some() {
            return Err(StoreError::duplicate_id(node.id));
        }

        self.db
            .query("CREATE type::thing($table, $uuid) CONTENT $doc;")
            .bind(("table", TABLE))
            .bind(("uuid", node.id.clone()))
            .bind(("doc", SurrealTreeNode::from(&node)))
            .await
            .context("Failed to create tree node")?
            .check()
            .context("Failed to create tree node")?;

        Ok(node)
    }

    async fn find_one(&self, filter: &NodeFilter) -> StoreResult<Option<TreeNode>> {
        let nodes = Self::select(&self.db, filter).await?;
        Ok(nodes.into_iter().next())
    }

    async fn find(
        &self,
        filter: &NodeFilter,
        projection: Option<&Projection>,
        options: &FindOptions,
    ) -> StoreResult<Vec<TreeNode>> {
        let nodes = Self::select(&self.db, filter).await?;
        Ok(options.apply(nodes, projection))
    }

    async fn stream(&self, filter: &NodeFilter) -> StoreResult<NodeStream> {
        let (tx, rx) = mpsc::channel(self.page_size);
        let db = self.db.clone();
        let filter = filter.clone();
        let page_size = self.page_size;

        tokio::spawn(async move {
            let mut after = String::new();
            loop {
                let page = match Self::page(&db, &filter, &after, page_size).await {
                    Ok(page) => page,
                    Err(e) => {
                        let _ = tx.send(Err(StoreError::from(e))).await;
                        return;
                    }
                };

                let exhausted = page.len() < page_size;
                if let Some(last) = page.last() {
                    after = last.id.clone();
                }

                for node in page.into_iter().filter(|node| filter.matches_properties(node)) {
                    if tx.send(Ok(node)).await.is_err() {
                        // Consumer dropped the stream
                        return;
                    }
                }

                if exhausted {
                    return;
                }
            }
        });

        Ok(Box::pin(ReceiverStream::new(rx)))
    }

    async fn update(&self, filter: &NodeFilter, patch: &NodePatch) -> StoreResult<u64> {
        let filter = self.resolve_filter(filter).await?;
        let mut condition = Condition::from_filter(&filter);

        let mut sets = vec!["modified_at = $set_modified_at".to_string()];
        condition.bindings.push((
            "set_modified_at".to_string(),
            Value::from(Utc::now().to_rfc3339()),
        ));
        if let Some(parent) = &patch.parent {
            sets.push("parent = $set_parent".to_string());
            condition
                .bindings
                .push(("set_parent".to_string(), serde_json::to_value(parent)?));
        }
        if let Some(path) = &patch.path {
            sets.push("path = $set_path".to_string());
            condition
                .bindings
                .push(("set_path".to_string(), Value::from(path.clone())));
        }
        if let Some(properties) = &patch.properties {
            sets.push("properties = $set_properties".to_string());
            condition
                .bindings
                .push(("set_properties".to_string(), properties.clone()));
        }

        let sql = format!(
            "UPDATE {} SET {}{} RETURN AFTER;",
            TABLE,
            sets.join(", "),
            condition.where_clause()
        );

        let mut query = self.db.query(sql);
        for binding in condition.bindings {
            query = query.bind(binding);
        }

        let mut response = query.await.context("Failed to update tree nodes")?;
        let rows: Vec<SurrealTreeNode> = response
            .take(0)
            .context("Failed to extract update results")?;

        Ok(rows.len() as u64)
    }

    async fn remove(&self, filter: &NodeFilter) -> StoreResult<u64> {
        let filter = self.resolve_filter(filter).await?;
        let condition = Condition::from_filter(&filter);
        let sql = format!("DELETE {}{} RETURN BEFORE;", TABLE, condition.where_clause());

        let mut query = self.db.query(sql);
        for binding in condition.bindings {
            query = query.bind(binding);
        }

        let mut response = query.await.context("Failed to remove tree nodes")?;
        let rows: Vec<SurrealTreeNode> = response
            .take(0)
            .context("Failed to extract removed records")?;

        Ok(rows.len() as u64)
    }
}

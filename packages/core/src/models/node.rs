//! Tree Node Data Structures
//!
//! This module defines the `TreeNode` document stored in the collection and the
//! partial update types used to change it.
//!
//! # Persisted Layout
//!
//! Every document carries two tree fields next to its own body:
//!
//! - `parent`: id of the parent document, `None` for a root
//! - `path`: materialized ancestor chain ending in the document's own id
//!
//! # Examples
//!
//! ```rust
//! use pathtree_core::models::TreeNode;
//! use serde_json::json;
//!
//! let root = TreeNode::new_with_id("A".to_string(), None, json!({"name": "Root"}));
//! let child = TreeNode::new_with_id("B".to_string(), Some("A".to_string()), json!({}));
//!
//! assert!(root.is_root());
//! assert!(!child.is_root());
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Validation errors for TreeNode operations
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    #[error("Missing required field: {0}")]
    MissingField(String),

    #[error("Invalid node ID: {0}")]
    InvalidId(String),

    #[error("Invalid parent reference: {0}")]
    InvalidParent(String),

    #[error("Properties validation failed: {0}")]
    InvalidProperties(String),
}

/// A document that takes part in a materialized-path tree.
///
/// # Fields
///
/// - `id`: Unique identifier (caller-provided or UUID)
/// - `parent`: Optional parent id; `None` means this node is a root
/// - `path`: Materialized path, `None` until the node is first saved
/// - `properties`: JSON object with the document body
/// - `created_at` / `modified_at`: Timestamps maintained by the store
///
/// The derived `level` is not a field; ask `TreeService::level` or
/// `PathCodec::level` for it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TreeNode {
    /// Unique identifier, used verbatim as a path segment
    pub id: String,

    /// Parent node ID
    #[serde(default)]
    pub parent: Option<String>,

    /// Ancestor chain joined by the tree's separator, ending in `id`
    #[serde(default)]
    pub path: Option<String>,

    /// Document body (must be a JSON object)
    #[serde(default = "empty_properties")]
    pub properties: serde_json::Value,

    /// Creation timestamp
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,

    /// Last modification timestamp
    #[serde(default = "Utc::now")]
    pub modified_at: DateTime<Utc>,
}

fn empty_properties() -> serde_json::Value {
    serde_json::Value::Object(Default::default())
}

impl TreeNode {
    /// Create a new node with an auto-generated UUID
    pub fn new(parent: Option<String>, properties: serde_json::Value) -> Self {
        Self::new_with_id(Uuid::new_v4().to_string(), parent, properties)
    }

    /// Create a new node with an explicit id
    pub fn new_with_id(id: String, parent: Option<String>, properties: serde_json::Value) -> Self {
        let now = Utc::now();
        Self {
            id,
            parent,
            path: None,
            properties,
            created_at: now,
            modified_at: now,
        }
    }

    /// Validate node structure and required fields
    ///
    /// # Errors
    ///
    /// Returns `ValidationError` if:
    /// - `id` is empty
    /// - `properties` is not a JSON object
    /// - the node names itself as parent
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.id.is_empty() {
            return Err(ValidationError::MissingField("id".to_string()));
        }

        if !self.properties.is_object() {
            return Err(ValidationError::InvalidProperties(
                "properties must be a JSON object".to_string(),
            ));
        }

        if self.parent.as_deref() == Some(self.id.as_str()) {
            return Err(ValidationError::InvalidParent(
                "Node cannot be its own parent".to_string(),
            ));
        }

        Ok(())
    }

    /// Check if this node is a root (no parent)
    pub fn is_root(&self) -> bool {
        self.parent.is_none()
    }

    /// Whether the path has been computed for this node
    pub fn is_materialized(&self) -> bool {
        self.path.as_deref().is_some_and(|p| !p.is_empty())
    }

    /// Apply a patch to this in-memory copy
    pub fn apply_patch(&mut self, patch: &NodePatch) {
        if let Some(parent) = &patch.parent {
            self.parent = parent.clone();
        }
        if let Some(path) = &patch.path {
            self.path = Some(path.clone());
        }
        if let Some(properties) = &patch.properties {
            self.properties = properties.clone();
        }
        self.modified_at = Utc::now();
    }
}

/// Custom deserializer for optional fields that accepts both plain values and nulls
///
/// - Missing field → None (don't update)
/// - null → Some(None) (set to NULL)
/// - "value" → Some(Some("value")) (set to value)
pub(crate) fn deserialize_optional_field<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Ok(Some(Option::<T>::deserialize(deserializer)?))
}

/// Caller-facing partial update of a node
///
/// `parent` uses the double-Option pattern:
///
/// - `None`: Don't change the parent
/// - `Some(None)`: Make the node a root
/// - `Some(Some(id))`: Move the node under `id`
///
/// # Examples
///
/// ```rust
/// # use pathtree_core::models::NodeUpdate;
/// let update = NodeUpdate::new().with_parent(Some("A".to_string()));
/// assert_eq!(update.parent, Some(Some("A".to_string())));
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeUpdate {
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "deserialize_optional_field"
    )]
    pub parent: Option<Option<String>>,

    /// Replacement document body
    #[serde(skip_serializing_if = "Option::is_none")]
    pub properties: Option<serde_json::Value>,
}

impl NodeUpdate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_parent(mut self, parent: Option<String>) -> Self {
        self.parent = Some(parent);
        self
    }

    pub fn with_properties(mut self, properties: serde_json::Value) -> Self {
        self.properties = Some(properties);
        self
    }

    /// Check if update contains any changes
    pub fn is_empty(&self) -> bool {
        self.parent.is_none() && self.properties.is_none()
    }
}

/// Store-level partial update (`$set` of the listed fields)
///
/// This is what a `DocumentStore` receives; unlike `NodeUpdate` it may carry
/// a recomputed `path`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodePatch {
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "deserialize_optional_field"
    )]
    pub parent: Option<Option<String>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub properties: Option<serde_json::Value>,
}

impl NodePatch {
    /// Patch that only rewrites the path field
    pub fn path(path: impl Into<String>) -> Self {
        Self {
            path: Some(path.into()),
            ..Default::default()
        }
    }
}

/// Result of a delete operation
///
/// Deleting a node that does not exist succeeds with `existed: false`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct DeleteResult {
    /// Whether the node existed before deletion
    pub existed: bool,

    /// Number of descendants removed by the cascade
    pub descendants_removed: u64,
}

impl DeleteResult {
    pub fn not_found() -> Self {
        Self {
            existed: false,
            descendants_removed: 0,
        }
    }
}

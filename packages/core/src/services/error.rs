//! Service Layer Error Types
//!
//! This module defines the error returned by every tree operation. Store
//! failures are wrapped unchanged; nothing in the service layer retries.

use crate::db::StoreError;
use crate::models::ValidationError;
use thiserror::Error;

/// Tree operation errors
#[derive(Error, Debug)]
pub enum TreeError {
    /// A node referenced by id does not exist
    #[error("Node not found: {id}")]
    NotFound { id: String },

    /// The document store reported a failure
    #[error("Store operation failed: {0}")]
    Store(#[from] StoreError),

    /// The tree configuration cannot produce well-formed paths
    #[error("Invalid configuration: {0}")]
    Configuration(String),

    /// The node failed validation
    #[error("Node validation failed: {0}")]
    Validation(#[from] ValidationError),

    /// Re-parenting would place a node under itself or a descendant
    #[error("Circular reference detected: {context}")]
    CircularReference { context: String },

    /// A node needed for path computation has no materialized path
    #[error("Node has no materialized path: {id}")]
    MissingPath { id: String },
}

impl TreeError {
    /// Create a node not found error
    pub fn not_found(id: impl Into<String>) -> Self {
        Self::NotFound { id: id.into() }
    }

    /// Create a configuration error
    pub fn configuration(msg: impl Into<String>) -> Self {
        Self::Configuration(msg.into())
    }

    /// Create a circular reference error
    pub fn circular_reference(context: impl Into<String>) -> Self {
        Self::CircularReference {
            context: context.into(),
        }
    }

    /// Create a missing path error
    pub fn missing_path(id: impl Into<String>) -> Self {
        Self::MissingPath { id: id.into() }
    }
}

pub type TreeResult<T> = std::result::Result<T, TreeError>;

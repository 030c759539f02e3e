//! Store Error Types
//!
//! Errors raised by `DocumentStore` implementations. The tree layer never
//! inspects or retries them; they are surfaced verbatim inside
//! `TreeError::Store`.

use thiserror::Error;

/// Document store operation errors
#[derive(Error, Debug)]
pub enum StoreError {
    /// A query or write could not be executed
    #[error("Store query failed: {context}")]
    QueryFailed { context: String },

    /// Insert of a document whose id is already taken
    #[error("Document already exists: {id}")]
    DuplicateId { id: String },

    /// A document could not be converted to or from the store format
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Error reported by the backing database
    #[error("Store backend error: {0}")]
    Backend(#[from] anyhow::Error),
}

impl StoreError {
    /// Create a query failed error with context
    pub fn query_failed(context: impl Into<String>) -> Self {
        Self::QueryFailed {
            context: context.into(),
        }
    }

    /// Create a duplicate id error
    pub fn duplicate_id(id: impl Into<String>) -> Self {
        Self::DuplicateId { id: id.into() }
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(err: serde_json::Error) -> Self {
        StoreError::Serialization(err.to_string())
    }
}

pub type StoreResult<T> = std::result::Result<T, StoreError>;

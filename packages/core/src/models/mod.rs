//! Data Models
//!
//! This module contains the data structures shared by the tree layer and the
//! document stores:
//!
//! - `TreeNode` - a document with its `parent` and materialized `path`
//! - `NodeUpdate` / `NodePatch` - caller-level and store-level partial updates
//! - `NodeFilter`, `Projection`, `FindOptions` - the store query vocabulary

mod filter;
mod node;

pub use filter::{
    FilterOperator, FindOptions, NodeFilter, Projection, PropertyFilter, SortDirection, SortField,
    SortKey,
};
pub use node::{DeleteResult, NodePatch, NodeUpdate, TreeNode, ValidationError};

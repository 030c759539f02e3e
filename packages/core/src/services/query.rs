//! Query Derivation
//!
//! Turns a node's `id`, `parent` and `path` into store filters for its
//! relatives. Nothing here touches the store.

use crate::models::{NodeFilter, TreeNode};
use crate::path_codec::PathCodec;
use crate::services::error::{TreeError, TreeResult};

#[derive(Debug, Clone, Default)]
pub struct QueryDerivation {
    codec: PathCodec,
}

impl QueryDerivation {
    pub fn new(codec: PathCodec) -> Self {
        Self { codec }
    }

    /// Filter for the direct children of `node`, or every descendant when `recursive`
    ///
    /// # Errors
    ///
    /// Returns `TreeError::MissingPath` for a recursive query on a node that
    /// has never been materialized.
    pub fn children_filter(&self, node: &TreeNode, recursive: bool) -> TreeResult<NodeFilter> {
        if recursive {
            let path = node
                .path
                .as_deref()
                .filter(|p| !p.is_empty())
                .ok_or_else(|| TreeError::missing_path(&node.id))?;
            Ok(NodeFilter::new().with_path_prefix(self.codec.descendant_prefix(path)))
        } else {
            Ok(NodeFilter::new().with_parent(Some(node.id.clone())))
        }
    }

    /// Filter for the parent of `node`; `None` for a root
    pub fn parent_filter(&self, node: &TreeNode) -> Option<NodeFilter> {
        node.parent.as_deref().map(NodeFilter::by_id)
    }

    /// Filter for every ancestor named in the node's path
    ///
    /// The store returns matches in its own order.
    pub fn ancestors_filter(&self, node: &TreeNode) -> NodeFilter {
        NodeFilter::new().with_ids(self.codec.ancestor_ids(node.path.as_deref()))
    }

    /// Order ancestors root first, following the node's path
    pub fn order_ancestors(&self, node: &TreeNode, mut ancestors: Vec<TreeNode>) -> Vec<TreeNode> {
        let ids = self.codec.ancestor_ids(node.path.as_deref());
        ancestors.sort_by_key(|ancestor| ids.iter().position(|id| *id == ancestor.id));
        ancestors
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn doc(id: &str, parent: Option<&str>, path: Option<&str>) -> TreeNode {
        let mut node = TreeNode::new_with_id(id.to_string(), parent.map(str::to_string), json!({}));
        node.path = path.map(str::to_string);
        node
    }

    #[test]
    fn test_children_filters() {
        let queries = QueryDerivation::default();
        let b = doc("B", Some("A"), Some("A#B"));

        let direct = queries.children_filter(&b, false).unwrap();
        assert_eq!(direct.parent, Some(Some("B".to_string())));
        assert!(direct.path_prefix.is_none());

        let recursive = queries.children_filter(&b, true).unwrap();
        assert_eq!(recursive.path_prefix.as_deref(), Some("A#B#"));
        assert!(recursive.parent.is_none());
    }

    #[test]
    fn test_recursive_children_need_path() {
        let queries = QueryDerivation::default();
        let result = queries.children_filter(&doc("B", None, None), true);
        assert!(matches!(result, Err(TreeError::MissingPath { .. })));
    }

    #[test]
    fn test_parent_filter() {
        let queries = QueryDerivation::default();
        assert!(queries.parent_filter(&doc("A", None, Some("A"))).is_none());

        let filter = queries.parent_filter(&doc("B", Some("A"), Some("A#B"))).unwrap();
        assert_eq!(filter.id.as_deref(), Some("A"));
    }

    #[test]
    fn test_ancestors_filter_and_order() {
        let queries = QueryDerivation::default();
        let c = doc("C", Some("B"), Some("A#B#C"));

        let filter = queries.ancestors_filter(&c);
        assert_eq!(filter.ids, Some(vec!["A".to_string(), "B".to_string()]));

        let ordered = queries.order_ancestors(
            &c,
            vec![doc("B", Some("A"), Some("A#B")), doc("A", None, Some("A"))],
        );
        let ids: Vec<_> = ordered.iter().map(|n| n.id.as_str()).collect();
        assert_eq!(ids, vec!["A", "B"]);
    }

    #[test]
    fn test_unmaterialized_node_has_no_ancestors() {
        let queries = QueryDerivation::default();
        let filter = queries.ancestors_filter(&doc("C", Some("B"), None));
        assert_eq!(filter.ids, Some(vec![]));
    }
}

//! Tree Builder
//!
//! Builds a nested tree from the flat descendants of a node. The query is
//! augmented so the store returns documents sorted by path; a path always
//! sorts before its extensions, so every node follows its parent and one pass
//! attaches each document under an entry that is already placed.
//!
//! # Reconstruction
//!
//! Entries live in an arena while the tree is assembled, indexed by path. A
//! document at level `min_level` becomes a new top-level entry. A deeper
//! document becomes a child of the entry whose path is its parent path, or is
//! dropped as an orphan when that entry is not in the result. Documents above
//! the minimum level are dropped.
//!
//! Subtrees need not be contiguous in the input: with separator `/`, the
//! sibling `R/item-2` sorts between `R/item` and `R/item/child`.
//!
//! The arena is converted into nested `TreeEntry` values at the end.

use crate::models::{FindOptions, NodeFilter, Projection, TreeNode};
use crate::path_codec::PathCodec;
use crate::services::error::{TreeError, TreeResult};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Options accepted by `TreeService::get_children_tree`
///
/// Deserializes from camelCase JSON: `filters`, `fields`, `options`,
/// `minLevel`, `recursive`, `emptyChilds`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ChildrenTreeOptions {
    /// Extra constraints ANDed with the subtree filter
    pub filters: NodeFilter,

    /// Projection of the returned documents
    pub fields: Option<Projection>,

    /// Sort keys and paging; path order is always made primary
    pub options: FindOptions,

    /// Shallowest level kept at the top of the result
    pub min_level: Option<usize>,

    /// Fetch the whole subtree instead of direct children
    pub recursive: bool,

    /// Give leaves an empty child list instead of none
    pub empty_childs: bool,
}

impl ChildrenTreeOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn recursive() -> Self {
        Self {
            recursive: true,
            ..Default::default()
        }
    }

    pub fn with_empty_childs(mut self) -> Self {
        self.empty_childs = true;
        self
    }

    pub fn with_min_level(mut self, min_level: usize) -> Self {
        self.min_level = Some(min_level);
        self
    }

    pub fn with_filters(mut self, filters: NodeFilter) -> Self {
        self.filters = filters;
        self
    }

    pub fn with_fields(mut self, fields: Projection) -> Self {
        self.fields = Some(fields);
        self
    }
}

/// A document with its nested children
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TreeEntry {
    #[serde(flatten)]
    pub node: TreeNode,

    /// `None` for a leaf unless empty child lists were requested
    #[serde(rename = "childs", default, skip_serializing_if = "Option::is_none")]
    pub children: Option<Vec<TreeEntry>>,
}

impl TreeEntry {
    /// Children of this entry, empty for a leaf
    pub fn children(&self) -> &[TreeEntry] {
        self.children.as_deref().unwrap_or_default()
    }

    /// Pre-order traversal of this entry and its descendants
    pub fn pre_order(&self) -> Vec<&TreeNode> {
        let mut nodes = Vec::new();
        let mut pending = vec![self];
        while let Some(entry) = pending.pop() {
            nodes.push(&entry.node);
            pending.extend(entry.children().iter().rev());
        }
        nodes
    }
}

struct ArenaEntry {
    node: TreeNode,
    children: Vec<usize>,
}

/// Query augmentation and reconstruction for `get_children_tree`
#[derive(Debug, Clone, Default)]
pub struct TreeBuilder {
    codec: PathCodec,
}

impl TreeBuilder {
    pub fn new(codec: PathCodec) -> Self {
        Self { codec }
    }

    /// Restrict `filters` to the children or the subtree of `node`
    ///
    /// Recursive queries select by path prefix and drop a "parent is null"
    /// constraint; direct queries force `parent == node.id`.
    pub fn augment_filter(
        &self,
        node: &TreeNode,
        mut filters: NodeFilter,
        recursive: bool,
    ) -> TreeResult<NodeFilter> {
        if recursive {
            let path = node
                .path
                .as_deref()
                .filter(|p| !p.is_empty())
                .ok_or_else(|| TreeError::missing_path(&node.id))?;
            filters.path_prefix = Some(self.codec.descendant_prefix(path));
            if filters.parent == Some(None) {
                filters.parent = None;
            }
        } else {
            filters.parent = Some(Some(node.id.clone()));
        }
        Ok(filters)
    }

    /// Make sure an explicit projection keeps the fields reconstruction needs
    pub fn augment_projection(&self, fields: Option<Projection>) -> Option<Projection> {
        fields.map(|mut projection| {
            projection.include("path");
            projection.include("parent");
            projection
        })
    }

    /// Make ascending path order the primary sort key
    pub fn augment_options(&self, mut options: FindOptions) -> FindOptions {
        options.ensure_primary_path_sort();
        options
    }

    /// Shallowest level that may appear at the top of the result
    pub fn effective_min_level(&self, node: &TreeNode, requested: Option<usize>) -> usize {
        let below_node = self.codec.level(node.path.as_deref()) + 1;
        requested.unwrap_or(1).max(below_node)
    }

    /// Nest path-sorted `results` under the entries they descend from
    pub fn build(&self, results: Vec<TreeNode>, min_level: usize, empty_childs: bool) -> Vec<TreeEntry> {
        let mut arena: Vec<ArenaEntry> = Vec::with_capacity(results.len());
        let mut roots: Vec<usize> = Vec::new();
        let mut placed: HashMap<String, usize> = HashMap::with_capacity(results.len());

        for node in results {
            let level = self.codec.level(node.path.as_deref());
            if level < min_level {
                tracing::debug!(
                    "Tree node {} filtered out. Level: {} minLevel: {}",
                    node.id,
                    level,
                    min_level
                );
                continue;
            }

            let path = node.path.clone().unwrap_or_default();
            let parent_index = if level == min_level {
                None
            } else {
                let parent = self
                    .codec
                    .parent_path(&path)
                    .and_then(|parent_path| placed.get(parent_path).copied());
                let Some(parent) = parent else {
                    tracing::debug!(
                        "Tree node {} filtered out. Level: {} has no parent entry",
                        node.id,
                        level
                    );
                    continue;
                };
                Some(parent)
            };

            let index = arena.len();
            arena.push(ArenaEntry {
                node,
                children: Vec::new(),
            });

            match parent_index {
                Some(parent) => arena[parent].children.push(index),
                None => roots.push(index),
            }
            placed.insert(path, index);
        }

        // Children always sit after their parent in the arena, so building
        // back to front finds every child entry already materialized.
        let mut built: Vec<Option<TreeEntry>> = Vec::with_capacity(arena.len());
        built.resize_with(arena.len(), || None);

        for (index, slot) in arena.into_iter().enumerate().rev() {
            let children = if slot.children.is_empty() {
                empty_childs.then(Vec::new)
            } else {
                Some(
                    slot.children
                        .iter()
                        .filter_map(|child| built[*child].take())
                        .collect(),
                )
            };

            built[index] = Some(TreeEntry {
                node: slot.node,
                children,
            });
        }

        roots
            .into_iter()
            .filter_map(|index| built[index].take())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn doc(id: &str, path: &str) -> TreeNode {
        let codec = PathCodec::default();
        let parent = codec.ancestor_ids(Some(path)).pop();
        let mut node = TreeNode::new_with_id(id.to_string(), parent, json!({}));
        node.path = Some(path.to_string());
        node
    }

    fn doc_in(separator: &str, id: &str, path: &str) -> TreeNode {
        let codec = PathCodec::new(separator);
        let parent = codec.ancestor_ids(Some(path)).pop();
        let mut node = TreeNode::new_with_id(id.to_string(), parent, json!({}));
        node.path = Some(path.to_string());
        node
    }

    fn ids(entries: &[TreeEntry]) -> Vec<&str> {
        entries.iter().map(|e| e.node.id.as_str()).collect()
    }

    #[test]
    fn test_builds_nested_tree() {
        // Subtree of A: B with child C, C2 with child D
        let builder = TreeBuilder::default();
        let results = vec![
            doc("B", "A#B"),
            doc("C", "A#B#C"),
            doc("C2", "A#C2"),
            doc("D", "A#C2#D"),
        ];

        let tree = builder.build(results, 2, false);

        assert_eq!(ids(&tree), vec!["B", "C2"]);
        assert_eq!(ids(tree[0].children()), vec!["C"]);
        assert_eq!(ids(tree[1].children()), vec!["D"]);
        assert!(tree[0].children()[0].children.is_none());
    }

    #[test]
    fn test_empty_childs_on_leaves() {
        let builder = TreeBuilder::default();
        let tree = builder.build(vec![doc("B", "A#B"), doc("C", "A#B#C")], 2, true);

        assert_eq!(tree[0].children().len(), 1);
        assert_eq!(tree[0].children()[0].children, Some(vec![]));

        let value = serde_json::to_value(&tree[0]).unwrap();
        assert_eq!(value["childs"][0]["childs"], json!([]));
        assert_eq!(value["childs"][0]["id"], json!("C"));
    }

    #[test]
    fn test_leaf_without_empty_childs_omits_key() {
        let builder = TreeBuilder::default();
        let tree = builder.build(vec![doc("B", "A#B")], 2, false);

        let value = serde_json::to_value(&tree[0]).unwrap();
        assert!(value.get("childs").is_none());
    }

    #[test]
    fn test_orphan_is_dropped() {
        let builder = TreeBuilder::default();
        // C's parent B was filtered out of the result set
        let tree = builder.build(vec![doc("C", "A#B#C"), doc("D", "A#D")], 2, false);

        assert_eq!(ids(&tree), vec!["D"]);
    }

    #[test]
    fn test_sibling_id_extending_another_keeps_children_apart() {
        // '-' sorts below '/', so item-2 lands between item and its child
        let builder = TreeBuilder::new(PathCodec::new("/"));
        let mut results = vec![
            doc_in("/", "item", "R/item"),
            doc_in("/", "child", "R/item/child"),
            doc_in("/", "item-2", "R/item-2"),
            doc_in("/", "grandchild", "R/item-2/grandchild"),
        ];
        results.sort_by(|a, b| a.path.cmp(&b.path));
        assert_eq!(results[1].id, "item-2");

        let tree = builder.build(results, 2, false);

        assert_eq!(ids(&tree), vec!["item", "item-2"]);
        assert_eq!(ids(tree[0].children()), vec!["child"]);
        assert_eq!(ids(tree[1].children()), vec!["grandchild"]);
    }

    #[test]
    fn test_default_separator_with_bang_suffixed_sibling() {
        let builder = TreeBuilder::default();
        let mut results = vec![doc("B", "A#B"), doc("B!", "A#B!"), doc("C", "A#B#C")];
        results.sort_by(|a, b| a.path.cmp(&b.path));

        let tree = builder.build(results, 2, false);

        assert_eq!(ids(&tree), vec!["B", "B!"]);
        assert_eq!(ids(tree[0].children()), vec!["C"]);
        assert!(tree[1].children.is_none());
    }

    #[test]
    fn test_shallow_nodes_dropped() {
        let builder = TreeBuilder::default();
        let tree = builder.build(vec![doc("A", "A"), doc("B", "A#B")], 2, false);

        assert_eq!(ids(&tree), vec!["B"]);
    }

    #[test]
    fn test_pre_order_reproduces_sorted_input() {
        let builder = TreeBuilder::default();
        let results = vec![
            doc("B", "A#B"),
            doc("C", "A#B#C"),
            doc("E", "A#B#C#E"),
            doc("F", "A#B#F"),
            doc("D", "A#D"),
        ];
        let expected: Vec<_> = results.iter().map(|n| n.id.clone()).collect();

        let tree = builder.build(results, 2, false);
        let traversed: Vec<_> = tree
            .iter()
            .flat_map(|entry| entry.pre_order())
            .map(|node| node.id.clone())
            .collect();

        assert_eq!(traversed, expected);
    }

    #[test]
    fn test_effective_min_level() {
        let builder = TreeBuilder::default();
        let b = doc("B", "A#B");

        assert_eq!(builder.effective_min_level(&b, None), 3);
        assert_eq!(builder.effective_min_level(&b, Some(1)), 3);
        assert_eq!(builder.effective_min_level(&b, Some(4)), 4);
    }

    #[test]
    fn test_augment_filter() {
        let builder = TreeBuilder::default();
        let a = doc("A", "A");

        let recursive = builder
            .augment_filter(&a, NodeFilter::new().with_parent(None), true)
            .unwrap();
        assert_eq!(recursive.path_prefix.as_deref(), Some("A#"));
        assert!(recursive.parent.is_none());

        let direct = builder.augment_filter(&a, NodeFilter::new(), false).unwrap();
        assert_eq!(direct.parent, Some(Some("A".to_string())));
    }

    #[test]
    fn test_augment_projection_and_options() {
        let builder = TreeBuilder::default();

        assert!(builder.augment_projection(None).is_none());
        let projection = builder
            .augment_projection(Some(Projection::new(["name"])))
            .unwrap();
        assert!(projection.contains("path"));
        assert!(projection.contains("parent"));

        let options = builder.augment_options(FindOptions::new());
        assert_eq!(options.sort[0], crate::models::SortKey::ascending(crate::models::SortField::Path));
    }

    #[test]
    fn test_options_deserialize_camel_case() {
        let options: ChildrenTreeOptions = serde_json::from_value(json!({
            "recursive": true,
            "minLevel": 2,
            "emptyChilds": true,
            "fields": {"fields": ["name"]}
        }))
        .unwrap();

        assert!(options.recursive);
        assert!(options.empty_childs);
        assert_eq!(options.min_level, Some(2));
        assert!(options.fields.unwrap().contains("name"));
    }
}

//! Path Codec
//!
//! Pure functions over materialized paths. A path is the chain of ancestor ids
//! joined by the configured separator and ending in the node's own id:
//!
//! ```text
//! A           root
//! A#B         child of A
//! A#B#C       grandchild of A
//! ```
//!
//! The codec never touches a store. The separator is carried by the codec
//! instance rather than a global so trees with different configurations stay
//! independent.

use crate::config::{TreeConfig, DEFAULT_PATH_SEPARATOR};

/// Encodes and decodes materialized paths for one separator
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathCodec {
    separator: String,
}

impl Default for PathCodec {
    fn default() -> Self {
        Self::new(DEFAULT_PATH_SEPARATOR)
    }
}

impl PathCodec {
    pub fn new(separator: impl Into<String>) -> Self {
        Self {
            separator: separator.into(),
        }
    }

    pub fn from_config(config: &TreeConfig) -> Self {
        Self::new(config.path_separator.clone())
    }

    pub fn separator(&self) -> &str {
        &self.separator
    }

    /// Path of a root node: its own id
    pub fn root_path(&self, id: &str) -> String {
        id.to_string()
    }

    /// Path of a node placed under a parent with `parent_path`
    pub fn child_path(&self, parent_path: &str, id: &str) -> String {
        format!("{}{}{}", parent_path, self.separator, id)
    }

    /// Depth of a path; 0 when the path is absent or empty, 1 for a root
    pub fn level(&self, path: Option<&str>) -> usize {
        match path {
            Some(p) if !p.is_empty() => p.split(self.separator.as_str()).count(),
            _ => 0,
        }
    }

    /// Ids of every ancestor encoded in `path`, root first
    ///
    /// The last segment is the node itself and is dropped.
    pub fn ancestor_ids(&self, path: Option<&str>) -> Vec<String> {
        let Some(path) = path.filter(|p| !p.is_empty()) else {
            return Vec::new();
        };

        let mut ids: Vec<String> = path
            .split(self.separator.as_str())
            .map(str::to_string)
            .collect();
        ids.pop();
        ids
    }

    /// Path of the parent of the node at `path`, `None` for a root
    pub fn parent_path<'a>(&self, path: &'a str) -> Option<&'a str> {
        path.rsplit_once(self.separator.as_str()).map(|(parent, _)| parent)
    }

    /// Prefix shared by every proper descendant of the node at `path`
    pub fn descendant_prefix(&self, path: &str) -> String {
        format!("{}{}", path, self.separator)
    }

    /// Move a descendant's path from under `old_path` to under `new_path`
    ///
    /// Plain substring replacement of the leading `old_path`. Returns `None`
    /// if `child_path` is not a proper descendant of `old_path`.
    pub fn rewrite_prefix(&self, old_path: &str, new_path: &str, child_path: &str) -> Option<String> {
        child_path
            .strip_prefix(old_path)
            .filter(|rest| rest.starts_with(self.separator.as_str()))
            .map(|rest| format!("{}{}", new_path, rest))
    }

    /// Whether `id` appears as any segment of `path`
    pub fn contains_segment(&self, path: &str, id: &str) -> bool {
        path.split(self.separator.as_str()).any(|segment| segment == id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_root_and_child_paths() {
        let codec = PathCodec::default();
        let a = codec.root_path("A");
        let b = codec.child_path(&a, "B");
        let c = codec.child_path(&b, "C");

        assert_eq!(a, "A");
        assert_eq!(b, "A#B");
        assert_eq!(c, "A#B#C");
    }

    #[test]
    fn test_level() {
        let codec = PathCodec::default();
        assert_eq!(codec.level(None), 0);
        assert_eq!(codec.level(Some("")), 0);
        assert_eq!(codec.level(Some("A")), 1);
        assert_eq!(codec.level(Some("A#B#C")), 3);
    }

    #[test]
    fn test_ancestor_ids_root_first() {
        let codec = PathCodec::default();
        assert_eq!(codec.ancestor_ids(Some("A#B#C")), vec!["A", "B"]);
        assert!(codec.ancestor_ids(Some("A")).is_empty());
        assert!(codec.ancestor_ids(None).is_empty());
    }

    #[test]
    fn test_rewrite_prefix() {
        let codec = PathCodec::default();
        assert_eq!(
            codec.rewrite_prefix("A#B#C", "A#C", "A#B#C#D"),
            Some("A#C#D".to_string())
        );
        assert_eq!(
            codec.rewrite_prefix("A#C", "A#B#C", "A#C#D#E"),
            Some("A#B#C#D#E".to_string())
        );
    }

    #[test]
    fn test_rewrite_prefix_requires_segment_boundary() {
        let codec = PathCodec::default();
        // "A#BX" shares characters with "A#B" but is not under it
        assert_eq!(codec.rewrite_prefix("A#B", "Z", "A#BX#C"), None);
        assert_eq!(codec.rewrite_prefix("A#B", "Z", "A#B"), None);
    }

    #[test]
    fn test_multi_character_separator() {
        let codec = PathCodec::new("::");
        let path = codec.child_path(&codec.child_path("root", "mid"), "leaf");

        assert_eq!(path, "root::mid::leaf");
        assert_eq!(codec.level(Some(&path)), 3);
        assert_eq!(codec.ancestor_ids(Some(&path)), vec!["root", "mid"]);
        assert_eq!(codec.descendant_prefix("root"), "root::");
    }

    #[test]
    fn test_contains_segment() {
        let codec = PathCodec::default();
        assert!(codec.contains_segment("A#B#C", "B"));
        assert!(!codec.contains_segment("A#BB#C", "B"));
    }

    #[test]
    fn test_parent_path() {
        let codec = PathCodec::default();
        assert_eq!(codec.parent_path("A#B#C"), Some("A#B"));
        assert_eq!(codec.parent_path("A"), None);
        assert_eq!(PathCodec::new("::").parent_path("a::b"), Some("a"));
    }
}

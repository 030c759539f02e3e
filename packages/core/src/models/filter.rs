//! Store Query Vocabulary
//!
//! Filters, projections and find options understood by every `DocumentStore`.
//! Structural constraints (`id`, `ids`, `parent`, `path_prefix`) are the ones
//! the tree layer derives; `property_filters` carry arbitrary caller filters
//! over the document body.
//!
//! The matching and ordering helpers in this module are the reference
//! semantics: the in-memory store uses them directly, and stores that push
//! structural constraints down to a database still evaluate property filters,
//! sorting and projection through them.

use crate::models::{TreeNode, ValidationError};
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::cmp::Ordering;
use std::sync::OnceLock;

/// Comparison operator for property filters
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub enum FilterOperator {
    /// Equality (=)
    Equals,
    /// Inequality (!=)
    NotEquals,
    /// Greater than (>)
    GreaterThan,
    /// Greater than or equal (>=)
    GreaterThanOrEqual,
    /// Less than (<)
    LessThan,
    /// Less than or equal (<=)
    LessThanOrEqual,
    /// String contains, or array contains element
    Contains,
    /// String starts with
    StartsWith,
    /// String ends with
    EndsWith,
    /// String matches a regular expression
    Matches,
}

/// Property filter for JSON path queries
///
/// Paths use JSONPath syntax starting with `$`:
/// - `"$.status"` - Top-level property
/// - `"$.metadata.priority"` - Nested property
/// - `"$"` - The whole properties object
///
/// # Examples
///
/// ```rust
/// # use pathtree_core::models::{PropertyFilter, FilterOperator};
/// # use serde_json::json;
/// let filter = PropertyFilter::new(
///     "$.status".to_string(),
///     FilterOperator::Equals,
///     json!("done"),
/// );
/// assert!(filter.is_ok());
///
/// let filter = PropertyFilter::new(
///     "status".to_string(),
///     FilterOperator::Equals,
///     json!("done"),
/// );
/// assert!(filter.is_err());
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PropertyFilter {
    /// JSON path to the property (e.g., "$.status", "$.metadata.priority")
    pub path: String,

    /// Comparison operator
    pub operator: FilterOperator,

    /// Value to compare against
    pub value: Value,

    /// `Matches` pattern, compiled on first use
    #[serde(skip)]
    pattern: OnceLock<Option<Regex>>,
}

impl PartialEq for PropertyFilter {
    fn eq(&self, other: &Self) -> bool {
        self.path == other.path && self.operator == other.operator && self.value == other.value
    }
}

impl PropertyFilter {
    /// Create a new PropertyFilter with path validation
    ///
    /// # Errors
    ///
    /// Returns `ValidationError::InvalidProperties` if:
    /// - Path doesn't start with `$`
    /// - Path contains `..` or ends with `.`
    /// - `Matches` is given a value that is not a valid regular expression
    pub fn new(path: String, operator: FilterOperator, value: Value) -> Result<Self, ValidationError> {
        if !path.starts_with('$') {
            return Err(ValidationError::InvalidProperties(format!(
                "JSON path must start with '$': {}",
                path
            )));
        }

        if path.contains("..") {
            return Err(ValidationError::InvalidProperties(format!(
                "JSON path contains invalid consecutive dots: {}",
                path
            )));
        }

        if path.len() > 1 && path.ends_with('.') {
            return Err(ValidationError::InvalidProperties(format!(
                "JSON path cannot end with '.': {}",
                path
            )));
        }

        let compiled = OnceLock::new();
        if operator == FilterOperator::Matches {
            let pattern = value.as_str().ok_or_else(|| {
                ValidationError::InvalidProperties("Matches requires a string pattern".to_string())
            })?;
            let regex = Regex::new(pattern).map_err(|e| {
                ValidationError::InvalidProperties(format!("Invalid pattern '{}': {}", pattern, e))
            })?;
            let _ = compiled.set(Some(regex));
        }

        Ok(Self {
            path,
            operator,
            value,
            pattern: compiled,
        })
    }

    /// Compiled `Matches` pattern; `None` when the value is not a valid regex
    fn regex(&self) -> Option<&Regex> {
        self.pattern
            .get_or_init(|| self.value.as_str().and_then(|p| Regex::new(p).ok()))
            .as_ref()
    }

    /// Resolve this filter's path inside a properties object
    fn resolve<'a>(&self, properties: &'a Value) -> Option<&'a Value> {
        let pointer = json_path_to_pointer(&self.path);
        properties.pointer(&pointer)
    }

    /// Evaluate the filter against a node's properties
    pub fn matches(&self, properties: &Value) -> bool {
        let Some(actual) = self.resolve(properties) else {
            // Missing properties only satisfy a negative comparison
            return self.operator == FilterOperator::NotEquals;
        };

        match self.operator {
            FilterOperator::Equals => actual == &self.value,
            FilterOperator::NotEquals => actual != &self.value,
            FilterOperator::GreaterThan => {
                compare_scalars(actual, &self.value) == Some(Ordering::Greater)
            }
            FilterOperator::GreaterThanOrEqual => matches!(
                compare_scalars(actual, &self.value),
                Some(Ordering::Greater | Ordering::Equal)
            ),
            FilterOperator::LessThan => compare_scalars(actual, &self.value) == Some(Ordering::Less),
            FilterOperator::LessThanOrEqual => matches!(
                compare_scalars(actual, &self.value),
                Some(Ordering::Less | Ordering::Equal)
            ),
            FilterOperator::Contains => match (actual, &self.value) {
                (Value::String(s), Value::String(needle)) => s.contains(needle.as_str()),
                (Value::Array(items), needle) => items.contains(needle),
                _ => false,
            },
            FilterOperator::StartsWith => match (actual, &self.value) {
                (Value::String(s), Value::String(prefix)) => s.starts_with(prefix.as_str()),
                _ => false,
            },
            FilterOperator::EndsWith => match (actual, &self.value) {
                (Value::String(s), Value::String(suffix)) => s.ends_with(suffix.as_str()),
                _ => false,
            },
            FilterOperator::Matches => match actual {
                Value::String(s) => self.regex().is_some_and(|re| re.is_match(s)),
                _ => false,
            },
        }
    }
}

/// Convert `$.a.b` into the JSON pointer `/a/b`
fn json_path_to_pointer(path: &str) -> String {
    path.trim_start_matches('$')
        .split('.')
        .filter(|segment| !segment.is_empty())
        .map(|segment| format!("/{}", segment.replace('~', "~0").replace('/', "~1")))
        .collect()
}

/// Order two scalars of the same kind; `None` when they are not comparable
fn compare_scalars(a: &Value, b: &Value) -> Option<Ordering> {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => x.as_f64()?.partial_cmp(&y.as_f64()?),
        (Value::String(x), Value::String(y)) => Some(x.cmp(y)),
        (Value::Bool(x), Value::Bool(y)) => Some(x.cmp(y)),
        _ => None,
    }
}

/// Total order over optional JSON values used for sorting
fn compare_for_sort(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    fn rank(value: Option<&Value>) -> u8 {
        match value {
            None | Some(Value::Null) => 0,
            Some(Value::Bool(_)) => 1,
            Some(Value::Number(_)) => 2,
            Some(Value::String(_)) => 3,
            Some(Value::Array(_)) => 4,
            Some(Value::Object(_)) => 5,
        }
    }

    match (a, b) {
        (Some(x), Some(y)) => compare_scalars(x, y)
            .unwrap_or_else(|| rank(a).cmp(&rank(b)).then_with(|| x.to_string().cmp(&y.to_string()))),
        _ => rank(a).cmp(&rank(b)),
    }
}

/// Node filter for store operations
///
/// All constraints are combined with AND; `None` fields do not filter.
///
/// # Examples
///
/// ```rust
/// # use pathtree_core::models::NodeFilter;
/// // Direct children of A
/// let children = NodeFilter::new().with_parent(Some("A".to_string()));
///
/// // Every descendant of A#B
/// let subtree = NodeFilter::new().with_path_prefix("A#B#");
///
/// // Root documents only
/// let roots = NodeFilter::new().with_parent(None);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeFilter {
    /// Filter by node ID
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    /// Filter by a set of IDs
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ids: Option<Vec<String>>,

    /// Filter by parent; `Some(None)` selects documents without a parent
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "super::node::deserialize_optional_field"
    )]
    pub parent: Option<Option<String>>,

    /// Filter by path prefix (starts-with match on `path`)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path_prefix: Option<String>,

    /// Filter by JSON property values
    #[serde(skip_serializing_if = "Option::is_none")]
    pub property_filters: Option<Vec<PropertyFilter>>,
}

impl NodeFilter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Point filter on a single id
    pub fn by_id(id: impl Into<String>) -> Self {
        Self {
            id: Some(id.into()),
            ..Default::default()
        }
    }

    pub fn with_ids(mut self, ids: Vec<String>) -> Self {
        self.ids = Some(ids);
        self
    }

    pub fn with_parent(mut self, parent: Option<String>) -> Self {
        self.parent = Some(parent);
        self
    }

    pub fn with_path_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.path_prefix = Some(prefix.into());
        self
    }

    /// Add a property filter (accumulates with existing ones)
    pub fn with_property_filter(mut self, filter: PropertyFilter) -> Self {
        self.property_filters.get_or_insert_with(Vec::new).push(filter);
        self
    }

    /// Whether a document satisfies every structural constraint
    pub fn matches_structure(&self, node: &TreeNode) -> bool {
        if let Some(id) = &self.id {
            if &node.id != id {
                return false;
            }
        }

        if let Some(ids) = &self.ids {
            if !ids.contains(&node.id) {
                return false;
            }
        }

        if let Some(parent) = &self.parent {
            if &node.parent != parent {
                return false;
            }
        }

        if let Some(prefix) = &self.path_prefix {
            match &node.path {
                Some(path) if path.starts_with(prefix.as_str()) => {}
                _ => return false,
            }
        }

        true
    }

    /// Whether a document satisfies every property filter
    pub fn matches_properties(&self, node: &TreeNode) -> bool {
        self.property_filters
            .iter()
            .flatten()
            .all(|filter| filter.matches(&node.properties))
    }

    /// Whether a document satisfies the whole filter
    pub fn matches(&self, node: &TreeNode) -> bool {
        self.matches_structure(node) && self.matches_properties(node)
    }
}

/// Field projection
///
/// `id` and the timestamps are always returned. `parent` and `path` are
/// returned only when listed; every other name selects a key of `properties`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Projection {
    pub fields: Vec<String>,
}

impl Projection {
    pub fn new<I, S>(fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            fields: fields.into_iter().map(Into::into).collect(),
        }
    }

    pub fn contains(&self, field: &str) -> bool {
        self.fields.iter().any(|f| f == field)
    }

    /// Add a field if it is not already listed
    pub fn include(&mut self, field: &str) {
        if !self.contains(field) {
            self.fields.push(field.to_string());
        }
    }

    /// Reduce a document to the projected fields
    pub fn apply(&self, mut node: TreeNode) -> TreeNode {
        if !self.contains("parent") {
            node.parent = None;
        }
        if !self.contains("path") {
            node.path = None;
        }
        if let Value::Object(properties) = &mut node.properties {
            properties.retain(|key, _| self.contains(key));
        }
        node
    }
}

/// Field a result set can be ordered by
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SortField {
    Path,
    Id,
    CreatedAt,
    ModifiedAt,
    /// A top-level key of `properties`
    Property(String),
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SortDirection {
    #[default]
    Ascending,
    Descending,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortKey {
    pub field: SortField,
    #[serde(default)]
    pub direction: SortDirection,
}

impl SortKey {
    pub fn ascending(field: SortField) -> Self {
        Self {
            field,
            direction: SortDirection::Ascending,
        }
    }

    pub fn descending(field: SortField) -> Self {
        Self {
            field,
            direction: SortDirection::Descending,
        }
    }

    fn compare(&self, a: &TreeNode, b: &TreeNode) -> Ordering {
        let ordering = match &self.field {
            SortField::Path => a.path.cmp(&b.path),
            SortField::Id => a.id.cmp(&b.id),
            SortField::CreatedAt => a.created_at.cmp(&b.created_at),
            SortField::ModifiedAt => a.modified_at.cmp(&b.modified_at),
            SortField::Property(key) => {
                compare_for_sort(a.properties.get(key), b.properties.get(key))
            }
        };

        match self.direction {
            SortDirection::Ascending => ordering,
            SortDirection::Descending => ordering.reverse(),
        }
    }
}

/// Sorting and paging options for `find`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FindOptions {
    /// Sort keys, most significant first
    #[serde(default)]
    pub sort: Vec<SortKey>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub skip: Option<usize>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<usize>,
}

impl FindOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sorted_by(mut self, key: SortKey) -> Self {
        self.sort.push(key);
        self
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn with_skip(mut self, skip: usize) -> Self {
        self.skip = Some(skip);
        self
    }

    /// Make ascending path order the most significant sort key
    ///
    /// Any existing path key is replaced; other keys remain as tie-breakers.
    pub fn ensure_primary_path_sort(&mut self) {
        self.sort.retain(|key| key.field != SortField::Path);
        self.sort.insert(0, SortKey::ascending(SortField::Path));
    }

    /// Sort, page and project an already filtered result set
    pub fn apply(&self, mut nodes: Vec<TreeNode>, projection: Option<&Projection>) -> Vec<TreeNode> {
        if !self.sort.is_empty() {
            nodes.sort_by(|a, b| {
                self.sort
                    .iter()
                    .map(|key| key.compare(a, b))
                    .find(|ordering| *ordering != Ordering::Equal)
                    .unwrap_or(Ordering::Equal)
            });
        }

        nodes
            .into_iter()
            .skip(self.skip.unwrap_or(0))
            .take(self.limit.unwrap_or(usize::MAX))
            .map(|node| match projection {
                Some(projection) => projection.apply(node),
                None => node,
            })
            .collect()
    }
}

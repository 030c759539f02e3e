//! Tree configuration
//!
//! `TreeConfig` is the single source of truth for the values that shape the
//! materialized paths of one tree. It is passed explicitly to every
//! `PathCodec` and store that needs it; there is no process-wide default, so
//! several trees with different separators can live in the same process.
//!
//! Configuration can come from three places:
//!
//! - `TreeConfig::default()` - separator `#`, stream page size 500
//! - `TreeConfig::from_env()` - `PATHTREE_PATH_SEPARATOR`, `PATHTREE_STREAM_PAGE_SIZE`
//! - `TreeConfig::from_file(path)` - a JSON document with camelCase keys

use crate::services::TreeError;
use serde::{Deserialize, Serialize};
use std::env;
use std::path::Path;

/// Default separator between path segments
pub const DEFAULT_PATH_SEPARATOR: &str = "#";

/// Default number of documents fetched per page when a store streams results
pub const DEFAULT_STREAM_PAGE_SIZE: usize = 500;

/// Environment variable overriding the path separator
pub const PATH_SEPARATOR_ENV: &str = "PATHTREE_PATH_SEPARATOR";

/// Environment variable overriding the stream page size
pub const STREAM_PAGE_SIZE_ENV: &str = "PATHTREE_STREAM_PAGE_SIZE";

/// Configuration for one materialized-path tree
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TreeConfig {
    /// Token placed between the ids of a path
    pub path_separator: String,

    /// Page size used by stores that stream descendants in batches
    pub stream_page_size: usize,
}

impl Default for TreeConfig {
    fn default() -> Self {
        Self {
            path_separator: DEFAULT_PATH_SEPARATOR.to_string(),
            stream_page_size: DEFAULT_STREAM_PAGE_SIZE,
        }
    }
}

impl TreeConfig {
    /// Create a configuration with a custom separator
    pub fn with_separator(separator: impl Into<String>) -> Self {
        Self {
            path_separator: separator.into(),
            ..Default::default()
        }
    }

    /// Build a configuration from environment variables, falling back to defaults
    ///
    /// # Errors
    ///
    /// Returns `TreeError::Configuration` if the page size is not a number or
    /// the resulting configuration is invalid.
    pub fn from_env() -> Result<Self, TreeError> {
        let mut config = Self::default();

        if let Ok(separator) = env::var(PATH_SEPARATOR_ENV) {
            config.path_separator = separator;
        }

        if let Ok(page_size) = env::var(STREAM_PAGE_SIZE_ENV) {
            config.stream_page_size = page_size.parse().map_err(|_| {
                TreeError::configuration(format!(
                    "{} must be a positive integer, got '{}'",
                    STREAM_PAGE_SIZE_ENV, page_size
                ))
            })?;
        }

        config.validate()?;
        Ok(config)
    }

    /// Load a configuration from a JSON file
    ///
    /// Missing keys take their default values.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, TreeError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|e| {
            TreeError::configuration(format!(
                "Failed to read tree config {}: {}",
                path.display(),
                e
            ))
        })?;

        let config: Self = serde_json::from_str(&raw).map_err(|e| {
            TreeError::configuration(format!(
                "Failed to parse tree config {}: {}",
                path.display(),
                e
            ))
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Check that the configuration can produce well-formed paths
    pub fn validate(&self) -> Result<(), TreeError> {
        if self.path_separator.is_empty() {
            return Err(TreeError::configuration("path separator cannot be empty"));
        }

        if self.stream_page_size == 0 {
            return Err(TreeError::configuration(
                "stream page size must be greater than zero",
            ));
        }

        Ok(())
    }
}

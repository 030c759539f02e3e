//! Tree Dump Binary
//!
//! Loads a seed file into an in-memory tree and prints the nested subtree of
//! every root as JSON. Useful for checking how a set of documents nests
//! without a database.
//!
//! # Usage
//!
//! ```bash
//! cargo run --bin tree-dump -- seed.json
//! EMPTY_CHILDS=1 cargo run --bin tree-dump -- seed.json
//! ```
//!
//! The seed file is a JSON array of documents, created in order:
//!
//! ```json
//! [
//!   { "id": "A" },
//!   { "id": "B", "parent": "A", "properties": { "name": "Child" } }
//! ]
//! ```
//!
//! # Environment Variables
//!
//! - `EMPTY_CHILDS`: give leaves an empty `childs` array
//! - `PATHTREE_PATH_SEPARATOR`: path separator (default: `#`)
//! - `RUST_LOG`: Logging level (e.g., "info", "debug", "trace")

use std::env;
use std::sync::Arc;

use anyhow::Context;
use pathtree_core::db::InMemoryStore;
use pathtree_core::{ChildrenTreeOptions, TreeConfig, TreeNode, TreeService};
use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize)]
struct SeedNode {
    id: String,
    #[serde(default)]
    parent: Option<String>,
    #[serde(default = "empty_object")]
    properties: serde_json::Value,
}

fn empty_object() -> serde_json::Value {
    serde_json::json!({})
}

#[derive(Serialize)]
struct RootDump {
    #[serde(flatten)]
    root: TreeNode,
    childs: Vec<pathtree_core::TreeEntry>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let seed_path = env::args()
        .nth(1)
        .ok_or_else(|| anyhow::anyhow!("usage: tree-dump <seed.json>"))?;
    let empty_childs = env::var("EMPTY_CHILDS").is_ok_and(|v| !v.is_empty() && v != "0");

    let config = TreeConfig::from_env()?;
    tracing::info!("Separator: {:?}", config.path_separator);

    let raw = tokio::fs::read_to_string(&seed_path)
        .await
        .with_context(|| format!("Failed to read seed file {}", seed_path))?;
    let seed: Vec<SeedNode> =
        serde_json::from_str(&raw).with_context(|| format!("Failed to parse {}", seed_path))?;

    let service = TreeService::with_config(Arc::new(InMemoryStore::new()), &config)?;

    let mut roots = Vec::new();
    for entry in seed {
        let node = TreeNode::new_with_id(entry.id, entry.parent, entry.properties);
        let created = service
            .create_node(node)
            .await
            .context("Failed to load seed node")?;
        if created.is_root() {
            roots.push(created);
        }
    }
    tracing::info!("Loaded {} root(s)", roots.len());

    let mut dump = Vec::with_capacity(roots.len());
    for root in roots {
        let mut options = ChildrenTreeOptions::recursive();
        options.empty_childs = empty_childs;

        let childs = service.get_children_tree(&root, options).await?;
        dump.push(RootDump { root, childs });
    }

    println!("{}", serde_json::to_string_pretty(&dump)?);
    Ok(())
}

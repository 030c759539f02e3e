//! Performance benchmarks for tree building and cascades
//!
//! Run with: `cargo bench -p pathtree-core`
//!
//! These benchmarks measure:
//! - Flat-to-nested reconstruction of path-sorted results
//! - Descendant path rewrite when a subtree moves

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use pathtree_core::db::InMemoryStore;
use pathtree_core::models::TreeNode;
use pathtree_core::path_codec::PathCodec;
use pathtree_core::services::{TreeBuilder, TreeService};
use serde_json::json;
use std::sync::Arc;
use tokio::runtime::Runtime;

/// Generate a path-sorted subtree under root `R` with `fanout` children per
/// node, `depth` levels deep
fn generate_sorted_subtree(fanout: usize, depth: usize) -> Vec<TreeNode> {
    let codec = PathCodec::default();
    let mut nodes = Vec::new();
    let mut frontier = vec![("R".to_string(), "R".to_string())];
    let mut next_id = 0;

    for _ in 1..depth {
        let mut next_frontier = Vec::new();
        for (parent_id, parent_path) in &frontier {
            for _ in 0..fanout {
                let id = format!("n{}", next_id);
                next_id += 1;

                let mut node = TreeNode::new_with_id(id.clone(), Some(parent_id.clone()), json!({}));
                let path = codec.child_path(parent_path, &id);
                node.path = Some(path.clone());
                nodes.push(node);
                next_frontier.push((id, path));
            }
        }
        frontier = next_frontier;
    }

    nodes.sort_by(|a, b| a.path.cmp(&b.path));
    nodes
}

/// Benchmark reconstruction for growing result sets
fn bench_build(c: &mut Criterion) {
    let builder = TreeBuilder::default();
    let mut group = c.benchmark_group("tree_build");

    for (fanout, depth) in [(10, 3), (5, 5), (2, 10)] {
        let nodes = generate_sorted_subtree(fanout, depth);
        group.bench_with_input(
            BenchmarkId::from_parameter(format!("{}x{}_{}_nodes", fanout, depth, nodes.len())),
            &nodes,
            |b, nodes| {
                b.iter(|| black_box(builder.build(nodes.clone(), 2, true)));
            },
        );
    }

    group.finish();
}

/// Benchmark moving a 1000-descendant subtree between two roots
fn bench_move_cascade(c: &mut Criterion) {
    let rt = Runtime::new().unwrap();

    let mut group = c.benchmark_group("move_cascade");
    group.sample_size(10); // Fewer samples for expensive operations

    group.bench_function("1000_descendants", |b| {
        b.iter_custom(|iters| {
            rt.block_on(async {
                let mut total = std::time::Duration::ZERO;

                for _ in 0..iters {
                    let service = TreeService::new(Arc::new(InMemoryStore::new()));
                    for root in ["P1", "P2"] {
                        service
                            .create_node(TreeNode::new_with_id(root.to_string(), None, json!({})))
                            .await
                            .unwrap();
                    }
                    service
                        .create_node(TreeNode::new_with_id(
                            "N".to_string(),
                            Some("P1".to_string()),
                            json!({}),
                        ))
                        .await
                        .unwrap();
                    for i in 0..1000 {
                        let parent = if i < 10 { "N".to_string() } else { format!("c{}", i % 10) };
                        service
                            .create_node(TreeNode::new_with_id(
                                format!("c{}", i),
                                Some(parent),
                                json!({}),
                            ))
                            .await
                            .unwrap();
                    }

                    let start = std::time::Instant::now();
                    let moved = service.move_node("N", Some("P2")).await;
                    total += start.elapsed();

                    black_box(moved.unwrap());
                }

                total
            })
        });
    });

    group.finish();
}

criterion_group!(benches, bench_build, bench_move_cascade);
criterion_main!(benches);

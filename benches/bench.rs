use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

use rbtree::arena::Tree;

/// Helper to bench a function on a tree.
/// It creates a group for the given name and closure and runs tests for various tree sizes. Each
/// tree is populated by ascending inserts - the ordering a plain BST degrades on, and the one the
/// rebalancing exists for.
fn bench_helper(c: &mut Criterion, name: &str, f: impl Fn(&mut Tree<i32>, i32)) {
    let mut group = c.benchmark_group(name);

    for num_levels in [3, 7, 11, 15] {
        let num_nodes = 2usize.pow(num_levels as u32) - 1;
        let largest_element_in_tree = (num_nodes - 1) as i32;

        let tree = {
            let mut tree = Tree::new();
            for x in 0..num_nodes {
                tree.insert(x as i32);
            }

            tree
        };

        let id = BenchmarkId::from_parameter(largest_element_in_tree);
        group.bench_function(id, |b| {
            b.iter_custom(|iters| {
                let mut time = std::time::Duration::ZERO;
                for _ in 0..iters {
                    let mut tree = black_box(tree.clone());
                    let instant = std::time::Instant::now();
                    f(&mut tree, black_box(largest_element_in_tree));
                    let elapsed = instant.elapsed();
                    time += elapsed;
                }
                time
            })
        });
    }

    group.finish();
}

pub fn criterion_benchmark(c: &mut Criterion) {
    bench_helper(c, "find", |tree, i| {
        let _node = black_box(tree.find(&i));
    });
    bench_helper(c, "delete", |tree, i| {
        if let Some(node) = tree.find(&i) {
            tree.delete(node);
        }
    });

    bench_helper(c, "insert", |tree, i| {
        tree.insert(i + 1);
    });

    bench_helper(c, "find-miss", |tree, i| {
        let _node = black_box(tree.find(&(i + 1)));
    });
}

criterion_group!(benches, criterion_benchmark);
criterion_main!(benches);

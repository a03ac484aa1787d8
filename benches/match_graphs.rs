#[path = "../tests/common/mod.rs"]
mod common;

use common::load_graph;
use criterion::{criterion_group, criterion_main, Benchmark, Criterion};
use skeleton_graph_matching::{
    AdaptiveMatcher, CostRatio, Graph, GraphBuilder, GreedyMatcher, MatchParams, Matcher, NoopTracer,
    TopologicalMatcher,
};

/// A synthetic root above a complete tree of the given branching factor and depth.
fn branching_tree(branching: usize, depth: usize) -> Graph<f64, f64> {
    let mut builder = GraphBuilder::new("tree");
    builder.add_node(0, 1.0);
    builder.add_node(1, 2.0);
    builder.add_edge(0, 1, 1.0);

    let mut level = vec![1];
    let mut next_id = 2;
    for _ in 0..depth {
        let mut next_level = Vec::new();
        for &parent in &level {
            for _ in 0..branching {
                builder.add_node(next_id, 1.0 + (next_id % 7) as f64 * 0.5);
                builder.add_edge(parent, next_id, 0.5 + (next_id % 3) as f64 * 0.25);
                next_level.push(next_id);
                next_id += 1;
            }
        }
        level = next_level;
    }

    builder.build()
}

fn assert_similarity<M: Matcher<f64, f64>>(matcher: &mut M, expected: f64, a: &Graph<f64, f64>, b: &Graph<f64, f64>) {
    let s = matcher.match_graphs(a, b, &MatchParams::default()).similarity();
    assert!((s - expected).abs() < 1e-9, "similarity {}", s);
}

fn bench_hand(c: &mut Criterion) {
    let hand = load_graph("tests/graphs/hand.gml");

    c.bench_function("match_graphs/hand/greedy", move |b| {
        let mut matcher = GreedyMatcher::new(CostRatio).with_tracer(NoopTracer);
        b.iter(|| assert_similarity(&mut matcher, 1.0, &hand, &hand))
    });
}

fn bench_hand_claw(c: &mut Criterion) {
    let hand = load_graph("tests/graphs/hand.gml");
    let claw = load_graph("tests/graphs/claw.gml");

    c.bench_function("match_graphs/hand_claw/adaptive", move |b| {
        let mut matcher = AdaptiveMatcher::new(CostRatio).with_tracer(NoopTracer);
        b.iter(|| matcher.match_graphs(&hand, &claw, &MatchParams::default()))
    });
}

fn bench_tree(c: &mut Criterion) {
    let tree = branching_tree(3, 4);

    c.bench(
        "match_graphs",
        Benchmark::new("tree_3_4/topological", move |b| {
            let mut matcher = TopologicalMatcher::new(CostRatio).with_tracer(NoopTracer);
            b.iter(|| assert_similarity(&mut matcher, 1.0, &tree, &tree));
        })
        .sample_size(10),
    );
}

criterion_group!(benches, bench_hand, bench_hand_claw, bench_tree);
criterion_main!(benches);

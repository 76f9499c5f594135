//! Loop detection benchmarks.
//!
//! Each strategy is run on random graphs of increasing size, built from a fixed seed
//! so that runs are comparable.
//!
//! Run with:
//! ```bash
//! cargo bench --bench loop_detection
//! ```

use std::sync::Arc;

use bdd_reach::analysis::ReachabilityAnalysis;
use bdd_reach::bdd::{Bdd, BddConfig};
use bdd_reach::graph::{GraphBuilder, ReachabilityGraph};
use bdd_reach::loops::LoopStrategy;
use bdd_reach::state::StateNode;
use bdd_reach::transition::Transition;
use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use rand::prelude::*;
use rand_chacha::ChaCha8Rng;

const BITS: u32 = 8;

// ============================================================================
// Helper: random ring-with-chords network
// ============================================================================

/// A ring of `n` routers with a few random chords; every edge filters or rewrites one bit.
fn build_graph(bdd: &Bdd, n: usize, seed: u64) -> ReachabilityGraph {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let mut builder = GraphBuilder::new();

    let nodes: Vec<_> = (0..n)
        .map(|k| builder.node(StateNode::post_in_vrf(format!("r{}", k), "default")))
        .collect();
    for k in 0..n.min(4) {
        let ingress = builder
            .ingress(StateNode::originate_vrf(format!("r{}", k), "default"))
            .unwrap();
        builder.edge(ingress, nodes[k], Transition::Identity).unwrap();
    }

    let transition = |rng: &mut ChaCha8Rng| {
        let var = rng.random_range(1..=BITS);
        let x = bdd.mk_var(var);
        let lit = if rng.random_bool(0.5) { x } else { -x };
        if rng.random_bool(0.7) {
            Transition::constraint(bdd.apply_or(lit, bdd.mk_var(rng.random_range(1..=BITS))))
        } else {
            Transition::Assign {
                vars: vec![var],
                value: lit,
            }
        }
    };

    for k in 0..n {
        let t = transition(&mut rng);
        builder.edge(nodes[k], nodes[(k + 1) % n], t).unwrap();
    }
    for _ in 0..n / 2 {
        let a = nodes[rng.random_range(0..n)];
        let b = nodes[rng.random_range(0..n)];
        let t = transition(&mut rng);
        let _ = builder.edge(a, b, t);
    }
    let query = builder.query();
    builder.edge(nodes[n - 1], query, Transition::Identity).unwrap();

    builder.build().unwrap()
}

// ============================================================================
// Benchmarks
// ============================================================================

fn bench_strategies(c: &mut Criterion) {
    let mut group = c.benchmark_group("loop_detection");

    for &n in &[8, 16, 32] {
        for strategy in LoopStrategy::ALL {
            // Enumerating every simple path does not scale past small graphs.
            if strategy == LoopStrategy::PathEnumeration && n > 8 {
                continue;
            }
            group.bench_with_input(BenchmarkId::new(strategy.to_string(), n), &n, |b, &n| {
                b.iter(|| {
                    let bdd = Arc::new(Bdd::with_config(BddConfig::default().with_cache_bits(14)));
                    let graph = build_graph(&bdd, n, 42);
                    let analysis = ReachabilityAnalysis::new(bdd, graph);
                    analysis.detect_loops_with(strategy)
                });
            });
        }
    }

    group.finish();
}

fn bench_reverse_reachable(c: &mut Criterion) {
    let mut group = c.benchmark_group("reverse_reachable");

    for &n in &[16, 64, 256] {
        group.bench_with_input(BenchmarkId::from_parameter(n), &n, |b, &n| {
            let bdd = Arc::new(Bdd::default());
            let graph = build_graph(&bdd, n, 7);
            let analysis = ReachabilityAnalysis::new(bdd, graph);
            b.iter(|| analysis.reverse_reachable());
        });
    }

    group.finish();
}

criterion_group!(benches, bench_strategies, bench_reverse_reachable);
criterion_main!(benches);

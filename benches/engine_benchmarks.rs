use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use supplygraph::config::EmbeddingConfig;
use supplygraph::embed::{CancelToken, EmbeddingEngine};
use supplygraph::graph::{AttrMap, AttrValue, GraphStore, NodeKind, Relation, ViewFilter};
use supplygraph::propagate::PropagationSimulator;

/// A synthetic supply network: `n` suppliers spread over `n / 10`
/// components, each supplier also pinned to one of 20 countries.
fn build_graph(suppliers: usize) -> GraphStore {
    let mut store = GraphStore::new();
    let components = (suppliers / 10).max(1);

    for i in 0..20 {
        store
            .add_node(NodeKind::Country, format!("C{i:02}"), AttrMap::new())
            .unwrap();
    }
    for i in 0..components {
        store
            .add_node(NodeKind::Component, format!("COMP_{i:04}"), AttrMap::new())
            .unwrap();
    }
    for i in 0..suppliers {
        let mut attrs = AttrMap::new();
        attrs.insert(
            "reliability_score".to_string(),
            AttrValue::Float(0.5 + (i % 50) as f64 / 100.0),
        );
        let s = store
            .add_node(NodeKind::Supplier, format!("SUP_{i:04}"), attrs)
            .unwrap();
        let comp = store.node_id(&format!("COMP_{:04}", i % components)).unwrap();
        store.add_edge(s, comp, Relation::Supplies, 0.09, None).unwrap();
        let country = store.node_id(&format!("C{:02}", i % 20)).unwrap();
        store.add_edge(s, country, Relation::LocatedIn, 1.0, None).unwrap();
    }
    store
}

/// Benchmark graph construction throughput
fn bench_graph_build(c: &mut Criterion) {
    let mut group = c.benchmark_group("graph_build");
    for size in [100, 1000].iter() {
        group.bench_with_input(BenchmarkId::from_parameter(size), size, |b, &size| {
            b.iter(|| {
                let store = build_graph(size);
                criterion::black_box(store.active_node_count());
            });
        });
    }
    group.finish();
}

/// Benchmark a full embedding pass
fn bench_full_embedding(c: &mut Criterion) {
    let mut group = c.benchmark_group("embedding_full");
    group.sample_size(10);

    for size in [100, 1000].iter() {
        let store = build_graph(*size);
        let snapshot = store.snapshot();
        let mut cfg = EmbeddingConfig::default();
        cfg.dim = 32;
        let engine = EmbeddingEngine::new(cfg);

        group.bench_with_input(BenchmarkId::from_parameter(size), size, |b, _| {
            b.iter(|| {
                let vectors = engine.compute_full(&snapshot, &CancelToken::new()).unwrap();
                criterion::black_box(vectors.len());
            });
        });
    }
    group.finish();
}

/// Benchmark one disruption simulation
fn bench_propagation(c: &mut Criterion) {
    let mut group = c.benchmark_group("propagation");

    for size in [100, 1000].iter() {
        let store = build_graph(*size);
        let snapshot = store.snapshot();
        let origin = snapshot.node_id("SUP_0000").unwrap();
        let sim = PropagationSimulator::new(Default::default());

        group.bench_with_input(BenchmarkId::from_parameter(size), size, |b, _| {
            b.iter(|| {
                let report = sim
                    .simulate(&snapshot, &[(origin, 1.0)], &ViewFilter::default())
                    .unwrap();
                criterion::black_box(report.affected_count());
            });
        });
    }
    group.finish();
}

criterion_group!(
    benches,
    bench_graph_build,
    bench_full_embedding,
    bench_propagation
);
criterion_main!(benches);

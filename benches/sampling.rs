//! Benchmarks for statement sampling, fact synthesis and ranking AUC.

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use rand::{Rng, SeedableRng};

use glisten::graph::{Fact, Label, Node, SourceGraph};
use glisten::sampler::{RelationRule, SampledPool, SamplingLimits};
use glisten::scorer::ranking_auc;
use glisten::synth::generate_facts;

/// 50 relations, 20k edges over 2k nodes.
fn random_graph() -> SourceGraph {
    let mut rng = rand::rngs::StdRng::seed_from_u64(0);
    (0..20_000)
        .map(|_| {
            Fact::new(
                Node::iri(format!("http://ex.org/n{}", rng.gen_range(0..2_000))),
                format!("http://ex.org/p{}", rng.gen_range(0..50)),
                Node::iri(format!("http://ex.org/n{}", rng.gen_range(0..2_000))),
            )
        })
        .collect()
}

fn bench_sample(c: &mut Criterion) {
    let graph = random_graph();
    let rule = RelationRule::BlockList { relations: vec![] };

    c.bench_function("sample_50_relations", |bench| {
        bench.iter(|| black_box(SampledPool::sample(&graph, &rule, SamplingLimits::default(), 1234)))
    });
}

fn bench_synthesize(c: &mut Criterion) {
    let graph = random_graph();
    let rule = RelationRule::BlockList { relations: vec![] };
    let limits = SamplingLimits::default();

    c.bench_function("generate_100_true_100_false", |bench| {
        bench.iter(|| {
            let mut t = SampledPool::sample(&graph, &rule, limits, 1234);
            let mut f = SampledPool::sample(&graph, &rule, limits, 1234);
            black_box(generate_facts(&graph, 1234, 100, 100, &mut t, &mut f))
        })
    });
}

fn bench_ranking_auc(c: &mut Criterion) {
    let mut rng = rand::rngs::StdRng::seed_from_u64(0);
    let scored: Vec<(Label, f64)> = (0..1_000)
        .map(|i| {
            let label = if i % 2 == 0 { Label::True } else { Label::False };
            (label, rng.gen_range(-1.0..1.0))
        })
        .collect();

    c.bench_function("ranking_auc_1000", |bench| {
        bench.iter(|| black_box(ranking_auc(&scored)))
    });
}

criterion_group!(benches, bench_sample, bench_synthesize, bench_ranking_auc);
criterion_main!(benches);

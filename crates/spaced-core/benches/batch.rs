// SPDX-License-Identifier: AGPL-3.0-or-later
// © 2025 Ryo ∴ SpiralArchitect (kishkavsesvit@icloud.com)

use criterion::{criterion_group, criterion_main, BatchSize, Criterion, Throughput};
use spaced_core::{
    Arity, BatchConfig, BatchEvaluator, GeneratorSet, Hyperboloid, PositiveDefinite, Symbol, Word,
};

/// Deterministic pseudo-random words drawn from a 64-bit LCG.
fn synthetic_words(count: usize, length: usize) -> Vec<Word> {
    let mut state: u64 = 0x9E37_79B9_7F4A_7C15;
    (0..count)
        .map(|_| {
            let symbols = (0..length)
                .map(|_| {
                    state = state
                        .wrapping_mul(6_364_136_223_846_793_005)
                        .wrapping_add(1_442_695_040_888_963_407);
                    Symbol::ALL[(state >> 61) as usize]
                })
                .collect();
            Word::new(symbols)
        })
        .collect()
}

fn bench_batch(c: &mut Criterion) {
    let generators = GeneratorSet::genus_two();
    let pairs = synthetic_words(4096, 8);
    let triples = synthetic_words(4096, 9);

    let mut group = c.benchmark_group("batch");
    group.throughput(Throughput::Elements(pairs.len() as u64));

    let hyperbolic =
        BatchEvaluator::new(Hyperboloid, &generators, Arity::Pairs, BatchConfig::default())
            .expect("hyperbolic evaluator");
    group.bench_function("hyperbolic_pairs", |b| {
        b.iter(|| criterion::black_box(hyperbolic.evaluate(&pairs).expect("batch")))
    });

    let hyperbolic_triples =
        BatchEvaluator::new(Hyperboloid, &generators, Arity::Triples, BatchConfig::default())
            .expect("hyperbolic evaluator");
    group.bench_function("hyperbolic_triples", |b| {
        b.iter(|| criterion::black_box(hyperbolic_triples.evaluate(&triples).expect("batch")))
    });

    let rank2 = BatchEvaluator::new(
        PositiveDefinite::new(),
        &generators,
        Arity::Pairs,
        BatchConfig::default(),
    )
    .expect("rank-two evaluator");
    group.bench_function("rank2_pairs", |b| {
        b.iter(|| criterion::black_box(rank2.evaluate(&pairs).expect("batch")))
    });

    group.throughput(Throughput::Elements(1024));
    let sequential = BatchEvaluator::new(
        PositiveDefinite::new(),
        &generators,
        Arity::Pairs,
        BatchConfig {
            sequential: true,
            ..BatchConfig::default()
        },
    )
    .expect("rank-two evaluator");
    group.bench_function("rank2_pairs_sequential", |b| {
        b.iter_batched(
            || pairs[..1024].to_vec(),
            |words| criterion::black_box(sequential.evaluate(&words).expect("batch")),
            BatchSize::SmallInput,
        )
    });
    group.finish();
}

criterion_group!(benches, bench_batch);
criterion_main!(benches);

use assocplot_core::{hit_test, occlusion, GenomicInterval, ScoredInterval};
use criterion::{black_box, criterion_group, criterion_main, Criterion};

/// Overlapping windows with a deterministic pseudo-random score landscape
fn generate_intervals(count: u64) -> Vec<ScoredInterval> {
    let mut state: u64 = 0x2545_f491_4f6c_dd1d;
    (0..count)
        .map(|i| {
            state ^= state << 13;
            state ^= state >> 7;
            state ^= state << 17;
            let start = i * 500;
            let width = 1_000 + state % 20_000;
            let score = (state % 10_000) as f64 / 1_000.0;
            let interval = GenomicInterval::new(1, start, start + width).unwrap();
            ScoredInterval::new(interval, 10f64.powf(-score), score)
        })
        .collect()
}

fn bench_reduce(c: &mut Criterion) {
    let intervals = generate_intervals(20_000);

    c.bench_function("reduce_20k", |b| {
        b.iter(|| black_box(occlusion::reduce(black_box(&intervals), true)))
    });

    c.bench_function("reduce_20k_no_ties", |b| {
        b.iter(|| black_box(occlusion::reduce(black_box(&intervals), false)))
    });
}

fn bench_resolve(c: &mut Criterion) {
    let intervals = occlusion::reduce(&generate_intervals(20_000), true);
    let span = intervals.last().map_or(1, |iv| iv.end()) as f64;

    c.bench_function("resolve_reduced_20k", |b| {
        let mut position = 0.0;
        b.iter(|| {
            position = (position + 7_919.0) % span;
            black_box(hit_test::resolve(black_box(position), &intervals))
        })
    });
}

criterion_group!(benches, bench_reduce, bench_resolve);
criterion_main!(benches);

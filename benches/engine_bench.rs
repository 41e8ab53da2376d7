//! Benchmark suite for letter-mastery
//!
//! Run with: cargo bench

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use letter_mastery::{CorridorValidator, LetterCatalog, Point, TraceConfig};

fn wobble(points: &[Point]) -> Vec<Point> {
    points
        .iter()
        .enumerate()
        .map(|(i, p)| Point::new(p.x + (i % 7) as f64 - 3.0, p.y + (i % 5) as f64 - 2.0))
        .collect()
}

fn bench_corridor_validate(c: &mut Criterion) {
    let catalog = LetterCatalog::builtin();
    let config = TraceConfig::default();
    let target = catalog.target_points("Ş", &config).unwrap_or_default();
    let drawn = vec![wobble(&target)];
    let validator = CorridorValidator::from_config(&config);

    c.bench_function("CorridorValidator::validate", |b| {
        b.iter(|| validator.validate(black_box(&drawn), black_box(&target)))
    });
}

fn bench_catalog_sampling(c: &mut Criterion) {
    let catalog = LetterCatalog::builtin();
    let config = TraceConfig::default();

    c.bench_function("LetterCatalog::sample_all", |b| {
        b.iter(|| catalog.sample_all(black_box(&config)))
    });
}

criterion_group!(benches, bench_corridor_validate, bench_catalog_sampling);
criterion_main!(benches);

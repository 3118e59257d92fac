use criterion::{Criterion, black_box, criterion_group, criterion_main};
use vigil_core::OutcomeClass;
use vigil_engine::{LikelihoodTable, PosteriorEngine};

// Valid-heavy with a sprinkling of lapses: long enough to cross the
// elimination rule, short enough that the engine stays ACTIVE throughout.
fn mixed_stream() -> Vec<(usize, OutcomeClass)> {
    (0..64)
        .map(|i| {
            let class = match (i % 9, i % 25) {
                (0, _) => OutcomeClass::Lapse,
                (_, 3) => OutcomeClass::FalseStart,
                _ => OutcomeClass::Valid,
            };
            (i / 11, class)
        })
        .collect()
}

fn bench_observe(c: &mut Criterion) {
    let stream = mixed_stream();

    c.bench_function("posterior_observe_mixed_64", |b| {
        b.iter(|| {
            // Threshold at the ceiling keeps the engine active for the
            // whole stream.
            let mut engine = PosteriorEngine::new(LikelihoodTable::default(), 0.999_999_999);
            for &(bin, class) in &stream {
                black_box(engine.observe(bin, class));
            }
            engine.snapshot()
        })
    });
}

criterion_group!(benches, bench_observe);
criterion_main!(benches);

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use three_body_fair::{
    config::SigningKey,
    game::OutcomeDeriver,
    physics::{simulate, Schedule},
    proof::mix,
};

const HOUSE_SEED: &str = "b5c57eb34d118fc75253e9b4c51c928f4f6fb628d52ea71a848a6bb585a8302d";
const ENTROPY: &str = "bc25e5fbe036ab26aa61328d8c518e0c01a3a8b3811464ad6d1381e0c322aec2";

fn entropy_source(c: &mut Criterion) {
    let mut group = c.benchmark_group("simulate");
    for (name, schedule) in [("house_seed", Schedule::HOUSE_SEED), ("mixing", Schedule::MIXING)] {
        group.bench_function(BenchmarkId::new(name, schedule.steps()), |b| {
            b.iter(|| black_box(simulate(black_box(b"test-fixture-001"), schedule)))
        });
    }
    group.finish();

    let key = SigningKey::new("bench-key").expect("non-empty key");
    c.bench_function("mix_physics_hmac", |b| {
        b.iter(|| black_box(mix(HOUSE_SEED, "player-42", 1_700_000_000_000, &key)))
    });
}

fn outcome_derivation(c: &mut Criterion) {
    let deriver = OutcomeDeriver::default();
    c.bench_function("derive_grid_default", |b| {
        b.iter(|| black_box(deriver.derive(black_box(ENTROPY))))
    });
}

criterion_group!(benches, entropy_source, outcome_derivation);
criterion_main!(benches);

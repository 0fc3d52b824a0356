use criterion::*;
use std::hint::black_box;

use isorts_sim::{SimConfig, SimWorld, UnitType, Vec2, BOSS_ID};

const DT: f32 = 1.0 / 60.0;

/// A crowd of `side * side` units walking across the map toward the boss.
fn crowded_world(side: u32) -> SimWorld {
    let mut sim = SimWorld::with_config(SimConfig::default()).unwrap();
    let types = UnitType::SQUAD;
    for i in 0..side * side {
        let pos = Vec2::new(2.0 + (i / side) as f32 * 0.9, 2.0 + (i % side) as f32 * 0.9);
        sim.spawn_unit(i, types[(i % 4) as usize], pos).unwrap();
        sim.order_move(i, Vec2::new(30.0, 30.0), false).unwrap();
    }
    sim.spawn_unit(BOSS_ID + side * side, UnitType::BossOverseer, Vec2::new(24.0, 24.0))
        .unwrap();
    sim
}

fn tick_benchmark(c: &mut Criterion) {
    let mut group = c.benchmark_group("tick");

    for side in [8u32, 16, 20] {
        let units = side * side;
        group.throughput(Throughput::Elements(units as u64));
        group.bench_function(format!("tick_{units}_units"), |b| {
            b.iter_batched(
                || crowded_world(side),
                |mut sim| {
                    for _ in 0..10 {
                        sim.tick(black_box(DT));
                    }
                    sim
                },
                BatchSize::LargeInput,
            );
        });
    }

    group.finish();
}

fn snapshot_benchmark(c: &mut Criterion) {
    let mut sim = crowded_world(16);
    sim.tick(DT);
    c.bench_function("snapshot_json_256_units", |b| {
        b.iter(|| black_box(sim.snapshot_json()));
    });
}

criterion_group!(benches, tick_benchmark, snapshot_benchmark);
criterion_main!(benches);

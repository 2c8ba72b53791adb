#[macro_use]
extern crate criterion;

use criterion::Criterion;
use trafik_config::TrafikConfig;
use trafik_engine::Stepper;

fn bench_stepper_tick(c: &mut Criterion) {
    let mut group = c.benchmark_group("stepper_tick");

    for cap in [100usize, 1000, 5000] {
        let mut config = TrafikConfig::default();
        config.engine.seed = Some(42);
        config.engine.max_vehicles = cap;
        config.engine.spawn_probability = 1.0;
        config.engine.despawn_probability = 0.0;

        let mut stepper = Stepper::new(&config).expect("valid config");
        // fill the registry so the measured ticks run at capacity
        for _ in 0..cap / 5 {
            stepper.step();
        }

        group.bench_function(format!("cap_{cap}"), |b| b.iter(|| stepper.step()));
    }

    group.finish();
}

criterion_group!(benches, bench_stepper_tick);
criterion_main!(benches);

#[macro_use]
extern crate criterion;

use criterion::Criterion;

use trafik_core::snapshot::{SnapshotBus, VehicleSnapshot};

fn bench_snapshot_bus_publish_recv(c: &mut Criterion) {
    let mut group = c.benchmark_group("snapshot_bus_throughput");

    for capacity in [64, 256, 4096] {
        group.throughput(criterion::Throughput::Elements(capacity as u64));
        group.bench_function(format!("capacity_{}", capacity), |b| {
            let bus = SnapshotBus::with_capacity(capacity).unwrap();
            let snapshot = VehicleSnapshot {
                tick: 0,
                timestamp_ns: 0,
                vehicles: Vec::new(),
            };
            b.iter(|| {
                bus.publish(snapshot.clone());
                bus.try_recv().unwrap();
            });
        });
    }
    group.finish();
}

criterion_group!(benches, bench_snapshot_bus_publish_recv);
criterion_main!(benches);

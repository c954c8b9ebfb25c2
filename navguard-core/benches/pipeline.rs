//! Per-epoch throughput of the detection pipeline
//!
//! The decision loop is meant to run every epoch on modest hardware;
//! this bench tracks the cost of one fully clean epoch (the common
//! case) end to end.

use criterion::{criterion_group, criterion_main, Criterion};

use navguard_core::config::DetectionConfig;
use navguard_core::observation::Observation;
use navguard_core::pipeline::SpoofingPipeline;

fn clean_observation(timestamp: u64, lat: f64) -> Observation {
    Observation::builder(timestamp)
        .position(lat, -122.33, 60.0)
        .velocity(4.5, 90.0)
        .satellite(2, 44.0, 65.0, 30.0)
        .satellite(5, 47.5, 80.0, 120.0)
        .satellite(7, 41.0, 35.0, 200.0)
        .satellite(13, 45.5, 55.0, 280.0)
        .satellite(19, 39.0, 25.0, 90.0)
        .satellite(24, 46.0, 70.0, 330.0)
        .build()
}

fn pipeline_throughput(c: &mut Criterion) {
    c.bench_function("process_clean_epoch", |b| {
        let mut pipeline: SpoofingPipeline<8, _, _> =
            SpoofingPipeline::builder(DetectionConfig::default())
                .build()
                .expect("default config validates");
        let mut timestamp = 0u64;
        let mut lat = 47.6;

        b.iter(|| {
            timestamp += 1_000;
            lat += 0.00004;
            pipeline
                .process(clean_observation(timestamp, lat))
                .expect("clean epoch")
        });
    });
}

criterion_group!(benches, pipeline_throughput);
criterion_main!(benches);

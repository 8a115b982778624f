// Sample Ring Benchmarks
// Throughput of the producer and consumer paths of the sample ring

use criterion::{criterion_group, criterion_main, Criterion, Throughput};
use retro_host::audio::{BlockPuller, SampleRing};
use std::hint::black_box;
use std::sync::Arc;

/// One frame's worth of samples at 44.1 kHz / 60 FPS
const FRAME_SAMPLES: usize = 735;

fn bench_push(c: &mut Criterion) {
    let mut group = c.benchmark_group("ring_push");
    group.throughput(Throughput::Elements(FRAME_SAMPLES as u64));

    let frame: Vec<f32> = (0..FRAME_SAMPLES).map(|i| (i as f32 * 0.01).sin()).collect();

    // Ring with room: plain pushes
    group.bench_function("frame_with_room", |b| {
        let ring = SampleRing::default();
        b.iter(|| {
            ring.extend(black_box(&frame));
            ring.clear();
        });
    });

    // Saturated ring: every push evicts the oldest sample
    group.bench_function("frame_saturated", |b| {
        let ring = SampleRing::default();
        while !ring.is_full() {
            ring.push(0.0);
        }
        b.iter(|| {
            ring.extend(black_box(&frame));
        });
    });

    group.finish();
}

fn bench_pull(c: &mut Criterion) {
    let mut group = c.benchmark_group("ring_pull");

    for block_size in [512usize, 4096] {
        group.throughput(Throughput::Elements(block_size as u64));

        group.bench_function(format!("block_{}", block_size), |b| {
            let ring = Arc::new(SampleRing::default());
            let mut puller = BlockPuller::new(Arc::clone(&ring), block_size, 1.0);
            let refill = vec![0.25f32; block_size];
            b.iter(|| {
                ring.extend(&refill);
                black_box(puller.pull());
            });
        });

        group.bench_function(format!("underrun_{}", block_size), |b| {
            let ring = Arc::new(SampleRing::default());
            let mut puller = BlockPuller::new(Arc::clone(&ring), block_size, 1.0);
            b.iter(|| {
                black_box(puller.pull());
            });
        });
    }

    group.finish();
}

fn bench_device_fill(c: &mut Criterion) {
    let mut group = c.benchmark_group("device_fill");

    // Stereo device asking for 1024 frames per callback
    group.bench_function("stereo_1024", |b| {
        let ring = Arc::new(SampleRing::default());
        let mut puller = BlockPuller::new(Arc::clone(&ring), 4096, 0.8);
        let refill = vec![0.5f32; 1024];
        let mut out = vec![0.0f32; 2048];
        b.iter(|| {
            ring.extend(&refill);
            puller.fill(black_box(&mut out), 2);
        });
    });

    group.finish();
}

criterion_group!(benches, bench_push, bench_pull, bench_device_fill);
criterion_main!(benches);

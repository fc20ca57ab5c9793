//! Benchmarks for the partitioned reverb convolver.
//!
//! Cost grows with impulse length / block size (the partition count), so
//! small blocks with a long impulse are the worst case.

use std::hint::black_box;

use criterion::{BenchmarkId, Criterion};
use rand::{rngs::StdRng, SeedableRng};
use theremin_dsp::dsp::{ImpulseResponse, PartitionedConvolver};

use crate::BLOCK_SIZES;

pub fn bench_convolver(c: &mut Criterion) {
    let mut group = c.benchmark_group("dsp/convolver");
    let mut rng = StdRng::seed_from_u64(42);
    let short = ImpulseResponse::decaying_noise(&mut rng, 48_000.0, 0.3, 2.2);
    let room = ImpulseResponse::decaying_noise(&mut rng, 48_000.0, 1.4, 2.2);

    for &size in BLOCK_SIZES {
        let input: Vec<f32> = (0..size).map(|i| (i as f32 * 0.05).sin()).collect();
        let mut left = vec![0.0f32; size];
        let mut right = vec![0.0f32; size];

        for (name, impulse) in [("short-0.3s", &short), ("room-1.4s", &room)] {
            let mut convolver = PartitionedConvolver::new(impulse, size, true);
            group.bench_with_input(BenchmarkId::new(name, size), &size, |b, _| {
                b.iter(|| {
                    convolver.process_block(
                        black_box(&input),
                        black_box(&mut left),
                        black_box(&mut right),
                    );
                })
            });
        }
    }

    group.finish();
}

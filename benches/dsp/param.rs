//! Benchmarks for parameter automation.

use std::hint::black_box;

use criterion::{BenchmarkId, Criterion};
use theremin_dsp::dsp::param::{AudioParam, ParamEvent};

use crate::BLOCK_SIZES;

const SAMPLE_RATE: f32 = 48_000.0;

pub fn bench_param(c: &mut Criterion) {
    let mut group = c.benchmark_group("dsp/param");

    for &size in BLOCK_SIZES {
        let mut buffer = vec![0.0f32; size];
        let block_secs = size as f64 / SAMPLE_RATE as f64;

        // Settled - constant fill, the common case between gestures
        let mut param = AudioParam::new(0.5);
        group.bench_with_input(BenchmarkId::new("settled", size), &size, |b, _| {
            b.iter(|| {
                param.fill(black_box(&mut buffer), 0.0, SAMPLE_RATE);
            })
        });

        // Gliding - a fresh exponential target every block, as a moving pointer does
        let mut param = AudioParam::new(440.0);
        let mut t = 0.0;
        let mut up = true;
        group.bench_with_input(BenchmarkId::new("glide", size), &size, |b, _| {
            b.iter(|| {
                let target = if up { 880.0 } else { 440.0 };
                up = !up;
                param.schedule(
                    ParamEvent::SetTargetAtTime {
                        target,
                        start: t,
                        time_constant: 0.012,
                    },
                    t,
                );
                param.fill(black_box(&mut buffer), t, SAMPLE_RATE);
                t += block_secs;
            })
        });
    }

    group.finish();
}

//! Benchmarks for a sounding voice rendered through the full graph.

use std::hint::black_box;

use criterion::{BenchmarkId, Criterion};
use theremin_dsp::{
    engine::{AudioSession, ManualClock},
    graph::{GraphRenderer, NativeGraph},
    synth::WaveformId,
    EngineConfig, ThereminEngine,
};

use crate::BLOCK_SIZES;

fn sounding(config: EngineConfig) -> (ThereminEngine, GraphRenderer) {
    let (graph, renderer) = NativeGraph::new(48_000.0);
    let mut engine = ThereminEngine::new(config, AudioSession::open(Box::new(graph)))
        .expect("valid config")
        .with_clock(Box::new(ManualClock::new()))
        .with_impulse_seed(7);
    engine.down(0.5, 0.2).expect("gesture");
    (engine, renderer)
}

pub fn bench_gesture(c: &mut Criterion) {
    let mut group = c.benchmark_group("scenarios/gesture");

    for &size in BLOCK_SIZES {
        let mut left = vec![0.0f32; size];
        let mut right = vec![0.0f32; size];

        // === DRY VOICE ===
        // sine → envelope → dry → master; the convolver still runs muted
        let (_engine, mut renderer) = sounding(EngineConfig::default());
        group.bench_with_input(BenchmarkId::new("dry", size), &size, |b, _| {
            b.iter(|| {
                renderer.render(black_box(&mut left), black_box(&mut right));
            })
        });

        // === WARM VOICE WITH REVERB ===
        let config = EngineConfig::default()
            .with_waveform(WaveformId::WarmSaw)
            .with_reverb(true, 0.5);
        let (_engine, mut renderer) = sounding(config);
        group.bench_with_input(BenchmarkId::new("warm-reverb", size), &size, |b, _| {
            b.iter(|| {
                renderer.render(black_box(&mut left), black_box(&mut right));
            })
        });

        // === MOVING POINTER ===
        // a new pitch/volume target per block, as during a drag
        let (mut engine, mut renderer) = sounding(EngineConfig::default());
        let mut x = 0.0;
        group.bench_with_input(BenchmarkId::new("drag", size), &size, |b, _| {
            b.iter(|| {
                x = (x + 0.01) % 1.0;
                engine.move_to(x, 0.3);
                renderer.render(black_box(&mut left), black_box(&mut right));
                engine.tick();
            })
        });
    }

    group.finish();
}

//! Benchmarks for oscillator waveform generation.

use std::hint::black_box;

use criterion::{BenchmarkId, Criterion};
use theremin_dsp::dsp::oscillator::{NativeShape, OscillatorBlock, OscillatorShape};
use theremin_dsp::synth::{WaveformId, WaveformLibrary};

use crate::BLOCK_SIZES;

pub fn bench_oscillator(c: &mut Criterion) {
    let mut group = c.benchmark_group("dsp/oscillator");
    let library = WaveformLibrary::shared();

    for &size in BLOCK_SIZES {
        let mut buffer = vec![0.0f32; size];
        let frequency = vec![440.0f32; size];

        // Native shapes - closed form per sample, PolyBLEP on the edges
        for shape in [
            NativeShape::Sine,
            NativeShape::Square,
            NativeShape::Sawtooth,
            NativeShape::Triangle,
        ] {
            let mut osc = OscillatorBlock::new(OscillatorShape::Native(shape));
            let name = format!("{shape:?}").to_lowercase();
            group.bench_with_input(BenchmarkId::new(name, size), &size, |b, _| {
                b.iter(|| {
                    osc.render(black_box(&mut buffer), black_box(&frequency), 48_000.0);
                })
            });
        }

        // Warm timbres - wavetable lookup with linear interpolation
        for id in [WaveformId::WarmSaw, WaveformId::WarmSquare] {
            let mut osc = OscillatorBlock::new(library.shape(id));
            group.bench_with_input(BenchmarkId::new(id.name(), size), &size, |b, _| {
                b.iter(|| {
                    osc.render(black_box(&mut buffer), black_box(&frequency), 48_000.0);
                })
            });
        }

        // Gliding pitch - high notes switch to the sparser tables
        let glide: Vec<f32> = (0..size)
            .map(|i| 130.0 + 1870.0 * i as f32 / size as f32)
            .collect();
        let mut osc = OscillatorBlock::new(library.shape(WaveformId::WarmSaw));
        group.bench_with_input(BenchmarkId::new("warm-saw-glide", size), &size, |b, _| {
            b.iter(|| {
                osc.render(black_box(&mut buffer), black_box(&glide), 48_000.0);
            })
        });
    }

    group.finish();
}

//! Benchmarks for DSP primitives and the full gesture path.
//!
//! Run with: cargo bench
//!
//! Everything here runs on the audio thread in production, so each block
//! must finish well inside its real-time deadline.
//!
//! Reference timing at 48kHz sample rate:
//!   - 64 samples  = 1.33ms deadline
//!   - 128 samples = 2.67ms deadline
//!   - 256 samples = 5.33ms deadline
//!   - 512 samples = 10.67ms deadline
//!
//! Benchmark groups:
//!   - dsp/*        Low-level primitives (oscillator, parameter automation, convolver)
//!   - scenarios/*  A sounding voice through the signal bus, reverb on and off

use criterion::{criterion_group, criterion_main};

mod dsp;
mod scenarios;

/// Common buffer sizes used in audio applications.
pub const BLOCK_SIZES: &[usize] = &[64, 128, 256, 512];

criterion_group!(
    benches,
    // Low-level DSP primitives
    dsp::bench_oscillator,
    dsp::bench_param,
    dsp::bench_convolver,
    // Gesture to speaker
    scenarios::bench_gesture,
);
criterion_main!(benches);

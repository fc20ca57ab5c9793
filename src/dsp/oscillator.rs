use std::{f64::consts::TAU, sync::Arc};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::dsp::periodic::PeriodicWave;

/// Waveforms the oscillator generates without a table.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NativeShape {
    Sine,
    Square,
    Sawtooth,
    Triangle,
}

/// What an oscillator is currently playing.
#[derive(Clone)]
pub enum OscillatorShape {
    Native(NativeShape),
    Periodic(Arc<PeriodicWave>),
}

impl std::fmt::Debug for OscillatorShape {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OscillatorShape::Native(shape) => write!(f, "Native({shape:?})"),
            OscillatorShape::Periodic(wave) => {
                write!(f, "Periodic({} harmonics)", wave.highest_harmonic())
            }
        }
    }
}

impl PartialEq for OscillatorShape {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (OscillatorShape::Native(a), OscillatorShape::Native(b)) => a == b,
            (OscillatorShape::Periodic(a), OscillatorShape::Periodic(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }
}

/// Phase-accumulating oscillator with PolyBLEP anti-aliasing for the native
/// shapes and band-limited table lookup for periodic waves.
pub struct OscillatorBlock {
    shape: OscillatorShape,
    phase: f64,
}

impl OscillatorBlock {
    pub fn new(shape: OscillatorShape) -> Self {
        Self { shape, phase: 0.0 }
    }

    pub fn sine() -> Self {
        Self::new(OscillatorShape::Native(NativeShape::Sine))
    }

    /// Swap the waveform without resetting phase.
    pub fn set_shape(&mut self, shape: OscillatorShape) {
        self.shape = shape;
    }

    pub fn shape(&self) -> &OscillatorShape {
        &self.shape
    }

    pub fn shape_mut(&mut self) -> &mut OscillatorShape {
        &mut self.shape
    }

    pub fn reset(&mut self) {
        self.phase = 0.0;
    }

    /// Render one sample per entry of `frequency` (Hz) into `out`.
    pub fn render(&mut self, out: &mut [f32], frequency: &[f32], sample_rate: f32) {
        debug_assert_eq!(out.len(), frequency.len());
        let sr = sample_rate as f64;

        for (sample, &freq) in out.iter_mut().zip(frequency) {
            let inc = (freq as f64 / sr).clamp(0.0, 0.5);
            *sample = match &self.shape {
                OscillatorShape::Native(NativeShape::Sine) => (TAU * self.phase).sin() as f32,
                OscillatorShape::Native(NativeShape::Sawtooth) => sawtooth(self.phase, inc),
                OscillatorShape::Native(NativeShape::Square) => square(self.phase, inc),
                OscillatorShape::Native(NativeShape::Triangle) => triangle(self.phase),
                OscillatorShape::Periodic(wave) => wave.sample(self.phase, freq, sample_rate),
            };

            self.phase += inc;
            if self.phase >= 1.0 {
                self.phase -= 1.0;
            }
        }
    }
}

#[inline]
fn sawtooth(phase: f64, inc: f64) -> f32 {
    let naive = 2.0 * phase - 1.0;
    (naive - poly_blep(phase, inc)) as f32
}

#[inline]
fn square(phase: f64, inc: f64) -> f32 {
    let mut value = if phase < 0.5 { 1.0 } else { -1.0 };
    value += poly_blep(phase, inc);
    value -= poly_blep((phase + 0.5) % 1.0, inc);
    value as f32
}

#[inline]
fn triangle(phase: f64) -> f32 {
    let value = if phase < 0.5 {
        4.0 * phase - 1.0
    } else {
        3.0 - 4.0 * phase
    };
    value as f32
}

/// Polynomial band-limited step correction around a discontinuity.
///
/// `t` is the phase in `[0, 1)`, `dt` the phase increment per sample.
#[inline]
fn poly_blep(t: f64, dt: f64) -> f64 {
    if dt <= 0.0 {
        0.0
    } else if t < dt {
        let t = t / dt;
        2.0 * t - t * t - 1.0
    } else if t > 1.0 - dt {
        let t = (t - 1.0) / dt;
        t * t + 2.0 * t + 1.0
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE_RATE: f32 = 48_000.0;

    fn render(shape: OscillatorShape, freq: f32, len: usize) -> Vec<f32> {
        let mut osc = OscillatorBlock::new(shape);
        let mut out = vec![0.0; len];
        let freqs = vec![freq; len];
        osc.render(&mut out, &freqs, SAMPLE_RATE);
        out
    }

    #[test]
    fn sine_matches_closed_form() {
        let out = render(OscillatorShape::Native(NativeShape::Sine), 440.0, 128);
        let n = 12;
        let expected = (TAU * 440.0 * n as f64 / SAMPLE_RATE as f64).sin() as f32;
        assert!((out[n] - expected).abs() < 1e-5, "expected {expected}, got {}", out[n]);
    }

    #[test]
    fn native_shapes_stay_bounded() {
        for shape in [
            NativeShape::Sine,
            NativeShape::Square,
            NativeShape::Sawtooth,
            NativeShape::Triangle,
        ] {
            let out = render(OscillatorShape::Native(shape), 1_000.0, 4_800);
            assert!(
                out.iter().all(|s| s.abs() <= 1.5),
                "{shape:?} out of range"
            );
        }
    }

    #[test]
    fn shape_swap_keeps_phase() {
        let mut osc = OscillatorBlock::sine();
        let mut out = [0.0; 10];
        osc.render(&mut out, &[480.0; 10], SAMPLE_RATE);
        let phase_before = osc.phase;

        osc.set_shape(OscillatorShape::Native(NativeShape::Triangle));
        assert_eq!(osc.phase, phase_before);
    }

    #[test]
    fn periodic_shape_plays_table() {
        let wave = Arc::new(PeriodicWave::from_sine_harmonics(&[(1, 1.0)]));
        let table = render(OscillatorShape::Periodic(wave), 440.0, 64);
        let native = render(OscillatorShape::Native(NativeShape::Sine), 440.0, 64);
        for (a, b) in table.iter().zip(&native) {
            assert!((a - b).abs() < 1e-3);
        }
    }
}

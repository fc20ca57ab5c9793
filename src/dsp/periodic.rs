//! Band-limited periodic waveforms built from Fourier coefficients.

use rustfft::{num_complex::Complex, FftPlanner};

/*
Periodic Waves
==============

A periodic wave is one cycle of a waveform described by its harmonic series:

    x(θ) = Σ  real[n]·cos(nθ) + imag[n]·sin(nθ)      n = 1 .. N

(index 0, the DC term, is ignored). One cycle is rendered into a lookup table
and the oscillator reads it with linear interpolation.

Aliasing
--------

A single table with 32 harmonics is fine at 100 Hz, but at 2 kHz the 32nd
harmonic sits at 64 kHz, far above Nyquist, and folds back as inharmonic
noise. So the wave keeps several tables ("levels"), each truncated to half the
harmonics of the previous:

    level 0: harmonics 1..32
    level 1: harmonics 1..16
    level 2: harmonics 1..8
    ...
    level k: harmonic 1 only

At render time the oscillator takes the richest level whose top harmonic is
still below Nyquist for the current frequency.

Normalization
-------------

All levels are scaled by the same factor, chosen so the full-bandwidth table
peaks at exactly 1.0. Using one factor keeps loudness steady when a glide
crosses a level boundary.

Synthesis
---------

Each level is produced with an inverse FFT of size TABLE_SIZE. For a real
signal, bin n and bin T-n carry conjugate halves of the coefficient:

    X[n]   = (real[n] - i·imag[n]) / 2
    X[T-n] = (real[n] + i·imag[n]) / 2
*/

/// Samples per cycle in each lookup table.
pub const TABLE_SIZE: usize = 4096;

struct WaveLevel {
    max_harmonic: usize,
    table: Vec<f32>,
}

/// An immutable, normalized, band-limited periodic waveform.
pub struct PeriodicWave {
    /// Richest level first.
    levels: Vec<WaveLevel>,
}

impl std::fmt::Debug for PeriodicWave {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PeriodicWave")
            .field("highest_harmonic", &self.highest_harmonic())
            .field("levels", &self.levels.len())
            .finish()
    }
}

impl PeriodicWave {
    /// Build from cosine (`real`) and sine (`imag`) coefficient arrays.
    ///
    /// Both arrays are indexed by harmonic number; index 0 is ignored. The
    /// shorter array is zero-extended.
    pub fn from_coefficients(real: &[f32], imag: &[f32]) -> Self {
        let len = real.len().max(imag.len());
        let highest = (1..len)
            .rev()
            .find(|&n| coeff(real, n) != 0.0 || coeff(imag, n) != 0.0)
            .unwrap_or(1)
            .min(TABLE_SIZE / 2 - 1);

        let mut planner = FftPlanner::<f32>::new();
        let ifft = planner.plan_fft_inverse(TABLE_SIZE);
        let mut spectrum = vec![Complex::new(0.0, 0.0); TABLE_SIZE];

        let mut levels = Vec::new();
        let mut limit = highest;
        loop {
            spectrum.fill(Complex::new(0.0, 0.0));
            for n in 1..=limit {
                let a = coeff(real, n) * 0.5;
                let b = coeff(imag, n) * 0.5;
                spectrum[n] = Complex::new(a, -b);
                spectrum[TABLE_SIZE - n] = Complex::new(a, b);
            }
            ifft.process(&mut spectrum);

            levels.push(WaveLevel {
                max_harmonic: limit,
                table: spectrum.iter().map(|c| c.re).collect(),
            });

            if limit == 1 {
                break;
            }
            limit = (limit / 2).max(1);
        }

        let peak = levels[0]
            .table
            .iter()
            .fold(0.0f32, |acc, &x| acc.max(x.abs()));
        if peak > 0.0 {
            let scale = 1.0 / peak;
            for level in &mut levels {
                for sample in &mut level.table {
                    *sample *= scale;
                }
            }
        }

        Self { levels }
    }

    /// Build from sparse `(harmonic, imag)` pairs with zero cosine terms.
    pub fn from_sine_harmonics(harmonics: &[(usize, f32)]) -> Self {
        let len = harmonics.iter().map(|&(n, _)| n + 1).max().unwrap_or(2);
        let mut imag = vec![0.0; len];
        for &(n, amplitude) in harmonics {
            imag[n] = amplitude;
        }
        Self::from_coefficients(&[], &imag)
    }

    /// Highest harmonic present in the full-bandwidth table.
    pub fn highest_harmonic(&self) -> usize {
        self.levels[0].max_harmonic
    }

    pub fn level_count(&self) -> usize {
        self.levels.len()
    }

    /// Table to play at `frequency` without harmonics above Nyquist.
    pub fn table_for(&self, frequency: f32, sample_rate: f32) -> &[f32] {
        let nyquist = sample_rate * 0.5;
        let f = frequency.abs().max(f32::MIN_POSITIVE);
        self.levels
            .iter()
            .find(|level| level.max_harmonic as f32 * f < nyquist)
            .unwrap_or_else(|| &self.levels[self.levels.len() - 1])
            .table
            .as_slice()
    }

    /// Peak absolute value of the full-bandwidth table.
    pub fn peak(&self) -> f32 {
        self.levels[0]
            .table
            .iter()
            .fold(0.0f32, |acc, &x| acc.max(x.abs()))
    }

    /// Interpolated sample at `phase` (cycles, `0.0..1.0`).
    #[inline]
    pub fn sample(&self, phase: f64, frequency: f32, sample_rate: f32) -> f32 {
        lookup(self.table_for(frequency, sample_rate), phase)
    }
}

#[inline]
fn coeff(values: &[f32], n: usize) -> f32 {
    values.get(n).copied().unwrap_or(0.0)
}

#[inline]
fn lookup(table: &[f32], phase: f64) -> f32 {
    let position = phase.rem_euclid(1.0) * table.len() as f64;
    let index = position as usize % table.len();
    let next = (index + 1) % table.len();
    let frac = (position - position.floor()) as f32;
    table[index] + (table[next] - table[index]) * frac
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::TAU;

    #[test]
    fn single_sine_harmonic_matches_sin() {
        let wave = PeriodicWave::from_sine_harmonics(&[(1, 1.0)]);
        for k in 0..64 {
            let phase = k as f64 / 64.0;
            let expected = (TAU * phase).sin() as f32;
            let actual = wave.sample(phase, 100.0, 48_000.0);
            assert!((actual - expected).abs() < 1e-3, "phase {phase}: {actual} vs {expected}");
        }
    }

    #[test]
    fn normalized_to_unit_peak() {
        let wave = PeriodicWave::from_sine_harmonics(&[(1, 0.2), (2, 0.1), (3, 0.05)]);
        assert!((wave.peak() - 1.0).abs() < 1e-5, "peak {}", wave.peak());
    }

    #[test]
    fn builds_halving_levels() {
        let harmonics: Vec<(usize, f32)> = (1..=32).map(|n| (n, 1.0 / n as f32)).collect();
        let wave = PeriodicWave::from_sine_harmonics(&harmonics);
        assert_eq!(wave.highest_harmonic(), 32);
        // 32, 16, 8, 4, 2, 1
        assert_eq!(wave.level_count(), 6);
    }

    #[test]
    fn high_notes_use_band_limited_table() {
        let harmonics: Vec<(usize, f32)> = (1..=32).map(|n| (n, 1.0 / n as f32)).collect();
        let wave = PeriodicWave::from_sine_harmonics(&harmonics);

        let low = wave.table_for(100.0, 48_000.0).as_ptr();
        let high = wave.table_for(2_000.0, 48_000.0).as_ptr();
        assert_ne!(low, high, "2 kHz must not use the 32-harmonic table");
    }
}

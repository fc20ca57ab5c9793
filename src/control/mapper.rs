use crate::control::pitch;

/*
Gesture → Pitch / Volume
========================

The gesture surface is a unit square. x picks the pitch, y the loudness.

Pitch (x)
---------

Hearing is logarithmic in frequency, so equal distances on the surface must
be equal musical intervals. The mapping is exponential:

    freq(x) = min · (max / min)^x

With the default 130 Hz .. 2000 Hz the surface spans ~3.9 octaves and every
semitone gets the same width.

Volume (y)
----------

y = 0 is the top edge. Loudness falls off quadratically towards the bottom,
which sounds more even than a linear fade:

    gain(y) = (1 - y)²

    1.0 ┤█
        │ ██
        │   ███
        │      ████
    0.0 ┼──────────█████──→ y
        0               1

Quantization
------------

Optionally the pitch snaps to the nearest equal-tempered semitone
(note = round(69 + 12·log2(f / 440)), ties away from zero). A note that
rounds past either bound is replaced by the nearest semitone inside it, so a
quantized pitch never leaves [min, max]. Bounds narrower than a semitone
hold no note at all; there the exact pitch is kept.
*/

/// A mapped gesture position: what to play and how to describe it.
#[derive(Debug, Clone, PartialEq)]
pub struct ToneTarget {
    pub frequency: f64,
    pub gain: f64,
    /// Nearest semitone to `frequency`.
    pub note: i32,
    pub note_name: &'static str,
    pub octave: i32,
    /// Deviation of `frequency` from the ideal pitch of `note`.
    /// Always 0 when quantized.
    pub cents: i32,
}

/// One semitone line on the gesture surface.
#[derive(Debug, Clone, PartialEq)]
pub struct ScaleMarker {
    pub note: i32,
    pub label: String,
    /// False for sharps.
    pub natural: bool,
    /// Horizontal position on the surface, `0.0..=1.0`.
    pub x01: f64,
}

/// Stateless mapping from normalized gesture coordinates to tone targets.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ControlSurfaceMapper {
    min_hz: f64,
    max_hz: f64,
}

impl ControlSurfaceMapper {
    pub fn new(min_hz: f64, max_hz: f64) -> Self {
        Self { min_hz, max_hz }
    }

    pub fn min_hz(&self) -> f64 {
        self.min_hz
    }

    pub fn max_hz(&self) -> f64 {
        self.max_hz
    }

    #[inline]
    pub fn frequency(&self, x01: f64) -> f64 {
        let x = clamp01(x01);
        (self.min_hz * (self.max_hz / self.min_hz).powf(x)).clamp(self.min_hz, self.max_hz)
    }

    #[inline]
    pub fn gain(&self, y01: f64) -> f64 {
        let y = clamp01(y01);
        (1.0 - y) * (1.0 - y)
    }

    /// Map a gesture sample to a target frequency and gain.
    pub fn map(&self, x01: f64, y01: f64, quantize: bool) -> ToneTarget {
        let exact = self.frequency(x01);
        let frequency = if quantize {
            self.snap(exact)
        } else {
            exact
        };
        describe(frequency, self.gain(y01), quantize)
    }

    /// Surface position of `freq`, the inverse of [`frequency`](Self::frequency).
    pub fn position(&self, freq: f64) -> f64 {
        clamp01((freq / self.min_hz).ln() / (self.max_hz / self.min_hz).ln())
    }

    /// Nearest semitone to `freq` that lies within the bounds.
    pub fn snap(&self, freq: f64) -> f64 {
        let note = pitch::nearest_note(freq);
        let snapped = match self.note_range() {
            Some((low, high)) => pitch::note_to_freq(note.clamp(low, high)),
            None => freq,
        };
        snapped.clamp(self.min_hz, self.max_hz)
    }

    /// Lowest and highest semitone inside the bounds, if any.
    fn note_range(&self) -> Option<(i32, i32)> {
        const EPS: f64 = 1e-9;
        let low = (pitch::freq_to_note_exact(self.min_hz) - EPS).ceil() as i32;
        let high = (pitch::freq_to_note_exact(self.max_hz) + EPS).floor() as i32;
        (low <= high).then_some((low, high))
    }

    /// Every semitone between the frequency bounds.
    pub fn scale_markers(&self) -> Vec<ScaleMarker> {
        let Some((low, high)) = self.note_range() else {
            return Vec::new();
        };

        (low..=high)
            .map(|note| ScaleMarker {
                note,
                label: pitch::note_label(note),
                natural: !pitch::note_name(note).contains('#'),
                x01: self.position(pitch::note_to_freq(note)),
            })
            .collect()
    }
}

impl Default for ControlSurfaceMapper {
    fn default() -> Self {
        Self::new(130.0, 2000.0)
    }
}

/// Readout decomposition of a played frequency.
pub fn describe(frequency: f64, gain: f64, quantized: bool) -> ToneTarget {
    let note = pitch::nearest_note(frequency);
    let cents = if quantized {
        0
    } else {
        pitch::cents_from(frequency, note)
    };
    ToneTarget {
        frequency,
        gain,
        note,
        note_name: pitch::note_name(note),
        octave: pitch::octave(note),
        cents,
    }
}

#[inline]
fn clamp01(v: f64) -> f64 {
    if v.is_nan() {
        0.0
    } else {
        v.clamp(0.0, 1.0)
    }
}

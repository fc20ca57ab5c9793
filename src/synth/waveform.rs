use std::{fmt, str::FromStr, sync::Arc, sync::OnceLock};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::dsp::{
    oscillator::{NativeShape, OscillatorShape},
    periodic::PeriodicWave,
};

/*
Warm Waveforms
==============

Two timbres are built from closed-form harmonic series instead of using the
oscillator's native shapes. Both are softened versions of a classic shape:
each harmonic keeps its 1/n amplitude but is additionally attenuated by an
exponential rolloff, which takes the buzz off the upper partials.

    warm-saw     n = 1..32         imag[n] = -(1/n) · e^(-n/14)
    warm-square  n = 1, 3, .., 31  imag[n] =  (1/n) · e^(-n/10)

All real (cosine) terms are zero, so every partial starts in sine phase.

    amplitude
    1.0 ┤█
        │█ █
        │█ █ ▄
        │█ █ █ ▄ ▂
        │█ █ █ █ █ ▂ ▁ ▁ ▁
    0.0 ┼─────────────────────→ n
         1 2 3 4 5 6 7 8 9     (warm-saw)

The tables are synthesized by `PeriodicWave`, which peak-normalizes them to
±1 and keeps band-limited copies for high notes. Synthesis happens once per
name; later lookups hand out the same `Arc`.
*/

/// Every timbre the voice can play.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "kebab-case"))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum WaveformId {
    #[default]
    Sine,
    Square,
    Sawtooth,
    Triangle,
    WarmSaw,
    WarmSquare,
}

impl WaveformId {
    pub const ALL: [WaveformId; 6] = [
        WaveformId::Sine,
        WaveformId::Square,
        WaveformId::Sawtooth,
        WaveformId::Triangle,
        WaveformId::WarmSaw,
        WaveformId::WarmSquare,
    ];

    pub fn name(self) -> &'static str {
        match self {
            WaveformId::Sine => "sine",
            WaveformId::Square => "square",
            WaveformId::Sawtooth => "sawtooth",
            WaveformId::Triangle => "triangle",
            WaveformId::WarmSaw => "warm-saw",
            WaveformId::WarmSquare => "warm-square",
        }
    }

    /// Next waveform in [`ALL`](Self::ALL), wrapping around.
    pub fn next(self) -> Self {
        let index = Self::ALL.iter().position(|&id| id == self).unwrap_or(0);
        Self::ALL[(index + 1) % Self::ALL.len()]
    }

    /// The oscillator's built-in shape, if this is not a synthesized timbre.
    pub fn native(self) -> Option<NativeShape> {
        match self {
            WaveformId::Sine => Some(NativeShape::Sine),
            WaveformId::Square => Some(NativeShape::Square),
            WaveformId::Sawtooth => Some(NativeShape::Sawtooth),
            WaveformId::Triangle => Some(NativeShape::Triangle),
            WaveformId::WarmSaw | WaveformId::WarmSquare => None,
        }
    }
}

impl fmt::Display for WaveformId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Error returned when parsing an unknown waveform name.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown waveform {0:?}")]
pub struct UnknownWaveform(pub String);

impl FromStr for WaveformId {
    type Err = UnknownWaveform;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .copied()
            .find(|id| id.name() == s)
            .ok_or_else(|| UnknownWaveform(s.to_string()))
    }
}

/// A named harmonic series: `(harmonic index, sine coefficient)` pairs.
#[derive(Debug, Clone, PartialEq)]
pub struct WaveformDefinition {
    pub name: &'static str,
    pub harmonics: Vec<(usize, f32)>,
}

impl WaveformDefinition {
    pub fn warm_saw() -> Self {
        let harmonics = (1..=32)
            .map(|n| {
                let n_f = n as f64;
                (n, (-(1.0 / n_f) * (-n_f / 14.0).exp()) as f32)
            })
            .collect();
        Self {
            name: WaveformId::WarmSaw.name(),
            harmonics,
        }
    }

    pub fn warm_square() -> Self {
        let harmonics = (1..=31)
            .step_by(2)
            .map(|n| {
                let n_f = n as f64;
                (n, ((1.0 / n_f) * (-n_f / 10.0).exp()) as f32)
            })
            .collect();
        Self {
            name: WaveformId::WarmSquare.name(),
            harmonics,
        }
    }

    /// Synthesize the normalized wavetable.
    pub fn build(&self) -> PeriodicWave {
        PeriodicWave::from_sine_harmonics(&self.harmonics)
    }
}

/// Lazily built, shared periodic waves for the synthesized timbres.
#[derive(Debug, Default)]
pub struct WaveformLibrary {
    warm_saw: OnceLock<Arc<PeriodicWave>>,
    warm_square: OnceLock<Arc<PeriodicWave>>,
}

static SHARED: WaveformLibrary = WaveformLibrary::new();

impl WaveformLibrary {
    pub const fn new() -> Self {
        Self {
            warm_saw: OnceLock::new(),
            warm_square: OnceLock::new(),
        }
    }

    /// The process-wide library.
    pub fn shared() -> &'static WaveformLibrary {
        &SHARED
    }

    /// Table for a synthesized timbre; `None` for native shapes.
    pub fn periodic(&self, id: WaveformId) -> Option<Arc<PeriodicWave>> {
        let cell = match id {
            WaveformId::WarmSaw => &self.warm_saw,
            WaveformId::WarmSquare => &self.warm_square,
            _ => return None,
        };
        let wave = cell.get_or_init(|| {
            let definition = match id {
                WaveformId::WarmSaw => WaveformDefinition::warm_saw(),
                _ => WaveformDefinition::warm_square(),
            };
            log::debug!("synthesized periodic wave {}", definition.name);
            Arc::new(definition.build())
        });
        Some(Arc::clone(wave))
    }

    /// What an oscillator should play for `id`.
    pub fn shape(&self, id: WaveformId) -> OscillatorShape {
        match (id.native(), self.periodic(id)) {
            (Some(native), _) => OscillatorShape::Native(native),
            (None, Some(wave)) => OscillatorShape::Periodic(wave),
            (None, None) => OscillatorShape::Native(NativeShape::Sine),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_round_trip() {
        for id in WaveformId::ALL {
            assert_eq!(id.name().parse::<WaveformId>(), Ok(id));
            assert_eq!(id.to_string(), id.name());
        }
        assert!("warm_saw".parse::<WaveformId>().is_err());
    }

    #[test]
    fn next_cycles_through_all() {
        let mut id = WaveformId::Sine;
        for _ in 0..WaveformId::ALL.len() {
            id = id.next();
        }
        assert_eq!(id, WaveformId::Sine);
        assert_eq!(WaveformId::Triangle.next(), WaveformId::WarmSaw);
    }

    #[test]
    fn warm_saw_coefficients() {
        let def = WaveformDefinition::warm_saw();
        assert_eq!(def.harmonics.len(), 32);
        let (n, first) = def.harmonics[0];
        assert_eq!(n, 1);
        assert!((first - (-(-1.0f32 / 14.0).exp())).abs() < 1e-6);
        assert!(def.harmonics.iter().all(|&(_, c)| c < 0.0));
    }

    #[test]
    fn warm_square_has_only_odd_harmonics() {
        let def = WaveformDefinition::warm_square();
        assert_eq!(def.harmonics.len(), 16);
        assert!(def.harmonics.iter().all(|&(n, _)| n % 2 == 1));
        assert_eq!(def.harmonics.last().map(|&(n, _)| n), Some(31));
    }

    #[test]
    fn periodic_waves_are_built_once() {
        let library = WaveformLibrary::new();
        let a = library.periodic(WaveformId::WarmSaw).expect("warm saw table");
        let b = library.periodic(WaveformId::WarmSaw).expect("warm saw table");
        assert!(Arc::ptr_eq(&a, &b), "table must be cached");
        assert!(library.periodic(WaveformId::Sine).is_none());
    }

    #[test]
    fn synthesized_tables_are_normalized() {
        let library = WaveformLibrary::new();
        for id in [WaveformId::WarmSaw, WaveformId::WarmSquare] {
            let wave = library.periodic(id).expect("periodic table");
            assert!((wave.peak() - 1.0).abs() < 1e-3, "{id}: peak {}", wave.peak());
        }
    }

    #[test]
    fn shapes_map_to_oscillator() {
        let library = WaveformLibrary::shared();
        assert_eq!(
            library.shape(WaveformId::Square),
            OscillatorShape::Native(NativeShape::Square)
        );
        assert!(matches!(
            library.shape(WaveformId::WarmSquare),
            OscillatorShape::Periodic(_)
        ));
        assert_eq!(
            library.shape(WaveformId::WarmSaw),
            library.shape(WaveformId::WarmSaw)
        );
    }

    #[cfg(feature = "serde")]
    #[test]
    fn serializes_kebab_case() {
        let json = serde_json::to_string(&WaveformId::WarmSquare).expect("serialize");
        assert_eq!(json, "\"warm-square\"");
    }
}

//! Engine configuration surface.
//!
//! Every option has a default matching the reference instrument, so
//! `EngineConfig::default()` is a playable setup. Times are in seconds.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::{error::ConfigError, synth::waveform::WaveformId};

#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default, rename_all = "camelCase"))]
#[derive(Debug, Clone, PartialEq)]
pub struct EngineConfig {
    /// Frequency at the left edge of the surface (Hz).
    pub min_hz: f64,
    /// Frequency at the right edge of the surface (Hz).
    pub max_hz: f64,
    /// Time constant of the pitch/volume approach while gliding.
    pub smoothing_time_constant: f64,
    pub reverb_impulse_duration: f64,
    pub reverb_decay_exponent: f64,
    /// Snap pitch to the nearest equal-tempered semitone.
    pub quantize: bool,
    pub reverb_enabled: bool,
    /// Reverb send level (0..1) applied while reverb is enabled.
    pub wet_ratio: f64,
    pub waveform: WaveformId,

    /// Prefix of suggested clip filenames.
    pub session_name: String,
    /// Encodings to try, in order, when a recording starts.
    pub recording_mime_preferences: Vec<String>,

    /// Time constant of the gain dip/restore around a waveform swap.
    pub waveform_crossfade: f64,
    /// Delay between starting the dip and swapping the waveform.
    pub waveform_swap_delay: f64,
    /// Time constant of the release ramp when a tone stops.
    pub release_time_constant: f64,
    /// Delay before the generator is stopped after release begins.
    pub oscillator_stop_delay: f64,
    /// Delay before the voice's nodes are disconnected and released.
    pub teardown_delay: f64,
}

/// Longest accepted time constant or delay, in seconds.
pub const MAX_TIMING_SECS: f64 = 10.0;
/// Longest accepted reverb impulse, in seconds.
pub const MAX_IMPULSE_SECS: f64 = 10.0;

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            min_hz: 130.0,
            max_hz: 2000.0,
            smoothing_time_constant: 0.012,
            reverb_impulse_duration: 1.4,
            reverb_decay_exponent: 2.2,
            quantize: false,
            reverb_enabled: false,
            wet_ratio: 0.25,
            waveform: WaveformId::Sine,

            session_name: "trackpad-theremin".to_string(),
            recording_mime_preferences: vec![
                "audio/webm;codecs=opus".to_string(),
                "audio/webm".to_string(),
                "audio/ogg;codecs=opus".to_string(),
            ],

            waveform_crossfade: 0.02,
            waveform_swap_delay: 0.025,
            release_time_constant: 0.005,
            oscillator_stop_delay: 0.03,
            teardown_delay: 0.06,
        }
    }
}

impl EngineConfig {
    pub fn with_frequency_range(mut self, min_hz: f64, max_hz: f64) -> Self {
        self.min_hz = min_hz;
        self.max_hz = max_hz;
        self
    }

    pub fn with_smoothing(mut self, time_constant: f64) -> Self {
        self.smoothing_time_constant = time_constant;
        self
    }

    pub fn with_quantize(mut self, quantize: bool) -> Self {
        self.quantize = quantize;
        self
    }

    pub fn with_reverb(mut self, enabled: bool, wet_ratio: f64) -> Self {
        self.reverb_enabled = enabled;
        self.wet_ratio = wet_ratio;
        self
    }

    pub fn with_impulse(mut self, duration: f64, decay_exponent: f64) -> Self {
        self.reverb_impulse_duration = duration;
        self.reverb_decay_exponent = decay_exponent;
        self
    }

    pub fn with_waveform(mut self, waveform: WaveformId) -> Self {
        self.waveform = waveform;
        self
    }

    pub fn with_session_name(mut self, name: impl Into<String>) -> Self {
        self.session_name = name.into();
        self
    }

    pub fn with_mime_preferences<I, S>(mut self, preferences: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.recording_mime_preferences = preferences.into_iter().map(Into::into).collect();
        self
    }

    /// Check that every value lies in its legal range.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.min_hz > 0.0 && self.max_hz > self.min_hz && self.max_hz.is_finite()) {
            return Err(ConfigError::InvalidBounds {
                min_hz: self.min_hz,
                max_hz: self.max_hz,
            });
        }

        positive("reverbDecayExponent", self.reverb_decay_exponent)?;
        positive("reverbImpulseDuration", self.reverb_impulse_duration)?;
        at_most("reverbImpulseDuration", self.reverb_impulse_duration, MAX_IMPULSE_SECS)?;

        for (field, value) in [
            ("smoothingTimeConstant", self.smoothing_time_constant),
            ("waveformCrossfade", self.waveform_crossfade),
            ("releaseTimeConstant", self.release_time_constant),
        ] {
            positive(field, value)?;
            at_most(field, value, MAX_TIMING_SECS)?;
        }
        for (field, value) in [
            ("waveformSwapDelay", self.waveform_swap_delay),
            ("oscillatorStopDelay", self.oscillator_stop_delay),
            ("teardownDelay", self.teardown_delay),
        ] {
            non_negative(field, value)?;
            at_most(field, value, MAX_TIMING_SECS)?;
        }

        if self.teardown_delay < self.oscillator_stop_delay {
            return Err(ConfigError::OutOfRange {
                field: "teardownDelay",
                value: self.teardown_delay,
            });
        }

        if !(0.0..=1.0).contains(&self.wet_ratio) {
            return Err(ConfigError::OutOfRange {
                field: "wetRatio",
                value: self.wet_ratio,
            });
        }

        Ok(())
    }

    /// Parse a JSON document; missing fields take their defaults.
    #[cfg(feature = "serde")]
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }
}

fn at_most(field: &'static str, value: f64, max: f64) -> Result<(), ConfigError> {
    if value <= max {
        Ok(())
    } else {
        Err(ConfigError::OutOfRange { field, value })
    }
}

fn positive(field: &'static str, value: f64) -> Result<(), ConfigError> {
    if value > 0.0 && value.is_finite() {
        Ok(())
    } else {
        Err(ConfigError::OutOfRange { field, value })
    }
}

fn non_negative(field: &'static str, value: f64) -> Result<(), ConfigError> {
    if value >= 0.0 && value.is_finite() {
        Ok(())
    } else {
        Err(ConfigError::OutOfRange { field, value })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let config = EngineConfig::default();
        config.validate().expect("default config should validate");
        assert_eq!(config.min_hz, 130.0);
        assert_eq!(config.max_hz, 2000.0);
        assert_eq!(config.wet_ratio, 0.25);
        assert_eq!(config.waveform, WaveformId::Sine);
    }

    #[test]
    fn rejects_inverted_bounds() {
        let config = EngineConfig::default().with_frequency_range(2000.0, 130.0);
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidBounds { .. })
        ));
    }

    #[test]
    fn rejects_wet_ratio_outside_unit_range() {
        let config = EngineConfig::default().with_reverb(true, 1.5);
        assert!(matches!(
            config.validate(),
            Err(ConfigError::OutOfRange { field: "wetRatio", .. })
        ));
    }

    #[test]
    fn rejects_teardown_before_generator_stop() {
        let mut config = EngineConfig::default();
        config.teardown_delay = 0.01;
        assert!(config.validate().is_err());
    }

    #[test]
    fn rejects_timings_above_the_ceiling() {
        let cases: [(&str, fn(&mut EngineConfig)); 6] = [
            ("smoothingTimeConstant", |c| c.smoothing_time_constant = 11.0),
            ("waveformCrossfade", |c| c.waveform_crossfade = 1e9),
            ("releaseTimeConstant", |c| c.release_time_constant = 60.0),
            ("waveformSwapDelay", |c| c.waveform_swap_delay = 1e20),
            ("oscillatorStopDelay", |c| c.oscillator_stop_delay = 10.5),
            ("teardownDelay", |c| c.teardown_delay = 1e20),
        ];
        for (name, apply) in cases {
            let mut config = EngineConfig::default();
            apply(&mut config);
            match config.validate() {
                Err(ConfigError::OutOfRange { field, .. }) => assert_eq!(field, name),
                other => panic!("{name}: expected OutOfRange, got {other:?}"),
            }
        }

        let slow = EngineConfig::default().with_smoothing(MAX_TIMING_SECS);
        slow.validate().expect("the ceiling itself is allowed");
    }

    #[test]
    fn rejects_overlong_impulse() {
        let config = EngineConfig::default().with_impulse(MAX_IMPULSE_SECS * 2.0, 2.2);
        assert!(matches!(
            config.validate(),
            Err(ConfigError::OutOfRange { field: "reverbImpulseDuration", .. })
        ));
    }

    #[cfg(feature = "serde")]
    #[test]
    fn json_with_huge_teardown_is_rejected() {
        let err = EngineConfig::from_json_str(r#"{ "teardownDelay": 1e20 }"#);
        assert!(matches!(
            err,
            Err(ConfigError::OutOfRange { field: "teardownDelay", .. })
        ));
    }

    #[cfg(feature = "serde")]
    #[test]
    fn parses_partial_json_with_defaults() {
        let config = EngineConfig::from_json_str(
            r#"{ "minHz": 110, "quantize": true, "waveform": "warm-saw", "wetRatio": 0.5 }"#,
        )
        .expect("config should parse");

        pretty_assertions::assert_eq!(
            config,
            EngineConfig::default()
                .with_frequency_range(110.0, 2000.0)
                .with_quantize(true)
                .with_waveform(WaveformId::WarmSaw)
                .with_reverb(false, 0.5)
        );
    }

    #[cfg(feature = "serde")]
    #[test]
    fn json_is_validated() {
        let err = EngineConfig::from_json_str(r#"{ "smoothingTimeConstant": 0 }"#);
        assert!(matches!(
            err,
            Err(ConfigError::OutOfRange { field: "smoothingTimeConstant", .. })
        ));
    }
}

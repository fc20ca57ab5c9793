//! Display strings for the front end.

use std::fmt;

use crate::control::mapper::ToneTarget;

const IDLE_FREQUENCY: &str = "— Hz";
const IDLE: &str = "—";

/// What the UI shows next to the gesture surface.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Readout {
    /// `"440 Hz"`
    pub frequency: String,
    /// `"0.56"`
    pub gain: String,
    /// `"A4"`, `"A4 +39¢"`, `"C#5 -12¢"`
    pub note: String,
    /// `"25%"`
    pub reverb: String,
}

impl Readout {
    /// Readout before any gesture has been made.
    pub fn idle(effective_wet: f64) -> Self {
        Self {
            frequency: IDLE_FREQUENCY.to_string(),
            gain: IDLE.to_string(),
            note: IDLE.to_string(),
            reverb: reverb_label(effective_wet),
        }
    }

    pub fn from_target(target: &ToneTarget, effective_wet: f64) -> Self {
        Self {
            frequency: frequency_label(target.frequency),
            gain: gain_label(target.gain),
            note: note_label(target),
            reverb: reverb_label(effective_wet),
        }
    }
}

impl fmt::Display for Readout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}  vol {}  {}  reverb {}",
            self.frequency, self.gain, self.note, self.reverb
        )
    }
}

pub fn frequency_label(freq: f64) -> String {
    format!("{} Hz", freq.round() as i64)
}

pub fn gain_label(gain: f64) -> String {
    format!("{gain:.2}")
}

/// Note and octave, with a signed cents suffix when off pitch.
pub fn note_label(target: &ToneTarget) -> String {
    let base = format!("{}{}", target.note_name, target.octave);
    match target.cents {
        0 => base,
        c if c > 0 => format!("{base} +{c}¢"),
        c => format!("{base} {c}¢"),
    }
}

pub fn reverb_label(effective_wet: f64) -> String {
    format!("{}%", (effective_wet * 100.0).round() as i64)
}

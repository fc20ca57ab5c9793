//! Equal-tempered pitch helpers. A4 = 440 Hz = MIDI note 69.

pub const A4_HZ: f64 = 440.0;
pub const A4_NOTE: i32 = 69;

const NOTE_NAMES: [&str; 12] = [
    "C", "C#", "D", "D#", "E", "F", "F#", "G", "G#", "A", "A#", "B",
];

/// Fractional MIDI note number of `freq`.
#[inline]
pub fn freq_to_note_exact(freq: f64) -> f64 {
    A4_NOTE as f64 + 12.0 * (freq / A4_HZ).log2()
}

#[inline]
pub fn note_to_freq(note: i32) -> f64 {
    A4_HZ * 2.0_f64.powf((note - A4_NOTE) as f64 / 12.0)
}

/// Nearest semitone to `freq`. Halfway cases round away from zero.
#[inline]
pub fn nearest_note(freq: f64) -> i32 {
    freq_to_note_exact(freq).round() as i32
}

/// Snap `freq` to the nearest equal-tempered semitone.
#[inline]
pub fn quantize_to_semitone(freq: f64) -> f64 {
    note_to_freq(nearest_note(freq))
}

/// Note name without octave, e.g. `"C#"`.
pub fn note_name(note: i32) -> &'static str {
    NOTE_NAMES[note.rem_euclid(12) as usize]
}

/// Scientific octave number (C4 = middle C = note 60).
pub fn octave(note: i32) -> i32 {
    note.div_euclid(12) - 1
}

/// `"A4"`, `"C#5"`, ...
pub fn note_label(note: i32) -> String {
    format!("{}{}", note_name(note), octave(note))
}

/// Whole cents between `freq` and the ideal frequency of `note`.
pub fn cents_from(freq: f64, note: i32) -> i32 {
    (1200.0 * (freq / note_to_freq(note)).log2()).round() as i32
}

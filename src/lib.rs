pub mod config;
pub mod control; // Gesture → pitch/volume mapping and readouts
pub mod dsp;
pub mod engine; // Session-level orchestration
pub mod error;
pub mod graph; // Audio graph capability + built-in backend
pub mod io;
pub mod recording;
pub mod synth; // Tone voice and waveform library

pub use config::EngineConfig;
pub use engine::ThereminEngine;
pub use error::{AudioError, GraphError};

/// Largest block the output stream hands to the renderer in one call.
pub const MAX_BLOCK_SIZE: usize = 2048;
/// Fixed processing quantum of the render graph, in frames.
pub const RENDER_QUANTUM: usize = 128;
/// Gain floor used instead of exact silence on a sounding envelope.
pub const MIN_GAIN: f32 = 0.0001;
pub(crate) const MIN_TIME: f64 = 1.0 / 48_000.0;

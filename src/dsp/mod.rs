//! Low-level DSP primitives used by the render graph.
//!
//! These components allocate only at construction and are realtime-safe
//! afterwards, so render nodes can own them directly. They stay focused on the
//! signal-processing math; scheduling and routing live in `graph`.

/// Partitioned FFT convolution for the reverb send.
pub mod convolver;
/// Synthetic impulse responses.
pub mod impulse;
/// Phase-accumulating oscillator with native and table shapes.
pub mod oscillator;
/// Sample-accurate parameter automation.
pub mod param;
/// Band-limited waveforms from harmonic coefficients.
pub mod periodic;

pub use convolver::PartitionedConvolver;
pub use impulse::ImpulseResponse;
pub use oscillator::{NativeShape, OscillatorBlock, OscillatorShape};
pub use param::{AudioParam, ParamEvent};
pub use periodic::PeriodicWave;

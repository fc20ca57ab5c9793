//! Error taxonomy for the engine.
//!
//! `AudioError` is what callers see. `GraphError` is the status of a single
//! node operation; the wiring boundary in the bus and the voice decides which
//! of those to absorb.

use thiserror::Error;

use crate::graph::NodeId;

/// Result type for engine operations.
pub type AudioResult<T> = Result<T, AudioError>;

/// Errors surfaced to the caller of the engine.
#[derive(Debug, Error)]
pub enum AudioError {
    /// No realtime audio runtime is available.
    #[error("no realtime audio backend is available")]
    UnsupportedAudioBackend,

    /// The runtime exists but has not been resumed yet.
    #[error("audio runtime is not running; retry after a user gesture")]
    AudioNotReady,

    /// The backend has no capture capability.
    #[error("recording is not supported by this audio backend")]
    RecordingUnsupported,

    /// Every preferred encoding was rejected.
    #[error("no preferred encoding accepted (tried {})", tried.join(", "))]
    CodecNegotiationFailed {
        /// MIME types that were attempted, in order.
        tried: Vec<String>,
    },

    /// A node operation failed.
    #[error(transparent)]
    Graph(#[from] GraphError),

    /// The clip encoder failed.
    #[error(transparent)]
    Encoder(#[from] EncoderError),
}

/// Status of a node operation on the audio graph.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GraphError {
    #[error("unknown node {0:?}")]
    UnknownNode(NodeId),

    #[error("node {node:?} has no {param} parameter")]
    UnsupportedParam { node: NodeId, param: &'static str },

    #[error("node {node:?} is not {expected}")]
    WrongNodeKind { node: NodeId, expected: &'static str },

    #[error("render command queue is full")]
    CommandQueueFull,

    #[error("audio graph has been closed")]
    Closed,

    #[error("audio graph node capacity ({0}) exceeded")]
    CapacityExceeded(usize),
}

/// Errors raised while constructing or running a clip encoder.
#[derive(Debug, Error)]
pub enum EncoderError {
    #[error("encoding {0:?} is not supported")]
    UnsupportedMimeType(String),

    #[error("node {0:?} is not a capture tap of this graph")]
    UnknownTap(NodeId),

    #[error("WAV encoding failed: {0}")]
    Wav(#[from] hound::Error),
}

/// Invalid configuration values.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{field} = {value} is out of range")]
    OutOfRange { field: &'static str, value: f64 },

    #[error("frequency bounds must satisfy 0 < minHz < maxHz (got {min_hz}..{max_hz})")]
    InvalidBounds { min_hz: f64, max_hz: f64 },

    #[cfg(feature = "serde")]
    #[error("could not parse configuration: {0}")]
    Parse(#[from] serde_json::Error),
}

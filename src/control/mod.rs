// Purpose: Gesture surface → tone targets, and the strings shown beside it
// Pure functions only; nothing here touches the audio graph

pub mod mapper;
pub mod pitch;
pub mod readout;

pub use mapper::{ControlSurfaceMapper, ScaleMarker, ToneTarget};
pub use readout::Readout;

//! The audio-graph capability every engine component depends on.
//!
//! A provider owns a realtime render timeline and a set of nodes on it. The
//! control side creates nodes, wires them and schedules parameter automation;
//! the provider applies all of it on its own thread without blocking the
//! caller. [`NativeGraph`](crate::graph::native::NativeGraph) is the built-in
//! implementation; any host runtime can stand in for it.

use crate::{
    dsp::{impulse::ImpulseResponse, oscillator::OscillatorShape, param::ParamEvent},
    error::GraphError,
    graph::NodeId,
    recording::encoder::CaptureBackend,
};

/// Lifecycle of the render timeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuntimeState {
    /// Exists, but the clock is frozen and output is silent.
    Suspended,
    Running,
    /// Permanently shut down.
    Closed,
}

/// Whether the host lets the runtime resume on its own.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResumePolicy {
    Immediate,
    /// Resuming is only allowed after a user gesture has been observed.
    RequiresUserGesture,
}

/// What to build when creating a node.
#[derive(Debug, Clone)]
pub enum NodeSpec {
    Oscillator {
        shape: OscillatorShape,
        frequency: f32,
    },
    Gain {
        gain: f32,
    },
    Convolver {
        impulse: ImpulseResponse,
    },
    /// Pass-through node whose signal can be recorded.
    CaptureTap,
}

impl NodeSpec {
    pub fn kind_name(&self) -> &'static str {
        match self {
            NodeSpec::Oscillator { .. } => "oscillator",
            NodeSpec::Gain { .. } => "gain",
            NodeSpec::Convolver { .. } => "convolver",
            NodeSpec::CaptureTap => "capture tap",
        }
    }
}

/// Automatable node parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ParamKind {
    /// Oscillator frequency in Hz.
    Frequency,
    /// Linear gain of a gain node.
    Gain,
}

impl ParamKind {
    pub fn name(self) -> &'static str {
        match self {
            ParamKind::Frequency => "frequency",
            ParamKind::Gain => "gain",
        }
    }
}

/// Outcome of a connect request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Link {
    Connected,
    AlreadyConnected,
}

/// Outcome of a disconnect request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Unlink {
    Disconnected,
    /// The edge or one of its endpoints no longer exists.
    NotConnected,
}

/// Node creation, wiring and parameter scheduling on a realtime timeline.
///
/// Every call is non-blocking: requests are queued for the render thread and
/// take effect at the start of its next quantum.
pub trait AudioGraphProvider: Send {
    fn sample_rate(&self) -> f32;

    /// Seconds elapsed on the render timeline.
    fn current_time(&self) -> f64;

    fn state(&self) -> RuntimeState;

    fn resume_policy(&self) -> ResumePolicy;

    fn resume(&mut self) -> Result<(), GraphError>;

    fn suspend(&mut self) -> Result<(), GraphError>;

    /// Shut the timeline down. Later node operations fail with
    /// [`GraphError::Closed`].
    fn close(&mut self);

    /// The node whose input is sent to the output device.
    fn destination(&self) -> NodeId;

    fn create_node(&mut self, spec: NodeSpec) -> Result<NodeId, GraphError>;

    fn connect(&mut self, from: NodeId, to: NodeId) -> Result<Link, GraphError>;

    fn disconnect(&mut self, from: NodeId, to: NodeId) -> Result<Unlink, GraphError>;

    /// Disconnect every edge of `node` and free it.
    fn release(&mut self, node: NodeId) -> Result<(), GraphError>;

    fn schedule(
        &mut self,
        node: NodeId,
        param: ParamKind,
        event: ParamEvent,
    ) -> Result<(), GraphError>;

    /// Value of `param` at [`current_time`](Self::current_time).
    fn param_value(&self, node: NodeId, param: ParamKind) -> Result<f32, GraphError>;

    fn set_oscillator_shape(
        &mut self,
        node: NodeId,
        shape: OscillatorShape,
    ) -> Result<(), GraphError>;

    fn start_node(&mut self, node: NodeId, at: f64) -> Result<(), GraphError>;

    fn stop_node(&mut self, node: NodeId, at: f64) -> Result<(), GraphError>;

    /// Recording capability, if the host has one.
    fn capture(&mut self) -> Option<&mut dyn CaptureBackend>;

    /// Drop resources the render thread has finished with.
    fn collect_garbage(&mut self) {}
}

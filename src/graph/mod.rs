//! The audio graph: the capability the engine talks to, and the built-in
//! backend that implements it.
//!
//! The engine never touches render nodes directly. It holds a
//! `Box<dyn AudioGraphProvider>` and works with opaque [`NodeId`]s; the
//! provider turns those requests into work on its realtime thread.

/// Gain node (envelopes, sends, master, destination).
pub mod amplify;
/// Lock-free messages between control and render halves.
pub mod command;
/// Control handle of the built-in backend.
pub mod native;
/// Render-node trait shared by the built-in nodes.
pub mod node;
/// Audio-band oscillator node with a start/stop window.
pub mod oscillator;
/// The `AudioGraphProvider` capability and its vocabulary.
pub mod provider;
/// Realtime half of the built-in backend.
pub mod renderer;
/// Convolution reverb node.
pub mod reverb;
/// Capture tap node for recording.
pub mod tap;

pub use native::NativeGraph;
pub use provider::{
    AudioGraphProvider, Link, NodeSpec, ParamKind, ResumePolicy, RuntimeState, Unlink,
};
pub use renderer::GraphRenderer;

/// Handle to a node owned by an [`AudioGraphProvider`].
///
/// The generation distinguishes a released node from a newer one that reuses
/// its slot, so stale handles are reported as unknown instead of aliasing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId {
    index: u32,
    generation: u32,
}

impl NodeId {
    pub const fn new(index: u32, generation: u32) -> Self {
        Self { index, generation }
    }

    pub fn index(self) -> usize {
        self.index as usize
    }

    pub fn generation(self) -> u32 {
        self.generation
    }
}

//! Built-in, in-process implementation of [`AudioGraphProvider`].
//!
//! `NativeGraph` is the control half: it validates requests against a mirror
//! of the topology and sends them to the matching [`GraphRenderer`] over a
//! lock-free ring. Whoever owns the renderer (the cpal output stream, or a
//! test rendering offline) drives the clock.

use std::{
    collections::HashMap,
    sync::{
        atomic::{AtomicBool, AtomicUsize},
        Arc, Mutex,
    },
};

use rtrb::{Consumer, Producer, RingBuffer};

use crate::{
    dsp::{oscillator::OscillatorShape, param::AudioParam, param::ParamEvent},
    error::{EncoderError, GraphError},
    graph::{
        amplify::GainNode,
        command::{Garbage, GraphCommand, SharedClock},
        node::RenderNode,
        oscillator::OscNode,
        provider::{
            AudioGraphProvider, Link, NodeSpec, ParamKind, ResumePolicy, RuntimeState, Unlink,
        },
        renderer::GraphRenderer,
        reverb::ConvolverNode,
        tap::TapNode,
        NodeId,
    },
    recording::encoder::{CaptureBackend, ClipEncoder, WavEncoder, WAV_MIME_TYPE},
};

/// Most nodes alive at once, the destination included.
pub const MAX_NODES: usize = 64;
/// Most upstream connections into one node.
pub const MAX_INPUTS: usize = 16;
const COMMAND_CAPACITY: usize = 1024;
/// Seconds of stereo audio a capture ring holds between drains.
const CAPTURE_SECONDS: f32 = 2.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum NodeKind {
    Destination,
    Oscillator,
    Gain,
    Convolver,
    CaptureTap,
}

struct NodeEntry {
    id: NodeId,
    kind: NodeKind,
    inputs: Vec<NodeId>,
    frequency: Option<AudioParam>,
    gain: Option<AudioParam>,
}

impl NodeEntry {
    fn new(id: NodeId, kind: NodeKind) -> Self {
        Self {
            id,
            kind,
            inputs: Vec::with_capacity(MAX_INPUTS),
            frequency: None,
            gain: None,
        }
    }

    fn param(&self, kind: ParamKind) -> Option<&AudioParam> {
        match kind {
            ParamKind::Frequency => self.frequency.as_ref(),
            ParamKind::Gain => self.gain.as_ref(),
        }
    }

    fn param_mut(&mut self, kind: ParamKind) -> Option<&mut AudioParam> {
        match kind {
            ParamKind::Frequency => self.frequency.as_mut(),
            ParamKind::Gain => self.gain.as_mut(),
        }
    }
}

struct TapHandle {
    rx: Arc<Mutex<Consumer<f32>>>,
    armed: Arc<AtomicBool>,
    dropped: Arc<AtomicUsize>,
}

/// Recording capability of the built-in backend: WAV from capture taps.
pub struct NativeCapture {
    sample_rate: f32,
    taps: HashMap<NodeId, TapHandle>,
}

impl CaptureBackend for NativeCapture {
    fn default_mime_type(&self) -> &str {
        WAV_MIME_TYPE
    }

    fn create_encoder(
        &mut self,
        tap: NodeId,
        mime_type: Option<&str>,
    ) -> Result<Box<dyn ClipEncoder>, EncoderError> {
        if let Some(requested) = mime_type {
            if requested != WAV_MIME_TYPE {
                return Err(EncoderError::UnsupportedMimeType(requested.to_string()));
            }
        }

        let handle = self.taps.get(&tap).ok_or(EncoderError::UnknownTap(tap))?;
        Ok(Box::new(WavEncoder::new(
            self.sample_rate,
            handle.rx.clone(),
            handle.armed.clone(),
            handle.dropped.clone(),
        )))
    }
}

/// Control handle of the built-in audio graph.
pub struct NativeGraph {
    sample_rate: f32,
    clock: Arc<SharedClock>,
    commands: Producer<GraphCommand>,
    garbage: Consumer<Garbage>,
    policy: ResumePolicy,
    slots: Vec<Option<NodeEntry>>,
    generations: Vec<u32>,
    free: Vec<usize>,
    destination: NodeId,
    capture: Option<NativeCapture>,
}

impl NativeGraph {
    /// Create a suspended graph and the renderer that plays it.
    pub fn new(sample_rate: f32) -> (Self, GraphRenderer) {
        let (commands_tx, commands_rx) = RingBuffer::<GraphCommand>::new(COMMAND_CAPACITY);
        let (garbage_tx, garbage_rx) = RingBuffer::<Garbage>::new(COMMAND_CAPACITY);
        let clock = Arc::new(SharedClock::new(RuntimeState::Suspended));

        let destination = NodeId::new(0, 0);
        let mut renderer = GraphRenderer::new(
            sample_rate,
            MAX_NODES,
            MAX_INPUTS,
            destination.index(),
            commands_rx,
            garbage_tx,
            clock.clone(),
        );
        renderer.install(destination.index(), Box::new(GainNode::unity()));

        let mut slots: Vec<Option<NodeEntry>> = (0..MAX_NODES).map(|_| None).collect();
        slots[0] = Some(NodeEntry::new(destination, NodeKind::Destination));

        let graph = Self {
            sample_rate,
            clock,
            commands: commands_tx,
            garbage: garbage_rx,
            policy: ResumePolicy::Immediate,
            slots,
            generations: vec![0; MAX_NODES],
            free: (1..MAX_NODES).rev().collect(),
            destination,
            capture: Some(NativeCapture {
                sample_rate,
                taps: HashMap::new(),
            }),
        };

        (graph, renderer)
    }

    /// Require a user gesture before [`resume`](AudioGraphProvider::resume)
    /// is honoured by the session.
    pub fn with_resume_policy(mut self, policy: ResumePolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Behave like a host with no recording capability.
    pub fn without_capture(mut self) -> Self {
        self.capture = None;
        self
    }

    /// Number of live nodes, the destination included.
    pub fn node_count(&self) -> usize {
        self.slots.iter().filter(|slot| slot.is_some()).count()
    }

    /// Upstream nodes connected into `node`.
    pub fn inputs_of(&self, node: NodeId) -> Result<&[NodeId], GraphError> {
        Ok(&self.entry(node)?.inputs)
    }

    fn entry(&self, node: NodeId) -> Result<&NodeEntry, GraphError> {
        self.slots
            .get(node.index())
            .and_then(Option::as_ref)
            .filter(|entry| entry.id == node)
            .ok_or(GraphError::UnknownNode(node))
    }

    fn entry_mut(&mut self, node: NodeId) -> Result<&mut NodeEntry, GraphError> {
        self.slots
            .get_mut(node.index())
            .and_then(Option::as_mut)
            .filter(|entry| entry.id == node)
            .ok_or(GraphError::UnknownNode(node))
    }

    fn oscillator(&self, node: NodeId) -> Result<&NodeEntry, GraphError> {
        let entry = self.entry(node)?;
        if entry.kind != NodeKind::Oscillator {
            return Err(GraphError::WrongNodeKind {
                node,
                expected: "an oscillator",
            });
        }
        Ok(entry)
    }

    fn send(&mut self, command: GraphCommand) -> Result<(), GraphError> {
        if self.clock.state() == RuntimeState::Closed {
            return Err(GraphError::Closed);
        }
        self.collect_garbage();
        self.commands
            .push(command)
            .map_err(|_| GraphError::CommandQueueFull)
    }

    fn build(
        &self,
        spec: NodeSpec,
    ) -> (Box<dyn RenderNode>, NodeKind, Option<TapHandle>, f32) {
        match spec {
            NodeSpec::Oscillator { shape, frequency } => (
                Box::new(OscNode::new(shape, frequency)),
                NodeKind::Oscillator,
                None,
                frequency,
            ),
            NodeSpec::Gain { gain } => (Box::new(GainNode::new(gain)), NodeKind::Gain, None, gain),
            NodeSpec::Convolver { impulse } => (
                Box::new(ConvolverNode::new(&impulse)),
                NodeKind::Convolver,
                None,
                0.0,
            ),
            NodeSpec::CaptureTap if self.capture.is_some() => {
                let capacity = (self.sample_rate * CAPTURE_SECONDS) as usize * 2;
                let (tx, rx) = RingBuffer::<f32>::new(capacity.max(2));
                let handle = TapHandle {
                    rx: Arc::new(Mutex::new(rx)),
                    armed: Arc::new(AtomicBool::new(false)),
                    dropped: Arc::new(AtomicUsize::new(0)),
                };
                let node = TapNode::new(tx, handle.armed.clone(), handle.dropped.clone());
                (Box::new(node), NodeKind::CaptureTap, Some(handle), 0.0)
            }
            NodeSpec::CaptureTap => (Box::new(GainNode::unity()), NodeKind::CaptureTap, None, 0.0),
        }
    }
}

impl AudioGraphProvider for NativeGraph {
    fn sample_rate(&self) -> f32 {
        self.sample_rate
    }

    fn current_time(&self) -> f64 {
        self.clock.frames() as f64 / self.sample_rate as f64
    }

    fn state(&self) -> RuntimeState {
        self.clock.state()
    }

    fn resume_policy(&self) -> ResumePolicy {
        self.policy
    }

    fn resume(&mut self) -> Result<(), GraphError> {
        match self.clock.state() {
            RuntimeState::Closed => Err(GraphError::Closed),
            _ => {
                self.clock.set_state(RuntimeState::Running);
                Ok(())
            }
        }
    }

    fn suspend(&mut self) -> Result<(), GraphError> {
        match self.clock.state() {
            RuntimeState::Closed => Err(GraphError::Closed),
            _ => {
                self.clock.set_state(RuntimeState::Suspended);
                Ok(())
            }
        }
    }

    fn close(&mut self) {
        self.clock.set_state(RuntimeState::Closed);
        if let Some(capture) = self.capture.as_mut() {
            capture.taps.clear();
        }
        self.collect_garbage();
    }

    fn destination(&self) -> NodeId {
        self.destination
    }

    fn create_node(&mut self, spec: NodeSpec) -> Result<NodeId, GraphError> {
        if self.clock.state() == RuntimeState::Closed {
            return Err(GraphError::Closed);
        }
        let slot = self
            .free
            .pop()
            .ok_or(GraphError::CapacityExceeded(MAX_NODES))?;

        let (node, kind, tap, initial) = self.build(spec);
        if let Err(err) = self.send(GraphCommand::Insert { slot, node }) {
            self.free.push(slot);
            return Err(err);
        }

        let id = NodeId::new(slot as u32, self.generations[slot]);
        let mut entry = NodeEntry::new(id, kind);
        match kind {
            NodeKind::Oscillator => {
                entry.frequency = Some(AudioParam::with_range(initial, 0.0, f32::MAX));
            }
            NodeKind::Gain => entry.gain = Some(AudioParam::new(initial)),
            _ => {}
        }
        self.slots[slot] = Some(entry);

        if let (Some(handle), Some(capture)) = (tap, self.capture.as_mut()) {
            capture.taps.insert(id, handle);
        }

        Ok(id)
    }

    fn connect(&mut self, from: NodeId, to: NodeId) -> Result<Link, GraphError> {
        self.entry(from)?;
        let target = self.entry(to)?;
        if target.inputs.contains(&from) {
            return Ok(Link::AlreadyConnected);
        }
        if from == to || target.inputs.len() >= MAX_INPUTS {
            return Err(GraphError::CapacityExceeded(MAX_INPUTS));
        }

        self.send(GraphCommand::Connect {
            from: from.index(),
            to: to.index(),
        })?;
        self.entry_mut(to)?.inputs.push(from);
        Ok(Link::Connected)
    }

    fn disconnect(&mut self, from: NodeId, to: NodeId) -> Result<Unlink, GraphError> {
        let connected = match (self.entry(from), self.entry(to)) {
            (Ok(_), Ok(target)) => target.inputs.contains(&from),
            _ => false,
        };
        if !connected {
            return Ok(Unlink::NotConnected);
        }

        self.send(GraphCommand::Disconnect {
            from: from.index(),
            to: to.index(),
        })?;
        self.entry_mut(to)?.inputs.retain(|&src| src != from);
        Ok(Unlink::Disconnected)
    }

    fn release(&mut self, node: NodeId) -> Result<(), GraphError> {
        if self.entry(node)?.kind == NodeKind::Destination {
            return Err(GraphError::WrongNodeKind {
                node,
                expected: "a releasable node",
            });
        }

        self.send(GraphCommand::Remove { slot: node.index() })?;

        for entry in self.slots.iter_mut().flatten() {
            entry.inputs.retain(|&src| src != node);
        }
        let slot = node.index();
        self.slots[slot] = None;
        self.generations[slot] = self.generations[slot].wrapping_add(1);
        self.free.push(slot);
        if let Some(capture) = self.capture.as_mut() {
            capture.taps.remove(&node);
        }
        Ok(())
    }

    fn schedule(
        &mut self,
        node: NodeId,
        param: ParamKind,
        event: ParamEvent,
    ) -> Result<(), GraphError> {
        if self.entry(node)?.param(param).is_none() {
            return Err(GraphError::UnsupportedParam {
                node,
                param: param.name(),
            });
        }

        self.send(GraphCommand::Schedule {
            slot: node.index(),
            param,
            event,
        })?;

        let now = self.current_time();
        if let Some(mirror) = self.entry_mut(node)?.param_mut(param) {
            mirror.schedule(event, now);
        }
        Ok(())
    }

    fn param_value(&self, node: NodeId, param: ParamKind) -> Result<f32, GraphError> {
        self.entry(node)?
            .param(param)
            .map(|mirror| mirror.value_at(self.current_time()))
            .ok_or(GraphError::UnsupportedParam {
                node,
                param: param.name(),
            })
    }

    fn set_oscillator_shape(
        &mut self,
        node: NodeId,
        shape: OscillatorShape,
    ) -> Result<(), GraphError> {
        self.oscillator(node)?;
        self.send(GraphCommand::SetShape {
            slot: node.index(),
            shape,
        })
    }

    fn start_node(&mut self, node: NodeId, at: f64) -> Result<(), GraphError> {
        self.oscillator(node)?;
        self.send(GraphCommand::Start {
            slot: node.index(),
            at,
        })
    }

    fn stop_node(&mut self, node: NodeId, at: f64) -> Result<(), GraphError> {
        self.oscillator(node)?;
        self.send(GraphCommand::Stop {
            slot: node.index(),
            at,
        })
    }

    fn capture(&mut self) -> Option<&mut dyn CaptureBackend> {
        self.capture
            .as_mut()
            .map(|capture| capture as &mut dyn CaptureBackend)
    }

    fn collect_garbage(&mut self) {
        while let Ok(garbage) = self.garbage.pop() {
            drop(garbage);
        }
    }
}

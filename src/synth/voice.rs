use std::time::Duration;

use log::{debug, warn};

use crate::{
    config::{EngineConfig, MAX_TIMING_SECS},
    dsp::param::ParamEvent,
    engine::scheduler::Scheduler,
    error::{AudioResult, GraphError},
    graph::{AudioGraphProvider, NodeId, NodeSpec, ParamKind},
    synth::waveform::{WaveformId, WaveformLibrary},
    MIN_GAIN,
};

/*
Tone Voice Lifecycle
====================

One oscillator feeding one gain envelope, wired into the bus inputs.

    Stopped ──start──▶ Starting ──set_target──▶ Running
       ▲                                          │
       │                                         stop
       │                                          ▼
       └────────────── teardown (+60 ms) ────── Stopping

start
-----

Builds the pair with the envelope at the gain floor (MIN_GAIN, not 0.0),
connects it to every bus input and starts the generator. Calling `start`
while a tone is sounding releases the old pair first, so the voice stays
monophonic; the old pair finishes its release on its own schedule.

set_target
----------

Schedules an exponential approach of frequency and gain from "now". Each
call restarts the approach from wherever the curve currently is, so a fast
stream of pointer moves glides instead of stepping.

set_waveform (crossfade)
------------------------

    gain
    prior ──╮                        ╭──────── prior (or latest target)
            ╰─╮                    ╭─╯
              ╰──── dip ≥ prior/2 ─╯
            │◀──── swap delay ───▶│
            dip                  swap shape + restore

While the dip is pending, new gain targets are only remembered; the approach
toward them starts at the restore. This keeps the dip within [0, prior].

stop
----

    t          release toward MIN_GAIN (5 ms time constant)
    t + 30 ms  generator stops on the render timeline
    t + 60 ms  nodes disconnected and released (deferred task)

Deferred steps carry the generation of the pair they belong to, so a task
that fires after a newer `start` only touches the pair it was queued for.
*/

/// Lifecycle of the voice as seen by the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VoiceState {
    Stopped,
    /// Generator running, no target received yet.
    Starting,
    Running,
    /// Released; teardown still pending.
    Stopping,
}

/// Snapshot of what the voice is playing.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ToneState {
    pub frequency: f64,
    pub gain: f64,
    pub waveform: WaveformId,
    pub active: bool,
}

/// Timing of the voice's smoothing and deferred steps, in seconds.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VoiceTiming {
    pub smoothing: f64,
    pub crossfade: f64,
    pub swap_delay: f64,
    pub release: f64,
    pub stop_delay: f64,
    pub teardown: f64,
}

impl From<&EngineConfig> for VoiceTiming {
    fn from(config: &EngineConfig) -> Self {
        Self {
            smoothing: config.smoothing_time_constant,
            crossfade: config.waveform_crossfade,
            swap_delay: config.waveform_swap_delay,
            release: config.release_time_constant,
            stop_delay: config.oscillator_stop_delay,
            teardown: config.teardown_delay,
        }
    }
}

impl Default for VoiceTiming {
    fn default() -> Self {
        Self::from(&EngineConfig::default())
    }
}

/// Deferred step of the voice, dispatched through [`ToneVoice::run`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VoiceTask {
    /// Swap in the current waveform and restore the gain.
    SwapWaveform { generation: u64 },
    /// Disconnect and release a stopped pair.
    Teardown { generation: u64 },
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct VoiceNodes {
    generation: u64,
    oscillator: NodeId,
    envelope: NodeId,
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct Crossfade {
    restore: f32,
}

/// The monophonic tone generator.
pub struct ToneVoice {
    timing: VoiceTiming,
    library: &'static WaveformLibrary,
    tone: ToneState,
    current: Option<VoiceNodes>,
    releasing: Vec<VoiceNodes>,
    outputs: Vec<NodeId>,
    crossfade: Option<Crossfade>,
    next_generation: u64,
}

impl ToneVoice {
    pub fn new(timing: VoiceTiming, waveform: WaveformId, initial_frequency: f64) -> Self {
        Self {
            timing,
            library: WaveformLibrary::shared(),
            tone: ToneState {
                frequency: initial_frequency,
                gain: 0.0,
                waveform,
                active: false,
            },
            current: None,
            releasing: Vec::new(),
            outputs: Vec::new(),
            crossfade: None,
            next_generation: 0,
        }
    }

    pub fn state(&self) -> VoiceState {
        match (&self.current, self.releasing.is_empty()) {
            (Some(_), _) if self.tone.active => VoiceState::Running,
            (Some(_), _) => VoiceState::Starting,
            (None, false) => VoiceState::Stopping,
            (None, true) => VoiceState::Stopped,
        }
    }

    pub fn tone(&self) -> ToneState {
        self.tone
    }

    pub fn waveform(&self) -> WaveformId {
        self.tone.waveform
    }

    pub fn is_sounding(&self) -> bool {
        self.current.is_some()
    }

    /// Nodes of the sounding pair, `(oscillator, envelope)`.
    pub fn nodes(&self) -> Option<(NodeId, NodeId)> {
        self.current.map(|nodes| (nodes.oscillator, nodes.envelope))
    }

    /// True while a dip is waiting for its waveform swap.
    pub fn is_crossfading(&self) -> bool {
        self.crossfade.is_some()
    }

    /// Build and start a new oscillator/envelope pair feeding `outputs`.
    pub fn start(
        &mut self,
        graph: &mut dyn AudioGraphProvider,
        scheduler: &mut Scheduler<VoiceTask>,
        outputs: &[NodeId],
    ) -> AudioResult<()> {
        if self.current.is_some() {
            self.stop(graph, scheduler);
        }

        let oscillator = graph.create_node(NodeSpec::Oscillator {
            shape: self.library.shape(self.tone.waveform),
            frequency: self.tone.frequency as f32,
        })?;
        let envelope = match graph.create_node(NodeSpec::Gain { gain: MIN_GAIN }) {
            Ok(node) => node,
            Err(err) => {
                absorb(graph.release(oscillator), "release oscillator");
                return Err(err.into());
            }
        };

        if let Err(err) = self.wire(graph, oscillator, envelope, outputs) {
            absorb(graph.release(oscillator), "release oscillator");
            absorb(graph.release(envelope), "release envelope");
            return Err(err.into());
        }

        let generation = self.next_generation;
        self.next_generation += 1;
        self.current = Some(VoiceNodes {
            generation,
            oscillator,
            envelope,
        });
        self.outputs = outputs.to_vec();
        self.tone.gain = 0.0;
        self.tone.active = false;
        debug!(
            "voice {generation} started ({}, {:.1} Hz)",
            self.tone.waveform, self.tone.frequency
        );
        Ok(())
    }

    fn wire(
        &self,
        graph: &mut dyn AudioGraphProvider,
        oscillator: NodeId,
        envelope: NodeId,
        outputs: &[NodeId],
    ) -> Result<(), GraphError> {
        graph.connect(oscillator, envelope)?;
        for &output in outputs {
            graph.connect(envelope, output)?;
        }
        graph.start_node(oscillator, graph.current_time())
    }

    /// Glide towards `frequency` at `gain`.
    pub fn set_target(&mut self, graph: &mut dyn AudioGraphProvider, frequency: f64, gain: f64) {
        self.tone.frequency = frequency;
        self.tone.gain = gain.clamp(0.0, 1.0);

        let Some(nodes) = self.current else {
            return;
        };
        self.tone.active = true;

        let now = graph.current_time();
        absorb(
            graph.schedule(
                nodes.oscillator,
                ParamKind::Frequency,
                self.approach(frequency as f32, now, self.timing.smoothing),
            ),
            "frequency target",
        );

        match self.crossfade.as_mut() {
            Some(crossfade) => crossfade.restore = self.tone.gain as f32,
            None => absorb(
                graph.schedule(
                    nodes.envelope,
                    ParamKind::Gain,
                    self.approach(self.tone.gain as f32, now, self.timing.smoothing),
                ),
                "gain target",
            ),
        }
    }

    /// Glide the pitch only, keeping the current gain.
    pub fn retune(&mut self, graph: &mut dyn AudioGraphProvider, frequency: f64) {
        self.tone.frequency = frequency;
        let Some(nodes) = self.current else {
            return;
        };
        let now = graph.current_time();
        absorb(
            graph.schedule(
                nodes.oscillator,
                ParamKind::Frequency,
                self.approach(frequency as f32, now, self.timing.smoothing),
            ),
            "frequency target",
        );
    }

    /// Frequency the oscillator is producing right now.
    pub fn sounding_frequency(&self, graph: &dyn AudioGraphProvider) -> Option<f64> {
        let nodes = self.current?;
        graph
            .param_value(nodes.oscillator, ParamKind::Frequency)
            .ok()
            .map(f64::from)
    }

    /// Choose the pitch the next `start` begins at without touching the graph.
    pub fn remember_frequency(&mut self, frequency: f64) {
        self.tone.frequency = frequency;
    }

    /// Choose the timbre for the next `start` without touching the graph.
    pub fn remember_waveform(&mut self, waveform: WaveformId) {
        self.tone.waveform = waveform;
    }

    /// Change timbre. A sounding voice crossfades; otherwise the choice is
    /// kept for the next `start`.
    pub fn set_waveform(
        &mut self,
        graph: &mut dyn AudioGraphProvider,
        scheduler: &mut Scheduler<VoiceTask>,
        waveform: WaveformId,
    ) {
        let previous = self.tone.waveform;
        self.tone.waveform = waveform;

        let Some(nodes) = self.current else {
            return;
        };
        if previous == waveform || self.crossfade.is_some() {
            return;
        }

        let prior = graph
            .param_value(nodes.envelope, ParamKind::Gain)
            .unwrap_or(MIN_GAIN)
            .max(MIN_GAIN);
        let dip = (prior * 0.5).max(MIN_GAIN).min(prior);

        let now = graph.current_time();
        if let Err(err) = graph.schedule(
            nodes.envelope,
            ParamKind::Gain,
            self.approach(dip, now, self.timing.crossfade),
        ) {
            warn!("crossfade dip failed, swapping directly: {err}");
            self.swap_shape(graph, nodes);
            return;
        }

        self.crossfade = Some(Crossfade { restore: prior });
        scheduler.enqueue(
            delay(self.timing.swap_delay),
            VoiceTask::SwapWaveform {
                generation: nodes.generation,
            },
        );
    }

    /// Release the tone. Idempotent.
    pub fn stop(&mut self, graph: &mut dyn AudioGraphProvider, scheduler: &mut Scheduler<VoiceTask>) {
        let Some(nodes) = self.current.take() else {
            return;
        };
        self.crossfade = None;
        self.tone.active = false;

        let now = graph.current_time();
        absorb(
            graph.schedule(
                nodes.envelope,
                ParamKind::Gain,
                self.approach(MIN_GAIN, now, self.timing.release),
            ),
            "release ramp",
        );
        absorb(
            graph.stop_node(nodes.oscillator, now + self.timing.stop_delay),
            "generator stop",
        );

        self.releasing.push(nodes);
        scheduler.enqueue(
            delay(self.timing.teardown),
            VoiceTask::Teardown {
                generation: nodes.generation,
            },
        );
        debug!("voice {} released", nodes.generation);
    }

    /// Execute a deferred step.
    pub fn run(&mut self, graph: &mut dyn AudioGraphProvider, task: VoiceTask) {
        match task {
            VoiceTask::SwapWaveform { generation } => {
                let Some(nodes) = self.current.filter(|n| n.generation == generation) else {
                    return;
                };
                let Some(crossfade) = self.crossfade.take() else {
                    return;
                };
                self.swap_shape(graph, nodes);

                let now = graph.current_time();
                absorb(
                    graph.schedule(
                        nodes.envelope,
                        ParamKind::Gain,
                        self.approach(crossfade.restore, now, self.timing.crossfade),
                    ),
                    "crossfade restore",
                );
            }
            VoiceTask::Teardown { generation } => {
                let Some(index) = self
                    .releasing
                    .iter()
                    .position(|n| n.generation == generation)
                else {
                    return;
                };
                let nodes = self.releasing.swap_remove(index);
                self.teardown(graph, nodes);
            }
        }
    }

    /// Release every node immediately, skipping the ramps.
    pub fn shutdown(&mut self, graph: &mut dyn AudioGraphProvider) {
        self.crossfade = None;
        self.tone.active = false;
        let mut pairs: Vec<VoiceNodes> = self.releasing.drain(..).collect();
        pairs.extend(self.current.take());
        for nodes in pairs {
            self.teardown(graph, nodes);
        }
    }

    fn teardown(&self, graph: &mut dyn AudioGraphProvider, nodes: VoiceNodes) {
        absorb(graph.disconnect(nodes.oscillator, nodes.envelope), "disconnect oscillator");
        for &output in &self.outputs {
            absorb(graph.disconnect(nodes.envelope, output), "disconnect envelope");
        }
        absorb(graph.release(nodes.oscillator), "release oscillator");
        absorb(graph.release(nodes.envelope), "release envelope");
        debug!("voice {} torn down", nodes.generation);
    }

    fn swap_shape(&self, graph: &mut dyn AudioGraphProvider, nodes: VoiceNodes) {
        absorb(
            graph.set_oscillator_shape(nodes.oscillator, self.library.shape(self.tone.waveform)),
            "waveform swap",
        );
    }

    fn approach(&self, target: f32, start: f64, time_constant: f64) -> ParamEvent {
        ParamEvent::SetTargetAtTime {
            target,
            start,
            time_constant,
        }
    }
}

/// Node operations on the voice are best effort once the voice is wired.
fn absorb<T>(result: Result<T, GraphError>, what: &str) {
    match result {
        Ok(_) => {}
        Err(GraphError::Closed) => debug!("{what} skipped: graph closed"),
        Err(GraphError::UnknownNode(node)) => debug!("{what} skipped: {node:?} already gone"),
        Err(err) => warn!("{what} failed: {err}"),
    }
}

/// Scheduler delay for `secs`; negative or unrepresentable values clamp.
fn delay(secs: f64) -> Duration {
    Duration::try_from_secs_f64(secs.max(0.0)).unwrap_or_else(|_| {
        warn!("delay of {secs} s out of range, clamped");
        Duration::from_secs_f64(MAX_TIMING_SECS)
    })
}

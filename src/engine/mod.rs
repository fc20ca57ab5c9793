// Purpose: Session-level orchestration
// Owns the audio session, the bus, the voice and the recorder; the only writer of all four

pub mod bus;
pub mod scheduler;
pub mod session;

use std::{
    io,
    path::{Path, PathBuf},
    time::Duration,
};

use log::{debug, info, warn};

use crate::{
    config::EngineConfig,
    control::{
        mapper::{describe, ControlSurfaceMapper, ScaleMarker, ToneTarget},
        readout::Readout,
    },
    error::{AudioResult, ConfigError},
    recording::{Clip, RecordingSession, RecordingState},
    synth::{
        voice::{ToneVoice, VoiceState, VoiceTask, VoiceTiming},
        waveform::WaveformId,
    },
};

pub use self::{
    bus::{BusNodes, SignalBus},
    scheduler::{Clock, ManualClock, MonotonicClock, Scheduler},
    session::AudioSession,
};

/// The instrument: gestures and toggles in, sound, readouts and clips out.
pub struct ThereminEngine {
    config: EngineConfig,
    session: AudioSession,
    mapper: ControlSurfaceMapper,
    bus: SignalBus,
    voice: ToneVoice,
    scheduler: Scheduler<VoiceTask>,
    recording: RecordingSession,
    quantize: bool,
    pointer_down: bool,
    last_target: Option<ToneTarget>,
}

impl ThereminEngine {
    pub fn new(config: EngineConfig, session: AudioSession) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            mapper: ControlSurfaceMapper::new(config.min_hz, config.max_hz),
            bus: SignalBus::new(&config),
            voice: ToneVoice::new(VoiceTiming::from(&config), config.waveform, config.min_hz),
            scheduler: Scheduler::new(Box::new(MonotonicClock::new())),
            recording: RecordingSession::new(
                config.session_name.clone(),
                config.recording_mime_preferences.clone(),
            ),
            quantize: config.quantize,
            pointer_down: false,
            last_target: None,
            session,
            config,
        })
    }

    /// Drive deferred steps from `clock` instead of wall time.
    pub fn with_clock(mut self, clock: Box<dyn Clock>) -> Self {
        self.scheduler = Scheduler::new(clock);
        self
    }

    /// Draw the reverb impulse from a seeded generator.
    pub fn with_impulse_seed(mut self, seed: u64) -> Self {
        self.bus = SignalBus::with_seed(&self.config, seed);
        self
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn session(&self) -> &AudioSession {
        &self.session
    }

    pub fn session_mut(&mut self) -> &mut AudioSession {
        &mut self.session
    }

    pub fn mapper(&self) -> &ControlSurfaceMapper {
        &self.mapper
    }

    pub fn bus(&self) -> &SignalBus {
        &self.bus
    }

    pub fn voice(&self) -> &ToneVoice {
        &self.voice
    }

    pub fn voice_state(&self) -> VoiceState {
        self.voice.state()
    }

    pub fn note_user_gesture(&mut self) {
        self.session.note_user_gesture();
    }

    // -- gestures ---------------------------------------------------------

    /// Pointer pressed at `(x, y)`: start a tone there.
    pub fn down(&mut self, x01: f64, y01: f64) -> AudioResult<()> {
        self.session.note_user_gesture();
        let graph = self.session.ensure_running()?;
        let inputs = self.bus.inputs(graph)?;

        let target = self.mapper.map(x01, y01, self.quantize);
        self.voice.remember_frequency(target.frequency);
        self.voice.start(graph, &mut self.scheduler, &inputs)?;
        self.voice.set_target(graph, target.frequency, target.gain);

        self.pointer_down = true;
        self.last_target = Some(target);
        Ok(())
    }

    /// Pointer moved while pressed. Ignored otherwise.
    pub fn move_to(&mut self, x01: f64, y01: f64) {
        if !self.pointer_down {
            return;
        }
        let target = self.mapper.map(x01, y01, self.quantize);
        if let Some(graph) = self.session.graph_mut() {
            self.voice.set_target(graph, target.frequency, target.gain);
        }
        self.last_target = Some(target);
    }

    /// Pointer released: let the tone ring out.
    pub fn up(&mut self) {
        if !self.pointer_down {
            return;
        }
        self.pointer_down = false;
        if let Some(graph) = self.session.graph_mut() {
            self.voice.stop(graph, &mut self.scheduler);
        }
    }

    /// Pointer capture lost or pointer left the surface.
    pub fn cancel(&mut self) {
        self.up();
    }

    pub fn is_pointer_down(&self) -> bool {
        self.pointer_down
    }

    // -- controls ---------------------------------------------------------

    pub fn quantize(&self) -> bool {
        self.quantize
    }

    /// Turning quantization on snaps a sounding tone to its nearest semitone.
    pub fn set_quantize(&mut self, quantize: bool) {
        let was = self.quantize;
        self.quantize = quantize;
        if !quantize || was {
            return;
        }

        let Some(graph) = self.session.graph_mut() else {
            return;
        };
        let Some(current) = self.voice.sounding_frequency(graph) else {
            return;
        };
        let snapped = self.mapper.snap(current);
        self.voice.retune(graph, snapped);
        let gain = self.voice.tone().gain;
        self.last_target = Some(describe(snapped, gain, true));
        debug!("quantize on: {current:.2} Hz snapped to {snapped:.2} Hz");
    }

    pub fn toggle_quantize(&mut self) -> bool {
        self.set_quantize(!self.quantize);
        self.quantize
    }

    pub fn reverb_enabled(&self) -> bool {
        self.bus.reverb_enabled()
    }

    pub fn wet_ratio(&self) -> f64 {
        self.bus.wet_ratio()
    }

    /// Reverb level actually applied.
    pub fn effective_wet(&self) -> f64 {
        self.bus.wet_gain()
    }

    pub fn set_reverb_enabled(&mut self, enabled: bool) {
        let ratio = self.bus.wet_ratio();
        self.apply_mix(ratio, enabled);
    }

    pub fn toggle_reverb(&mut self) -> bool {
        self.set_reverb_enabled(!self.bus.reverb_enabled());
        self.bus.reverb_enabled()
    }

    /// Set the send level, clamped to `0..=1`, whether or not reverb is on.
    pub fn set_wet_ratio(&mut self, ratio: f64) {
        let enabled = self.bus.reverb_enabled();
        self.apply_mix(ratio, enabled);
    }

    fn apply_mix(&mut self, ratio: f64, enabled: bool) {
        if let Err(err) = self.bus.set_wet(self.session.graph_mut(), ratio, enabled) {
            warn!("reverb mix not applied: {err}");
        }
    }

    pub fn waveform(&self) -> WaveformId {
        self.voice.waveform()
    }

    /// Change timbre; a sounding tone crossfades into it.
    pub fn set_waveform(&mut self, waveform: WaveformId) {
        match self.session.graph_mut() {
            Some(graph) => self.voice.set_waveform(graph, &mut self.scheduler, waveform),
            None => self.voice.remember_waveform(waveform),
        }
    }

    pub fn cycle_waveform(&mut self) -> WaveformId {
        let next = self.voice.waveform().next();
        self.set_waveform(next);
        next
    }

    // -- recording --------------------------------------------------------

    pub fn recording_state(&self) -> RecordingState {
        self.recording.state()
    }

    pub fn is_recording(&self) -> bool {
        self.recording.is_capturing()
    }

    /// Start capturing the master mix. Returns the negotiated MIME type.
    pub fn start_recording(&mut self) -> AudioResult<String> {
        let graph = self.session.ensure_running()?;
        let tap = self.bus.tap(graph)?;
        let mime_type = self.recording.start(graph.capture(), tap)?;
        Ok(mime_type.to_string())
    }

    /// Finish the capture; the new clip, if one was recording.
    pub fn stop_recording(&mut self) -> Option<&Clip> {
        self.recording.stop()
    }

    pub fn toggle_recording(&mut self) -> AudioResult<bool> {
        if self.recording.is_capturing() {
            self.recording.stop();
            Ok(false)
        } else {
            self.start_recording()?;
            Ok(true)
        }
    }

    pub fn clips(&self) -> &[Clip] {
        self.recording.clips()
    }

    pub fn suggested_filename(&self, index: usize) -> Option<String> {
        self.recording.suggested_filename(index)
    }

    /// Write clip `index` into `dir` under its suggested filename.
    pub fn export_clip(&self, index: usize, dir: &Path) -> io::Result<PathBuf> {
        let clip = self.recording.clips().get(index).ok_or_else(|| {
            io::Error::new(io::ErrorKind::NotFound, format!("no clip #{}", index + 1))
        })?;
        let path = clip.write_to(dir, self.recording.session_name(), index + 1)?;
        info!("exported clip {} to {}", clip.id(), path.display());
        Ok(path)
    }

    // -- readouts ---------------------------------------------------------

    pub fn readout(&self) -> Readout {
        match &self.last_target {
            Some(target) => Readout::from_target(target, self.effective_wet()),
            None => Readout::idle(self.effective_wet()),
        }
    }

    pub fn last_target(&self) -> Option<&ToneTarget> {
        self.last_target.as_ref()
    }

    pub fn scale_markers(&self) -> Vec<ScaleMarker> {
        self.mapper.scale_markers()
    }

    // -- control timeline -------------------------------------------------

    /// Run due deferred steps and move captured audio along. Call often.
    pub fn tick(&mut self) {
        let due = self.scheduler.tick();
        if let Some(graph) = self.session.graph_mut() {
            for task in due {
                self.voice.run(graph, task);
            }
            graph.collect_garbage();
        }

        if let Err(err) = self.recording.pump() {
            warn!("capture interrupted: {err}");
        }
    }

    /// Time until [`tick`](Self::tick) has work, if anything is pending.
    pub fn next_task_in(&self) -> Option<Duration> {
        self.scheduler.next_due_in()
    }

    /// Stop everything and shut the runtime down. Idempotent.
    pub fn close(&mut self) {
        self.pointer_down = false;
        self.recording.stop();
        self.scheduler.clear();
        if let Some(graph) = self.session.graph_mut() {
            self.voice.shutdown(graph);
            self.bus.teardown(graph);
        }
        self.session.close();
    }
}

impl Drop for ThereminEngine {
    fn drop(&mut self) {
        self.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{error::AudioError, graph::NativeGraph, recording::WAV_MIME_TYPE};

    fn engine() -> (ThereminEngine, crate::graph::GraphRenderer, ManualClock) {
        let (graph, renderer) = NativeGraph::new(48_000.0);
        let clock = ManualClock::new();
        let session = AudioSession::open(Box::new(graph));
        let engine = ThereminEngine::new(EngineConfig::default(), session)
            .expect("valid config")
            .with_clock(Box::new(clock.clone()))
            .with_impulse_seed(11);
        (engine, renderer, clock)
    }

    #[test]
    fn rejects_invalid_config() {
        let config = EngineConfig::default().with_frequency_range(500.0, 100.0);
        assert!(ThereminEngine::new(config, AudioSession::detached()).is_err());
    }

    #[test]
    fn detached_engine_reports_missing_backend() {
        let mut engine = ThereminEngine::new(EngineConfig::default(), AudioSession::detached())
            .expect("valid config");
        assert!(matches!(
            engine.down(0.5, 0.5),
            Err(AudioError::UnsupportedAudioBackend)
        ));
        assert!(matches!(
            engine.start_recording(),
            Err(AudioError::UnsupportedAudioBackend)
        ));
        engine.set_waveform(WaveformId::WarmSaw);
        assert_eq!(engine.waveform(), WaveformId::WarmSaw);
        engine.up();
    }

    #[test]
    fn down_starts_a_tone_and_up_releases_it() {
        let (mut engine, _renderer, _clock) = engine();
        engine.down(0.0, 0.0).expect("down");
        assert_eq!(engine.voice_state(), VoiceState::Running);
        assert!(engine.session().is_running());
        assert!(engine.bus().is_wired());

        engine.up();
        assert_eq!(engine.voice_state(), VoiceState::Stopping);
        engine.up();
    }

    #[test]
    fn moves_without_down_are_ignored() {
        let (mut engine, _renderer, _clock) = engine();
        engine.move_to(0.5, 0.5);
        assert!(engine.last_target().is_none());
        assert_eq!(engine.readout(), Readout::idle(0.0));
    }

    #[test]
    fn readout_tracks_gestures() {
        let (mut engine, _renderer, _clock) = engine();
        engine.down(0.0, 0.0).expect("down");
        engine.move_to(1.0, 1.0);
        let readout = engine.readout();
        assert_eq!(readout.frequency, "2000 Hz");
        assert_eq!(readout.gain, "0.00");
        assert_eq!(readout.reverb, "0%");
    }

    #[test]
    fn wet_ratio_updates_even_when_reverb_is_off() {
        let (mut engine, _renderer, _clock) = engine();
        engine.set_wet_ratio(1.7);
        assert_eq!(engine.wet_ratio(), 1.0);
        assert_eq!(engine.effective_wet(), 0.0);
        assert!(engine.toggle_reverb());
        assert_eq!(engine.effective_wet(), 1.0);
        assert_eq!(engine.readout().reverb, "100%");
    }

    #[test]
    fn recording_uses_the_native_encoder() {
        let (mut engine, _renderer, _clock) = engine();
        let mime = engine.start_recording().expect("recording starts");
        assert_eq!(mime, WAV_MIME_TYPE);
        assert!(engine.is_recording());
        assert!(engine.stop_recording().is_some());
        assert!(engine.stop_recording().is_none());
        assert_eq!(engine.clips().len(), 1);
        assert_eq!(
            engine.suggested_filename(0).as_deref(),
            Some("trackpad-theremin-take-1.wav")
        );
    }

    #[test]
    fn close_is_idempotent() {
        let (mut engine, _renderer, _clock) = engine();
        engine.down(0.3, 0.3).expect("down");
        engine.close();
        engine.close();
        assert!(matches!(
            engine.down(0.3, 0.3),
            Err(AudioError::Graph(crate::error::GraphError::Closed))
        ));
    }

    fn render_ms(renderer: &mut crate::graph::GraphRenderer, ms: usize) {
        let mut left = vec![0.0; 48 * ms];
        let mut right = vec![0.0; 48 * ms];
        renderer.render(&mut left, &mut right);
    }

    #[test]
    fn second_press_does_not_bend_the_released_tone() {
        let (mut engine, mut renderer, _clock) = engine();
        engine.down(0.2, 0.0).expect("down");
        render_ms(&mut renderer, 50);
        let first = engine.mapper().frequency(0.2);
        let (old, _) = engine.voice().nodes().expect("first voice");

        engine.up();
        engine.down(0.8, 0.0).expect("down again");
        render_ms(&mut renderer, 20);

        let graph = engine.session().graph().expect("graph");
        let released = graph
            .param_value(old, crate::graph::ParamKind::Frequency)
            .expect("released oscillator");
        assert!(
            (f64::from(released) - first).abs() < 0.01,
            "released tone moved from {first} to {released}"
        );
    }

    #[test]
    fn quantize_snap_respects_narrow_bounds() {
        let (graph, _renderer) = NativeGraph::new(48_000.0);
        let config = EngineConfig::default().with_frequency_range(132.0, 1990.0);
        let mut engine = ThereminEngine::new(config, AudioSession::open(Box::new(graph)))
            .expect("valid config")
            .with_clock(Box::new(ManualClock::new()));
        engine.down(0.0, 0.0).expect("down");
        engine.set_quantize(true);
        let target = engine.last_target().expect("target");
        assert!(
            (132.0..=1990.0).contains(&target.frequency),
            "snapped to {}",
            target.frequency
        );
        assert_eq!(target.note_name, "C#");
    }

    #[test]
    fn preferred_mime_is_used_when_accepted() {
        let (graph, _renderer) = NativeGraph::new(48_000.0);
        let config =
            EngineConfig::default().with_mime_preferences(["audio/ogg", WAV_MIME_TYPE]);
        let mut engine = ThereminEngine::new(config, AudioSession::open(Box::new(graph)))
            .expect("valid config");
        assert!(engine.session().has_backend());
        assert_eq!(engine.start_recording().expect("recording"), WAV_MIME_TYPE);
    }
}

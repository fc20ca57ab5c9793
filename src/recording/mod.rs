//! Session recording: capture tap → encoder → clips.
//!
//! ```text
//!            start()                       stop()
//!   Idle ──────────────► Armed ──────────► Capturing ──────────► Idle
//!          negotiate        encoder          fragments       concatenate
//!          encoding         started          appended        into a Clip
//! ```
//!
//! `Armed` only lasts between a successful negotiation and the encoder
//! actually starting; a failed start drops straight back to `Idle`.

pub mod clip;
pub mod encoder;

use log::{debug, info, warn};

use crate::{
    error::{AudioError, AudioResult},
    graph::NodeId,
};

pub use clip::Clip;
pub use encoder::{CaptureBackend, ClipEncoder, FragmentSink, WavEncoder, WAV_MIME_TYPE};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordingState {
    Idle,
    Armed,
    Capturing,
}

pub struct RecordingSession {
    state: RecordingState,
    session_name: String,
    preferences: Vec<String>,
    encoder: Option<Box<dyn ClipEncoder>>,
    mime_type: String,
    fragments: Vec<Vec<u8>>,
    clips: Vec<Clip>,
}

impl RecordingSession {
    pub fn new(session_name: impl Into<String>, preferences: Vec<String>) -> Self {
        Self {
            state: RecordingState::Idle,
            session_name: session_name.into(),
            preferences,
            encoder: None,
            mime_type: String::new(),
            fragments: Vec::new(),
            clips: Vec::new(),
        }
    }

    pub fn state(&self) -> RecordingState {
        self.state
    }

    pub fn is_capturing(&self) -> bool {
        self.state == RecordingState::Capturing
    }

    pub fn session_name(&self) -> &str {
        &self.session_name
    }

    /// Encoding of the capture in progress.
    pub fn mime_type(&self) -> Option<&str> {
        (self.state != RecordingState::Idle).then_some(self.mime_type.as_str())
    }

    pub fn clips(&self) -> &[Clip] {
        &self.clips
    }

    /// `"<session>-take-<n>.<ext>"` for the clip at `index`.
    pub fn suggested_filename(&self, index: usize) -> Option<String> {
        self.clips
            .get(index)
            .map(|clip| clip.suggested_filename(&self.session_name, index + 1))
    }

    /// Begin capturing `tap`. Returns the negotiated MIME type.
    ///
    /// Already capturing is not an error; the running capture continues.
    pub fn start(
        &mut self,
        backend: Option<&mut dyn CaptureBackend>,
        tap: NodeId,
    ) -> AudioResult<&str> {
        if self.state != RecordingState::Idle {
            return Ok(&self.mime_type);
        }

        let Some(backend) = backend else {
            return Err(AudioError::RecordingUnsupported);
        };

        let mut encoder = negotiate(backend, tap, &self.preferences)?;
        self.mime_type = encoder.mime_type().to_string();
        self.fragments.clear();
        self.state = RecordingState::Armed;

        if let Err(err) = encoder.start() {
            self.state = RecordingState::Idle;
            return Err(err.into());
        }

        self.encoder = Some(encoder);
        self.state = RecordingState::Capturing;
        info!("recording started ({})", self.mime_type);
        Ok(&self.mime_type)
    }

    /// Append an encoded fragment. Ignored unless capturing, or when empty.
    pub fn push_fragment(&mut self, bytes: Vec<u8>) {
        if self.state == RecordingState::Capturing && !bytes.is_empty() {
            self.fragments.push(bytes);
        }
    }

    /// Pull whatever the encoder has ready.
    pub fn pump(&mut self) -> AudioResult<()> {
        if self.state != RecordingState::Capturing {
            return Ok(());
        }
        let Some(mut encoder) = self.encoder.take() else {
            return Ok(());
        };

        let result = encoder.drain(&mut |bytes| self.push_fragment(bytes));
        self.encoder = Some(encoder);
        result.map_err(AudioError::from)
    }

    /// Finish the capture and store it as a clip. No-op when idle.
    pub fn stop(&mut self) -> Option<&Clip> {
        if self.state == RecordingState::Idle {
            return None;
        }

        if let Some(mut encoder) = self.encoder.take() {
            if let Err(err) = encoder.stop(&mut |bytes| self.push_fragment(bytes)) {
                warn!("encoder failed while stopping, keeping captured data: {err}");
            }
        }

        let clip = Clip::from_fragments(&self.fragments, self.mime_type.as_str());
        self.fragments.clear();
        self.state = RecordingState::Idle;
        info!(
            "recording stopped: clip {} ({} bytes, {})",
            clip.id(),
            clip.byte_size(),
            clip.mime_type()
        );

        self.clips.push(clip);
        self.clips.last()
    }
}

/// First preferred encoding the backend accepts, else its default.
fn negotiate(
    backend: &mut dyn CaptureBackend,
    tap: NodeId,
    preferences: &[String],
) -> AudioResult<Box<dyn ClipEncoder>> {
    for mime_type in preferences {
        match backend.create_encoder(tap, Some(mime_type)) {
            Ok(encoder) => {
                debug!("negotiated encoding {mime_type}");
                return Ok(encoder);
            }
            Err(err) => debug!("encoding {mime_type} rejected: {err}"),
        }
    }

    if !preferences.is_empty() {
        let failed = AudioError::CodecNegotiationFailed {
            tried: preferences.to_vec(),
        };
        debug!("{failed}; using {}", backend.default_mime_type());
    }

    backend.create_encoder(tap, None).map_err(|err| {
        warn!("backend default encoder unavailable: {err}");
        AudioError::RecordingUnsupported
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::EncoderError;
    use pretty_assertions::assert_eq;

    /// Encoder that replays scripted fragments: one batch per `drain`, the
    /// rest on `stop`.
    struct ScriptedEncoder {
        mime_type: String,
        batches: Vec<Vec<Vec<u8>>>,
    }

    impl ClipEncoder for ScriptedEncoder {
        fn mime_type(&self) -> &str {
            &self.mime_type
        }

        fn start(&mut self) -> Result<(), EncoderError> {
            Ok(())
        }

        fn drain(&mut self, sink: &mut FragmentSink<'_>) -> Result<(), EncoderError> {
            if !self.batches.is_empty() {
                for fragment in self.batches.remove(0) {
                    sink(fragment);
                }
            }
            Ok(())
        }

        fn stop(&mut self, sink: &mut FragmentSink<'_>) -> Result<(), EncoderError> {
            for fragment in self.batches.drain(..).flatten() {
                sink(fragment);
            }
            Ok(())
        }
    }

    struct ScriptedBackend {
        accepts: Vec<&'static str>,
        default: Option<&'static str>,
        batches: Vec<Vec<Vec<u8>>>,
        requests: Vec<Option<String>>,
    }

    impl ScriptedBackend {
        fn new(accepts: Vec<&'static str>, default: Option<&'static str>) -> Self {
            Self {
                accepts,
                default,
                batches: Vec::new(),
                requests: Vec::new(),
            }
        }
    }

    impl CaptureBackend for ScriptedBackend {
        fn default_mime_type(&self) -> &str {
            self.default.unwrap_or("none")
        }

        fn create_encoder(
            &mut self,
            _tap: NodeId,
            mime_type: Option<&str>,
        ) -> Result<Box<dyn ClipEncoder>, EncoderError> {
            self.requests.push(mime_type.map(str::to_string));
            let chosen = match mime_type {
                Some(m) if self.accepts.iter().any(|&a| a == m) => m,
                Some(m) => return Err(EncoderError::UnsupportedMimeType(m.to_string())),
                None => self
                    .default
                    .ok_or_else(|| EncoderError::UnsupportedMimeType("default".into()))?,
            };
            Ok(Box::new(ScriptedEncoder {
                mime_type: chosen.to_string(),
                batches: std::mem::take(&mut self.batches),
            }))
        }
    }

    fn prefs() -> Vec<String> {
        vec![
            "audio/webm;codecs=opus".to_string(),
            "audio/webm".to_string(),
            "audio/ogg;codecs=opus".to_string(),
        ]
    }

    const TAP: NodeId = NodeId::new(3, 0);

    #[test]
    fn three_fragments_make_one_clip() {
        let mut backend = ScriptedBackend::new(vec!["audio/webm;codecs=opus"], None);
        backend.batches = vec![vec![vec![1; 100]], vec![vec![2; 200]], vec![vec![3; 150]]];
        let mut session = RecordingSession::new("trackpad-theremin", prefs());

        session.start(Some(&mut backend), TAP).expect("start");
        assert_eq!(session.state(), RecordingState::Capturing);
        session.pump().expect("pump");
        session.pump().expect("pump");

        let before = session.clips().len();
        let clip = session.stop().expect("clip");
        assert_eq!(clip.byte_size(), 450);
        assert_eq!(clip.mime_type(), "audio/webm;codecs=opus");
        assert_eq!(&clip.payload()[..100], &[1; 100][..]);
        assert_eq!(&clip.payload()[100..300], &[2; 200][..]);
        assert_eq!(&clip.payload()[300..], &[3; 150][..]);
        assert_eq!(session.clips().len(), before + 1);
        assert_eq!(session.state(), RecordingState::Idle);
    }

    #[test]
    fn negotiation_walks_preferences_in_order() {
        let mut backend = ScriptedBackend::new(vec!["audio/ogg;codecs=opus"], None);
        let mut session = RecordingSession::new("s", prefs());

        let mime = session.start(Some(&mut backend), TAP).expect("start").to_string();
        assert_eq!(mime, "audio/ogg;codecs=opus");
        assert_eq!(
            backend.requests,
            vec![
                Some("audio/webm;codecs=opus".to_string()),
                Some("audio/webm".to_string()),
                Some("audio/ogg;codecs=opus".to_string()),
            ]
        );
    }

    #[test]
    fn falls_back_to_backend_default() {
        let mut backend = ScriptedBackend::new(vec![], Some("audio/wav"));
        let mut session = RecordingSession::new("s", prefs());

        let mime = session.start(Some(&mut backend), TAP).expect("start").to_string();
        assert_eq!(mime, "audio/wav");
        assert_eq!(backend.requests.last(), Some(&None));
    }

    #[test]
    fn no_encoder_at_all_is_unsupported() {
        let mut backend = ScriptedBackend::new(vec![], None);
        let mut session = RecordingSession::new("s", prefs());

        let err = session.start(Some(&mut backend), TAP).unwrap_err();
        assert!(matches!(err, AudioError::RecordingUnsupported), "{err:?}");
        assert_eq!(session.state(), RecordingState::Idle);
    }

    #[test]
    fn missing_capture_capability_is_unsupported() {
        let mut session = RecordingSession::new("s", prefs());
        let err = session.start(None, TAP).unwrap_err();
        assert!(matches!(err, AudioError::RecordingUnsupported));
    }

    #[test]
    fn stop_when_idle_is_a_no_op() {
        let mut session = RecordingSession::new("s", prefs());
        assert!(session.stop().is_none());
        assert!(session.stop().is_none());
        assert!(session.clips().is_empty());
    }

    #[test]
    fn empty_fragments_are_ignored() {
        let mut backend = ScriptedBackend::new(vec!["audio/webm"], None);
        backend.batches = vec![vec![vec![], vec![9; 4], vec![]]];
        let mut session = RecordingSession::new("s", prefs());

        session.start(Some(&mut backend), TAP).expect("start");
        let clip = session.stop().expect("clip");
        assert_eq!(clip.byte_size(), 4);
    }

    #[test]
    fn fragments_outside_capture_are_dropped() {
        let mut session = RecordingSession::new("s", prefs());
        session.push_fragment(vec![1, 2, 3]);

        let mut backend = ScriptedBackend::new(vec!["audio/webm"], None);
        session.start(Some(&mut backend), TAP).expect("start");
        let clip = session.stop().expect("clip");
        assert_eq!(clip.byte_size(), 0);
    }

    #[test]
    fn clips_get_numbered_filenames() {
        let mut backend = ScriptedBackend::new(vec!["audio/webm;codecs=opus"], None);
        let mut session = RecordingSession::new("trackpad-theremin", prefs());
        for _ in 0..2 {
            session.start(Some(&mut backend), TAP).expect("start");
            session.stop();
        }

        assert_eq!(
            session.suggested_filename(1).as_deref(),
            Some("trackpad-theremin-take-2.webm")
        );
        assert_eq!(session.suggested_filename(2), None);
    }
}

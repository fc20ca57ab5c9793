//! Explicit owner of the audio runtime.
//!
//! Components never reach for an ambient audio context. They borrow the
//! provider from the session for the length of one operation.

use log::{info, warn};

use crate::{
    error::{AudioError, AudioResult, GraphError},
    graph::{AudioGraphProvider, ResumePolicy, RuntimeState},
};

pub struct AudioSession {
    provider: Option<Box<dyn AudioGraphProvider>>,
    gesture_seen: bool,
    reported_missing: bool,
}

impl AudioSession {
    /// Session over a live provider. The runtime is left as the provider
    /// created it, usually suspended.
    pub fn open(provider: Box<dyn AudioGraphProvider>) -> Self {
        info!(
            "audio session opened ({} Hz, {:?})",
            provider.sample_rate(),
            provider.state()
        );
        Self {
            provider: Some(provider),
            gesture_seen: false,
            reported_missing: false,
        }
    }

    /// Session without any audio runtime. Playback and recording fail with
    /// [`AudioError::UnsupportedAudioBackend`].
    pub fn detached() -> Self {
        Self {
            provider: None,
            gesture_seen: false,
            reported_missing: false,
        }
    }

    pub fn has_backend(&self) -> bool {
        self.provider.is_some()
    }

    pub fn state(&self) -> Option<RuntimeState> {
        self.provider.as_ref().map(|provider| provider.state())
    }

    pub fn is_running(&self) -> bool {
        self.state() == Some(RuntimeState::Running)
    }

    pub fn sample_rate(&self) -> Option<f32> {
        self.provider.as_ref().map(|provider| provider.sample_rate())
    }

    /// Record that the user interacted, unlocking gesture-gated runtimes.
    pub fn note_user_gesture(&mut self) {
        self.gesture_seen = true;
    }

    pub fn gesture_seen(&self) -> bool {
        self.gesture_seen
    }

    /// The provider, whatever its state.
    pub fn graph(&self) -> Option<&dyn AudioGraphProvider> {
        self.provider.as_deref()
    }

    pub fn graph_mut(&mut self) -> Option<&mut dyn AudioGraphProvider> {
        self.provider
            .as_deref_mut()
            .map(|provider| provider as &mut dyn AudioGraphProvider)
    }

    /// The provider, or `UnsupportedAudioBackend` (reported once).
    pub fn require(&mut self) -> AudioResult<&mut dyn AudioGraphProvider> {
        if self.provider.is_none() {
            if !self.reported_missing {
                warn!("no realtime audio backend; playback and recording disabled");
                self.reported_missing = true;
            }
            return Err(AudioError::UnsupportedAudioBackend);
        }
        self.provider
            .as_deref_mut()
            .map(|provider| provider as &mut dyn AudioGraphProvider)
            .ok_or(AudioError::UnsupportedAudioBackend)
    }

    /// Resume the runtime if allowed and hand out the running provider.
    ///
    /// Fails with `AudioNotReady` while a gesture-gated runtime is waiting
    /// for its first gesture; retry after [`note_user_gesture`](Self::note_user_gesture).
    pub fn ensure_running(&mut self) -> AudioResult<&mut dyn AudioGraphProvider> {
        let gesture_seen = self.gesture_seen;
        let provider = self.require()?;

        match provider.state() {
            RuntimeState::Running => {}
            RuntimeState::Closed => return Err(GraphError::Closed.into()),
            RuntimeState::Suspended => {
                if provider.resume_policy() == ResumePolicy::RequiresUserGesture && !gesture_seen {
                    return Err(AudioError::AudioNotReady);
                }
                provider.resume()?;
                info!("audio runtime resumed");
            }
        }
        Ok(provider)
    }

    pub fn suspend(&mut self) -> AudioResult<()> {
        self.require()?.suspend()?;
        Ok(())
    }

    /// Shut the runtime down. Idempotent.
    pub fn close(&mut self) {
        if let Some(provider) = self.provider.as_deref_mut() {
            if provider.state() != RuntimeState::Closed {
                provider.close();
                info!("audio session closed");
            }
        }
    }
}

impl Drop for AudioSession {
    fn drop(&mut self) {
        self.close();
    }
}

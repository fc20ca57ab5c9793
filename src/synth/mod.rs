// Purpose: The monophonic tone voice and the timbres it can play
// Sits above the graph nodes; talks to them only through AudioGraphProvider

pub mod voice;
pub mod waveform;

pub use voice::{ToneState, ToneVoice, VoiceState, VoiceTask, VoiceTiming};
pub use waveform::{WaveformDefinition, WaveformId, WaveformLibrary};

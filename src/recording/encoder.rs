//! Capture capability and clip encoders.

use std::{
    io::Cursor,
    sync::{
        atomic::{AtomicBool, AtomicUsize, Ordering},
        Arc, Mutex, MutexGuard, PoisonError,
    },
};

use rtrb::Consumer;

use crate::{error::EncoderError, graph::NodeId};

pub const WAV_MIME_TYPE: &str = "audio/wav";

/// Receives encoded data fragments in arrival order.
pub type FragmentSink<'a> = dyn FnMut(Vec<u8>) + 'a;

/// A host's ability to turn a capture tap into encoded audio.
pub trait CaptureBackend {
    /// Encoding used when no preference is given.
    fn default_mime_type(&self) -> &str;

    /// Build an encoder for `tap`. `None` asks for the backend default.
    fn create_encoder(
        &mut self,
        tap: NodeId,
        mime_type: Option<&str>,
    ) -> Result<Box<dyn ClipEncoder>, EncoderError>;
}

/// An encoder attached to a capture tap.
///
/// Encoders hand out fragments through a sink; a fragment is an opaque byte
/// chunk and a clip is the concatenation of all of them in order.
pub trait ClipEncoder: Send {
    fn mime_type(&self) -> &str;

    fn start(&mut self) -> Result<(), EncoderError>;

    /// Pull captured audio and emit any fragments that are ready.
    fn drain(&mut self, sink: &mut FragmentSink<'_>) -> Result<(), EncoderError>;

    /// Finish encoding and emit the remaining fragments.
    fn stop(&mut self, sink: &mut FragmentSink<'_>) -> Result<(), EncoderError>;
}

/// 16-bit PCM WAV encoder fed by a native capture tap.
///
/// WAV needs its header sizes up front, so samples are buffered while
/// capturing and the whole file is emitted as one fragment on stop.
pub struct WavEncoder {
    spec: hound::WavSpec,
    rx: Arc<Mutex<Consumer<f32>>>,
    armed: Arc<AtomicBool>,
    dropped: Arc<AtomicUsize>,
    samples: Vec<i16>,
}

impl WavEncoder {
    pub fn new(
        sample_rate: f32,
        rx: Arc<Mutex<Consumer<f32>>>,
        armed: Arc<AtomicBool>,
        dropped: Arc<AtomicUsize>,
    ) -> Self {
        Self {
            spec: hound::WavSpec {
                channels: 2,
                sample_rate: sample_rate.round() as u32,
                bits_per_sample: 16,
                sample_format: hound::SampleFormat::Int,
            },
            rx,
            armed,
            dropped,
            samples: Vec::new(),
        }
    }

    fn pull(&mut self) {
        let mut rx = lock(&self.rx);
        while let Ok(sample) = rx.pop() {
            self.samples.push(to_pcm(sample));
        }
    }

    fn encode(&self) -> Result<Vec<u8>, EncoderError> {
        let mut cursor = Cursor::new(Vec::new());
        {
            let mut writer = hound::WavWriter::new(&mut cursor, self.spec)?;
            for &sample in &self.samples {
                writer.write_sample(sample)?;
            }
            writer.finalize()?;
        }
        Ok(cursor.into_inner())
    }
}

impl ClipEncoder for WavEncoder {
    fn mime_type(&self) -> &str {
        WAV_MIME_TYPE
    }

    fn start(&mut self) -> Result<(), EncoderError> {
        {
            let mut rx = lock(&self.rx);
            while rx.pop().is_ok() {}
        }
        self.samples.clear();
        self.dropped.store(0, Ordering::Relaxed);
        self.armed.store(true, Ordering::Release);
        Ok(())
    }

    fn drain(&mut self, _sink: &mut FragmentSink<'_>) -> Result<(), EncoderError> {
        self.pull();
        Ok(())
    }

    fn stop(&mut self, sink: &mut FragmentSink<'_>) -> Result<(), EncoderError> {
        self.armed.store(false, Ordering::Release);
        self.pull();

        let dropped = self.dropped.swap(0, Ordering::Relaxed);
        if dropped > 0 {
            log::warn!("capture ring overflowed, {dropped} samples lost");
        }

        let bytes = self.encode()?;
        self.samples.clear();
        sink(bytes);
        Ok(())
    }
}

impl Drop for WavEncoder {
    fn drop(&mut self) {
        self.armed.store(false, Ordering::Release);
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

#[inline]
fn to_pcm(sample: f32) -> i16 {
    (sample.clamp(-1.0, 1.0) * i16::MAX as f32) as i16
}

#[cfg(test)]
mod tests {
    use super::*;
    use rtrb::RingBuffer;

    fn encoder() -> (WavEncoder, rtrb::Producer<f32>, Arc<AtomicBool>) {
        let (tx, rx) = RingBuffer::new(64);
        let armed = Arc::new(AtomicBool::new(false));
        let enc = WavEncoder::new(
            8_000.0,
            Arc::new(Mutex::new(rx)),
            armed.clone(),
            Arc::default(),
        );
        (enc, tx, armed)
    }

    #[test]
    fn start_arms_and_stop_disarms() {
        let (mut enc, _tx, armed) = encoder();
        enc.start().expect("start");
        assert!(armed.load(Ordering::Acquire));
        enc.stop(&mut |_| {}).expect("stop");
        assert!(!armed.load(Ordering::Acquire));
    }

    #[test]
    fn stop_emits_one_wav_fragment() {
        let (mut enc, mut tx, _armed) = encoder();
        enc.start().expect("start");
        for s in [0.0, 0.5, -0.5, 1.0] {
            tx.push(s).expect("push");
        }
        let mut fragments = Vec::new();
        enc.drain(&mut |bytes| fragments.push(bytes)).expect("drain");
        assert!(fragments.is_empty(), "no fragments before stop");

        enc.stop(&mut |bytes| fragments.push(bytes)).expect("stop");
        assert_eq!(fragments.len(), 1);

        let reader = hound::WavReader::new(Cursor::new(fragments.remove(0))).expect("valid wav");
        assert_eq!(reader.spec().channels, 2);
        assert_eq!(reader.spec().sample_rate, 8_000);
        let samples: Vec<i16> = reader.into_samples().map(|s| s.expect("sample")).collect();
        assert_eq!(samples, vec![0, 16_383, -16_383, i16::MAX]);
    }

    #[test]
    fn start_discards_stale_samples() {
        let (mut enc, mut tx, _armed) = encoder();
        tx.push(0.25).expect("push");
        enc.start().expect("start");

        let mut fragments = Vec::new();
        enc.stop(&mut |bytes| fragments.push(bytes)).expect("stop");
        let reader = hound::WavReader::new(Cursor::new(fragments.remove(0))).expect("valid wav");
        assert_eq!(reader.len(), 0);
    }

    #[test]
    fn pcm_conversion_clips() {
        assert_eq!(to_pcm(2.0), i16::MAX);
        assert_eq!(to_pcm(-2.0), -i16::MAX);
    }
}

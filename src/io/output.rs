//! Output device glue: a cpal stream that pulls audio from a [`GraphRenderer`].
//!
//! The renderer moves into the device callback; nothing is shared with the
//! control thread except the lock-free rings inside the graph. An optional
//! scope ring receives a mono copy of everything played, for display.

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use rtrb::{Consumer, Producer, RingBuffer};
use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc,
};
use thiserror::Error;

use crate::{graph::GraphRenderer, MAX_BLOCK_SIZE};

#[derive(Debug, Error)]
pub enum OutputError {
    #[error("no default output device available")]
    NoDevice,

    #[error("failed to fetch default output config: {0}")]
    Config(#[from] cpal::DefaultStreamConfigError),

    #[error("failed to build output stream: {0}")]
    Build(#[from] cpal::BuildStreamError),

    #[error("failed to start output stream: {0}")]
    Play(#[from] cpal::PlayStreamError),
}

/// The host's default output device and its preferred configuration.
pub struct OutputDevice {
    device: cpal::Device,
    config: cpal::StreamConfig,
}

impl OutputDevice {
    pub fn default_output() -> Result<Self, OutputError> {
        let host = cpal::default_host();
        let device = host.default_output_device().ok_or(OutputError::NoDevice)?;
        let config = device.default_output_config()?.config();
        Ok(Self { device, config })
    }

    pub fn sample_rate(&self) -> f32 {
        self.config.sample_rate.0 as f32
    }

    pub fn channels(&self) -> usize {
        self.config.channels as usize
    }

    pub fn name(&self) -> String {
        self.device.name().unwrap_or_else(|_| "unknown device".to_string())
    }

    /// Start playing `renderer`. With `scope_capacity > 0` a mono copy of
    /// the output is pushed to the returned stream's scope ring.
    pub fn play(
        self,
        mut renderer: GraphRenderer,
        scope_capacity: usize,
    ) -> Result<OutputStream, OutputError> {
        let channels = self.channels().max(1);
        let (mut scope_tx, scope_rx) = if scope_capacity > 0 {
            let (tx, rx) = RingBuffer::<f32>::new(scope_capacity);
            (Some(tx), Some(rx))
        } else {
            (None, None)
        };
        let errors = Arc::new(AtomicUsize::new(0));
        let error_count = errors.clone();

        let stream = self.device.build_output_stream(
            &self.config,
            move |data: &mut [f32], _| {
                for block in data.chunks_mut(MAX_BLOCK_SIZE * channels) {
                    renderer.render_interleaved(block, channels);
                    if let Some(tx) = scope_tx.as_mut() {
                        push_scope(tx, block, channels);
                    }
                }
            },
            move |err| {
                error_count.fetch_add(1, Ordering::Relaxed);
                log::error!("output stream error: {err}");
            },
            None,
        )?;
        stream.play()?;

        log::info!(
            "output stream started on {} ({} Hz, {} ch)",
            self.name(),
            self.sample_rate(),
            channels
        );

        Ok(OutputStream {
            _stream: stream,
            sample_rate: self.sample_rate(),
            channels,
            scope: scope_rx,
            errors,
        })
    }
}

/// A running output stream. Audio stops when this is dropped.
pub struct OutputStream {
    _stream: cpal::Stream,
    sample_rate: f32,
    channels: usize,
    scope: Option<Consumer<f32>>,
    errors: Arc<AtomicUsize>,
}

impl OutputStream {
    pub fn sample_rate(&self) -> f32 {
        self.sample_rate
    }

    pub fn channels(&self) -> usize {
        self.channels
    }

    /// Stream errors reported by the device so far.
    pub fn error_count(&self) -> usize {
        self.errors.load(Ordering::Relaxed)
    }

    /// Move every scope sample that has arrived into `out`.
    pub fn drain_scope(&mut self, out: &mut Vec<f32>) {
        if let Some(rx) = self.scope.as_mut() {
            while let Ok(sample) = rx.pop() {
                out.push(sample);
            }
        }
    }
}

/// Mono mix of an interleaved block; samples that do not fit are dropped.
fn push_scope(tx: &mut Producer<f32>, block: &[f32], channels: usize) {
    let used = channels.min(2);
    for frame in block.chunks(channels) {
        if tx.is_full() {
            return;
        }
        let sum: f32 = frame.iter().take(used).sum();
        let _ = tx.push(sum / used as f32);
    }
}

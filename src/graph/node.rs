use crate::{
    dsp::{oscillator::OscillatorShape, param::AudioParam},
    graph::provider::ParamKind,
    RENDER_QUANTUM,
};

/// One render quantum of stereo audio, `[left, right]`.
pub type StereoBlock = [[f32; RENDER_QUANTUM]; 2];

pub(crate) const SILENT_BLOCK: StereoBlock = [[0.0; RENDER_QUANTUM]; 2];

/// Context passed to render nodes for each quantum
///
/// - sample_rate: Audio sample rate (e.g., 48000.0)
/// - time: Render-timeline time of the first frame, in seconds
pub struct RenderCtx {
    pub sample_rate: f32,
    pub time: f64,
}

impl RenderCtx {
    pub fn new(sample_rate: f32, time: f64) -> Self {
        Self { sample_rate, time }
    }

    /// Time of frame `index` within the quantum.
    #[inline]
    pub fn frame_time(&self, index: usize) -> f64 {
        self.time + index as f64 / self.sample_rate as f64
    }
}

/// Core trait for nodes living on the render thread
///
/// `input` is the sum of every upstream node's output for this quantum.
/// Implementations must not allocate or block.
pub trait RenderNode: Send {
    fn process(&mut self, input: &StereoBlock, output: &mut StereoBlock, ctx: &RenderCtx);

    /// Automation timeline for `kind`, if the node has one.
    fn param_mut(&mut self, _kind: ParamKind) -> Option<&mut AudioParam> {
        None
    }

    /// Replace the waveform and hand back whichever shape is no longer in
    /// use. Nodes without a waveform return `shape` unchanged.
    fn swap_shape(&mut self, shape: OscillatorShape) -> OscillatorShape {
        shape
    }

    /// Begin generating at render time `at`.
    ///
    /// Default implementation does nothing (always-on nodes).
    fn start(&mut self, _at: f64) {}

    /// Stop generating at render time `at`.
    fn stop(&mut self, _at: f64) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frame_time_steps_by_sample_period() {
        let ctx = RenderCtx::new(1_000.0, 2.0);
        assert_eq!(ctx.frame_time(0), 2.0);
        assert!((ctx.frame_time(10) - 2.01).abs() < 1e-12);
    }
}

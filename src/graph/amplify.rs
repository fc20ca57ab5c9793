use crate::{
    dsp::param::AudioParam,
    graph::{
        node::{RenderCtx, RenderNode, StereoBlock},
        provider::ParamKind,
    },
    RENDER_QUANTUM,
};

/// Multiplies its input by an automatable gain.
///
/// Used for the voice envelope, the dry and wet sends, the master bus and the
/// graph destination (at unity).
pub struct GainNode {
    gain: AudioParam,
    gain_buf: [f32; RENDER_QUANTUM],
}

impl GainNode {
    pub fn new(gain: f32) -> Self {
        Self {
            gain: AudioParam::new(gain),
            gain_buf: [0.0; RENDER_QUANTUM],
        }
    }

    pub fn unity() -> Self {
        Self::new(1.0)
    }
}

impl RenderNode for GainNode {
    fn process(&mut self, input: &StereoBlock, output: &mut StereoBlock, ctx: &RenderCtx) {
        self.gain
            .fill(&mut self.gain_buf, ctx.time, ctx.sample_rate);

        for (out, inp) in output.iter_mut().zip(input) {
            for ((o, &x), &g) in out.iter_mut().zip(inp).zip(&self.gain_buf) {
                *o = x * g;
            }
        }
    }

    fn param_mut(&mut self, kind: ParamKind) -> Option<&mut AudioParam> {
        match kind {
            ParamKind::Gain => Some(&mut self.gain),
            ParamKind::Frequency => None,
        }
    }
}

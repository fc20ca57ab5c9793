use crate::{
    dsp::{convolver::PartitionedConvolver, impulse::ImpulseResponse},
    graph::node::{RenderCtx, RenderNode, StereoBlock},
    RENDER_QUANTUM,
};

/*
Convolution Reverb Node
=======================

Places the signal in a synthetic room by convolving it with an impulse
response: a recording (here: a simulation) of how a space answers a click.

    dry ──┬──────────────────────────────┐
          │                              ▼
          └──► [ convolver: x * h ] ──► wet ──► master

The node is 100% wet. Blending with the dry signal happens on the bus, which
keeps the dry + wet crossfade in one place.

Channels
--------

The two input channels are averaged to mono, then convolved with the left and
right impulse channels separately. Independent noise in each impulse channel
is what gives the tail its stereo width.

Processing is one render quantum per FFT partition, so the node adds no
latency on top of the graph.
*/

pub struct ConvolverNode {
    convolver: PartitionedConvolver,
    mono: [f32; RENDER_QUANTUM],
}

impl ConvolverNode {
    pub fn new(impulse: &ImpulseResponse) -> Self {
        Self {
            convolver: PartitionedConvolver::new(impulse, RENDER_QUANTUM, true),
            mono: [0.0; RENDER_QUANTUM],
        }
    }
}

impl RenderNode for ConvolverNode {
    fn process(&mut self, input: &StereoBlock, output: &mut StereoBlock, _ctx: &RenderCtx) {
        for ((m, &l), &r) in self.mono.iter_mut().zip(&input[0]).zip(&input[1]) {
            *m = 0.5 * (l + r);
        }

        let [left, right] = output;
        self.convolver
            .process_block(&self.mono, &mut left[..], &mut right[..]);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::node::SILENT_BLOCK;
    use rand::{rngs::StdRng, SeedableRng};

    #[test]
    fn silence_in_silence_out() {
        let ir = ImpulseResponse::decaying_noise(&mut StdRng::seed_from_u64(5), 48_000.0, 0.1, 2.2);
        let mut node = ConvolverNode::new(&ir);
        let mut out = SILENT_BLOCK;
        node.process(&SILENT_BLOCK, &mut out, &RenderCtx::new(48_000.0, 0.0));
        assert!(out.iter().flatten().all(|s| s.abs() < 1e-9));
    }

    #[test]
    fn click_produces_decorrelated_tail() {
        let ir = ImpulseResponse::decaying_noise(&mut StdRng::seed_from_u64(5), 48_000.0, 0.1, 2.2);
        let mut node = ConvolverNode::new(&ir);
        let ctx = RenderCtx::new(48_000.0, 0.0);

        let mut click = SILENT_BLOCK;
        click[0][0] = 1.0;
        click[1][0] = 1.0;
        let mut out = SILENT_BLOCK;
        node.process(&click, &mut out, &ctx);
        node.process(&SILENT_BLOCK, &mut out, &ctx);

        let energy: f32 = out[0].iter().map(|s| s * s).sum();
        assert!(energy > 0.0, "tail should ring past the first quantum");
        assert_ne!(out[0], out[1]);
    }
}

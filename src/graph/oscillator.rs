use crate::{
    dsp::{
        oscillator::{OscillatorBlock, OscillatorShape},
        param::AudioParam,
    },
    graph::{
        node::{RenderCtx, RenderNode, StereoBlock},
        provider::ParamKind,
    },
    RENDER_QUANTUM,
};

/*
Oscillator Node
===============

The sound source of the voice. It wraps an `OscillatorBlock` with the two
things the graph needs on top of raw waveform math:

  1. A frequency `AudioParam`, evaluated per sample, so exponential glides
     scheduled from the control thread are sample-accurate.
  2. A start/stop window on the render timeline. Outside the window the node
     writes silence; inside it the oscillator runs free.

        start_at                        stop_at
           │ ∿∿∿∿∿∿∿∿∿∿∿∿∿∿∿∿∿∿∿∿∿∿∿∿∿∿∿∿ │
  ─────────┴──────────────────────────────┴──────────→ t
   silence            sounding                silence

A node is single-use: once stopped it stays silent until released, matching
the one-shot source nodes of typical host audio runtimes.

The output is mono, duplicated to both channels.
*/

pub struct OscNode {
    osc: OscillatorBlock,
    frequency: AudioParam,
    frequency_buf: [f32; RENDER_QUANTUM],
    start_at: Option<f64>,
    stop_at: Option<f64>,
}

impl OscNode {
    pub fn new(shape: OscillatorShape, frequency: f32) -> Self {
        Self {
            osc: OscillatorBlock::new(shape),
            frequency: AudioParam::with_range(frequency, 0.0, f32::MAX),
            frequency_buf: [0.0; RENDER_QUANTUM],
            start_at: None,
            stop_at: None,
        }
    }

    #[inline]
    fn sounding(&self, t: f64) -> bool {
        match self.start_at {
            Some(start) => t >= start && self.stop_at.map_or(true, |stop| t < stop),
            None => false,
        }
    }
}

impl RenderNode for OscNode {
    fn process(&mut self, _input: &StereoBlock, output: &mut StereoBlock, ctx: &RenderCtx) {
        let end = ctx.frame_time(RENDER_QUANTUM - 1);
        let idle = match self.start_at {
            None => true,
            Some(start) => end < start || self.stop_at.is_some_and(|stop| ctx.time >= stop),
        };

        self.frequency
            .fill(&mut self.frequency_buf, ctx.time, ctx.sample_rate);

        if idle {
            output[0].fill(0.0);
            output[1].fill(0.0);
            return;
        }

        let [left, right] = output;
        self.osc
            .render(&mut left[..], &self.frequency_buf, ctx.sample_rate);
        for (i, sample) in left.iter_mut().enumerate() {
            if !self.sounding(ctx.frame_time(i)) {
                *sample = 0.0;
            }
        }
        right.copy_from_slice(&left[..]);
    }

    fn param_mut(&mut self, kind: ParamKind) -> Option<&mut AudioParam> {
        match kind {
            ParamKind::Frequency => Some(&mut self.frequency),
            ParamKind::Gain => None,
        }
    }

    fn swap_shape(&mut self, shape: OscillatorShape) -> OscillatorShape {
        std::mem::replace(self.osc.shape_mut(), shape)
    }

    fn start(&mut self, at: f64) {
        if self.start_at.is_none() {
            self.start_at = Some(at);
        }
    }

    fn stop(&mut self, at: f64) {
        self.stop_at = Some(self.stop_at.map_or(at, |prev| prev.min(at)));
    }
}

use std::sync::{
    atomic::{AtomicBool, AtomicUsize, Ordering},
    Arc,
};

use rtrb::Producer;

use crate::graph::node::{RenderCtx, RenderNode, StereoBlock};

/// Pass-through node that copies its signal into a capture ring while armed.
///
/// Samples are pushed interleaved (`L R L R ...`). When the ring is full the
/// sample is dropped and counted rather than blocking the render thread.
pub struct TapNode {
    tx: Producer<f32>,
    armed: Arc<AtomicBool>,
    dropped: Arc<AtomicUsize>,
}

impl TapNode {
    pub fn new(tx: Producer<f32>, armed: Arc<AtomicBool>, dropped: Arc<AtomicUsize>) -> Self {
        Self { tx, armed, dropped }
    }
}

impl RenderNode for TapNode {
    fn process(&mut self, input: &StereoBlock, output: &mut StereoBlock, _ctx: &RenderCtx) {
        *output = *input;

        if !self.armed.load(Ordering::Acquire) {
            return;
        }

        let mut lost = 0;
        for (&l, &r) in input[0].iter().zip(&input[1]) {
            if self.tx.slots() < 2 {
                lost += 2;
                continue;
            }
            let _ = self.tx.push(l);
            let _ = self.tx.push(r);
        }
        if lost > 0 {
            self.dropped.fetch_add(lost, Ordering::Relaxed);
        }
    }
}

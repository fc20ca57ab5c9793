use std::sync::Arc;

use rtrb::{Consumer, Producer};

use crate::{
    graph::{
        command::{Garbage, GraphCommand, SharedClock},
        node::{RenderCtx, RenderNode, StereoBlock, SILENT_BLOCK},
        provider::RuntimeState,
    },
    RENDER_QUANTUM,
};

/*
Graph Renderer
==============

The realtime half of `NativeGraph`. It owns every node and is driven by the
output device callback (or by a test) through `render`.

Quantum Loop
------------

Devices ask for arbitrary buffer sizes, but nodes work in fixed quanta of
RENDER_QUANTUM frames. The renderer keeps one finished quantum and hands it
out piecewise, rendering the next one when it runs dry:

    device:   |---- 300 ----|-- 100 --|------- 500 -------|
    quanta:   |128|128|128|128|128|128|128|128|...

Each quantum:

  1. Drain control commands (insert / remove / connect / schedule ...).
  2. If suspended or closed: emit silence, leave the clock alone.
  3. Visit nodes in topological order. A node's input is the sum of its
     upstream nodes' outputs for this quantum.
  4. The destination node's output is the device output.
  5. Advance the shared frame counter.

Ordering is recomputed only when the topology changes (Kahn's algorithm on
preallocated scratch). Nodes caught in a cycle are skipped.

Nothing here allocates: buffers are sized for the node capacity up front and
removed nodes are shipped back to the control thread to be dropped there.
*/

pub struct GraphRenderer {
    sample_rate: f32,
    commands: Consumer<GraphCommand>,
    garbage: Producer<Garbage>,
    clock: Arc<SharedClock>,
    destination: usize,

    nodes: Vec<Option<Box<dyn RenderNode>>>,
    inputs: Vec<Vec<usize>>,
    outputs: Vec<StereoBlock>,
    mix: StereoBlock,

    order: Vec<usize>,
    indegree: Vec<usize>,
    ready: Vec<usize>,
    topology_dirty: bool,

    block: StereoBlock,
    cursor: usize,
}

impl GraphRenderer {
    pub(crate) fn new(
        sample_rate: f32,
        capacity: usize,
        max_inputs: usize,
        destination: usize,
        commands: Consumer<GraphCommand>,
        garbage: Producer<Garbage>,
        clock: Arc<SharedClock>,
    ) -> Self {
        Self {
            sample_rate,
            commands,
            garbage,
            clock,
            destination,
            nodes: (0..capacity).map(|_| None).collect(),
            inputs: (0..capacity)
                .map(|_| Vec::with_capacity(max_inputs))
                .collect(),
            outputs: vec![SILENT_BLOCK; capacity],
            mix: SILENT_BLOCK,
            order: Vec::with_capacity(capacity),
            indegree: vec![0; capacity],
            ready: Vec::with_capacity(capacity),
            topology_dirty: true,
            block: SILENT_BLOCK,
            cursor: RENDER_QUANTUM,
        }
    }

    /// Place a node before the renderer is handed to the audio thread.
    pub(crate) fn install(&mut self, slot: usize, node: Box<dyn RenderNode>) {
        self.nodes[slot] = Some(node);
        self.topology_dirty = true;
    }

    pub fn sample_rate(&self) -> f32 {
        self.sample_rate
    }

    /// Fill both channels with the next `left.len()` frames of output.
    pub fn render(&mut self, left: &mut [f32], right: &mut [f32]) {
        debug_assert_eq!(left.len(), right.len());
        let mut written = 0;

        while written < left.len() {
            if self.cursor == RENDER_QUANTUM {
                self.render_quantum();
                self.cursor = 0;
            }

            let n = (RENDER_QUANTUM - self.cursor).min(left.len() - written);
            let range = self.cursor..self.cursor + n;
            left[written..written + n].copy_from_slice(&self.block[0][range.clone()]);
            right[written..written + n].copy_from_slice(&self.block[1][range]);
            self.cursor += n;
            written += n;
        }
    }

    /// Fill an interleaved device buffer with `channels` channels.
    ///
    /// Mono devices get the average of left and right; channels past the
    /// second are silent.
    pub fn render_interleaved(&mut self, data: &mut [f32], channels: usize) {
        let channels = channels.max(1);
        for frame in data.chunks_mut(channels) {
            if self.cursor == RENDER_QUANTUM {
                self.render_quantum();
                self.cursor = 0;
            }

            let l = self.block[0][self.cursor];
            let r = self.block[1][self.cursor];
            match frame {
                [mono] => *mono = 0.5 * (l + r),
                [fl, fr, rest @ ..] => {
                    *fl = l;
                    *fr = r;
                    rest.fill(0.0);
                }
                [] => {}
            }
            self.cursor += 1;
        }
    }

    fn render_quantum(&mut self) {
        self.drain_commands();

        if self.clock.state() != RuntimeState::Running {
            self.block = SILENT_BLOCK;
            return;
        }

        if self.topology_dirty {
            self.sort();
        }

        let ctx = RenderCtx::new(self.sample_rate, self.now());

        for &slot in &self.order {
            self.mix = SILENT_BLOCK;
            for &src in &self.inputs[slot] {
                for (mix, out) in self.mix.iter_mut().zip(&self.outputs[src]) {
                    for (m, &x) in mix.iter_mut().zip(out) {
                        *m += x;
                    }
                }
            }

            if let Some(node) = self.nodes[slot].as_mut() {
                node.process(&self.mix, &mut self.outputs[slot], &ctx);
            }
        }

        self.block = self.outputs[self.destination];
        self.clock.advance(RENDER_QUANTUM as u64);
    }

    fn now(&self) -> f64 {
        self.clock.frames() as f64 / self.sample_rate as f64
    }

    fn drain_commands(&mut self) {
        let now = self.now();

        while let Ok(command) = self.commands.pop() {
            match command {
                GraphCommand::Insert { slot, node } => {
                    if let Some(old) = self.nodes[slot].replace(node) {
                        let _ = self.garbage.push(Garbage::Node(old));
                    }
                    self.inputs[slot].clear();
                    self.outputs[slot] = SILENT_BLOCK;
                    self.topology_dirty = true;
                }
                GraphCommand::Remove { slot } => {
                    if let Some(old) = self.nodes[slot].take() {
                        let _ = self.garbage.push(Garbage::Node(old));
                    }
                    self.inputs[slot].clear();
                    for inputs in &mut self.inputs {
                        inputs.retain(|&src| src != slot);
                    }
                    self.topology_dirty = true;
                }
                GraphCommand::Connect { from, to } => {
                    let inputs = &mut self.inputs[to];
                    if !inputs.contains(&from) && inputs.len() < inputs.capacity() {
                        inputs.push(from);
                        self.topology_dirty = true;
                    }
                }
                GraphCommand::Disconnect { from, to } => {
                    let inputs = &mut self.inputs[to];
                    if let Some(index) = inputs.iter().position(|&src| src == from) {
                        inputs.swap_remove(index);
                        self.topology_dirty = true;
                    }
                }
                GraphCommand::Schedule { slot, param, event } => {
                    if let Some(target) = self.nodes[slot]
                        .as_mut()
                        .and_then(|node| node.param_mut(param))
                    {
                        target.schedule(event, now);
                    }
                }
                GraphCommand::SetShape { slot, shape } => {
                    let unused = match self.nodes[slot].as_mut() {
                        Some(node) => node.swap_shape(shape),
                        None => shape,
                    };
                    let _ = self.garbage.push(Garbage::Shape(unused));
                }
                GraphCommand::Start { slot, at } => {
                    if let Some(node) = self.nodes[slot].as_mut() {
                        node.start(at);
                    }
                }
                GraphCommand::Stop { slot, at } => {
                    if let Some(node) = self.nodes[slot].as_mut() {
                        node.stop(at);
                    }
                }
            }
        }
    }

    /// Kahn's algorithm over the live slots.
    fn sort(&mut self) {
        self.order.clear();
        self.ready.clear();

        for slot in 0..self.nodes.len() {
            if self.nodes[slot].is_some() {
                self.indegree[slot] = self.inputs[slot].len();
                if self.indegree[slot] == 0 {
                    self.ready.push(slot);
                }
            } else {
                self.indegree[slot] = usize::MAX;
            }
        }

        while let Some(slot) = self.ready.pop() {
            self.order.push(slot);
            for next in 0..self.inputs.len() {
                if self.indegree[next] == usize::MAX {
                    continue;
                }
                let edges = self.inputs[next].iter().filter(|&&src| src == slot).count();
                if edges > 0 {
                    self.indegree[next] -= edges;
                    if self.indegree[next] == 0 {
                        self.ready.push(next);
                    }
                }
            }
        }

        for slot in 0..self.outputs.len() {
            if !self.order.contains(&slot) {
                self.outputs[slot] = SILENT_BLOCK;
            }
        }

        self.topology_dirty = false;
    }
}

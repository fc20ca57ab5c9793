//! Messages between the control handle and the render thread.

use std::sync::atomic::{AtomicU64, AtomicU8, Ordering};

use crate::{
    dsp::{oscillator::OscillatorShape, param::ParamEvent},
    graph::{node::RenderNode, provider::ParamKind, provider::RuntimeState},
};

/// Control → render requests. Slots index the renderer's node table.
pub enum GraphCommand {
    Insert {
        slot: usize,
        node: Box<dyn RenderNode>,
    },
    Remove {
        slot: usize,
    },
    Connect {
        from: usize,
        to: usize,
    },
    Disconnect {
        from: usize,
        to: usize,
    },
    Schedule {
        slot: usize,
        param: ParamKind,
        event: ParamEvent,
    },
    SetShape {
        slot: usize,
        shape: OscillatorShape,
    },
    Start {
        slot: usize,
        at: f64,
    },
    Stop {
        slot: usize,
        at: f64,
    },
}

/// Render → control: resources to drop off the render thread.
pub enum Garbage {
    Node(Box<dyn RenderNode>),
    Shape(OscillatorShape),
}

/// State both halves read without locking.
pub(crate) struct SharedClock {
    frames: AtomicU64,
    state: AtomicU8,
}

impl SharedClock {
    pub(crate) fn new(state: RuntimeState) -> Self {
        Self {
            frames: AtomicU64::new(0),
            state: AtomicU8::new(encode(state)),
        }
    }

    pub(crate) fn frames(&self) -> u64 {
        self.frames.load(Ordering::Acquire)
    }

    pub(crate) fn advance(&self, frames: u64) {
        self.frames.fetch_add(frames, Ordering::AcqRel);
    }

    pub(crate) fn state(&self) -> RuntimeState {
        match self.state.load(Ordering::Acquire) {
            0 => RuntimeState::Suspended,
            1 => RuntimeState::Running,
            _ => RuntimeState::Closed,
        }
    }

    pub(crate) fn set_state(&self, state: RuntimeState) {
        self.state.store(encode(state), Ordering::Release);
    }
}

fn encode(state: RuntimeState) -> u8 {
    match state {
        RuntimeState::Suspended => 0,
        RuntimeState::Running => 1,
        RuntimeState::Closed => 2,
    }
}

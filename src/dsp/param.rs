use std::collections::VecDeque;

/*
Parameter Automation
====================

Every continuously controllable value in the graph (oscillator frequency,
gain-node level) is an `AudioParam`: a current curve plus a short queue of
scheduled events on the render timeline.

Event Types
-----------

  SetValue          jump immediately, dropping anything still queued
  SetValueAtTime    jump at a given render time
  SetTargetAtTime   start an exponential approach toward `target` at `start`

The Exponential Approach
------------------------

A target event turns the parameter into a first-order low-pass step response:

    v(t) = target + (v0 - target) * e^(-(t - start) / tau)

where v0 is whatever the previous curve evaluated to at `start`. After one
time constant the value has covered ~63% of the distance, after five ~99%.

    v0 ┐╲
       │ ╲
       │  ╲_
       │    ╲__
       │       ╲____
target └────────────╲════════ → t
       start  +tau  +2tau ...

Why this is click-free for gesture tracking: each pointer move schedules a
new approach starting "now". The new curve begins exactly where the old one
is at that instant (v0 is evaluated, not assumed), so rapid updates coalesce
into one continuous trajectory and the latest value wins.

Real-time Safety
----------------

The pending queue is a `VecDeque` with fixed capacity reserved up front. If a
flood of events ever fills it, the oldest pending event is dropped before a
new one is queued, so `schedule` never allocates on the render thread.
*/

/// Pending events a parameter can hold before the oldest is dropped.
pub const PENDING_CAPACITY: usize = 32;

/// After this many time constants an approach is treated as settled.
const SETTLE_TIME_CONSTANTS: f64 = 24.0;

/// An automation event for a parameter.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ParamEvent {
    /// Jump to `value` now, cancelling pending automation.
    SetValue { value: f32 },
    /// Jump to `value` at render time `time`.
    SetValueAtTime { value: f32, time: f64 },
    /// Approach `target` exponentially from `start` with `time_constant`.
    SetTargetAtTime {
        target: f32,
        start: f64,
        time_constant: f64,
    },
}

impl ParamEvent {
    fn time(&self) -> f64 {
        match *self {
            ParamEvent::SetValue { .. } => f64::NEG_INFINITY,
            ParamEvent::SetValueAtTime { time, .. } => time,
            ParamEvent::SetTargetAtTime { start, .. } => start,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Curve {
    Hold(f32),
    Target {
        from: f32,
        target: f32,
        start: f64,
        time_constant: f64,
    },
}

impl Curve {
    #[inline]
    fn eval(&self, t: f64) -> f32 {
        match *self {
            Curve::Hold(value) => value,
            Curve::Target {
                from,
                target,
                start,
                time_constant,
            } => {
                if t <= start {
                    return from;
                }
                let decay = (-(t - start) / time_constant).exp();
                (target as f64 + (from as f64 - target as f64) * decay) as f32
            }
        }
    }

    /// Curve that results from `event` becoming due while `self` is running.
    fn then(&self, event: &ParamEvent) -> Curve {
        match *event {
            ParamEvent::SetValue { value } | ParamEvent::SetValueAtTime { value, .. } => {
                Curve::Hold(value)
            }
            ParamEvent::SetTargetAtTime {
                target,
                start,
                time_constant,
            } => Curve::Target {
                from: self.eval(start),
                target,
                start,
                time_constant: time_constant.max(crate::MIN_TIME),
            },
        }
    }
}

/// A parameter value driven by a timeline of automation events.
#[derive(Debug, Clone)]
pub struct AudioParam {
    curve: Curve,
    pending: VecDeque<ParamEvent>,
    min: f32,
    max: f32,
}

impl AudioParam {
    pub fn new(initial: f32) -> Self {
        Self::with_range(initial, f32::MIN, f32::MAX)
    }

    /// A parameter whose evaluated value is clamped to `min..=max`.
    pub fn with_range(initial: f32, min: f32, max: f32) -> Self {
        Self {
            curve: Curve::Hold(initial),
            pending: VecDeque::with_capacity(PENDING_CAPACITY),
            min,
            max,
        }
    }

    /// Queue an automation event. `now` is the time an immediate
    /// `SetValue` takes effect.
    pub fn schedule(&mut self, event: ParamEvent, now: f64) {
        self.advance(now);

        if let ParamEvent::SetValue { value } = event {
            self.pending.clear();
            self.curve = Curve::Hold(value);
            return;
        }

        if self.pending.len() == PENDING_CAPACITY {
            self.pending.pop_front();
        }

        let time = event.time();
        let index = self
            .pending
            .iter()
            .position(|queued| queued.time() > time)
            .unwrap_or(self.pending.len());
        self.pending.insert(index, event);
    }

    /// Consume every event due at or before `t`.
    #[inline]
    pub fn advance(&mut self, t: f64) {
        while let Some(event) = self.pending.front() {
            if event.time() > t {
                break;
            }
            self.curve = self.curve.then(event);
            self.pending.pop_front();
        }

        if let Curve::Target {
            target,
            start,
            time_constant,
            ..
        } = self.curve
        {
            if t - start > SETTLE_TIME_CONSTANTS * time_constant {
                self.curve = Curve::Hold(target);
            }
        }
    }

    /// Value at time `t` without consuming any events.
    pub fn value_at(&self, t: f64) -> f32 {
        let mut curve = self.curve;
        for event in self.pending.iter().take_while(|e| e.time() <= t) {
            curve = curve.then(event);
        }
        curve.eval(t).clamp(self.min, self.max)
    }

    /// Fill `out` with per-sample values starting at render time `start`.
    pub fn fill(&mut self, out: &mut [f32], start: f64, sample_rate: f32) {
        let dt = 1.0 / sample_rate as f64;

        if let (Curve::Hold(value), true) = (self.curve, self.pending.is_empty()) {
            out.fill(value.clamp(self.min, self.max));
            return;
        }

        for (i, sample) in out.iter_mut().enumerate() {
            let t = start + i as f64 * dt;
            self.advance(t);
            *sample = self.curve.eval(t).clamp(self.min, self.max);
        }
    }

    /// True when no automation is running or queued.
    pub fn is_settled(&self) -> bool {
        matches!(self.curve, Curve::Hold(_)) && self.pending.is_empty()
    }

    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }
}

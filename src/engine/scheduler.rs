//! Deferred actions on the control timeline.
//!
//! Teardown and crossfade steps need to happen "tens of milliseconds later".
//! Instead of timers or sleeping threads, they are queued here with a due
//! time and dispatched from [`ThereminEngine::tick`](super::ThereminEngine::tick).
//! The clock is injectable so tests can step time by hand.

use std::{
    cmp::{Ordering, Reverse},
    collections::BinaryHeap,
    sync::{
        atomic::{AtomicU64, Ordering as AtomicOrdering},
        Arc,
    },
    time::{Duration, Instant},
};

/// Source of control-timeline time.
pub trait Clock: Send {
    /// Time since the clock's origin.
    fn now(&self) -> Duration;
}

/// Wall-clock time since construction.
pub struct MonotonicClock {
    origin: Instant,
}

impl MonotonicClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for MonotonicClock {
    fn now(&self) -> Duration {
        self.origin.elapsed()
    }
}

/// Clock that only moves when told to. Clones share the same time.
#[derive(Clone, Default)]
pub struct ManualClock {
    micros: Arc<AtomicU64>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn advance(&self, by: Duration) {
        self.micros
            .fetch_add(by.as_micros() as u64, AtomicOrdering::AcqRel);
    }

    pub fn set(&self, to: Duration) {
        self.micros
            .store(to.as_micros() as u64, AtomicOrdering::Release);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Duration {
        Duration::from_micros(self.micros.load(AtomicOrdering::Acquire))
    }
}

struct Entry<T> {
    due: Duration,
    seq: u64,
    task: T,
}

impl<T> PartialEq for Entry<T> {
    fn eq(&self, other: &Self) -> bool {
        self.due == other.due && self.seq == other.seq
    }
}

impl<T> Eq for Entry<T> {}

impl<T> PartialOrd for Entry<T> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<T> Ord for Entry<T> {
    fn cmp(&self, other: &Self) -> Ordering {
        (self.due, self.seq).cmp(&(other.due, other.seq))
    }
}

/// Tasks ordered by due time; ties run in scheduling order.
pub struct Scheduler<T> {
    clock: Box<dyn Clock>,
    queue: BinaryHeap<Reverse<Entry<T>>>,
    next_seq: u64,
}

impl<T> Scheduler<T> {
    pub fn new(clock: Box<dyn Clock>) -> Self {
        Self {
            clock,
            queue: BinaryHeap::new(),
            next_seq: 0,
        }
    }

    pub fn now(&self) -> Duration {
        self.clock.now()
    }

    /// Run `task` once `delay` has elapsed.
    pub fn enqueue(&mut self, delay: Duration, task: T) {
        let entry = Entry {
            due: self.clock.now() + delay,
            seq: self.next_seq,
            task,
        };
        self.next_seq += 1;
        self.queue.push(Reverse(entry));
    }

    /// Remove and return every task that is due, earliest first.
    pub fn tick(&mut self) -> Vec<T> {
        let now = self.clock.now();
        let mut due = Vec::new();
        while self
            .queue
            .peek()
            .is_some_and(|Reverse(entry)| entry.due <= now)
        {
            if let Some(Reverse(entry)) = self.queue.pop() {
                due.push(entry.task);
            }
        }
        due
    }

    /// Time until the next task is due, if any.
    pub fn next_due_in(&self) -> Option<Duration> {
        let now = self.clock.now();
        self.queue
            .peek()
            .map(|Reverse(entry)| entry.due.saturating_sub(now))
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    /// Drop every pending task.
    pub fn clear(&mut self) {
        self.queue.clear();
    }
}

//! End-to-end scenario benchmarks.
//!
//! These drive the engine the way the app does and measure the render
//! thread's cost for a whole device buffer.

mod gesture;

pub use gesture::bench_gesture;

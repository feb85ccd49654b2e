//! Time subsystem.
//!
//! Provides stable, testable frame timing utilities without coupling to the runtime.
//! Intended usage:
//! - one `FrameClock` per window (or per render loop)
//! - call `tick()` once per presented frame to obtain `FrameTime`
//! - feed `FrameTime::dt` into an `FpsMeter` for periodic frame-rate logs

mod fps;
mod frame_clock;

pub use fps::FpsMeter;
pub use frame_clock::{FrameClock, FrameTime};

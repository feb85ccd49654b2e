//! Core engine-facing contracts.
//!
//! Defines the interface between the runtime (platform loop) and the
//! application driving the sprite buffer, plus the per-frame context.

mod app;
mod ctx;

pub use app::{App, AppControl};
pub use ctx::{FrameCtx, WindowCtx};

//! GPU device + surface management.
//!
//! Creates the wgpu Instance/Adapter/Device/Queue with enough vertex buffer
//! slots for columnar instance data, configures the window surface, and hands
//! out one encoder + view per frame.

mod context;
mod frame;
mod init;
mod surface;

pub use context::Gpu;
pub use frame::{GpuFrame, SurfaceErrorAction};
pub use init::GpuInit;

//! Coordinate types shared by the runtime and renderers.
//!
//! Canonical CPU space:
//! - Logical pixels (DPI-aware)
//! - Origin top-left
//! - +X right, +Y down
//!
//! Renderers convert to NDC in shaders using the frame uniform.

mod viewport;

pub use viewport::Viewport;

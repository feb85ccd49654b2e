//! GPU rendering subsystem.
//!
//! The sprite renderer draws every live row of a `ColumnarBuffer` in one
//! instanced call. Each renderer owns its GPU resources (pipelines, buffers).
//!
//! Convention:
//! - CPU geometry is in logical pixels (top-left origin, +Y down).
//! - Vertex shader converts to NDC using the frame uniform.

mod common;
mod ctx;

pub mod atlas;
pub mod instance;
pub mod sprite;

pub use atlas::Atlas;
pub use ctx::{RenderCtx, RenderTarget};
pub use instance::{InstanceBuffer, InstanceLayout};
pub use sprite::{sprite_schema, SpriteRenderer};

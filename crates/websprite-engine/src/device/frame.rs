/// One acquired swapchain image plus the encoder recording into it.
///
/// Hand it back to `Gpu::submit` within the same frame; holding it blocks the
/// next acquisition.
pub struct GpuFrame {
    pub surface_texture: wgpu::SurfaceTexture,
    pub view: wgpu::TextureView,
    pub encoder: wgpu::CommandEncoder,
}

/// What the caller should do after `Gpu::begin_frame` failed.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum SurfaceErrorAction {
    /// Surface reconfigured; the next frame may render.
    Reconfigured,
    /// Transient; drop this frame.
    SkipFrame,
    /// Unrecoverable (out of memory).
    Fatal,
}

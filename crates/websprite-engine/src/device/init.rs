use anyhow::{ensure, Result};

/// Initialization parameters for the GPU layer.
#[derive(Debug, Clone)]
pub struct GpuInit {
    /// Prefer an sRGB surface format when available.
    ///
    /// The sprite atlas is uploaded as sRGB, so an sRGB surface keeps colors exact.
    pub prefer_srgb: bool,

    /// Present mode (swap behavior).
    ///
    /// FIFO is broadly supported; use `Immediate`/`Mailbox` to measure raw throughput.
    pub present_mode: wgpu::PresentMode,

    /// Optional alpha mode preference for the surface.
    ///
    /// If provided but unsupported on the current surface, a supported mode is selected.
    pub alpha_mode: Option<wgpu::CompositeAlphaMode>,

    pub required_features: wgpu::Features,

    /// Base limits requested from the adapter/device.
    pub required_limits: wgpu::Limits,

    /// Vertex buffer slots the instanced draws need: one for the quad plus
    /// one per instance column. Raised above `required_limits` when the
    /// adapter allows it.
    pub vertex_buffers: u32,

    /// Desired maximum frame latency for the surface (hint).
    pub desired_maximum_frame_latency: u32,
}

impl GpuInit {
    /// Device limits to request from an adapter reporting `adapter` limits.
    ///
    /// Fails when the adapter cannot bind `vertex_buffers` slots.
    pub fn device_limits(&self, adapter: &wgpu::Limits) -> Result<wgpu::Limits> {
        ensure!(
            self.vertex_buffers <= adapter.max_vertex_buffers,
            "adapter supports {} vertex buffers, {} required",
            adapter.max_vertex_buffers,
            self.vertex_buffers
        );

        let mut limits = self.required_limits.clone();
        limits.max_vertex_buffers = limits.max_vertex_buffers.max(self.vertex_buffers);
        Ok(limits)
    }
}

impl Default for GpuInit {
    fn default() -> Self {
        Self {
            prefer_srgb: true,
            present_mode: wgpu::PresentMode::Fifo,
            alpha_mode: None,
            required_features: wgpu::Features::empty(),
            required_limits: wgpu::Limits::default(),
            // Quad + dest, dest_size, src, src_size.
            vertex_buffers: 5,
            desired_maximum_frame_latency: 2,
        }
    }
}

//! Shared GPU types used by the sprite renderer.

use bytemuck::{Pod, Zeroable};

// ── blend ─────────────────────────────────────────────────────────────────

/// Straight (non-premultiplied) alpha: `src * a + dst * (1 - a)`.
pub(super) fn alpha_blend() -> wgpu::BlendState {
    wgpu::BlendState {
        color: wgpu::BlendComponent {
            src_factor: wgpu::BlendFactor::SrcAlpha,
            dst_factor: wgpu::BlendFactor::OneMinusSrcAlpha,
            operation: wgpu::BlendOperation::Add,
        },
        alpha: wgpu::BlendComponent {
            src_factor: wgpu::BlendFactor::One,
            dst_factor: wgpu::BlendFactor::OneMinusSrcAlpha,
            operation: wgpu::BlendOperation::Add,
        },
    }
}

// ── quad vertex ───────────────────────────────────────────────────────────

#[repr(C)]
#[derive(Debug, Copy, Clone, Pod, Zeroable)]
pub(super) struct QuadVertex {
    pub corner: [f32; 2], // 0..1
}

impl QuadVertex {
    const ATTRS: [wgpu::VertexAttribute; 1] = wgpu::vertex_attr_array![0 => Float32x2];

    pub(super) fn layout() -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<QuadVertex>() as u64,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &Self::ATTRS,
        }
    }
}

pub(super) const QUAD_VERTICES: [QuadVertex; 4] = [
    QuadVertex { corner: [0.0, 0.0] },
    QuadVertex { corner: [1.0, 0.0] },
    QuadVertex { corner: [1.0, 1.0] },
    QuadVertex { corner: [0.0, 1.0] },
];

pub(super) const QUAD_INDICES: [u16; 6] = [0, 1, 2, 0, 2, 3];

// ── uniform ───────────────────────────────────────────────────────────────

/// Per-frame sprite uniform. Both members are vec4 for std140-compatible layout.
#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, Pod, Zeroable)]
pub(super) struct SpriteUniform {
    /// `[1 / width, 1 / height, 1 / depth, 0]` of the frame, in logical px.
    pub inv_frame: [f32; 4],
    /// `[1 / width, 1 / height, 0, 0]` of the atlas, in texels.
    pub inv_atlas: [f32; 4],
}

impl SpriteUniform {
    pub(super) fn new(frame: [f32; 2], depth: f32, inv_atlas: [f32; 2]) -> Self {
        Self {
            inv_frame: [
                1.0 / frame[0].max(1.0),
                1.0 / frame[1].max(1.0),
                1.0 / depth.max(1.0),
                0.0,
            ],
            inv_atlas: [inv_atlas[0], inv_atlas[1], 0.0, 0.0],
        }
    }
}

/// Minimum binding size of the sprite uniform buffer.
pub(super) fn uniform_min_binding_size() -> std::num::NonZeroU64 {
    std::num::NonZeroU64::new(std::mem::size_of::<SpriteUniform>() as u64)
        .expect("SpriteUniform has non-zero size by construction")
}

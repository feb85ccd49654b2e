use std::borrow::Cow;

use anyhow::{ensure, Context, Result};
use wgpu::util::DeviceExt;

use crate::render::{Atlas, RenderCtx, RenderTarget};
use crate::soa::{ColumnarBuffer, FieldDescriptor, FieldSpec, ScalarType, Schema, SoaError};

use super::common::{
    alpha_blend, uniform_min_binding_size, QuadVertex, SpriteUniform, QUAD_INDICES, QUAD_VERTICES,
};
use super::instance::{InstanceBuffer, InstanceLayout};

/// Shader matching [`sprite_schema`].
pub const SPRITE_SHADER: &str = include_str!("shaders/sprite.wgsl");

/// Default depth range for `dest.z`.
pub const DEFAULT_FRAME_DEPTH: f32 = 65536.0;

/// Schema consumed by [`SPRITE_SHADER`]:
///
/// | field       | shape  | meaning                            |
/// |-------------|--------|------------------------------------|
/// | `dest`      | f32 x3 | screen position (x, y) and depth z |
/// | `dest_size` | f32 x2 | on-screen size                     |
/// | `src`       | f32 x2 | atlas texel position               |
/// | `src_size`  | f32 x2 | atlas texel size                   |
pub fn sprite_schema() -> Result<Schema, SoaError> {
    let f32x = |n| FieldSpec::new(ScalarType::Float32).with_components(n);
    Schema::new([
        ("dest", f32x(3)),
        ("dest_size", f32x(2)),
        ("src", f32x(2)),
        ("src_size", f32x(2)),
    ])
}

/// Draws all live rows of a [`ColumnarBuffer`] as textured quads in a single
/// instanced draw call.
///
/// Slot 0 is a static unit quad; slots 1.. are the buffer's columns, bound at
/// their column offsets within one shared GPU buffer.
pub struct SpriteRenderer {
    shader_source: Cow<'static, str>,
    layout: InstanceLayout,
    frame_depth: f32,

    pipeline_format: Option<wgpu::TextureFormat>,
    pipeline: Option<wgpu::RenderPipeline>,

    bind_group_layout: Option<wgpu::BindGroupLayout>,
    bind_group: Option<wgpu::BindGroup>,
    bound_atlas: Option<u64>,
    uniform_ubo: Option<wgpu::Buffer>,

    quad_vbo: Option<wgpu::Buffer>,
    quad_ibo: Option<wgpu::Buffer>,

    instances: InstanceBuffer,
}

impl SpriteRenderer {
    /// Renderer for buffers laid out as `fields`, using [`SPRITE_SHADER`].
    pub fn new(fields: &[FieldDescriptor]) -> Result<Self> {
        Self::with_shader(fields, SPRITE_SHADER)
    }

    /// Renderer with a custom WGSL shader. The shader must read the quad
    /// corner at location 0 and field `i` at location `i + 1`, and expose
    /// `vs_main`/`fs_main` plus the frame uniform, atlas texture and sampler
    /// at bindings 0..=2 of group 0.
    pub fn with_shader(
        fields: &[FieldDescriptor],
        shader_source: impl Into<Cow<'static, str>>,
    ) -> Result<Self> {
        let layout = InstanceLayout::new(fields, 1, 1).context("invalid sprite instance layout")?;

        Ok(Self {
            shader_source: shader_source.into(),
            layout,
            frame_depth: DEFAULT_FRAME_DEPTH,
            pipeline_format: None,
            pipeline: None,
            bind_group_layout: None,
            bind_group: None,
            bound_atlas: None,
            uniform_ubo: None,
            quad_vbo: None,
            quad_ibo: None,
            instances: InstanceBuffer::new(),
        })
    }

    pub fn set_frame_depth(&mut self, depth: f32) {
        self.frame_depth = depth;
    }

    #[inline]
    pub fn layout(&self) -> &InstanceLayout {
        &self.layout
    }

    /// Uploads `buffer` and draws its `len()` live rows.
    ///
    /// The buffer must not be mutated between this call and submission of
    /// `target.encoder`.
    pub fn render(
        &mut self,
        ctx: &RenderCtx<'_>,
        target: &mut RenderTarget<'_>,
        atlas: &Atlas,
        buffer: &ColumnarBuffer,
    ) -> Result<()> {
        self.layout.check_fields(buffer.fields())?;

        let max_slots = ctx.device.limits().max_vertex_buffers as usize;
        ensure!(
            self.layout.len() < max_slots,
            "sprite layout needs {} vertex buffers, device allows {max_slots}",
            self.layout.len() + 1
        );

        self.ensure_pipeline(ctx);
        self.ensure_static_buffers(ctx);
        self.ensure_bindings(ctx, atlas);

        // Mutating methods must happen before borrowing pipeline/buffers immutably.
        self.write_uniform(ctx, atlas);
        buffer
            .upload(&mut self.instances.sink(ctx.device, ctx.queue))
            .context("instance upload failed")?;

        if buffer.is_empty() {
            return Ok(());
        }
        let instance_count = u32::try_from(buffer.len()).context("instance count exceeds u32")?;

        let Some(pipeline) = self.pipeline.as_ref() else { return Ok(()) };
        let Some(bind_group) = self.bind_group.as_ref() else { return Ok(()) };
        let Some(quad_vbo) = self.quad_vbo.as_ref() else { return Ok(()) };
        let Some(quad_ibo) = self.quad_ibo.as_ref() else { return Ok(()) };
        let Some(instance_vbo) = self.instances.buffer() else { return Ok(()) };

        let mut rpass = target.encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("websprite sprite pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: target.color_view,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Load,
                    store: wgpu::StoreOp::Store,
                },
                depth_slice: None,
            })],
            depth_stencil_attachment: None,
            timestamp_writes: None,
            occlusion_query_set: None,
            multiview_mask: None,
        });

        rpass.set_pipeline(pipeline);
        rpass.set_bind_group(0, bind_group, &[]);
        rpass.set_vertex_buffer(0, quad_vbo.slice(..));
        for (slot, range) in self.layout.bind_ranges(buffer.fields()) {
            rpass.set_vertex_buffer(slot, instance_vbo.slice(range));
        }
        rpass.set_index_buffer(quad_ibo.slice(..), wgpu::IndexFormat::Uint16);
        rpass.draw_indexed(0..QUAD_INDICES.len() as u32, 0, 0..instance_count);

        Ok(())
    }

    fn ensure_pipeline(&mut self, ctx: &RenderCtx<'_>) {
        if self.pipeline_format == Some(ctx.surface_format) && self.pipeline.is_some() {
            return;
        }

        let shader = ctx.device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("websprite sprite shader"),
            source: wgpu::ShaderSource::Wgsl(self.shader_source.clone()),
        });

        let bind_group_layout =
            ctx.device
                .create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                    label: Some("websprite sprite bgl"),
                    entries: &[
                        wgpu::BindGroupLayoutEntry {
                            binding: 0,
                            visibility: wgpu::ShaderStages::VERTEX,
                            ty: wgpu::BindingType::Buffer {
                                ty: wgpu::BufferBindingType::Uniform,
                                has_dynamic_offset: false,
                                min_binding_size: Some(uniform_min_binding_size()),
                            },
                            count: None,
                        },
                        wgpu::BindGroupLayoutEntry {
                            binding: 1,
                            visibility: wgpu::ShaderStages::FRAGMENT,
                            ty: wgpu::BindingType::Texture {
                                sample_type: wgpu::TextureSampleType::Float { filterable: true },
                                view_dimension: wgpu::TextureViewDimension::D2,
                                multisampled: false,
                            },
                            count: None,
                        },
                        wgpu::BindGroupLayoutEntry {
                            binding: 2,
                            visibility: wgpu::ShaderStages::FRAGMENT,
                            ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                            count: None,
                        },
                    ],
                });

        let pipeline_layout =
            ctx.device
                .create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
                    label: Some("websprite sprite pipeline layout"),
                    bind_group_layouts: &[&bind_group_layout],
                    immediate_size: 0,
                });

        let mut buffers = vec![QuadVertex::layout()];
        buffers.extend(self.layout.vertex_buffer_layouts());

        let pipeline = ctx.device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("websprite sprite pipeline"),
            layout: Some(&pipeline_layout),

            vertex: wgpu::VertexState {
                module: &shader,
                entry_point: Some("vs_main"),
                compilation_options: Default::default(),
                buffers: &buffers,
            },

            fragment: Some(wgpu::FragmentState {
                module: &shader,
                entry_point: Some("fs_main"),
                compilation_options: Default::default(),
                targets: &[Some(wgpu::ColorTargetState {
                    format: ctx.surface_format,
                    blend: Some(alpha_blend()),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
            }),

            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                strip_index_format: None,
                front_face: wgpu::FrontFace::Ccw,
                cull_mode: None,
                polygon_mode: wgpu::PolygonMode::Fill,
                unclipped_depth: false,
                conservative: false,
            },

            depth_stencil: None,
            multisample: wgpu::MultisampleState::default(),
            multiview_mask: None,
            cache: None,
        });

        log::debug!(
            "sprite pipeline built for {:?} with {} instance slots",
            ctx.surface_format,
            self.layout.len()
        );

        self.pipeline_format = Some(ctx.surface_format);
        self.pipeline = Some(pipeline);
        self.bind_group_layout = Some(bind_group_layout);

        self.bind_group = None;
        self.bound_atlas = None;
        self.uniform_ubo = None;
    }

    fn ensure_bindings(&mut self, ctx: &RenderCtx<'_>, atlas: &Atlas) {
        if self.bind_group.is_some()
            && self.uniform_ubo.is_some()
            && self.bound_atlas == Some(atlas.id())
        {
            return;
        }
        let Some(bgl) = self.bind_group_layout.as_ref() else { return };

        let uniform_ubo = ctx.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("websprite sprite ubo"),
            size: std::mem::size_of::<SpriteUniform>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let bind_group = ctx.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("websprite sprite bind group"),
            layout: bgl,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: uniform_ubo.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::TextureView(atlas.view()),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: wgpu::BindingResource::Sampler(atlas.sampler()),
                },
            ],
        });

        self.uniform_ubo = Some(uniform_ubo);
        self.bind_group = Some(bind_group);
        self.bound_atlas = Some(atlas.id());
    }

    fn ensure_static_buffers(&mut self, ctx: &RenderCtx<'_>) {
        if self.quad_vbo.is_some() && self.quad_ibo.is_some() {
            return;
        }

        self.quad_vbo = Some(ctx.device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("websprite quad vbo"),
            contents: bytemuck::cast_slice(&QUAD_VERTICES),
            usage: wgpu::BufferUsages::VERTEX,
        }));

        self.quad_ibo = Some(ctx.device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("websprite quad ibo"),
            contents: bytemuck::cast_slice(&QUAD_INDICES),
            usage: wgpu::BufferUsages::INDEX,
        }));
    }

    fn write_uniform(&mut self, ctx: &RenderCtx<'_>, atlas: &Atlas) {
        let Some(ubo) = self.uniform_ubo.as_ref() else { return };
        let u = SpriteUniform::new(
            ctx.viewport.size(),
            self.frame_depth,
            atlas.inverse_size(),
        );
        ctx.queue.write_buffer(ubo, 0, bytemuck::bytes_of(&u));
    }
}

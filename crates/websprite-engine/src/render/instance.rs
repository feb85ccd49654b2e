//! Binding of columnar instance data to GPU vertex attributes.
//!
//! Each schema field becomes its own vertex-buffer slot that steps once per
//! instance. All slots read the same GPU buffer; slot `i` is bound to the byte
//! range `fields[i].offset..fields[i].offset + fields[i].span` and advances by
//! `fields[i].row_stride()` per instance. Any divergence between these values
//! and the CPU layout silently corrupts rendering, so both are derived from the
//! same `FieldDescriptor`s.

use std::ops::Range;

use anyhow::{bail, ensure, Result};

use crate::soa::{FieldDescriptor, ScalarType, UploadSink};

/// WebGPU requires vertex strides and offsets to be 4-byte multiples.
const VERTEX_STRIDE_ALIGNMENT: u64 = 4;

/// Maps a column shape to the vertex format the shader reads.
///
/// Integer columns bind as integer attributes unless `normalized`, in which
/// case they read as unit-range floats. `normalized` has no effect on float
/// columns. Returns `None` for shapes wgpu has no format for (3-component
/// 8/16-bit, normalized 32-bit integers).
pub fn vertex_format(
    scalar_type: ScalarType,
    components: u32,
    normalized: bool,
) -> Option<wgpu::VertexFormat> {
    use wgpu::VertexFormat as F;

    let format = match (scalar_type, normalized, components) {
        (ScalarType::Float32, _, 1) => F::Float32,
        (ScalarType::Float32, _, 2) => F::Float32x2,
        (ScalarType::Float32, _, 3) => F::Float32x3,
        (ScalarType::Float32, _, 4) => F::Float32x4,

        (ScalarType::UInt32, false, 1) => F::Uint32,
        (ScalarType::UInt32, false, 2) => F::Uint32x2,
        (ScalarType::UInt32, false, 3) => F::Uint32x3,
        (ScalarType::UInt32, false, 4) => F::Uint32x4,

        (ScalarType::Int32, false, 1) => F::Sint32,
        (ScalarType::Int32, false, 2) => F::Sint32x2,
        (ScalarType::Int32, false, 3) => F::Sint32x3,
        (ScalarType::Int32, false, 4) => F::Sint32x4,

        (ScalarType::UInt16, false, 1) => F::Uint16,
        (ScalarType::UInt16, false, 2) => F::Uint16x2,
        (ScalarType::UInt16, false, 4) => F::Uint16x4,
        (ScalarType::UInt16, true, 1) => F::Unorm16,
        (ScalarType::UInt16, true, 2) => F::Unorm16x2,
        (ScalarType::UInt16, true, 4) => F::Unorm16x4,

        (ScalarType::Int16, false, 1) => F::Sint16,
        (ScalarType::Int16, false, 2) => F::Sint16x2,
        (ScalarType::Int16, false, 4) => F::Sint16x4,
        (ScalarType::Int16, true, 1) => F::Snorm16,
        (ScalarType::Int16, true, 2) => F::Snorm16x2,
        (ScalarType::Int16, true, 4) => F::Snorm16x4,

        (ScalarType::UInt8, false, 1) => F::Uint8,
        (ScalarType::UInt8, false, 2) => F::Uint8x2,
        (ScalarType::UInt8, false, 4) => F::Uint8x4,
        (ScalarType::UInt8, true, 1) => F::Unorm8,
        (ScalarType::UInt8, true, 2) => F::Unorm8x2,
        (ScalarType::UInt8, true, 4) => F::Unorm8x4,

        (ScalarType::Int8, false, 1) => F::Sint8,
        (ScalarType::Int8, false, 2) => F::Sint8x2,
        (ScalarType::Int8, false, 4) => F::Sint8x4,
        (ScalarType::Int8, true, 1) => F::Snorm8,
        (ScalarType::Int8, true, 2) => F::Snorm8x2,
        (ScalarType::Int8, true, 4) => F::Snorm8x4,

        _ => return None,
    };
    Some(format)
}

/// Per-field vertex attribute setup derived from a buffer's field layout.
///
/// Strides, formats and shader locations depend only on the schema, so the
/// pipeline built from this layout stays valid across `grow`. Base offsets
/// change with capacity and are taken from the live descriptors at bind time
/// (see [`InstanceLayout::bind_ranges`]).
#[derive(Debug, Clone, PartialEq)]
pub struct InstanceLayout {
    first_slot: u32,
    names: Vec<String>,
    attributes: Vec<wgpu::VertexAttribute>,
    strides: Vec<u64>,
}

impl InstanceLayout {
    /// Builds one slot per field. Field `i` is read at
    /// `@location(first_location + i)` from vertex-buffer slot `first_slot + i`.
    pub fn new(fields: &[FieldDescriptor], first_slot: u32, first_location: u32) -> Result<Self> {
        let mut names = Vec::with_capacity(fields.len());
        let mut attributes = Vec::with_capacity(fields.len());
        let mut strides = Vec::with_capacity(fields.len());

        for (i, field) in fields.iter().enumerate() {
            let Some(format) = vertex_format(field.scalar_type, field.components, field.normalized)
            else {
                bail!(
                    "field `{}`: no vertex format for {} x {:?} (normalized: {})",
                    field.name,
                    field.components,
                    field.scalar_type,
                    field.normalized
                );
            };

            let stride = field.row_stride() as u64;
            ensure!(
                stride % VERTEX_STRIDE_ALIGNMENT == 0,
                "field `{}`: row stride {stride} is not a multiple of {VERTEX_STRIDE_ALIGNMENT} bytes",
                field.name
            );

            names.push(field.name.clone());
            attributes.push(wgpu::VertexAttribute {
                format,
                offset: 0,
                shader_location: first_location + i as u32,
            });
            strides.push(stride);
        }

        Ok(Self {
            first_slot,
            names,
            attributes,
            strides,
        })
    }

    /// Number of vertex-buffer slots used.
    #[inline]
    pub fn len(&self) -> usize {
        self.attributes.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.attributes.is_empty()
    }

    #[inline]
    pub fn attributes(&self) -> &[wgpu::VertexAttribute] {
        &self.attributes
    }

    #[inline]
    pub fn strides(&self) -> &[u64] {
        &self.strides
    }

    /// Vertex-buffer layouts, in slot order, for pipeline creation.
    pub fn vertex_buffer_layouts(&self) -> Vec<wgpu::VertexBufferLayout<'_>> {
        self.attributes
            .iter()
            .zip(&self.strides)
            .map(|(attr, &stride)| wgpu::VertexBufferLayout {
                array_stride: stride,
                step_mode: wgpu::VertexStepMode::Instance,
                attributes: std::slice::from_ref(attr),
            })
            .collect()
    }

    /// Checks that `fields` has the schema this layout was built for.
    pub fn check_fields(&self, fields: &[FieldDescriptor]) -> Result<()> {
        ensure!(
            fields.len() == self.len(),
            "instance layout has {} fields, buffer has {}",
            self.len(),
            fields.len()
        );
        for ((field, name), (attr, &stride)) in fields
            .iter()
            .zip(&self.names)
            .zip(self.attributes.iter().zip(&self.strides))
        {
            let format = vertex_format(field.scalar_type, field.components, field.normalized);
            ensure!(
                &field.name == name && format == Some(attr.format) && field.row_stride() as u64 == stride,
                "buffer field `{}` does not match instance layout field `{name}`",
                field.name
            );
        }
        Ok(())
    }

    /// `(slot, byte range)` to bind for each field of the current allocation.
    pub fn bind_ranges<'a>(
        &'a self,
        fields: &'a [FieldDescriptor],
    ) -> impl Iterator<Item = (u32, Range<u64>)> + 'a {
        fields.iter().enumerate().map(move |(i, f)| {
            let start = f.offset as u64;
            (self.first_slot + i as u32, start..start + f.span as u64)
        })
    }
}

/// GPU vertex buffer mirroring a `ColumnarBuffer`.
///
/// The buffer is recreated whenever the uploaded byte length changes (i.e.
/// after the CPU side grew) and rewritten in full on every upload.
#[derive(Default)]
pub struct InstanceBuffer {
    vbo: Option<wgpu::Buffer>,
    size: u64,
}

impl InstanceBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn buffer(&self) -> Option<&wgpu::Buffer> {
        self.vbo.as_ref()
    }

    /// Size of the current GPU allocation in bytes.
    #[inline]
    pub fn size(&self) -> u64 {
        self.size
    }

    /// Upload sink writing through `queue` into this buffer.
    pub fn sink<'a>(&'a mut self, device: &'a wgpu::Device, queue: &'a wgpu::Queue) -> GpuUpload<'a> {
        GpuUpload {
            device,
            queue,
            target: self,
        }
    }

    fn ensure_size(&mut self, device: &wgpu::Device, size: u64) {
        if self.vbo.is_some() && self.size == size {
            return;
        }

        log::debug!("instance vbo: reallocating {} -> {size} bytes", self.size);

        self.vbo = Some(device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("websprite instance vbo"),
            size,
            usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        }));
        self.size = size;
    }
}

/// [`UploadSink`] backed by `wgpu::Queue::write_buffer`.
pub struct GpuUpload<'a> {
    device: &'a wgpu::Device,
    queue: &'a wgpu::Queue,
    target: &'a mut InstanceBuffer,
}

impl UploadSink for GpuUpload<'_> {
    fn upload(&mut self, bytes: &[u8]) -> Result<()> {
        ensure!(!bytes.is_empty(), "refusing to upload an empty instance region");
        ensure!(
            bytes.len() as u64 % wgpu::COPY_BUFFER_ALIGNMENT == 0,
            "instance region of {} bytes is not copy-aligned",
            bytes.len()
        );

        self.target.ensure_size(self.device, bytes.len() as u64);
        if let Some(vbo) = self.target.vbo.as_ref() {
            self.queue.write_buffer(vbo, 0, bytes);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::soa::{layout, FieldSpec, Schema};

    fn fields(schema: &Schema, capacity: usize) -> Vec<FieldDescriptor> {
        layout(schema, capacity).unwrap()
    }

    // ── vertex_format ─────────────────────────────────────────────────────

    #[test]
    fn float_formats_ignore_normalization() {
        assert_eq!(vertex_format(ScalarType::Float32, 2, false), Some(wgpu::VertexFormat::Float32x2));
        assert_eq!(vertex_format(ScalarType::Float32, 2, true), Some(wgpu::VertexFormat::Float32x2));
    }

    #[test]
    fn integer_formats_follow_normalization() {
        assert_eq!(vertex_format(ScalarType::UInt8, 4, false), Some(wgpu::VertexFormat::Uint8x4));
        assert_eq!(vertex_format(ScalarType::UInt8, 4, true), Some(wgpu::VertexFormat::Unorm8x4));
        assert_eq!(vertex_format(ScalarType::Int16, 2, true), Some(wgpu::VertexFormat::Snorm16x2));
        assert_eq!(vertex_format(ScalarType::Int32, 3, false), Some(wgpu::VertexFormat::Sint32x3));
    }

    #[test]
    fn unsupported_shapes_have_no_format() {
        assert_eq!(vertex_format(ScalarType::UInt8, 3, false), None);
        assert_eq!(vertex_format(ScalarType::Int16, 3, true), None);
        assert_eq!(vertex_format(ScalarType::UInt32, 1, true), None);
    }

    // ── InstanceLayout ────────────────────────────────────────────────────

    #[test]
    fn layout_matches_column_layout() {
        let schema = Schema::new([
            ("dest", FieldSpec::new(ScalarType::Float32).with_components(3)),
            ("tint", FieldSpec::new(ScalarType::UInt8).with_components(4).normalized()),
            ("frame", FieldSpec::new(ScalarType::UInt32)),
        ])
        .unwrap();
        let fields = fields(&schema, 64);

        let inst = InstanceLayout::new(&fields, 1, 1).unwrap();
        assert_eq!(inst.strides(), &[12, 4, 4]);
        let locations: Vec<_> = inst.attributes().iter().map(|a| a.shader_location).collect();
        assert_eq!(locations, vec![1, 2, 3]);
        assert!(inst.attributes().iter().all(|a| a.offset == 0));

        let layouts = inst.vertex_buffer_layouts();
        assert_eq!(layouts.len(), 3);
        assert!(layouts.iter().all(|l| l.step_mode == wgpu::VertexStepMode::Instance));

        let ranges: Vec<_> = inst.bind_ranges(&fields).collect();
        assert_eq!(ranges, vec![(1, 0..768), (2, 768..1024), (3, 1024..1280)]);
    }

    #[test]
    fn bind_ranges_follow_growth() {
        let schema = Schema::new([
            ("a", FieldSpec::new(ScalarType::Float32).with_components(2)),
            ("b", FieldSpec::new(ScalarType::Float32)),
        ])
        .unwrap();
        let small = fields(&schema, 64);
        let large = fields(&schema, 256);
        let inst = InstanceLayout::new(&small, 0, 0).unwrap();

        inst.check_fields(&large).unwrap();
        let ranges: Vec<_> = inst.bind_ranges(&large).collect();
        assert_eq!(ranges, vec![(0, 0..2048), (1, 2048..3072)]);
    }

    #[test]
    fn unaligned_stride_rejected() {
        let schema = Schema::new([("id", ScalarType::UInt8)]).unwrap();
        assert!(InstanceLayout::new(&fields(&schema, 64), 0, 0).is_err());
    }

    #[test]
    fn check_fields_rejects_other_schema() {
        let a = Schema::new([("x", ScalarType::Float32)]).unwrap();
        let b = Schema::new([("x", ScalarType::UInt32)]).unwrap();
        let inst = InstanceLayout::new(&fields(&a, 64), 0, 0).unwrap();
        assert!(inst.check_fields(&fields(&b, 64)).is_err());
    }
}

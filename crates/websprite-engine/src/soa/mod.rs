//! Columnar (struct-of-arrays) instance storage.
//!
//! A [`ColumnarBuffer`] owns one contiguous byte region split into one column
//! per schema field. Column `i` starts at `fields()[i].offset` and advances by
//! `fields()[i].row_stride()` bytes per row. That byte layout is exactly what
//! the GPU reads through per-field instanced vertex attributes, so the region
//! returned by [`ColumnarBuffer::as_bytes`] is uploaded verbatim.
//!
//! Capacity is always a multiple of [`ALIGNMENT`] rows. Growing by a power of
//! two scales every column offset and span by the same factor, which keeps
//! growth a straight per-column copy.

mod buffer;
mod error;
mod layout;
mod scalar;
mod upload;
mod value;

pub use buffer::{ColumnarBuffer, WriteMode};
pub use error::SoaError;
pub use layout::{
    align_capacity, layout, total_bytes, FieldDescriptor, FieldSpec, Schema, ALIGNMENT,
    MAX_COMPONENTS,
};
pub use scalar::{Element, Scalar, ScalarType};
pub use upload::UploadSink;
pub use value::{Row, Value};

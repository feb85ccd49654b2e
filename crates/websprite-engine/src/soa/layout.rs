use std::ops::Range;

use indexmap::IndexMap;

use super::error::SoaError;
use super::scalar::ScalarType;

/// Row alignment of every capacity. Column offsets are therefore multiples of
/// 64 bytes, which satisfies GPU vertex-buffer offset alignment.
pub const ALIGNMENT: usize = 64;

/// Largest component count a field may declare (vec4).
pub const MAX_COMPONENTS: u32 = 4;

/// Shape of one schema entry.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct FieldSpec {
    pub scalar_type: ScalarType,
    pub components: u32,
    pub normalized: bool,
}

impl FieldSpec {
    #[inline]
    pub const fn new(scalar_type: ScalarType) -> Self {
        Self {
            scalar_type,
            components: 1,
            normalized: false,
        }
    }

    #[inline]
    pub const fn with_components(mut self, components: u32) -> Self {
        self.components = components;
        self
    }

    /// Integer components are read by the shader as `[0, 1]` / `[-1, 1]` floats.
    #[inline]
    pub const fn normalized(mut self) -> Self {
        self.normalized = true;
        self
    }

    /// Bytes one row occupies in this field's column.
    #[inline]
    pub const fn row_stride(&self) -> usize {
        self.scalar_type.byte_size() * self.components as usize
    }
}

impl From<ScalarType> for FieldSpec {
    #[inline]
    fn from(scalar_type: ScalarType) -> Self {
        FieldSpec::new(scalar_type)
    }
}

/// Validated, ordered set of fields. Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Schema {
    fields: IndexMap<String, FieldSpec>,
}

impl Schema {
    /// Builds a schema from ordered `(name, spec)` pairs.
    ///
    /// Fails with `DuplicateField` on a repeated name, `InvalidComponentCount`
    /// outside `1..=4` and `EmptySchema` when no field is given.
    pub fn new<I, N, S>(fields: I) -> Result<Self, SoaError>
    where
        I: IntoIterator<Item = (N, S)>,
        N: Into<String>,
        S: Into<FieldSpec>,
    {
        let mut map: IndexMap<String, FieldSpec> = IndexMap::new();
        for (name, spec) in fields {
            let name = name.into();
            let spec = spec.into();
            if spec.components == 0 || spec.components > MAX_COMPONENTS {
                return Err(SoaError::InvalidComponentCount {
                    name,
                    components: spec.components,
                });
            }
            if map.contains_key(&name) {
                return Err(SoaError::DuplicateField { name });
            }
            map.insert(name, spec);
        }

        if map.is_empty() {
            return Err(SoaError::EmptySchema);
        }

        Ok(Self { fields: map })
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Position of `name` in declaration order.
    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.fields.get_index_of(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &FieldSpec)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Sum of every field's row stride (bytes per row across all columns).
    pub fn row_bytes(&self) -> usize {
        self.fields.values().map(FieldSpec::row_stride).sum()
    }
}

/// Placement of one column inside the raw byte region.
///
/// `span == scalar_type.byte_size() * components * capacity` always holds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldDescriptor {
    pub name: String,
    pub scalar_type: ScalarType,
    pub components: u32,
    pub normalized: bool,
    /// Column start, in bytes from the start of the region.
    pub offset: usize,
    /// Column length in bytes.
    pub span: usize,
}

impl FieldDescriptor {
    /// Bytes between consecutive rows of this column.
    #[inline]
    pub fn row_stride(&self) -> usize {
        self.scalar_type.byte_size() * self.components as usize
    }

    #[inline]
    pub fn byte_range(&self) -> Range<usize> {
        self.offset..self.offset + self.span
    }

    /// Bytes of row `index` in this column. Caller checks `index < capacity`.
    #[inline]
    pub fn row_range(&self, index: usize) -> Range<usize> {
        let start = self.offset + index * self.row_stride();
        start..start + self.row_stride()
    }

    /// Same column after multiplying capacity by `scale`.
    pub(crate) fn scaled(&self, scale: usize) -> Option<Self> {
        Some(Self {
            name: self.name.clone(),
            scalar_type: self.scalar_type,
            components: self.components,
            normalized: self.normalized,
            offset: self.offset.checked_mul(scale)?,
            span: self.span.checked_mul(scale)?,
        })
    }
}

/// Rounds `requested` up to the next multiple of [`ALIGNMENT`]; zero becomes
/// `ALIGNMENT`.
pub fn align_capacity(requested: usize) -> Result<usize, SoaError> {
    if requested == 0 {
        return Ok(ALIGNMENT);
    }
    requested
        .checked_next_multiple_of(ALIGNMENT)
        .ok_or(SoaError::CapacityOverflow { rows: requested })
}

/// Computes column offsets and spans for `capacity` rows.
///
/// Columns are packed in schema order with no padding:
/// `offset[0] = 0`, `offset[i] = offset[i - 1] + span[i - 1]`.
pub fn layout(schema: &Schema, capacity: usize) -> Result<Vec<FieldDescriptor>, SoaError> {
    let overflow = SoaError::CapacityOverflow { rows: capacity };

    let mut fields = Vec::with_capacity(schema.len());
    let mut offset = 0usize;
    for (name, spec) in schema.iter() {
        let span = spec
            .row_stride()
            .checked_mul(capacity)
            .ok_or_else(|| overflow.clone())?;

        fields.push(FieldDescriptor {
            name: name.to_string(),
            scalar_type: spec.scalar_type,
            components: spec.components,
            normalized: spec.normalized,
            offset,
            span,
        });

        offset = offset.checked_add(span).ok_or_else(|| overflow.clone())?;
    }

    Ok(fields)
}

/// Total region size covered by `fields`.
pub fn total_bytes(fields: &[FieldDescriptor]) -> usize {
    fields.last().map_or(0, |f| f.offset + f.span)
}

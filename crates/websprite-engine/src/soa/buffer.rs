use super::error::SoaError;
use super::layout::{align_capacity, layout, total_bytes, FieldDescriptor, Schema};
use super::scalar::{Element, Scalar};
use super::upload::UploadSink;
use super::value::{Row, Value};

/// Backing storage unit. Every column starts at a multiple of 64 bytes, so a
/// word-aligned region can be viewed as any element slice without copies.
type Word = u32;
const WORD_BYTES: usize = std::mem::size_of::<Word>();

/// How `write_row` treats fields missing from the row.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum WriteMode {
    /// Every declared field must be present.
    Full,
    /// Absent fields keep their previous values.
    Patch,
}

/// Struct-of-arrays instance buffer.
///
/// Owns one contiguous region holding one column per schema field.
/// `len()` rows are live; `capacity()` rows are allocated and addressable.
///
/// Frame protocol: all mutation for a frame must finish before the bytes are
/// handed to the GPU ([`ColumnarBuffer::upload`]), and nothing may mutate the
/// buffer between that upload and the draw that consumes it.
#[derive(Debug, Clone)]
pub struct ColumnarBuffer {
    schema: Schema,
    fields: Vec<FieldDescriptor>,
    words: Vec<Word>,
    capacity: usize,
    len: usize,
    generation: u64,
}

impl ColumnarBuffer {
    /// Creates an empty buffer. `initial_capacity` is rounded up to a multiple
    /// of [`super::ALIGNMENT`]; zero yields one alignment unit.
    pub fn new(schema: Schema, initial_capacity: usize) -> Result<Self, SoaError> {
        let capacity = align_capacity(initial_capacity)?;
        let fields = layout(&schema, capacity)?;
        let words = alloc_words(total_bytes(&fields))?;

        Ok(Self {
            schema,
            fields,
            words,
            capacity,
            len: 0,
            generation: 0,
        })
    }

    // ── accessors ─────────────────────────────────────────────────────────

    #[inline]
    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    /// Column placements in schema order.
    #[inline]
    pub fn fields(&self) -> &[FieldDescriptor] {
        &self.fields
    }

    pub fn field(&self, name: &str) -> Option<&FieldDescriptor> {
        self.schema.index_of(name).map(|i| &self.fields[i])
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of live rows.
    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// `true` when the next `push_row` will grow the buffer.
    #[inline]
    pub fn is_full(&self) -> bool {
        self.len == self.capacity
    }

    /// Incremented by every successful `grow`. GPU-side copies sized from an
    /// older generation are stale.
    #[inline]
    pub fn generation(&self) -> u64 {
        self.generation
    }

    #[inline]
    pub fn byte_len(&self) -> usize {
        self.words.len() * WORD_BYTES
    }

    /// Raw region in upload layout. No copy or byte-order conversion.
    #[inline]
    pub fn as_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.words)
    }

    /// Hands the raw region to `sink`.
    ///
    /// Call once per frame after all mutation and before the draw.
    pub fn upload<S: UploadSink + ?Sized>(&self, sink: &mut S) -> anyhow::Result<()> {
        sink.upload(self.as_bytes())
    }

    // ── row access ────────────────────────────────────────────────────────

    /// Reads every field at `index`. Any index below capacity is readable,
    /// live or not.
    pub fn get_row(&self, index: usize) -> Result<Row, SoaError> {
        self.check_index(index)?;
        let mut row = Row::with_capacity(self.fields.len());
        for field in &self.fields {
            row.insert(field.name.clone(), self.read_value(field, index));
        }
        Ok(row)
    }

    /// Writes all declared fields at `index`. Fails with `MissingField` before
    /// touching memory if any is absent.
    pub fn set_row(&mut self, index: usize, row: &Row) -> Result<(), SoaError> {
        self.write_row(index, row, WriteMode::Full)
    }

    /// Writes only the fields present in `row`.
    pub fn patch_row(&mut self, index: usize, row: &Row) -> Result<(), SoaError> {
        self.write_row(index, row, WriteMode::Patch)
    }

    /// Writes `row` at `index`. The row is validated in full before any
    /// column is modified. Fields not in the schema are ignored.
    pub fn write_row(&mut self, index: usize, row: &Row, mode: WriteMode) -> Result<(), SoaError> {
        self.check_index(index)?;
        let writes = self.validate(row, mode)?;
        self.apply(index, &writes);
        Ok(())
    }

    /// Appends a full row, doubling capacity once if the buffer is full.
    /// Returns the index written.
    pub fn push_row(&mut self, row: &Row) -> Result<usize, SoaError> {
        let writes = self.validate(row, WriteMode::Full)?;

        if self.is_full() {
            let doubled = self
                .capacity
                .checked_mul(2)
                .ok_or(SoaError::CapacityOverflow { rows: self.capacity })?;
            self.grow(doubled)?;
        }

        let index = self.len;
        self.apply(index, &writes);
        self.len += 1;
        Ok(index)
    }

    /// Removes the last live row and returns its values. The bytes stay in
    /// place until overwritten.
    pub fn pop_row(&mut self) -> Result<Row, SoaError> {
        if self.len == 0 {
            return Err(SoaError::Empty);
        }
        self.len -= 1;
        self.get_row(self.len)
    }

    /// Drops all live rows without touching memory.
    pub fn clear(&mut self) {
        self.len = 0;
    }

    // ── field access ──────────────────────────────────────────────────────

    pub fn get_field(&self, name: &str, index: usize) -> Result<Value, SoaError> {
        let field = self.lookup(name)?;
        self.check_index(index)?;
        Ok(self.read_value(field, index))
    }

    pub fn set_field(
        &mut self,
        name: &str,
        index: usize,
        value: impl Into<Value>,
    ) -> Result<(), SoaError> {
        let value = value.into();
        let fi = self
            .schema
            .index_of(name)
            .ok_or_else(|| SoaError::UnknownField { name: name.to_string() })?;
        self.check_index(index)?;
        check_components(&self.fields[fi], &value)?;
        self.apply(index, &[(fi, &value)]);
        Ok(())
    }

    /// Whole column as a typed slice of `capacity * components` elements.
    pub fn column<T: Element>(&self, name: &str) -> Result<&[T], SoaError> {
        let field = self.lookup(name)?;
        check_type::<T>(field)?;
        Ok(bytemuck::cast_slice(&self.as_bytes()[field.byte_range()]))
    }

    pub fn column_mut<T: Element>(&mut self, name: &str) -> Result<&mut [T], SoaError> {
        let fi = self
            .schema
            .index_of(name)
            .ok_or_else(|| SoaError::UnknownField { name: name.to_string() })?;
        let field = &self.fields[fi];
        check_type::<T>(field)?;
        let bytes: &mut [u8] = bytemuck::cast_slice_mut(&mut self.words);
        Ok(bytemuck::cast_slice_mut(&mut bytes[field.byte_range()]))
    }

    // ── capacity ──────────────────────────────────────────────────────────

    /// Ensures capacity for at least `min_capacity` rows with a single
    /// reallocation, doubling from the current capacity.
    pub fn reserve(&mut self, min_capacity: usize) -> Result<(), SoaError> {
        let mut target = if self.capacity == 0 {
            super::ALIGNMENT
        } else {
            self.capacity
        };

        while target < min_capacity {
            target = target
                .checked_mul(2)
                .ok_or(SoaError::CapacityOverflow { rows: min_capacity })?;
        }

        if target == self.capacity {
            return Ok(());
        }
        self.grow(target)
    }

    /// Reallocates to `new_capacity`, which must be the current capacity times
    /// a power of two >= 2. Every column is copied into the prefix of its new,
    /// larger column. On error the buffer is unchanged.
    pub fn grow(&mut self, new_capacity: usize) -> Result<(), SoaError> {
        let current = self.capacity;
        let invalid = SoaError::InvalidCapacity {
            current,
            requested: new_capacity,
        };

        if new_capacity <= current || new_capacity % current != 0 {
            return Err(invalid);
        }
        let scale = new_capacity / current;
        if !scale.is_power_of_two() {
            return Err(invalid);
        }

        let fields = self
            .fields
            .iter()
            .map(|f| f.scaled(scale))
            .collect::<Option<Vec<_>>>()
            .ok_or(SoaError::CapacityOverflow { rows: new_capacity })?;

        let total = total_bytes(&fields);
        debug_assert_eq!(Some(total), self.byte_len().checked_mul(scale));

        let mut words = alloc_words(total)?;
        {
            let dst: &mut [u8] = bytemuck::cast_slice_mut(&mut words);
            let src = self.as_bytes();
            for (old, new) in self.fields.iter().zip(&fields) {
                dst[new.offset..new.offset + old.span].copy_from_slice(&src[old.byte_range()]);
            }
        }

        log::debug!(
            "columnar buffer grow: {current} -> {new_capacity} rows ({} -> {total} bytes)",
            self.byte_len()
        );

        self.words = words;
        self.fields = fields;
        self.capacity = new_capacity;
        self.generation += 1;
        Ok(())
    }

    // ── internals ─────────────────────────────────────────────────────────

    fn check_index(&self, index: usize) -> Result<(), SoaError> {
        if index >= self.capacity {
            return Err(SoaError::IndexOutOfRange {
                index,
                capacity: self.capacity,
            });
        }
        Ok(())
    }

    fn lookup(&self, name: &str) -> Result<&FieldDescriptor, SoaError> {
        self.field(name)
            .ok_or_else(|| SoaError::UnknownField { name: name.to_string() })
    }

    /// Resolves `row` into `(field index, value)` pairs without writing.
    fn validate<'r>(
        &self,
        row: &'r Row,
        mode: WriteMode,
    ) -> Result<Vec<(usize, &'r Value)>, SoaError> {
        let mut writes = Vec::with_capacity(self.fields.len());
        for (fi, field) in self.fields.iter().enumerate() {
            match row.get(&field.name) {
                Some(value) => {
                    check_components(field, value)?;
                    writes.push((fi, value));
                }
                None if mode == WriteMode::Full => {
                    return Err(SoaError::MissingField {
                        name: field.name.clone(),
                    });
                }
                None => {}
            }
        }
        Ok(writes)
    }

    fn apply(&mut self, index: usize, writes: &[(usize, &Value)]) {
        let bytes: &mut [u8] = bytemuck::cast_slice_mut(&mut self.words);
        for &(fi, value) in writes {
            let field = &self.fields[fi];
            let ty = field.scalar_type;
            let dst = &mut bytes[field.row_range(index)];
            for (chunk, scalar) in dst.chunks_exact_mut(ty.byte_size()).zip(value.components()) {
                scalar.convert(ty).write_ne(chunk);
            }
        }
    }

    fn read_value(&self, field: &FieldDescriptor, index: usize) -> Value {
        let ty = field.scalar_type;
        let src = &self.as_bytes()[field.row_range(index)];
        Value::from_scalars(
            src.chunks_exact(ty.byte_size())
                .map(|c| Scalar::read_ne(ty, c))
                .collect(),
        )
    }
}

fn check_components(field: &FieldDescriptor, value: &Value) -> Result<(), SoaError> {
    if value.len() != field.components as usize {
        return Err(SoaError::ComponentMismatch {
            name: field.name.clone(),
            expected: field.components,
            found: value.len(),
        });
    }
    Ok(())
}

fn check_type<T: Element>(field: &FieldDescriptor) -> Result<(), SoaError> {
    if field.scalar_type != T::SCALAR_TYPE {
        return Err(SoaError::TypeMismatch {
            name: field.name.clone(),
            stored: field.scalar_type,
            requested: T::SCALAR_TYPE,
        });
    }
    Ok(())
}

/// Allocates a zeroed region of `bytes` bytes, reporting allocator failure
/// instead of aborting.
fn alloc_words(bytes: usize) -> Result<Vec<Word>, SoaError> {
    debug_assert_eq!(bytes % WORD_BYTES, 0);
    let n = bytes / WORD_BYTES;

    let mut words = Vec::new();
    words
        .try_reserve_exact(n)
        .map_err(|_| SoaError::AllocationFailed { bytes })?;
    words.resize(n, 0);
    Ok(words)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::soa::{FieldSpec, ScalarType};

    fn sprite_schema() -> Schema {
        Schema::new([
            ("dx", ScalarType::Float32),
            ("dy", ScalarType::Float32),
            ("sx", ScalarType::Float32),
            ("sy", ScalarType::Float32),
        ])
        .unwrap()
    }

    fn sprite(dx: f32, dy: f32, sx: f32, sy: f32) -> Row {
        Row::new()
            .with("dx", dx)
            .with("dy", dy)
            .with("sx", sx)
            .with("sy", sy)
    }

    fn numbered(i: usize) -> Row {
        let f = i as f32;
        sprite(f, f, f * 8.0, f * 8.0)
    }

    fn fill(buf: &mut ColumnarBuffer, n: usize) {
        for i in 0..n {
            buf.push_row(&numbered(i)).unwrap();
        }
    }

    // ── construction ──────────────────────────────────────────────────────

    #[test]
    fn constructed_capacity_is_aligned() {
        for (requested, expected) in [(0, 64), (1, 64), (4, 64), (63, 64), (64, 64), (65, 128), (200, 256)] {
            let buf = ColumnarBuffer::new(sprite_schema(), requested).unwrap();
            assert_eq!(buf.capacity(), expected, "requested {requested}");
            assert_eq!(buf.len(), 0);
        }
    }

    #[test]
    fn region_is_sized_from_layout() {
        let buf = ColumnarBuffer::new(sprite_schema(), 64).unwrap();
        assert_eq!(buf.byte_len(), 4 * 4 * 64);
        assert_eq!(buf.as_bytes().len(), buf.byte_len());
        assert!(buf.as_bytes().iter().all(|&b| b == 0));
    }

    // ── push / get ────────────────────────────────────────────────────────

    #[test]
    fn pushes_are_readable() {
        let mut buf = ColumnarBuffer::new(sprite_schema(), 64).unwrap();
        fill(&mut buf, 10);
        assert_eq!(buf.len(), 10);
        for i in 0..10 {
            assert_eq!(buf.get_row(i).unwrap(), numbered(i));
        }
    }

    #[test]
    fn get_row_lists_fields_in_schema_order() {
        let mut buf = ColumnarBuffer::new(sprite_schema(), 0).unwrap();
        let shuffled = Row::new()
            .with("sy", 4.0f32)
            .with("dx", 1.0f32)
            .with("sx", 3.0f32)
            .with("dy", 2.0f32);
        buf.push_row(&shuffled).unwrap();
        let names: Vec<_> = buf.get_row(0).unwrap().names().map(str::to_string).collect();
        assert_eq!(names, vec!["dx", "dy", "sx", "sy"]);
    }

    #[test]
    fn set_overwrites_previous_value() {
        let mut buf = ColumnarBuffer::new(sprite_schema(), 64).unwrap();
        fill(&mut buf, 3);
        buf.set_row(1, &sprite(9.0, 9.0, 9.0, 9.0)).unwrap();
        assert_eq!(buf.get_row(1).unwrap(), sprite(9.0, 9.0, 9.0, 9.0));
        assert_eq!(buf.get_row(0).unwrap(), numbered(0));
        assert_eq!(buf.get_row(2).unwrap(), numbered(2));
    }

    #[test]
    fn index_at_capacity_is_out_of_range() {
        let mut buf = ColumnarBuffer::new(sprite_schema(), 64).unwrap();
        let err = buf.set_row(64, &numbered(0)).unwrap_err();
        assert_eq!(err, SoaError::IndexOutOfRange { index: 64, capacity: 64 });
        assert_eq!(
            buf.get_row(64).unwrap_err(),
            SoaError::IndexOutOfRange { index: 64, capacity: 64 }
        );
        // Below capacity but beyond len is addressable.
        assert!(buf.set_row(63, &numbered(1)).is_ok());
        assert_eq!(buf.capacity(), 64);
    }

    // ── full vs patch writes ──────────────────────────────────────────────

    #[test]
    fn patch_keeps_absent_fields() {
        let schema = Schema::new([("dx", ScalarType::Float32), ("dy", ScalarType::Float32)]).unwrap();
        let mut buf = ColumnarBuffer::new(schema, 0).unwrap();
        buf.push_row(&Row::new().with("dx", 1.0f32).with("dy", 2.0f32)).unwrap();

        buf.patch_row(0, &Row::new().with("dx", 5.0f32)).unwrap();

        assert_eq!(
            buf.get_row(0).unwrap(),
            Row::new().with("dx", 5.0f32).with("dy", 2.0f32)
        );
    }

    #[test]
    fn full_write_missing_field_changes_nothing() {
        let mut buf = ColumnarBuffer::new(sprite_schema(), 0).unwrap();
        fill(&mut buf, 2);
        let before = buf.as_bytes().to_vec();

        let partial = Row::new().with("dx", 7.0f32).with("dy", 7.0f32).with("sx", 7.0f32);
        let err = buf.set_row(1, &partial).unwrap_err();

        assert_eq!(err, SoaError::MissingField { name: "sy".into() });
        assert_eq!(buf.as_bytes(), &before[..]);
    }

    #[test]
    fn push_missing_field_does_not_grow_or_count() {
        let mut buf = ColumnarBuffer::new(sprite_schema(), 64).unwrap();
        fill(&mut buf, 64);
        let err = buf.push_row(&Row::new().with("dx", 1.0f32)).unwrap_err();
        assert!(matches!(err, SoaError::MissingField { .. }));
        assert_eq!(buf.capacity(), 64);
        assert_eq!(buf.len(), 64);
        assert_eq!(buf.generation(), 0);
    }

    #[test]
    fn component_mismatch_rejected_before_write() {
        let schema = Schema::new([
            ("pos", FieldSpec::new(ScalarType::Float32).with_components(2)),
            ("id", FieldSpec::new(ScalarType::UInt32)),
        ])
        .unwrap();
        let mut buf = ColumnarBuffer::new(schema, 0).unwrap();

        let bad = Row::new().with("pos", [1.0f32, 2.0, 3.0]).with("id", 1u32);
        let err = buf.push_row(&bad).unwrap_err();
        assert_eq!(
            err,
            SoaError::ComponentMismatch { name: "pos".into(), expected: 2, found: 3 }
        );
        assert!(buf.is_empty());
    }

    #[test]
    fn unknown_fields_in_row_are_ignored() {
        let mut buf = ColumnarBuffer::new(sprite_schema(), 0).unwrap();
        let row = numbered(3).with("rotation", 1.0f32);
        buf.push_row(&row).unwrap();
        let back = buf.get_row(0).unwrap();
        assert!(!back.contains("rotation"));
        assert_eq!(back, numbered(3));
    }

    #[test]
    fn values_convert_to_column_type() {
        let schema = Schema::new([("tile", ScalarType::UInt16), ("x", ScalarType::Float32)]).unwrap();
        let mut buf = ColumnarBuffer::new(schema, 0).unwrap();
        buf.push_row(&Row::new().with("tile", 12.7f32).with("x", 3u8)).unwrap();

        let row = buf.get_row(0).unwrap();
        assert_eq!(row.get("tile"), Some(&Value::from(12u16)));
        assert_eq!(row.get("x"), Some(&Value::from(3.0f32)));
    }

    // ── pop ───────────────────────────────────────────────────────────────

    #[test]
    fn pop_inverts_push() {
        let mut buf = ColumnarBuffer::new(sprite_schema(), 0).unwrap();
        fill(&mut buf, 3);
        let r = sprite(1.5, -2.5, 16.0, 32.0);
        buf.push_row(&r).unwrap();
        assert_eq!(buf.len(), 4);
        assert_eq!(buf.pop_row().unwrap(), r);
        assert_eq!(buf.len(), 3);
    }

    #[test]
    fn pop_on_empty_reports_empty() {
        let mut buf = ColumnarBuffer::new(sprite_schema(), 0).unwrap();
        assert_eq!(buf.pop_row().unwrap_err(), SoaError::Empty);
        buf.push_row(&numbered(0)).unwrap();
        buf.pop_row().unwrap();
        assert_eq!(buf.pop_row().unwrap_err(), SoaError::Empty);
    }

    #[test]
    fn push_after_pop_overwrites_slot() {
        let mut buf = ColumnarBuffer::new(sprite_schema(), 0).unwrap();
        fill(&mut buf, 2);
        buf.pop_row().unwrap();
        buf.push_row(&numbered(7)).unwrap();
        assert_eq!(buf.len(), 2);
        assert_eq!(buf.get_row(1).unwrap(), numbered(7));
    }

    #[test]
    fn clear_drops_rows_but_keeps_memory() {
        let mut buf = ColumnarBuffer::new(sprite_schema(), 0).unwrap();
        fill(&mut buf, 5);
        let before = buf.as_bytes().to_vec();

        buf.clear();
        assert_eq!(buf.len(), 0);
        assert!(buf.is_empty());
        assert_eq!(buf.capacity(), 64);
        assert_eq!(buf.as_bytes(), &before[..]);
        assert_eq!(buf.pop_row().unwrap_err(), SoaError::Empty);

        // The next push reuses slot 0; later slots keep their old bytes.
        assert_eq!(buf.push_row(&numbered(9)).unwrap(), 0);
        assert_eq!(buf.len(), 1);
        assert_eq!(buf.get_row(0).unwrap(), numbered(9));
        assert_eq!(buf.get_row(1).unwrap(), numbered(1));
    }

    // ── growth ────────────────────────────────────────────────────────────

    #[test]
    fn overflow_push_grows_exactly_once() {
        let mut buf = ColumnarBuffer::new(sprite_schema(), 64).unwrap();
        fill(&mut buf, 64);
        assert!(buf.is_full());
        let before = buf.as_bytes().to_vec();

        buf.push_row(&numbered(64)).unwrap();

        assert_eq!(buf.capacity(), 128);
        assert_eq!(buf.generation(), 1);
        assert_eq!(buf.len(), 65);
        for i in 0..65 {
            assert_eq!(buf.get_row(i).unwrap(), numbered(i));
        }

        // Each old column is byte-identical to the prefix of its new column.
        let old_span = 4 * 64;
        for (fi, field) in buf.fields().iter().enumerate() {
            let old = &before[fi * old_span..(fi + 1) * old_span];
            let new = &buf.as_bytes()[field.offset..field.offset + old_span];
            assert_eq!(old, new, "column {}", field.name);
        }
    }

    #[test]
    fn grow_by_non_power_of_two_fails() {
        let mut buf = ColumnarBuffer::new(sprite_schema(), 64).unwrap();
        fill(&mut buf, 5);
        let before = buf.as_bytes().to_vec();

        for bad in [64, 32, 64 * 3, 100] {
            assert_eq!(
                buf.grow(bad).unwrap_err(),
                SoaError::InvalidCapacity { current: 64, requested: bad }
            );
        }
        assert_eq!(buf.capacity(), 64);
        assert_eq!(buf.as_bytes(), &before[..]);
    }

    #[test]
    fn failed_allocation_leaves_buffer_untouched() {
        let schema = Schema::new([("x", ScalarType::Float32), ("y", ScalarType::Float32)]).unwrap();
        let mut buf = ColumnarBuffer::new(schema, 64).unwrap();
        buf.push_row(&Row::new().with("x", 1.0f32).with("y", 2.0f32)).unwrap();
        let before = buf.as_bytes().to_vec();

        // 2 columns x 4 bytes x 2^58 rows: representable, never allocatable.
        let err = buf.grow(64 << 52).unwrap_err();
        assert!(matches!(err, SoaError::AllocationFailed { .. }), "{err:?}");

        assert_eq!(buf.capacity(), 64);
        assert_eq!(buf.generation(), 0);
        assert_eq!(buf.len(), 1);
        assert_eq!(buf.as_bytes(), &before[..]);
        assert_eq!(buf.fields()[1].offset, 4 * 64);
    }

    #[test]
    fn reserve_past_usize_reports_overflow() {
        let mut buf = ColumnarBuffer::new(sprite_schema(), 256).unwrap();
        fill(&mut buf, 3);
        let before = buf.as_bytes().to_vec();

        assert_eq!(
            buf.reserve(usize::MAX).unwrap_err(),
            SoaError::CapacityOverflow { rows: usize::MAX }
        );
        assert_eq!(buf.capacity(), 256);
        assert_eq!(buf.generation(), 0);
        assert_eq!(buf.as_bytes(), &before[..]);
    }

    #[test]
    fn grow_to_usize_max_fails() {
        let mut buf = ColumnarBuffer::new(sprite_schema(), 64).unwrap();
        assert!(buf.grow(usize::MAX).is_err());
        assert_eq!(buf.capacity(), 64);
    }

    #[test]
    fn grow_with_overflowing_spans_reports_overflow() {
        let mut buf = ColumnarBuffer::new(sprite_schema(), 64).unwrap();
        // Power-of-two scale, but 4-byte columns of 2^63 rows overflow usize.
        let err = buf.grow(1 << 63).unwrap_err();
        assert_eq!(err, SoaError::CapacityOverflow { rows: 1 << 63 });
        assert_eq!(buf.capacity(), 64);
        assert_eq!(buf.generation(), 0);
    }

    #[test]
    fn grow_by_two_doubles_byte_len() {
        let mut buf = ColumnarBuffer::new(sprite_schema(), 64).unwrap();
        let before = buf.byte_len();
        buf.grow(128).unwrap();
        assert_eq!(buf.byte_len(), before * 2);
        assert_eq!(buf.fields()[1].offset, 512);
    }

    #[test]
    fn grow_by_larger_power_of_two() {
        let mut buf = ColumnarBuffer::new(sprite_schema(), 64).unwrap();
        fill(&mut buf, 20);
        buf.grow(512).unwrap();
        assert_eq!(buf.capacity(), 512);
        assert_eq!(buf.byte_len(), 4 * 4 * 512);
        for i in 0..20 {
            assert_eq!(buf.get_row(i).unwrap(), numbered(i));
        }
    }

    #[test]
    fn reserve_doubles_to_cover_target() {
        let mut buf = ColumnarBuffer::new(sprite_schema(), 64).unwrap();
        fill(&mut buf, 64);

        buf.reserve(1000).unwrap();

        assert_eq!(buf.capacity(), 1024);
        assert_eq!(buf.generation(), 1, "one reallocation");
        assert_eq!(buf.len(), 64);
        for i in 0..64 {
            assert_eq!(buf.get_row(i).unwrap(), numbered(i));
        }
    }

    #[test]
    fn reserve_within_capacity_is_noop() {
        let mut buf = ColumnarBuffer::new(sprite_schema(), 128).unwrap();
        buf.reserve(100).unwrap();
        buf.reserve(128).unwrap();
        assert_eq!(buf.capacity(), 128);
        assert_eq!(buf.generation(), 0);
    }

    #[test]
    fn multi_component_columns_survive_growth() {
        let schema = Schema::new([
            ("pos", FieldSpec::new(ScalarType::Float32).with_components(3)),
            ("tint", FieldSpec::new(ScalarType::UInt8).with_components(4).normalized()),
            ("frame", FieldSpec::new(ScalarType::UInt16).with_components(2)),
        ])
        .unwrap();
        let mut buf = ColumnarBuffer::new(schema, 0).unwrap();

        let row = |i: usize| {
            let f = i as f32;
            let b = i as u8;
            Row::new()
                .with("pos", [f, f + 0.5, -f])
                .with("tint", [b, b.wrapping_add(1), 0, 255])
                .with("frame", [i as u16, 3])
        };

        for i in 0..130 {
            buf.push_row(&row(i)).unwrap();
        }

        assert_eq!(buf.capacity(), 256);
        assert_eq!(buf.generation(), 2);
        for i in 0..130 {
            assert_eq!(buf.get_row(i).unwrap(), row(i));
        }

        let pos = buf.field("pos").unwrap();
        let tint = buf.field("tint").unwrap();
        assert_eq!(pos.span, 12 * 256);
        assert_eq!(tint.offset, 12 * 256);
        assert_eq!(tint.span, 4 * 256);
    }

    #[test]
    fn four_float_sprite_scenario() {
        let mut buf = ColumnarBuffer::new(sprite_schema(), 4).unwrap();
        let tuples = [
            (0.0, 0.0, 0.0, 0.0),
            (1.0, 1.0, 8.0, 8.0),
            (2.0, 2.0, 16.0, 16.0),
            (3.0, 3.0, 24.0, 24.0),
            (4.0, 4.0, 32.0, 32.0),
        ];
        for &(dx, dy, sx, sy) in &tuples {
            buf.push_row(&sprite(dx, dy, sx, sy)).unwrap();
        }

        // Requested capacity 4 is aligned up to 64, so five rows fit without growth.
        assert_eq!(buf.capacity(), 64);
        assert_eq!(buf.generation(), 0);
        assert_eq!(buf.len(), 5);
        for (i, &(dx, dy, sx, sy)) in tuples.iter().enumerate() {
            assert_eq!(buf.get_row(i).unwrap(), sprite(dx, dy, sx, sy));
        }
    }

    // ── typed columns ─────────────────────────────────────────────────────

    #[test]
    fn typed_column_views_match_rows() {
        let mut buf = ColumnarBuffer::new(sprite_schema(), 0).unwrap();
        fill(&mut buf, 3);

        let sx = buf.column::<f32>("sx").unwrap();
        assert_eq!(sx.len(), 64);
        assert_eq!(&sx[..3], &[0.0, 8.0, 16.0]);

        buf.column_mut::<f32>("dy").unwrap()[2] = 42.0;
        assert_eq!(buf.get_field("dy", 2).unwrap(), Value::from(42.0f32));
    }

    #[test]
    fn typed_column_rejects_wrong_type() {
        let buf = ColumnarBuffer::new(sprite_schema(), 0).unwrap();
        assert_eq!(
            buf.column::<u32>("dx").unwrap_err(),
            SoaError::TypeMismatch {
                name: "dx".into(),
                stored: ScalarType::Float32,
                requested: ScalarType::UInt32,
            }
        );
        assert_eq!(
            buf.column::<f32>("nope").unwrap_err(),
            SoaError::UnknownField { name: "nope".into() }
        );
    }

    #[test]
    fn set_field_writes_single_column() {
        let mut buf = ColumnarBuffer::new(sprite_schema(), 0).unwrap();
        fill(&mut buf, 2);
        buf.set_field("sx", 1, 99.0f32).unwrap();
        assert_eq!(buf.get_row(1).unwrap(), sprite(1.0, 1.0, 99.0, 8.0));
        assert!(matches!(
            buf.set_field("sz", 1, 1.0f32),
            Err(SoaError::UnknownField { .. })
        ));
    }

    // ── upload ────────────────────────────────────────────────────────────

    #[test]
    fn upload_hands_over_raw_region() {
        let mut buf = ColumnarBuffer::new(sprite_schema(), 0).unwrap();
        fill(&mut buf, 4);

        let mut sink: Vec<u8> = Vec::new();
        buf.upload(&mut sink).unwrap();
        assert_eq!(sink, buf.as_bytes());

        let dx_bytes = &sink[..4];
        assert_eq!(dx_bytes, 0.0f32.to_ne_bytes());
        let dx1 = &sink[4..8];
        assert_eq!(dx1, 1.0f32.to_ne_bytes());
    }
}

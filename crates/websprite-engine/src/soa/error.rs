use super::scalar::ScalarType;

/// Errors reported by schema construction and columnar buffer operations.
///
/// Every error is returned to the immediate caller; nothing is retried.
/// Operations that fail leave the buffer exactly as it was.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SoaError {
    /// Two schema entries share a name.
    #[error("duplicate field `{name}` in schema")]
    DuplicateField { name: String },

    /// A schema must declare at least one field.
    #[error("schema declares no fields")]
    EmptySchema,

    /// Component count outside `1..=MAX_COMPONENTS`.
    #[error("field `{name}` declares {components} components (expected 1..=4)")]
    InvalidComponentCount { name: String, components: u32 },

    /// A full-row write omitted a declared field.
    #[error("full row write is missing field `{name}`")]
    MissingField { name: String },

    /// Single-field access named a field the schema does not declare.
    #[error("unknown field `{name}`")]
    UnknownField { name: String },

    /// Row index is not below the current capacity.
    #[error("row index {index} out of range (capacity {capacity})")]
    IndexOutOfRange { index: usize, capacity: usize },

    /// `grow` target is not the current capacity times a power of two >= 2.
    #[error(
        "cannot grow from {current} to {requested} rows; \
         target must be current capacity times a power of two (use reserve)"
    )]
    InvalidCapacity { current: usize, requested: usize },

    /// `pop_row` on a buffer with no live rows.
    #[error("pop on empty buffer")]
    Empty,

    /// Typed column access with an element type that does not match the field.
    #[error("field `{name}` stores {stored:?}, requested {requested:?}")]
    TypeMismatch {
        name: String,
        stored: ScalarType,
        requested: ScalarType,
    },

    /// A value carries a different number of components than the field declares.
    #[error("field `{name}` expects {expected} components, got {found}")]
    ComponentMismatch {
        name: String,
        expected: u32,
        found: usize,
    },

    /// The byte size for the requested row count does not fit in `usize`.
    #[error("capacity of {rows} rows overflows the addressable size")]
    CapacityOverflow { rows: usize },

    /// The allocator refused the backing region.
    #[error("failed to allocate {bytes} bytes of column storage")]
    AllocationFailed { bytes: usize },
}

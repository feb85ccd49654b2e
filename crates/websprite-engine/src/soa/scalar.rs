use bytemuck::Pod;

/// GPU-compatible scalar representation of one column component.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum ScalarType {
    Int8,
    UInt8,
    Int16,
    UInt16,
    Int32,
    UInt32,
    Float32,
}

impl ScalarType {
    pub const ALL: [ScalarType; 7] = [
        ScalarType::Int8,
        ScalarType::UInt8,
        ScalarType::Int16,
        ScalarType::UInt16,
        ScalarType::Int32,
        ScalarType::UInt32,
        ScalarType::Float32,
    ];

    /// Size of one component in bytes.
    #[inline]
    pub const fn byte_size(self) -> usize {
        match self {
            ScalarType::Int8 | ScalarType::UInt8 => 1,
            ScalarType::Int16 | ScalarType::UInt16 => 2,
            ScalarType::Int32 | ScalarType::UInt32 | ScalarType::Float32 => 4,
        }
    }

    /// `true` for floating-point columns; integral columns bind as integer
    /// attributes unless normalized.
    #[inline]
    pub const fn is_floating(self) -> bool {
        matches!(self, ScalarType::Float32)
    }
}

/// One tagged component value.
#[derive(Debug, Copy, Clone, PartialEq)]
pub enum Scalar {
    Int8(i8),
    UInt8(u8),
    Int16(i16),
    UInt16(u16),
    Int32(i32),
    UInt32(u32),
    Float32(f32),
}

impl Scalar {
    #[inline]
    pub const fn scalar_type(self) -> ScalarType {
        match self {
            Scalar::Int8(_) => ScalarType::Int8,
            Scalar::UInt8(_) => ScalarType::UInt8,
            Scalar::Int16(_) => ScalarType::Int16,
            Scalar::UInt16(_) => ScalarType::UInt16,
            Scalar::Int32(_) => ScalarType::Int32,
            Scalar::UInt32(_) => ScalarType::UInt32,
            Scalar::Float32(_) => ScalarType::Float32,
        }
    }

    /// Widens to `f64`. Exact for every supported type.
    pub fn to_f64(self) -> f64 {
        match self {
            Scalar::Int8(v) => v as f64,
            Scalar::UInt8(v) => v as f64,
            Scalar::Int16(v) => v as f64,
            Scalar::UInt16(v) => v as f64,
            Scalar::Int32(v) => v as f64,
            Scalar::UInt32(v) => v as f64,
            Scalar::Float32(v) => v as f64,
        }
    }

    /// Converts to `ty` with `as` semantics: float-to-int truncates toward
    /// zero and saturates, int-to-int saturates, NaN becomes 0.
    pub fn convert(self, ty: ScalarType) -> Scalar {
        match ty {
            ScalarType::Int8 => Scalar::Int8(i8::from_scalar(self)),
            ScalarType::UInt8 => Scalar::UInt8(u8::from_scalar(self)),
            ScalarType::Int16 => Scalar::Int16(i16::from_scalar(self)),
            ScalarType::UInt16 => Scalar::UInt16(u16::from_scalar(self)),
            ScalarType::Int32 => Scalar::Int32(i32::from_scalar(self)),
            ScalarType::UInt32 => Scalar::UInt32(u32::from_scalar(self)),
            ScalarType::Float32 => Scalar::Float32(f32::from_scalar(self)),
        }
    }

    /// Writes the value in native byte order. `dst.len()` must equal the
    /// type's byte size.
    pub(crate) fn write_ne(self, dst: &mut [u8]) {
        match self {
            Scalar::Int8(v) => dst.copy_from_slice(bytemuck::bytes_of(&v)),
            Scalar::UInt8(v) => dst.copy_from_slice(bytemuck::bytes_of(&v)),
            Scalar::Int16(v) => dst.copy_from_slice(bytemuck::bytes_of(&v)),
            Scalar::UInt16(v) => dst.copy_from_slice(bytemuck::bytes_of(&v)),
            Scalar::Int32(v) => dst.copy_from_slice(bytemuck::bytes_of(&v)),
            Scalar::UInt32(v) => dst.copy_from_slice(bytemuck::bytes_of(&v)),
            Scalar::Float32(v) => dst.copy_from_slice(bytemuck::bytes_of(&v)),
        }
    }

    /// Reads one `ty` value in native byte order from `src`.
    pub(crate) fn read_ne(ty: ScalarType, src: &[u8]) -> Scalar {
        match ty {
            ScalarType::Int8 => Scalar::Int8(bytemuck::pod_read_unaligned(src)),
            ScalarType::UInt8 => Scalar::UInt8(bytemuck::pod_read_unaligned(src)),
            ScalarType::Int16 => Scalar::Int16(bytemuck::pod_read_unaligned(src)),
            ScalarType::UInt16 => Scalar::UInt16(bytemuck::pod_read_unaligned(src)),
            ScalarType::Int32 => Scalar::Int32(bytemuck::pod_read_unaligned(src)),
            ScalarType::UInt32 => Scalar::UInt32(bytemuck::pod_read_unaligned(src)),
            ScalarType::Float32 => Scalar::Float32(bytemuck::pod_read_unaligned(src)),
        }
    }
}

/// Rust element types that can back a column.
///
/// Implemented for the seven primitive types matching [`ScalarType`].
pub trait Element: Pod + PartialEq + std::fmt::Debug {
    const SCALAR_TYPE: ScalarType;

    /// Extracts a value of this type, converting numerically if `scalar`
    /// carries another type.
    fn from_scalar(scalar: Scalar) -> Self;
}

macro_rules! element {
    ($t:ty, $variant:ident) => {
        impl Element for $t {
            const SCALAR_TYPE: ScalarType = ScalarType::$variant;

            #[inline]
            fn from_scalar(scalar: Scalar) -> Self {
                match scalar {
                    Scalar::$variant(v) => v,
                    other => other.to_f64() as $t,
                }
            }
        }

        impl From<$t> for Scalar {
            #[inline]
            fn from(v: $t) -> Self {
                Scalar::$variant(v)
            }
        }
    };
}

element!(i8, Int8);
element!(u8, UInt8);
element!(i16, Int16);
element!(u16, UInt16);
element!(i32, Int32);
element!(u32, UInt32);
element!(f32, Float32);

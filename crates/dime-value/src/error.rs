use crate::array::DType;

/// Errors raised while constructing a [`NumericArray`](crate::NumericArray).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ArrayError {
    /// More dimensions than the wire format can describe.
    #[error("array rank {rank} exceeds the maximum of 255")]
    RankTooLarge { rank: usize },

    /// The backing buffer does not hold `product(shape)` elements.
    #[error("array buffer holds {actual} scalars, shape requires {expected}")]
    LengthMismatch { expected: usize, actual: usize },

    /// Complex arrays interleave floating-point components only.
    #[error("complex arrays require a float32 or float64 buffer, got {dtype}")]
    ComplexRequiresFloat { dtype: DType },

    /// The product of the extents does not fit in `usize`.
    #[error("array shape overflows the addressable element count")]
    ShapeOverflow,
}

/// Errors raised while encoding a value. Nothing is written on failure.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EncodeError {
    /// Only column-major ("F") arrays have a wire representation.
    #[error("row-major (\"C\") arrays cannot be encoded; convert to column-major first")]
    RowMajorArray,

    /// An array extent does not fit the 4-byte extent field.
    #[error("array extent {extent} exceeds the 4-byte extent field")]
    ExtentTooLarge { extent: usize },

    /// A text, list or map length does not fit the 4-byte length field.
    #[error("{what} length {len} exceeds the 4-byte length field")]
    LengthOverflow { what: &'static str, len: usize },

    /// Map keys must be text when encoding.
    #[error("map keys must be text, found {kind}")]
    NonTextKey { kind: &'static str },

    /// An unsigned value does not fit the signed 64-bit wire integer.
    #[error("unsigned integer {value} does not fit a signed 64-bit integer")]
    IntegerOverflow { value: u64 },
}

/// Errors raised while decoding `dimeb` bytes.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DecodeError {
    /// A header promised more bytes than the buffer holds.
    #[error("truncated input: needed {needed} bytes at offset {offset}, {available} available")]
    Truncated {
        offset: usize,
        needed: usize,
        available: usize,
    },

    /// The type tag is not part of the format.
    #[error("unknown type tag 0x{tag:02X} at offset {offset}")]
    UnknownTag { tag: u8, offset: usize },

    /// Text payload is not UTF-8.
    #[error("text at offset {offset} is not valid UTF-8")]
    InvalidUtf8 { offset: usize },

    /// The element count of an array header overflows `usize`.
    #[error("array header at offset {offset} describes more elements than addressable")]
    ShapeOverflow { offset: usize },

    /// Containers nested deeper than the decoder accepts.
    #[error("containers nested deeper than {max} levels")]
    NestingTooDeep { max: usize },

    /// Bytes remain after a complete value.
    #[error("{count} trailing bytes after value")]
    TrailingBytes { count: usize },
}

//! N-dimensional numeric arrays.
//!
//! A [`NumericArray`] is a shape, a storage order and one contiguous buffer
//! of scalars. Complex arrays store interleaved `(re, im)` pairs in a float
//! buffer, so the buffer holds `product(shape) * 2` scalars.

use std::fmt;

use crate::error::ArrayError;
use crate::value::{Complex, Value};

/// Largest rank the one-byte rank field can carry.
pub const MAX_RANK: usize = 255;

/// Element type of a numeric array or scalar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DType {
    I8,
    I16,
    I32,
    I64,
    U8,
    U16,
    U32,
    U64,
    F32,
    F64,
    Complex64,
    Complex128,
}

impl DType {
    /// All dtypes in tag order.
    pub const ALL: [DType; 12] = [
        DType::I8,
        DType::I16,
        DType::I32,
        DType::I64,
        DType::U8,
        DType::U16,
        DType::U32,
        DType::U64,
        DType::F32,
        DType::F64,
        DType::Complex64,
        DType::Complex128,
    ];

    /// The scalar type tag (`0x03..=0x0E`).
    pub fn scalar_tag(self) -> u8 {
        match self {
            DType::I8 => 0x03,
            DType::I16 => 0x04,
            DType::I32 => 0x05,
            DType::I64 => 0x06,
            DType::U8 => 0x07,
            DType::U16 => 0x08,
            DType::U32 => 0x09,
            DType::U64 => 0x0A,
            DType::F32 => 0x0B,
            DType::F64 => 0x0C,
            DType::Complex64 => 0x0D,
            DType::Complex128 => 0x0E,
        }
    }

    /// Inverse of [`DType::scalar_tag`].
    pub fn from_scalar_tag(tag: u8) -> Option<Self> {
        Self::ALL.into_iter().find(|dtype| dtype.scalar_tag() == tag)
    }

    /// Width in bytes of one stored scalar component.
    ///
    /// For complex dtypes this is the width of one of the two components.
    pub fn component_size(self) -> usize {
        match self {
            DType::I8 | DType::U8 => 1,
            DType::I16 | DType::U16 => 2,
            DType::I32 | DType::U32 | DType::F32 | DType::Complex64 => 4,
            DType::I64 | DType::U64 | DType::F64 | DType::Complex128 => 8,
        }
    }

    pub fn is_complex(self) -> bool {
        matches!(self, DType::Complex64 | DType::Complex128)
    }

    /// Lower-case name, matching numpy's spelling.
    pub fn name(self) -> &'static str {
        match self {
            DType::I8 => "int8",
            DType::I16 => "int16",
            DType::I32 => "int32",
            DType::I64 => "int64",
            DType::U8 => "uint8",
            DType::U16 => "uint16",
            DType::U32 => "uint32",
            DType::U64 => "uint64",
            DType::F32 => "float32",
            DType::F64 => "float64",
            DType::Complex64 => "complex64",
            DType::Complex128 => "complex128",
        }
    }
}

impl fmt::Display for DType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// How logical indices map onto the flat buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Order {
    /// Row-major: the last index varies fastest.
    C,
    /// Column-major: the first index varies fastest.
    #[default]
    F,
}

impl Order {
    pub fn as_str(self) -> &'static str {
        match self {
            Order::C => "C",
            Order::F => "F",
        }
    }
}

/// Typed backing buffer of a [`NumericArray`].
#[derive(Debug, Clone, PartialEq)]
pub enum ArrayData {
    I8(Vec<i8>),
    I16(Vec<i16>),
    I32(Vec<i32>),
    I64(Vec<i64>),
    U8(Vec<u8>),
    U16(Vec<u16>),
    U32(Vec<u32>),
    U64(Vec<u64>),
    F32(Vec<f32>),
    F64(Vec<f64>),
}

macro_rules! with_buffer {
    ($data:expr, $buf:ident => $body:expr) => {
        match $data {
            ArrayData::I8($buf) => $body,
            ArrayData::I16($buf) => $body,
            ArrayData::I32($buf) => $body,
            ArrayData::I64($buf) => $body,
            ArrayData::U8($buf) => $body,
            ArrayData::U16($buf) => $body,
            ArrayData::U32($buf) => $body,
            ArrayData::U64($buf) => $body,
            ArrayData::F32($buf) => $body,
            ArrayData::F64($buf) => $body,
        }
    };
}

macro_rules! map_buffer {
    ($data:expr, $buf:ident => $body:expr) => {
        match $data {
            ArrayData::I8($buf) => ArrayData::I8($body),
            ArrayData::I16($buf) => ArrayData::I16($body),
            ArrayData::I32($buf) => ArrayData::I32($body),
            ArrayData::I64($buf) => ArrayData::I64($body),
            ArrayData::U8($buf) => ArrayData::U8($body),
            ArrayData::U16($buf) => ArrayData::U16($body),
            ArrayData::U32($buf) => ArrayData::U32($body),
            ArrayData::U64($buf) => ArrayData::U64($body),
            ArrayData::F32($buf) => ArrayData::F32($body),
            ArrayData::F64($buf) => ArrayData::F64($body),
        }
    };
}

macro_rules! impl_from_vec {
    ($($ty:ty => $variant:ident),* $(,)?) => {
        $(
            impl From<Vec<$ty>> for ArrayData {
                fn from(buf: Vec<$ty>) -> Self {
                    ArrayData::$variant(buf)
                }
            }
        )*
    };
}

impl_from_vec! {
    i8 => I8, i16 => I16, i32 => I32, i64 => I64,
    u8 => U8, u16 => U16, u32 => U32, u64 => U64,
    f32 => F32, f64 => F64,
}

impl ArrayData {
    /// Number of stored scalars.
    pub fn len(&self) -> usize {
        with_buffer!(self, buf => buf.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The dtype of one stored scalar, ignoring any complex interleaving.
    pub fn scalar_dtype(&self) -> DType {
        match self {
            ArrayData::I8(_) => DType::I8,
            ArrayData::I16(_) => DType::I16,
            ArrayData::I32(_) => DType::I32,
            ArrayData::I64(_) => DType::I64,
            ArrayData::U8(_) => DType::U8,
            ArrayData::U16(_) => DType::U16,
            ArrayData::U32(_) => DType::U32,
            ArrayData::U64(_) => DType::U64,
            ArrayData::F32(_) => DType::F32,
            ArrayData::F64(_) => DType::F64,
        }
    }

    fn scalar(&self, at: usize) -> Value {
        match self {
            ArrayData::I8(buf) => Value::I8(buf[at]),
            ArrayData::I16(buf) => Value::I16(buf[at]),
            ArrayData::I32(buf) => Value::I32(buf[at]),
            ArrayData::I64(buf) => Value::I64(buf[at]),
            ArrayData::U8(buf) => Value::U8(buf[at]),
            ArrayData::U16(buf) => Value::U16(buf[at]),
            ArrayData::U32(buf) => Value::U32(buf[at]),
            ArrayData::U64(buf) => Value::U64(buf[at]),
            ArrayData::F32(buf) => Value::F32(buf[at]),
            ArrayData::F64(buf) => Value::F64(buf[at]),
        }
    }
}

/// An N-dimensional numeric array.
///
/// Invariant: `data.len() == product(shape) * (complex ? 2 : 1)`. Shape,
/// order and rank are fixed at construction.
#[derive(Debug, Clone, PartialEq)]
pub struct NumericArray {
    order: Order,
    shape: Vec<usize>,
    complex: bool,
    data: ArrayData,
}

impl NumericArray {
    /// Build a real-valued array.
    pub fn new(
        order: Order,
        shape: impl Into<Vec<usize>>,
        data: impl Into<ArrayData>,
    ) -> Result<Self, ArrayError> {
        Self::build(order, shape.into(), false, data.into())
    }

    /// Build a complex array from interleaved `(re, im)` float components.
    pub fn new_complex(
        order: Order,
        shape: impl Into<Vec<usize>>,
        data: impl Into<ArrayData>,
    ) -> Result<Self, ArrayError> {
        let data = data.into();
        if !matches!(data, ArrayData::F32(_) | ArrayData::F64(_)) {
            return Err(ArrayError::ComplexRequiresFloat {
                dtype: data.scalar_dtype(),
            });
        }
        Self::build(order, shape.into(), true, data)
    }

    /// Build a complex array from complex elements.
    pub fn from_complex(
        order: Order,
        shape: impl Into<Vec<usize>>,
        elements: &[Complex<f64>],
    ) -> Result<Self, ArrayError> {
        let interleaved: Vec<f64> = elements.iter().flat_map(|c| [c.re, c.im]).collect();
        Self::new_complex(order, shape, interleaved)
    }

    fn build(
        order: Order,
        shape: Vec<usize>,
        complex: bool,
        data: ArrayData,
    ) -> Result<Self, ArrayError> {
        if shape.len() > MAX_RANK {
            return Err(ArrayError::RankTooLarge { rank: shape.len() });
        }
        let elements = element_count(&shape).ok_or(ArrayError::ShapeOverflow)?;
        let expected = if complex {
            elements.checked_mul(2).ok_or(ArrayError::ShapeOverflow)?
        } else {
            elements
        };
        if data.len() != expected {
            return Err(ArrayError::LengthMismatch {
                expected,
                actual: data.len(),
            });
        }
        Ok(Self {
            order,
            shape,
            complex,
            data,
        })
    }

    /// Element dtype. Complex arrays report `Complex64`/`Complex128`.
    pub fn dtype(&self) -> DType {
        match (self.complex, self.data.scalar_dtype()) {
            (true, DType::F32) => DType::Complex64,
            (true, _) => DType::Complex128,
            (false, dtype) => dtype,
        }
    }

    pub fn order(&self) -> Order {
        self.order
    }

    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    pub fn rank(&self) -> usize {
        self.shape.len()
    }

    pub fn is_complex(&self) -> bool {
        self.complex
    }

    /// Number of logical elements (`product(shape)`).
    pub fn len(&self) -> usize {
        if self.complex {
            self.data.len() / 2
        } else {
            self.data.len()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// The flat scalar buffer.
    pub fn data(&self) -> &ArrayData {
        &self.data
    }

    pub fn into_data(self) -> ArrayData {
        self.data
    }

    /// Flat element offset of a logical index, or `None` when out of bounds.
    ///
    /// The offset counts elements; for complex arrays the components of the
    /// element live at scalar positions `2 * offset` and `2 * offset + 1`.
    pub fn offset(&self, index: &[usize]) -> Option<usize> {
        offset_in(&self.shape, self.order, index)
    }

    /// Read one element. Complex elements come back as `Complex64`/`Complex128`.
    pub fn get(&self, index: &[usize]) -> Option<Value> {
        let offset = self.offset(index)?;
        if !self.complex {
            return Some(self.data.scalar(offset));
        }
        match &self.data {
            ArrayData::F32(buf) => Some(Value::Complex64(Complex::new(
                buf[2 * offset],
                buf[2 * offset + 1],
            ))),
            ArrayData::F64(buf) => Some(Value::Complex128(Complex::new(
                buf[2 * offset],
                buf[2 * offset + 1],
            ))),
            _ => None,
        }
    }

    /// An equivalent column-major array. Column-major arrays are cloned.
    pub fn to_column_major(&self) -> NumericArray {
        if self.order == Order::F {
            return self.clone();
        }
        let width = if self.complex { 2 } else { 1 };
        let shape = &self.shape;
        let data = map_buffer!(&self.data, buf => reorder(buf, shape, width));
        NumericArray {
            order: Order::F,
            shape: self.shape.clone(),
            complex: self.complex,
            data,
        }
    }
}

fn element_count(shape: &[usize]) -> Option<usize> {
    shape.iter().try_fold(1usize, |acc, &extent| acc.checked_mul(extent))
}

fn offset_in(shape: &[usize], order: Order, index: &[usize]) -> Option<usize> {
    if index.len() != shape.len() {
        return None;
    }
    if index.iter().zip(shape).any(|(i, extent)| i >= extent) {
        return None;
    }
    let fold = |acc: usize, (i, extent): (&usize, &usize)| acc * extent + i;
    let offset = match order {
        // Horner over the slowest-varying index first.
        Order::F => index.iter().zip(shape).rev().fold(0, fold),
        Order::C => index.iter().zip(shape).fold(0, fold),
    };
    Some(offset)
}

// Walks the output in column-major order and gathers from the row-major input.
fn reorder<T: Copy>(buf: &[T], shape: &[usize], width: usize) -> Vec<T> {
    let mut out = Vec::with_capacity(buf.len());
    let mut index = vec![0usize; shape.len()];
    let elements = buf.len() / width;
    for _ in 0..elements {
        let src = offset_in(shape, Order::C, &index).unwrap_or(0) * width;
        out.extend_from_slice(&buf[src..src + width]);
        for (i, extent) in index.iter_mut().zip(shape) {
            *i += 1;
            if *i < *extent {
                break;
            }
            *i = 0;
        }
    }
    out
}

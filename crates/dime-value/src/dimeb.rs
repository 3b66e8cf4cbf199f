//! The `dimeb` binary value format.
//!
//! Every value starts with a one-byte type tag; all multi-byte fields are
//! big-endian.
//!
//! ```text
//! 0x00 null   0x01 true   0x02 false
//! 0x03..0x0A  int8 int16 int32 int64 uint8 uint16 uint32 uint64
//! 0x0B..0x0E  float32 float64 complex64 complex128
//! 0x10 | t    numeric array of scalar tag t:
//!             ┌─────┬──────┬──────────────────┬───────────────────────┐
//!             │ tag │ rank │ rank × extent u32 │ column-major scalars  │
//!             └─────┴──────┴──────────────────┴───────────────────────┘
//! 0x20 text   tag, u32 byte length, UTF-8 bytes
//! 0x21 list   tag, u32 count, elements
//! 0x22 map    tag, u32 pair count, key then value for each pair
//! ```
//!
//! Plain integers are always written as int64, plain reals as float64 and
//! complex scalars as complex128. The narrower scalar tags are only read.
//! Arrays keep their element type.

use bytes::{Buf, BufMut, BytesMut};

use crate::array::{ArrayData, DType, NumericArray, Order};
use crate::error::{DecodeError, EncodeError};
use crate::value::{Complex, Value};

/// Serialization name negotiated during the handshake.
pub const SERIALIZATION: &str = "dimeb";

/// Deepest container nesting accepted by the decoder.
pub const MAX_DEPTH: usize = 512;

pub const TAG_NULL: u8 = 0x00;
pub const TAG_TRUE: u8 = 0x01;
pub const TAG_FALSE: u8 = 0x02;
pub const TAG_I64: u8 = 0x06;
pub const TAG_F64: u8 = 0x0C;
pub const TAG_COMPLEX128: u8 = 0x0E;
pub const TAG_ARRAY: u8 = 0x10;
pub const TAG_TEXT: u8 = 0x20;
pub const TAG_LIST: u8 = 0x21;
pub const TAG_MAP: u8 = 0x22;

/// Encode a value into a fresh buffer.
pub fn encode(value: &Value) -> Result<Vec<u8>, EncodeError> {
    let mut dst = BytesMut::new();
    encode_into(value, &mut dst)?;
    Ok(dst.to_vec())
}

/// Append the encoding of `value` to `dst`.
///
/// On error `dst` is restored to its original length.
pub fn encode_into(value: &Value, dst: &mut BytesMut) -> Result<(), EncodeError> {
    let start = dst.len();
    let result = write_value(value, dst);
    if result.is_err() {
        dst.truncate(start);
    }
    result
}

/// Decode one value from the front of `src`.
///
/// Returns the value and the number of bytes it occupied. Bytes after the
/// value are left alone.
pub fn decode(src: &[u8]) -> Result<(Value, usize), DecodeError> {
    let mut reader = Reader { src, pos: 0 };
    let value = reader.value(0)?;
    Ok((value, reader.pos))
}

/// Decode a buffer that holds exactly one value.
pub fn from_slice(src: &[u8]) -> Result<Value, DecodeError> {
    let (value, used) = decode(src)?;
    if used != src.len() {
        return Err(DecodeError::TrailingBytes {
            count: src.len() - used,
        });
    }
    Ok(value)
}

fn write_value(value: &Value, dst: &mut BytesMut) -> Result<(), EncodeError> {
    match value {
        Value::Null => dst.put_u8(TAG_NULL),
        Value::Bool(true) => dst.put_u8(TAG_TRUE),
        Value::Bool(false) => dst.put_u8(TAG_FALSE),
        Value::I8(v) => write_i64(dst, (*v).into()),
        Value::I16(v) => write_i64(dst, (*v).into()),
        Value::I32(v) => write_i64(dst, (*v).into()),
        Value::I64(v) => write_i64(dst, *v),
        Value::U8(v) => write_i64(dst, (*v).into()),
        Value::U16(v) => write_i64(dst, (*v).into()),
        Value::U32(v) => write_i64(dst, (*v).into()),
        Value::U64(v) => {
            let v = i64::try_from(*v).map_err(|_| EncodeError::IntegerOverflow { value: *v })?;
            write_i64(dst, v);
        }
        Value::F32(v) => write_f64(dst, (*v).into()),
        Value::F64(v) => write_f64(dst, *v),
        Value::Complex64(c) => write_complex(dst, c.re.into(), c.im.into()),
        Value::Complex128(c) => write_complex(dst, c.re, c.im),
        Value::Array(array) => write_array(array, dst)?,
        Value::Text(text) => {
            dst.put_u8(TAG_TEXT);
            dst.put_u32(wire_len("text", text.len())?);
            dst.put_slice(text.as_bytes());
        }
        Value::List(items) => {
            dst.put_u8(TAG_LIST);
            dst.put_u32(wire_len("list", items.len())?);
            for item in items {
                write_value(item, dst)?;
            }
        }
        Value::Map(pairs) => {
            dst.put_u8(TAG_MAP);
            dst.put_u32(wire_len("map", pairs.len())?);
            for (key, val) in pairs {
                if !matches!(key, Value::Text(_)) {
                    return Err(EncodeError::NonTextKey { kind: key.kind() });
                }
                write_value(key, dst)?;
                write_value(val, dst)?;
            }
        }
    }
    Ok(())
}

fn write_i64(dst: &mut BytesMut, v: i64) {
    dst.put_u8(TAG_I64);
    dst.put_i64(v);
}

fn write_f64(dst: &mut BytesMut, v: f64) {
    dst.put_u8(TAG_F64);
    dst.put_f64(v);
}

fn write_complex(dst: &mut BytesMut, re: f64, im: f64) {
    dst.put_u8(TAG_COMPLEX128);
    dst.put_f64(re);
    dst.put_f64(im);
}

fn wire_len(what: &'static str, len: usize) -> Result<u32, EncodeError> {
    u32::try_from(len).map_err(|_| EncodeError::LengthOverflow { what, len })
}

fn write_array(array: &NumericArray, dst: &mut BytesMut) -> Result<(), EncodeError> {
    if array.order() != Order::F {
        return Err(EncodeError::RowMajorArray);
    }

    let data = array.data();
    let width = array.dtype().component_size();
    dst.reserve(2 + 4 * array.rank() + data.len() * width);

    dst.put_u8(TAG_ARRAY | array.dtype().scalar_tag());
    // Rank is bounded by construction.
    dst.put_u8(array.rank() as u8);
    for &extent in array.shape() {
        let extent = u32::try_from(extent).map_err(|_| EncodeError::ExtentTooLarge { extent })?;
        dst.put_u32(extent);
    }

    match data {
        ArrayData::I8(buf) => buf.iter().for_each(|&v| dst.put_i8(v)),
        ArrayData::I16(buf) => buf.iter().for_each(|&v| dst.put_i16(v)),
        ArrayData::I32(buf) => buf.iter().for_each(|&v| dst.put_i32(v)),
        ArrayData::I64(buf) => buf.iter().for_each(|&v| dst.put_i64(v)),
        ArrayData::U8(buf) => dst.put_slice(buf),
        ArrayData::U16(buf) => buf.iter().for_each(|&v| dst.put_u16(v)),
        ArrayData::U32(buf) => buf.iter().for_each(|&v| dst.put_u32(v)),
        ArrayData::U64(buf) => buf.iter().for_each(|&v| dst.put_u64(v)),
        ArrayData::F32(buf) => buf.iter().for_each(|&v| dst.put_f32(v)),
        ArrayData::F64(buf) => buf.iter().for_each(|&v| dst.put_f64(v)),
    }
    Ok(())
}

struct Reader<'a> {
    src: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    /// Borrow the next `n` bytes, failing instead of reading past the end.
    fn take(&mut self, n: usize) -> Result<&'a [u8], DecodeError> {
        let available = self.src.len() - self.pos;
        if n > available {
            return Err(DecodeError::Truncated {
                offset: self.pos,
                needed: n,
                available,
            });
        }
        let bytes = &self.src[self.pos..self.pos + n];
        self.pos += n;
        Ok(bytes)
    }

    fn u8(&mut self) -> Result<u8, DecodeError> {
        Ok(self.take(1)?[0])
    }

    fn u32(&mut self) -> Result<u32, DecodeError> {
        Ok(self.take(4)?.get_u32())
    }

    fn len(&mut self) -> Result<usize, DecodeError> {
        Ok(self.u32()? as usize)
    }

    fn value(&mut self, depth: usize) -> Result<Value, DecodeError> {
        let offset = self.pos;
        let tag = self.u8()?;
        let value = match tag {
            TAG_NULL => Value::Null,
            TAG_TRUE => Value::Bool(true),
            TAG_FALSE => Value::Bool(false),
            0x03 => Value::I8(self.take(1)?.get_i8()),
            0x04 => Value::I16(self.take(2)?.get_i16()),
            0x05 => Value::I32(self.take(4)?.get_i32()),
            TAG_I64 => Value::I64(self.take(8)?.get_i64()),
            0x07 => Value::U8(self.u8()?),
            0x08 => Value::U16(self.take(2)?.get_u16()),
            0x09 => Value::U32(self.u32()?),
            0x0A => Value::U64(self.take(8)?.get_u64()),
            0x0B => Value::F32(self.take(4)?.get_f32()),
            TAG_F64 => Value::F64(self.take(8)?.get_f64()),
            0x0D => {
                let mut b = self.take(8)?;
                Value::Complex64(Complex::new(b.get_f32(), b.get_f32()))
            }
            TAG_COMPLEX128 => {
                let mut b = self.take(16)?;
                Value::Complex128(Complex::new(b.get_f64(), b.get_f64()))
            }
            0x13..=0x1E => {
                let dtype = DType::from_scalar_tag(tag & 0x0F)
                    .ok_or(DecodeError::UnknownTag { tag, offset })?;
                Value::Array(self.array(dtype, offset)?)
            }
            TAG_TEXT => {
                let len = self.len()?;
                let at = self.pos;
                let bytes = self.take(len)?;
                let text =
                    std::str::from_utf8(bytes).map_err(|_| DecodeError::InvalidUtf8 { offset: at })?;
                Value::Text(text.to_string())
            }
            TAG_LIST => {
                let count = self.len()?;
                let depth = self.descend(depth)?;
                // Every element is at least one byte.
                let mut items = Vec::with_capacity(count.min(self.remaining()));
                for _ in 0..count {
                    items.push(self.value(depth)?);
                }
                Value::List(items)
            }
            TAG_MAP => {
                let count = self.len()?;
                let depth = self.descend(depth)?;
                let mut pairs = Vec::with_capacity(count.min(self.remaining() / 2));
                for _ in 0..count {
                    let key = self.value(depth)?;
                    let val = self.value(depth)?;
                    pairs.push((key, val));
                }
                Value::Map(pairs)
            }
            _ => return Err(DecodeError::UnknownTag { tag, offset }),
        };
        Ok(value)
    }

    fn remaining(&self) -> usize {
        self.src.len() - self.pos
    }

    fn descend(&self, depth: usize) -> Result<usize, DecodeError> {
        if depth >= MAX_DEPTH {
            return Err(DecodeError::NestingTooDeep { max: MAX_DEPTH });
        }
        Ok(depth + 1)
    }

    fn array(&mut self, dtype: DType, offset: usize) -> Result<NumericArray, DecodeError> {
        let rank = self.u8()? as usize;
        let mut extents = self.take(4 * rank)?;
        let shape: Vec<usize> = (0..rank).map(|_| extents.get_u32() as usize).collect();

        let overflow = DecodeError::ShapeOverflow { offset };
        let elements = shape
            .iter()
            .try_fold(1usize, |acc, &extent| acc.checked_mul(extent))
            .ok_or_else(|| overflow.clone())?;
        let scalars = if dtype.is_complex() {
            elements.checked_mul(2).ok_or_else(|| overflow.clone())?
        } else {
            elements
        };
        let byte_len = scalars
            .checked_mul(dtype.component_size())
            .ok_or(overflow)?;
        let mut body = self.take(byte_len)?;

        let data = match dtype {
            DType::I8 => ArrayData::I8((0..scalars).map(|_| body.get_i8()).collect()),
            DType::I16 => ArrayData::I16((0..scalars).map(|_| body.get_i16()).collect()),
            DType::I32 => ArrayData::I32((0..scalars).map(|_| body.get_i32()).collect()),
            DType::I64 => ArrayData::I64((0..scalars).map(|_| body.get_i64()).collect()),
            DType::U8 => ArrayData::U8(body.to_vec()),
            DType::U16 => ArrayData::U16((0..scalars).map(|_| body.get_u16()).collect()),
            DType::U32 => ArrayData::U32((0..scalars).map(|_| body.get_u32()).collect()),
            DType::U64 => ArrayData::U64((0..scalars).map(|_| body.get_u64()).collect()),
            DType::F32 | DType::Complex64 => {
                ArrayData::F32((0..scalars).map(|_| body.get_f32()).collect())
            }
            DType::F64 | DType::Complex128 => {
                ArrayData::F64((0..scalars).map(|_| body.get_f64()).collect())
            }
        };

        let built = if dtype.is_complex() {
            NumericArray::new_complex(Order::F, shape, data)
        } else {
            NumericArray::new(Order::F, shape, data)
        };
        // Lengths were derived from the header, so construction only fails
        // for ranks the one-byte field cannot produce.
        built.map_err(|_| DecodeError::ShapeOverflow { offset })
    }
}

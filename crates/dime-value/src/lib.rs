//! DiME value model and the `dimeb` binary codec.
//!
//! Every variable exchanged over the fabric is a [`Value`]: scalars, complex
//! numbers, N-dimensional [`NumericArray`]s, text, lists and maps. The
//! [`dimeb`] module encodes them into a tagged, big-endian binary form that
//! every client language can read back.
//!
//! ```
//! use dime_value::{dimeb, NumericArray, Order, Value};
//!
//! let array = NumericArray::new(Order::F, vec![2, 2], vec![1.0f64, 2.0, 3.0, 4.0]).unwrap();
//! let bytes = dimeb::encode(&Value::Array(array.clone())).unwrap();
//! let (decoded, used) = dimeb::decode(&bytes).unwrap();
//! assert_eq!(used, bytes.len());
//! assert_eq!(decoded, Value::Array(array));
//! ```

pub mod array;
pub mod dimeb;
pub mod error;
pub mod value;

pub use array::{ArrayData, DType, NumericArray, Order, MAX_RANK};
pub use dimeb::{decode, encode, encode_into, from_slice, SERIALIZATION};
pub use error::{ArrayError, DecodeError, EncodeError};
pub use value::{Complex, Value};

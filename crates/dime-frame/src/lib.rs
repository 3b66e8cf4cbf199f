//! Frame transport for the DiME wire protocol.
//!
//! Every message on a DiME connection is one frame:
//! - The 4-byte magic `"DiME"`
//! - A 4-byte big-endian header length and a 4-byte big-endian payload length
//! - A UTF-8 JSON header object, then the raw payload bytes
//!
//! [`FrameReader`] reassembles frames from arbitrary read chunks and
//! [`FrameWriter`] emits each frame as one buffered write.

pub mod codec;
pub mod error;
pub mod reader;
pub mod writer;

#[cfg(feature = "async")]
pub mod framed;

pub use codec::{
    decode_frame, encode_frame, Frame, FrameConfig, Header, DEFAULT_MAX_PAYLOAD, MAGIC,
    PREFIX_SIZE,
};
pub use error::{FrameError, Result};
pub use reader::FrameReader;
pub use writer::FrameWriter;

#[cfg(feature = "async")]
pub use framed::DimeCodec;

use bytes::{Buf, BufMut, Bytes, BytesMut};

use crate::error::{FrameError, Result};

/// Fixed prefix: magic (4) + header length (4) + payload length (4) = 12 bytes.
pub const PREFIX_SIZE: usize = 12;

/// Magic number: ASCII "DiME" read as a big-endian `u32`.
pub const MAGIC: u32 = 0x4469_4D45;

/// Default maximum payload size: the largest length the wire can express.
pub const DEFAULT_MAX_PAYLOAD: usize = u32::MAX as usize;

const MAX_HEADER: usize = u32::MAX as usize;

/// A frame header: a JSON object whose key order is kept as sent.
pub type Header = serde_json::Map<String, serde_json::Value>;

/// One decoded frame.
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    /// The structured header.
    pub header: Header,
    /// The raw payload, possibly empty.
    pub payload: Bytes,
}

impl Frame {
    /// Create a new frame.
    pub fn new(header: Header, payload: impl Into<Bytes>) -> Self {
        Self {
            header,
            payload: payload.into(),
        }
    }

    /// A frame with an empty payload.
    pub fn control(header: Header) -> Self {
        Self::new(header, Bytes::new())
    }

    /// Look up a header field.
    pub fn get(&self, key: &str) -> Option<&serde_json::Value> {
        self.header.get(key)
    }

    /// Look up a string header field.
    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.header.get(key).and_then(serde_json::Value::as_str)
    }
}

/// Encode a frame into the wire format.
///
/// Wire format:
/// ```text
/// ┌────────────┬────────────┬────────────┬──────────────┬───────────┐
/// │ Magic (4B) │ Header len │ Payload    │ Header       │ Payload   │
/// │ "DiME"     │ H (4B BE)  │ P (4B BE)  │ H bytes JSON │ P bytes   │
/// └────────────┴────────────┴────────────┴──────────────┴───────────┘
/// ```
pub fn encode_frame(header: &Header, payload: &[u8], dst: &mut BytesMut) -> Result<()> {
    let header_bytes = serde_json::to_vec(header).map_err(|err| FrameError::MalformedHeader {
        reason: err.to_string(),
    })?;
    if header_bytes.len() > MAX_HEADER {
        return Err(FrameError::HeaderTooLarge {
            size: header_bytes.len(),
            max: MAX_HEADER,
        });
    }
    if payload.len() > u32::MAX as usize {
        return Err(FrameError::PayloadTooLarge {
            size: payload.len(),
            max: u32::MAX as usize,
        });
    }

    dst.reserve(PREFIX_SIZE + header_bytes.len() + payload.len());
    dst.put_u32(MAGIC);
    dst.put_u32(header_bytes.len() as u32);
    dst.put_u32(payload.len() as u32);
    dst.put_slice(&header_bytes);
    dst.put_slice(payload);
    Ok(())
}

/// Decode a frame from a buffer.
///
/// Returns `Ok(None)` if the buffer doesn't contain a complete frame yet.
/// The magic is checked as soon as the 12-byte prefix is buffered. On
/// success, consumes exactly one frame's bytes from the buffer.
pub fn decode_frame(src: &mut BytesMut, max_payload: usize) -> Result<Option<Frame>> {
    if src.len() < PREFIX_SIZE {
        return Ok(None);
    }

    let mut prefix = &src[..PREFIX_SIZE];
    let magic = prefix.get_u32();
    if magic != MAGIC {
        return Err(FrameError::InvalidMagic { found: magic });
    }
    let header_len = prefix.get_u32() as usize;
    let payload_len = prefix.get_u32() as usize;

    if payload_len > max_payload {
        return Err(FrameError::PayloadTooLarge {
            size: payload_len,
            max: max_payload,
        });
    }

    let total = PREFIX_SIZE
        .saturating_add(header_len)
        .saturating_add(payload_len);
    if src.len() < total {
        return Ok(None);
    }

    src.advance(PREFIX_SIZE);
    let header_bytes = src.split_to(header_len);
    let payload = src.split_to(payload_len).freeze();
    let header = parse_header(&header_bytes)?;

    Ok(Some(Frame { header, payload }))
}

fn parse_header(bytes: &[u8]) -> Result<Header> {
    let value: serde_json::Value =
        serde_json::from_slice(bytes).map_err(|err| FrameError::MalformedHeader {
            reason: err.to_string(),
        })?;
    match value {
        serde_json::Value::Object(map) => Ok(map),
        other => Err(FrameError::MalformedHeader {
            reason: format!("expected a JSON object, found {other}"),
        }),
    }
}

/// Configuration for the frame codec.
#[derive(Debug, Clone)]
pub struct FrameConfig {
    /// Maximum payload size in bytes. Default: `u32::MAX` (no policy limit).
    pub max_payload_size: usize,
    /// Read timeout for blocking operations.
    pub read_timeout: Option<std::time::Duration>,
    /// Write timeout for blocking operations.
    pub write_timeout: Option<std::time::Duration>,
}

impl Default for FrameConfig {
    fn default() -> Self {
        Self {
            max_payload_size: DEFAULT_MAX_PAYLOAD,
            read_timeout: None,
            write_timeout: None,
        }
    }
}

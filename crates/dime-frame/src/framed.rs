//! `tokio_util` codec for driving DiME frames over async streams.
//!
//! ```ignore
//! let mut framed = tokio_util::codec::Framed::new(stream, DimeCodec::default());
//! framed.send(Frame::control(header)).await?;
//! let reply = framed.next().await;
//! ```

use bytes::BytesMut;
use tokio_util::codec::{Decoder, Encoder};

use crate::codec::{decode_frame, encode_frame, Frame, DEFAULT_MAX_PAYLOAD};
use crate::error::{FrameError, Result};

/// Frame codec for `tokio_util::codec::Framed`.
#[derive(Debug, Clone)]
pub struct DimeCodec {
    max_payload_size: usize,
}

impl DimeCodec {
    pub fn new(max_payload_size: usize) -> Self {
        Self { max_payload_size }
    }

    pub fn max_payload_size(&self) -> usize {
        self.max_payload_size
    }
}

impl Default for DimeCodec {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_PAYLOAD)
    }
}

impl Decoder for DimeCodec {
    type Item = Frame;
    type Error = FrameError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Frame>> {
        decode_frame(src, self.max_payload_size)
    }
}

impl Encoder<Frame> for DimeCodec {
    type Error = FrameError;

    fn encode(&mut self, item: Frame, dst: &mut BytesMut) -> Result<()> {
        if item.payload.len() > self.max_payload_size {
            return Err(FrameError::PayloadTooLarge {
                size: item.payload.len(),
                max: self.max_payload_size,
            });
        }
        encode_frame(&item.header, &item.payload, dst)
    }
}

/// Errors that can occur during frame encoding/decoding.
///
/// Every variant except an oversized outbound frame leaves the stream at an
/// unknown frame boundary, so the connection cannot be reused.
#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    /// The frame prefix does not start with `"DiME"`.
    #[error("invalid frame magic 0x{found:08X} (expected 0x44694D45 \"DiME\")")]
    InvalidMagic { found: u32 },

    /// The encoded header does not fit the 32-bit length field.
    #[error("header too large ({size} bytes, max {max})")]
    HeaderTooLarge { size: usize, max: usize },

    /// The payload exceeds the configured maximum size.
    #[error("payload too large ({size} bytes, max {max})")]
    PayloadTooLarge { size: usize, max: usize },

    /// The header bytes are not a UTF-8 JSON object.
    #[error("malformed frame header: {reason}")]
    MalformedHeader { reason: String },

    /// An I/O error occurred while reading or writing frames.
    #[error("frame I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The connection was closed before a complete frame was received.
    #[error("connection closed (incomplete frame)")]
    ConnectionClosed,
}

pub type Result<T> = std::result::Result<T, FrameError>;

impl From<dime_transport::TransportError> for FrameError {
    fn from(err: dime_transport::TransportError) -> Self {
        use dime_transport::TransportError;

        match err {
            TransportError::Io(io) | TransportError::Accept(io) => FrameError::Io(io),
            TransportError::Bind { source, .. } | TransportError::Connect { source, .. } => {
                FrameError::Io(source)
            }
            other => FrameError::Io(std::io::Error::other(other.to_string())),
        }
    }
}

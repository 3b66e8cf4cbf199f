use std::io;

/// Errors that can occur in transport operations.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// The address string could not be parsed.
    #[error("invalid address '{address}': {reason}")]
    InvalidAddress { address: String, reason: String },

    /// Failed to bind to the specified address.
    #[error("failed to bind to {address}: {source}")]
    Bind { address: String, source: io::Error },

    /// Failed to connect to the specified address.
    #[error("failed to connect to {address}: {source}")]
    Connect { address: String, source: io::Error },

    /// Failed to accept an incoming connection.
    #[error("failed to accept connection: {0}")]
    Accept(io::Error),

    /// An I/O error occurred on the transport stream.
    #[error("transport I/O error: {0}")]
    Io(#[from] io::Error),

    /// The transport has been shut down.
    #[error("transport shut down")]
    Shutdown,
}

impl TransportError {
    /// The underlying I/O error, if this error wraps one.
    pub fn io_source(&self) -> Option<&io::Error> {
        match self {
            Self::Bind { source, .. } | Self::Connect { source, .. } => Some(source),
            Self::Accept(source) | Self::Io(source) => Some(source),
            Self::InvalidAddress { .. } | Self::Shutdown => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, TransportError>;

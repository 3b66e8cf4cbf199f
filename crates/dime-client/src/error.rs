use dime_value::{DecodeError, EncodeError};

/// Errors that can occur in client operations.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// Transport-level error (connect, socket options).
    #[error("transport error: {0}")]
    Transport(#[from] dime_transport::TransportError),

    /// Frame-level error: I/O, timeout, bad magic or malformed header.
    #[error("frame error: {0}")]
    Frame(#[from] dime_frame::FrameError),

    /// The broker sent a response this client cannot interpret.
    #[error("protocol error: {0}")]
    Protocol(String),

    /// Serialization negotiation failed.
    #[error("handshake failed: {0}")]
    Handshake(String),

    /// The broker answered a command with a negative status.
    #[error("{command} failed: {message}")]
    Command {
        command: &'static str,
        message: String,
    },

    /// A value could not be encoded; nothing was sent for it.
    #[error("cannot encode variable '{varname}': {source}")]
    Encode {
        varname: String,
        #[source]
        source: EncodeError,
    },

    /// A delivered payload could not be decoded.
    #[error("cannot decode variable '{varname}': {source}")]
    Decode {
        varname: String,
        #[source]
        source: DecodeError,
    },

    /// A request header could not be serialized.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    /// An earlier fatal error invalidated the session.
    #[error("session failed: {0}")]
    SessionFailed(String),

    /// The session was closed by the caller.
    #[error("session closed")]
    Closed,
}

impl ClientError {
    /// Whether this error invalidates the whole session.
    ///
    /// Command and encode failures are local to the call that raised them.
    pub fn is_fatal(&self) -> bool {
        !matches!(
            self,
            ClientError::Command { .. } | ClientError::Encode { .. } | ClientError::Json(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, ClientError>;

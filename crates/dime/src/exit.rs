use std::fmt;
use std::io;

use dime_client::ClientError;
use dime_frame::FrameError;
use dime_transport::TransportError;

pub const SUCCESS: i32 = 0;
pub const FAILURE: i32 = 1;
pub const TRANSPORT_ERROR: i32 = 3;
pub const COMMAND_REJECTED: i32 = 4;
pub const PROTOCOL_ERROR: i32 = 5;
pub const PERMISSION_DENIED: i32 = 50;
pub const DATA_INVALID: i32 = 60;
pub const USAGE: i32 = 64;
pub const TIMEOUT: i32 = 124;

pub type CliResult<T> = Result<T, CliError>;

#[derive(Debug)]
pub struct CliError {
    pub code: i32,
    pub message: String,
}

impl CliError {
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    pub fn usage(message: impl Into<String>) -> Self {
        Self::new(USAGE, message)
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for CliError {}

fn io_code(err: &io::Error) -> i32 {
    match err.kind() {
        io::ErrorKind::PermissionDenied => PERMISSION_DENIED,
        io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock => TIMEOUT,
        io::ErrorKind::ConnectionRefused
        | io::ErrorKind::NotFound
        | io::ErrorKind::BrokenPipe
        | io::ErrorKind::ConnectionReset => FAILURE,
        _ => TRANSPORT_ERROR,
    }
}

fn transport_code(err: &TransportError) -> i32 {
    match err {
        TransportError::InvalidAddress { .. } => USAGE,
        other => other.io_source().map_or(TRANSPORT_ERROR, io_code),
    }
}

fn frame_code(err: &FrameError) -> i32 {
    match err {
        FrameError::Io(source) => io_code(source),
        FrameError::ConnectionClosed => FAILURE,
        FrameError::PayloadTooLarge { .. } | FrameError::HeaderTooLarge { .. } => DATA_INVALID,
        FrameError::InvalidMagic { .. } | FrameError::MalformedHeader { .. } => PROTOCOL_ERROR,
    }
}

/// Map a client error to a process exit code, keeping the message.
pub fn client_error(context: &str, err: ClientError) -> CliError {
    let code = match &err {
        ClientError::Transport(err) => transport_code(err),
        ClientError::Frame(err) => frame_code(err),
        ClientError::Command { .. } => COMMAND_REJECTED,
        ClientError::Encode { .. } | ClientError::Decode { .. } | ClientError::Json(_) => {
            DATA_INVALID
        }
        ClientError::Protocol(_) | ClientError::Handshake(_) => PROTOCOL_ERROR,
        ClientError::SessionFailed(_) | ClientError::Closed => FAILURE,
    };
    CliError::new(code, format!("{context}: {err}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn command_rejection_has_its_own_code() {
        let err = client_error(
            "dime send",
            ClientError::Command {
                command: "send",
                message: "No such group exists: x".to_string(),
            },
        );
        assert_eq!(err.code, COMMAND_REJECTED);
        assert_eq!(err.to_string(), "dime send: send failed: No such group exists: x");
    }

    #[test]
    fn timeouts_map_to_timeout() {
        let io = io::Error::new(io::ErrorKind::WouldBlock, "timed out");
        let err = client_error("wait failed", ClientError::Frame(FrameError::Io(io)));
        assert_eq!(err.code, TIMEOUT);
    }

    #[test]
    fn bad_address_is_a_usage_error() {
        let err = TransportError::InvalidAddress {
            address: "udp://x".to_string(),
            reason: "unsupported protocol 'udp'".to_string(),
        };
        assert_eq!(client_error("connect failed", err.into()).code, USAGE);
    }

    #[test]
    fn refused_connection_is_a_plain_failure() {
        let err = TransportError::Connect {
            address: "/tmp/none.sock".to_string(),
            source: io::Error::from(io::ErrorKind::ConnectionRefused),
        };
        assert_eq!(client_error("connect failed", err.into()).code, FAILURE);
    }
}

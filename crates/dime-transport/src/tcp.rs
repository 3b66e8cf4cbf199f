use std::net::TcpStream;

use tracing::debug;

use crate::error::{Result, TransportError};
use crate::traits::IpcStream;

/// Connect to a TCP broker (blocking).
///
/// Nagle's algorithm is disabled: every request is a small header frame
/// followed by a wait for the reply.
pub fn connect(host: &str, port: u16) -> Result<IpcStream> {
    let address = format!("{host}:{port}");
    let stream = TcpStream::connect((host, port)).map_err(|e| TransportError::Connect {
        address: address.clone(),
        source: e,
    })?;
    stream.set_nodelay(true).map_err(|e| TransportError::Connect {
        address: address.clone(),
        source: e,
    })?;
    debug!(%address, "connected to tcp broker");
    Ok(IpcStream::from_tcp(stream))
}

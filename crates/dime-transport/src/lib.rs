//! Byte-stream transports for DiME clients.
//!
//! Provides a unified interface over the reliable, ordered channels a DiME
//! broker listens on:
//! - Unix domain sockets (`ipc://` / `unix://`)
//! - TCP (`tcp://host:port`)
//!
//! This is the lowest layer of the client stack. Everything else builds on
//! top of the [`IpcStream`] type provided here.

pub mod address;
pub mod error;
pub mod tcp;
pub mod traits;

#[cfg(unix)]
pub mod uds;

pub use address::{Address, DEFAULT_ADDRESS, DEFAULT_SOCKET_PATH};
pub use error::{Result, TransportError};
pub use traits::{connect, IpcStream};

#[cfg(unix)]
pub use uds::UnixDomainSocket;

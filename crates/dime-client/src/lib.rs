//! Client side of the DiME session protocol.
//!
//! A [`Client`] holds one broker connection. Every call is a complete
//! request/response turn; concurrent callers are serialized per connection.
//!
//! ```no_run
//! use dime_client::Client;
//! use dime_value::Value;
//!
//! # fn main() -> dime_client::Result<()> {
//! let client = Client::connect("ipc:///tmp/dime.sock")?;
//! client.join(&["matlab"])?;
//! client.send_map("python", [("x", Value::F64(1.5))])?;
//! let received = client.sync_map(None)?;
//! # let _ = received;
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod connector;
pub mod error;
pub mod handshake;
pub mod protocol;
pub mod session;

pub use client::Client;
pub use connector::{connect, connect_with_config, ClientConfig};
pub use error::{ClientError, Result};
pub use handshake::handshake_client;
pub use protocol::{Reply, Request};
pub use session::{Session, SessionState};

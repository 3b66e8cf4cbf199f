//! DiME pub/sub client.
//!
//! Connects to a DiME broker and exchanges typed variables (scalars, complex
//! numbers, N-dimensional numeric arrays, text, lists and maps) with other
//! clients addressed by group name.
//!
//! # Crate Structure
//!
//! - [`transport`]: byte-stream transports (Unix sockets, TCP) and addresses
//! - [`frame`]: the `DiME` frame format carrying a JSON header and a payload
//! - [`value`]: the value model and the `dimeb` codec
//! - [`client`]: the session protocol and the thread-safe [`Client`]
//!
//! ```no_run
//! use dime::{Client, Value};
//!
//! let client = Client::connect("ipc:///tmp/dime.sock")?;
//! client.join(&["python"])?;
//! client.send("matlab", "gain", &Value::F64(0.5))?;
//! for (name, value) in client.sync(None)? {
//!     println!("{name} = {value:?}");
//! }
//! # Ok::<(), dime::client::ClientError>(())
//! ```

/// Re-export transport types.
pub mod transport {
    pub use dime_transport::*;
}

/// Re-export frame types.
pub mod frame {
    pub use dime_frame::*;
}

/// Re-export the value model and codec.
pub mod value {
    pub use dime_value::*;
}

/// Re-export session types.
pub mod client {
    pub use dime_client::*;
}

pub use dime_client::{Client, ClientConfig, ClientError};
pub use dime_value::{NumericArray, Order, Value};

use std::time::Duration;

use dime_frame::{FrameConfig, FrameReader, FrameWriter, DEFAULT_MAX_PAYLOAD};
use dime_transport::Address;
use tracing::info;

use crate::client::Client;
use crate::error::Result;
use crate::session::Session;

/// Connection settings.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Serialization requested during the handshake. Only `dimeb` is
    /// implemented.
    pub serialization: String,
    /// TLS flag sent during the handshake. A broker that answers with
    /// `tls: true` is refused.
    pub tls: bool,
    /// Read timeout; expiry fails the session.
    pub read_timeout: Option<Duration>,
    /// Write timeout; expiry fails the session.
    pub write_timeout: Option<Duration>,
    /// Largest inbound or outbound payload accepted.
    pub max_payload_size: usize,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            serialization: dime_value::SERIALIZATION.to_string(),
            tls: false,
            read_timeout: None,
            write_timeout: None,
            max_payload_size: DEFAULT_MAX_PAYLOAD,
        }
    }
}

/// Connect to a broker address such as `ipc:///tmp/dime.sock` or
/// `tcp://localhost:5000`.
pub fn connect(address: &str) -> Result<Client> {
    let address = Address::parse(address)?;
    connect_with_config(&address, &ClientConfig::default())
}

/// Connect with explicit configuration.
pub fn connect_with_config(address: &Address, config: &ClientConfig) -> Result<Client> {
    info!(%address, "connecting");
    let stream = dime_transport::connect(address)?;
    let reader_stream = stream.try_clone()?;

    let frame_config = FrameConfig {
        max_payload_size: config.max_payload_size,
        read_timeout: config.read_timeout,
        write_timeout: config.write_timeout,
    };

    let reader = FrameReader::with_config_ipc(reader_stream, frame_config.clone())?;
    let writer = FrameWriter::with_config_ipc(stream, frame_config)?;

    let mut session = Session::new(reader, writer);
    session.handshake(&config.serialization, config.tls)?;
    info!(%address, serialization = session.serialization(), "connected");

    Ok(Client::from_session(address.clone(), session))
}

use std::io::{Read, Write};

use dime_frame::{FrameReader, FrameWriter};
use tracing::debug;

use crate::error::{ClientError, Result};
use crate::protocol::{recv_reply, send_request, Request};

/// Perform the client-side handshake.
///
/// Sends `{command: "handshake", serialization, tls}` and awaits exactly one
/// reply. Returns the serialization the broker agreed to, which is always
/// the one requested.
pub fn handshake_client<R: Read, W: Write>(
    reader: &mut FrameReader<R>,
    writer: &mut FrameWriter<W>,
    serialization: &str,
    tls: bool,
) -> Result<String> {
    if serialization != dime_value::SERIALIZATION {
        return Err(ClientError::Handshake(format!(
            "unsupported serialization '{serialization}' (only '{}' is implemented)",
            dime_value::SERIALIZATION
        )));
    }

    send_request(writer, &Request::Handshake { serialization, tls }, b"")?;
    let (reply, _) = recv_reply(reader, serialization)?;

    match reply.status {
        None => {
            return Err(ClientError::Protocol(
                "handshake response carried no status".to_string(),
            ))
        }
        Some(status) if status < 0 => {
            return Err(ClientError::Handshake(
                reply
                    .error
                    .unwrap_or_else(|| format!("broker refused handshake (status {status})")),
            ))
        }
        Some(_) => {}
    }

    let negotiated = reply.serialization.unwrap_or_default();
    if negotiated != serialization {
        return Err(ClientError::Handshake(format!(
            "unsupported serialization '{negotiated}' (requested '{serialization}')"
        )));
    }

    if reply.tls == Some(true) {
        return Err(ClientError::Handshake(
            "broker requested TLS, which this client does not implement".to_string(),
        ));
    }

    debug!(serialization = %negotiated, "handshake complete");
    Ok(negotiated)
}

#[cfg(test)]
mod tests {
    use std::os::unix::net::UnixStream;
    use std::thread;

    use serde_json::json;

    use super::*;

    type Reader = FrameReader<UnixStream>;
    type Writer = FrameWriter<UnixStream>;

    fn header(value: serde_json::Value) -> dime_frame::Header {
        match value {
            serde_json::Value::Object(map) => map,
            _ => panic!("not an object"),
        }
    }

    /// Client halves plus a broker thread that answers one handshake with
    /// `reply`, returning the request header it saw.
    fn pair_with_reply(
        reply: serde_json::Value,
    ) -> (Reader, Writer, thread::JoinHandle<dime_frame::Header>) {
        let (client, server) = UnixStream::pair().unwrap();
        let reader = FrameReader::new(client.try_clone().unwrap());
        let writer = FrameWriter::new(client);

        let broker = thread::spawn(move || {
            let mut reader = FrameReader::new(server.try_clone().unwrap());
            let mut writer = FrameWriter::new(server);
            let request = reader.read_frame().unwrap();
            writer.send(&header(reply), b"").unwrap();
            request.header
        });
        (reader, writer, broker)
    }

    #[test]
    fn handshake_succeeds() {
        let (mut reader, mut writer, broker) =
            pair_with_reply(json!({"status": 0, "serialization": "dimeb"}));

        let negotiated = handshake_client(&mut reader, &mut writer, "dimeb", false).unwrap();
        assert_eq!(negotiated, "dimeb");

        let request = broker.join().unwrap();
        assert_eq!(
            serde_json::Value::Object(request),
            json!({"command": "handshake", "serialization": "dimeb", "tls": false})
        );
    }

    #[test]
    fn negative_status_fails_with_message() {
        let (mut reader, mut writer, broker) =
            pair_with_reply(json!({"status": -1, "error": "bad serialization"}));

        let err = handshake_client(&mut reader, &mut writer, "dimeb", false).unwrap_err();
        assert!(matches!(err, ClientError::Handshake(ref msg) if msg == "bad serialization"));
        broker.join().unwrap();
    }

    #[test]
    fn serialization_mismatch_fails() {
        let (mut reader, mut writer, broker) =
            pair_with_reply(json!({"status": 0, "serialization": "pickle"}));

        let err = handshake_client(&mut reader, &mut writer, "dimeb", false).unwrap_err();
        assert!(matches!(err, ClientError::Handshake(_)));
        assert!(err.to_string().contains("pickle"));
        broker.join().unwrap();
    }

    #[test]
    fn tls_upgrade_refused() {
        let (mut reader, mut writer, broker) =
            pair_with_reply(json!({"status": 0, "serialization": "dimeb", "tls": true}));

        let err = handshake_client(&mut reader, &mut writer, "dimeb", true).unwrap_err();
        assert!(matches!(err, ClientError::Handshake(_)));
        let request = broker.join().unwrap();
        assert_eq!(request.get("tls"), Some(&json!(true)));
    }

    #[test]
    fn unsupported_serialization_rejected_before_sending() {
        let (client, server) = UnixStream::pair().unwrap();
        let mut reader = FrameReader::new(client.try_clone().unwrap());
        let mut writer = FrameWriter::new(client);

        let err = handshake_client(&mut reader, &mut writer, "json", false).unwrap_err();
        assert!(matches!(err, ClientError::Handshake(_)));

        drop(writer);
        drop(reader);
        let mut broker = FrameReader::new(server);
        assert!(matches!(
            broker.read_frame().unwrap_err(),
            dime_frame::FrameError::ConnectionClosed
        ));
    }

    #[test]
    fn closed_connection_is_frame_error() {
        let (client, server) = UnixStream::pair().unwrap();
        let mut reader = FrameReader::new(client.try_clone().unwrap());
        let mut writer = FrameWriter::new(client);
        drop(server);

        let err = handshake_client(&mut reader, &mut writer, "dimeb", false).unwrap_err();
        assert!(matches!(err, ClientError::Frame(_)));
        assert!(err.is_fatal());
    }
}

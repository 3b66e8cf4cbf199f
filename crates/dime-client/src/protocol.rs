//! Request and response headers.
//!
//! Requests carry a `command` field. Responses either carry a numeric
//! `status` (negative means failure, with a sibling `error` message) or are
//! forwarded variables carrying `varname` and `serialization`.

use std::io::{Read, Write};

use bytes::Bytes;
use dime_frame::{FrameReader, FrameWriter, Header};
use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::error::{ClientError, Result};

/// A request header, serialized with its `command` tag first.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "command", rename_all = "lowercase")]
pub enum Request<'a> {
    Handshake {
        serialization: &'a str,
        tls: bool,
    },
    Join {
        name: Vec<&'a str>,
    },
    Leave {
        name: Vec<&'a str>,
    },
    Devices,
    Send {
        name: &'a str,
        varname: &'a str,
        serialization: &'a str,
    },
    Broadcast {
        varname: &'a str,
        serialization: &'a str,
    },
    /// `n < 0` asks for everything queued.
    Sync {
        n: i64,
    },
    Wait,
}

impl Request<'_> {
    /// The command name as sent on the wire.
    pub fn command(&self) -> &'static str {
        match self {
            Request::Handshake { .. } => "handshake",
            Request::Join { .. } => "join",
            Request::Leave { .. } => "leave",
            Request::Devices => "devices",
            Request::Send { .. } => "send",
            Request::Broadcast { .. } => "broadcast",
            Request::Sync { .. } => "sync",
            Request::Wait => "wait",
        }
    }

    /// Render as a frame header.
    pub fn to_header(&self) -> Result<Header> {
        match serde_json::to_value(self)? {
            serde_json::Value::Object(map) => Ok(map),
            other => Err(ClientError::Protocol(format!(
                "request rendered as non-object header: {other}"
            ))),
        }
    }
}

/// The fields of a response header this client looks at.
///
/// Unknown fields are ignored.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct Reply {
    #[serde(default)]
    pub status: Option<i64>,
    #[serde(default)]
    pub error: Option<String>,
    /// Set (as `true` or a non-zero number) on broker notifications.
    #[serde(default)]
    pub meta: Option<serde_json::Value>,
    #[serde(default)]
    pub command: Option<String>,
    #[serde(default)]
    pub serialization: Option<String>,
    #[serde(default)]
    pub varname: Option<String>,
    #[serde(default)]
    pub devices: Option<Vec<String>>,
    #[serde(default)]
    pub n: Option<i64>,
    #[serde(default)]
    pub tls: Option<bool>,
}

impl Reply {
    /// Parse a received header.
    pub fn from_header(header: Header) -> Result<Self> {
        serde_json::from_value(serde_json::Value::Object(header))
            .map_err(|err| ClientError::Protocol(format!("malformed response header: {err}")))
    }

    /// A positive-status notification that is not a reply to any request.
    pub fn is_meta(&self) -> bool {
        let flagged = match &self.meta {
            Some(serde_json::Value::Bool(flag)) => *flag,
            Some(serde_json::Value::Number(n)) => n.as_f64().is_some_and(|v| v != 0.0),
            _ => false,
        };
        flagged && self.status.is_some_and(|status| status > 0)
    }

    /// Turn a status reply into a result.
    ///
    /// A missing status is a protocol violation; a negative one is a
    /// command failure carrying the broker's message.
    pub fn check(self, command: &'static str) -> Result<Self> {
        match self.status {
            None => Err(ClientError::Protocol(format!(
                "{command} response carried no status"
            ))),
            Some(status) if status < 0 => Err(ClientError::Command {
                command,
                message: self
                    .error
                    .unwrap_or_else(|| format!("status {status}")),
            }),
            Some(_) => Ok(self),
        }
    }
}

/// Send one request frame.
pub(crate) fn send_request<W: Write>(
    writer: &mut FrameWriter<W>,
    request: &Request<'_>,
    payload: &[u8],
) -> Result<()> {
    let header = request.to_header()?;
    trace!(command = request.command(), payload_len = payload.len(), "sending request");
    writer.send(&header, payload)?;
    Ok(())
}

/// Receive the next frame that is not a broker notification.
///
/// `reregister` notifications that confirm `serialization` are skipped.
/// Any other notification is a handshake failure.
pub(crate) fn recv_reply<R: Read>(
    reader: &mut FrameReader<R>,
    serialization: &str,
) -> Result<(Reply, Bytes)> {
    loop {
        let frame = reader.read_frame()?;
        let reply = Reply::from_header(frame.header)?;
        if !reply.is_meta() {
            return Ok((reply, frame.payload));
        }

        match (reply.command.as_deref(), reply.serialization.as_deref()) {
            (Some("reregister"), Some(requested)) if requested == serialization => {
                trace!(serialization, "broker re-registered serialization");
            }
            (Some("reregister"), other) => {
                return Err(ClientError::Handshake(format!(
                    "broker re-registered unsupported serialization {}",
                    other.unwrap_or("<none>")
                )));
            }
            (command, _) => {
                return Err(ClientError::Handshake(format!(
                    "unknown broker notification '{}'",
                    command.unwrap_or("<none>")
                )));
            }
        }
    }
}

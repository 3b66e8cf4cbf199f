//! The session state machine.
//!
//! A [`Session`] owns both halves of one broker connection and runs every
//! command as a complete request/response turn. Methods take `&mut self`,
//! so a session can never have two receives outstanding.

use std::borrow::Borrow;
use std::collections::BTreeMap;
use std::fmt;
use std::io::{Read, Write};

use bytes::BytesMut;
use dime_frame::{FrameReader, FrameWriter};
use dime_value::{dimeb, Value};
use tracing::{debug, info, warn};

use crate::error::{ClientError, Result};
use crate::handshake::handshake_client;
use crate::protocol::{recv_reply, send_request, Reply, Request};

/// Lifecycle of a session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionState {
    /// Connected, handshake not yet complete.
    Handshaking,
    /// Handshake complete; commands may be issued.
    Ready,
    /// Closed by the caller.
    Closed,
    /// Invalidated by a fatal error, described here.
    Failed(String),
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionState::Handshaking => f.write_str("handshaking"),
            SessionState::Ready => f.write_str("ready"),
            SessionState::Closed => f.write_str("closed"),
            SessionState::Failed(cause) => write!(f, "failed ({cause})"),
        }
    }
}

/// One broker connection.
pub struct Session<R, W> {
    reader: FrameReader<R>,
    writer: FrameWriter<W>,
    serialization: String,
    state: SessionState,
    scratch: BytesMut,
}

impl<R: Read, W: Write> Session<R, W> {
    /// Wrap a connected stream pair. Call [`Session::handshake`] next.
    pub fn new(reader: FrameReader<R>, writer: FrameWriter<W>) -> Self {
        Self {
            reader,
            writer,
            serialization: dimeb::SERIALIZATION.to_string(),
            state: SessionState::Handshaking,
            scratch: BytesMut::new(),
        }
    }

    /// Negotiate the serialization and move to `Ready`.
    pub fn handshake(&mut self, serialization: &str, tls: bool) -> Result<()> {
        if self.state != SessionState::Handshaking {
            return Err(ClientError::Protocol(format!(
                "handshake attempted in state {}",
                self.state
            )));
        }
        match handshake_client(&mut self.reader, &mut self.writer, serialization, tls) {
            Ok(negotiated) => {
                self.serialization = negotiated;
                self.state = SessionState::Ready;
                Ok(())
            }
            Err(err) => {
                self.fail(&err);
                Err(err)
            }
        }
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    /// The negotiated serialization name.
    pub fn serialization(&self) -> &str {
        &self.serialization
    }

    /// Register this client under each group name.
    pub fn join<S: AsRef<str>>(&mut self, names: &[S]) -> Result<()> {
        let name: Vec<&str> = names.iter().map(|n| n.as_ref()).collect();
        self.guarded(|session| session.simple(&Request::Join { name }))
            .map(|_| ())
    }

    /// Deregister this client from each group name.
    pub fn leave<S: AsRef<str>>(&mut self, names: &[S]) -> Result<()> {
        let name: Vec<&str> = names.iter().map(|n| n.as_ref()).collect();
        self.guarded(|session| session.simple(&Request::Leave { name }))
            .map(|_| ())
    }

    /// Names of all groups that currently have members.
    pub fn devices(&mut self) -> Result<Vec<String>> {
        self.guarded(|session| {
            let reply = session.simple(&Request::Devices)?;
            reply.devices.ok_or_else(|| {
                ClientError::Protocol("devices response carried no device list".to_string())
            })
        })
    }

    /// Send one variable to every member of group `name`.
    pub fn send(&mut self, name: &str, varname: &str, value: &Value) -> Result<()> {
        self.send_map(name, [(varname, value)])
    }

    /// Send each variable to group `name`, in iteration order.
    ///
    /// Each variable is its own request/response turn. On error, variables
    /// before the failing one have been delivered and later ones have not.
    pub fn send_map<I, K, V>(&mut self, name: &str, vars: I) -> Result<()>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Borrow<Value>,
    {
        self.guarded(|session| {
            for (varname, value) in vars {
                session.push_var(Some(name), varname.as_ref(), value.borrow())?;
            }
            Ok(())
        })
    }

    /// Send one variable to every other connected client.
    pub fn broadcast(&mut self, varname: &str, value: &Value) -> Result<()> {
        self.broadcast_map([(varname, value)])
    }

    /// Broadcast each variable, in iteration order. Partial delivery on
    /// error works as in [`Session::send_map`].
    pub fn broadcast_map<I, K, V>(&mut self, vars: I) -> Result<()>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Borrow<Value>,
    {
        self.guarded(|session| {
            for (varname, value) in vars {
                session.push_var(None, varname.as_ref(), value.borrow())?;
            }
            Ok(())
        })
    }

    /// Receive up to `limit` queued variables (all of them for `None`).
    ///
    /// Variables in a serialization other than the negotiated one are
    /// skipped but still count against the limit, so the request is
    /// repeated for the shortfall until nothing more was skipped. The
    /// broker must end every sync reply with a status frame, even when
    /// nothing is queued.
    ///
    /// Returns `(varname, value)` pairs in arrival order.
    pub fn sync(&mut self, limit: Option<u32>) -> Result<Vec<(String, Value)>> {
        self.guarded(|session| {
            let mut received = Vec::new();
            let mut request = limit;
            loop {
                let skipped = session.sync_once(request, &mut received)?;
                match request {
                    Some(n) if n > 0 && skipped > 0 => {
                        debug!(skipped, "sync shortfall, requesting more");
                        request = Some(skipped);
                    }
                    _ => break,
                }
            }
            Ok(received)
        })
    }

    /// [`Session::sync`] collected into a map; later variables replace
    /// earlier ones with the same name.
    pub fn sync_map(&mut self, limit: Option<u32>) -> Result<BTreeMap<String, Value>> {
        Ok(self.sync(limit)?.into_iter().collect())
    }

    /// Block until at least one variable is queued for this client.
    ///
    /// Returns the queued count when the broker reports it.
    pub fn wait(&mut self) -> Result<Option<i64>> {
        self.guarded(|session| Ok(session.simple(&Request::Wait)?.n))
    }

    /// Flush pending output and move to `Closed`.
    ///
    /// The streams are released when the session is dropped.
    pub fn close(&mut self) -> Result<()> {
        if self.state == SessionState::Closed {
            return Ok(());
        }
        let flushed = self.writer.flush();
        self.state = SessionState::Closed;
        info!("session closed");
        flushed.map_err(ClientError::from)
    }

    /// Borrow the frame reader.
    pub fn reader(&self) -> &FrameReader<R> {
        &self.reader
    }

    /// Borrow the frame writer.
    pub fn writer(&self) -> &FrameWriter<W> {
        &self.writer
    }

    /// Run `op` in the `Ready` state, failing the session on fatal errors.
    fn guarded<T>(&mut self, op: impl FnOnce(&mut Self) -> Result<T>) -> Result<T> {
        match &self.state {
            SessionState::Ready => {}
            SessionState::Failed(cause) => return Err(ClientError::SessionFailed(cause.clone())),
            SessionState::Closed => return Err(ClientError::Closed),
            SessionState::Handshaking => {
                return Err(ClientError::Protocol(
                    "command issued before handshake".to_string(),
                ))
            }
        }

        let result = op(self);
        if let Err(err) = &result {
            if err.is_fatal() {
                self.fail(err);
            }
        }
        result
    }

    fn fail(&mut self, err: &ClientError) {
        warn!(error = %err, "session failed");
        self.state = SessionState::Failed(err.to_string());
    }

    /// One request, one status reply.
    fn simple(&mut self, request: &Request<'_>) -> Result<Reply> {
        send_request(&mut self.writer, request, b"")?;
        let (reply, _) = recv_reply(&mut self.reader, &self.serialization)?;
        reply.check(request.command())
    }

    fn push_var(&mut self, name: Option<&str>, varname: &str, value: &Value) -> Result<()> {
        self.scratch.clear();
        dimeb::encode_into(value, &mut self.scratch).map_err(|source| ClientError::Encode {
            varname: varname.to_string(),
            source,
        })?;

        let serialization = self.serialization.as_str();
        let request = match name {
            Some(name) => Request::Send {
                name,
                varname,
                serialization,
            },
            None => Request::Broadcast {
                varname,
                serialization,
            },
        };
        send_request(&mut self.writer, &request, &self.scratch)?;
        let (reply, _) = recv_reply(&mut self.reader, &self.serialization)?;
        reply.check(request.command())?;
        debug!(
            command = request.command(),
            varname,
            bytes = self.scratch.len(),
            "variable delivered"
        );
        Ok(())
    }

    /// One sync request/reply stream. Returns how many entries were skipped.
    fn sync_once(
        &mut self,
        limit: Option<u32>,
        received: &mut Vec<(String, Value)>,
    ) -> Result<u32> {
        let n = limit.map_or(-1, i64::from);
        send_request(&mut self.writer, &Request::Sync { n }, b"")?;

        let mut skipped = 0u32;
        loop {
            let (reply, payload) = recv_reply(&mut self.reader, &self.serialization)?;
            if reply.status.is_some() {
                reply.check("sync")?;
                break;
            }

            if reply.serialization.as_deref() != Some(self.serialization.as_str()) {
                warn!(
                    varname = reply.varname.as_deref().unwrap_or("<none>"),
                    serialization = reply.serialization.as_deref().unwrap_or("<none>"),
                    "skipping variable in foreign serialization"
                );
                skipped += 1;
                continue;
            }

            let varname = reply.varname.ok_or_else(|| {
                ClientError::Protocol("sync entry carried no varname".to_string())
            })?;
            let value = dimeb::from_slice(&payload).map_err(|source| ClientError::Decode {
                varname: varname.clone(),
                source,
            })?;
            received.push((varname, value));
        }

        debug!(n, received = received.len(), skipped, "sync complete");
        Ok(skipped)
    }
}

impl<R, W> fmt::Debug for Session<R, W> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("serialization", &self.serialization)
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}

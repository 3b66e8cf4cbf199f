use std::borrow::Borrow;
use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use dime_transport::{Address, IpcStream, TransportError};
use dime_value::Value;

use crate::connector::{self, ClientConfig};
use crate::error::Result;
use crate::session::{Session, SessionState};

/// A connected DiME client.
///
/// All methods take `&self`; calls from different threads are serialized so
/// that each request/response turn completes before the next one starts.
pub struct Client {
    address: Address,
    session: Mutex<Session<IpcStream, IpcStream>>,
}

impl Client {
    /// Connect and handshake with default settings.
    pub fn connect(address: &str) -> Result<Self> {
        connector::connect(address)
    }

    /// Connect and handshake with explicit settings.
    pub fn connect_with_config(address: &Address, config: &ClientConfig) -> Result<Self> {
        connector::connect_with_config(address, config)
    }

    pub(crate) fn from_session(address: Address, session: Session<IpcStream, IpcStream>) -> Self {
        Self {
            address,
            session: Mutex::new(session),
        }
    }

    /// The broker address this client is connected to.
    pub fn address(&self) -> &Address {
        &self.address
    }

    /// Current session state.
    pub fn state(&self) -> SessionState {
        self.lock().state().clone()
    }

    /// The negotiated serialization name.
    pub fn serialization(&self) -> String {
        self.lock().serialization().to_string()
    }

    pub fn join<S: AsRef<str>>(&self, names: &[S]) -> Result<()> {
        self.lock().join(names)
    }

    pub fn leave<S: AsRef<str>>(&self, names: &[S]) -> Result<()> {
        self.lock().leave(names)
    }

    pub fn devices(&self) -> Result<Vec<String>> {
        self.lock().devices()
    }

    pub fn send(&self, name: &str, varname: &str, value: &Value) -> Result<()> {
        self.lock().send(name, varname, value)
    }

    /// See [`Session::send_map`].
    pub fn send_map<I, K, V>(&self, name: &str, vars: I) -> Result<()>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Borrow<Value>,
    {
        self.lock().send_map(name, vars)
    }

    pub fn broadcast(&self, varname: &str, value: &Value) -> Result<()> {
        self.lock().broadcast(varname, value)
    }

    /// See [`Session::broadcast_map`].
    pub fn broadcast_map<I, K, V>(&self, vars: I) -> Result<()>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Borrow<Value>,
    {
        self.lock().broadcast_map(vars)
    }

    /// See [`Session::sync`].
    pub fn sync(&self, limit: Option<u32>) -> Result<Vec<(String, Value)>> {
        self.lock().sync(limit)
    }

    pub fn sync_map(&self, limit: Option<u32>) -> Result<BTreeMap<String, Value>> {
        self.lock().sync_map(limit)
    }

    /// See [`Session::wait`].
    pub fn wait(&self) -> Result<Option<i64>> {
        self.lock().wait()
    }

    /// Close the session and shut the socket down.
    pub fn close(&self) -> Result<()> {
        let mut session = self.lock();
        let closed = session.close();
        match session.writer().get_ref().shutdown() {
            Ok(()) | Err(TransportError::Shutdown) => closed,
            Err(err) => closed.and(Err(err.into())),
        }
    }

    // Poisoning is ignored; the session state still guards later calls.
    fn lock(&self) -> MutexGuard<'_, Session<IpcStream, IpcStream>> {
        self.session.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl std::fmt::Debug for Client {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Client")
            .field("address", &self.address)
            .finish_non_exhaustive()
    }
}

//! In-process broker used by the integration tests.
//!
//! Implements the broker side of every command over a Unix domain socket:
//! groups, per-client queues, send, broadcast, sync and wait.

#![allow(dead_code)]

use std::collections::{BTreeMap, HashMap, VecDeque};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Condvar, Mutex};
use std::thread;

use bytes::Bytes;
use dime_frame::{FrameError, FrameReader, FrameWriter, Header};
use dime_transport::{IpcStream, UnixDomainSocket};
use serde_json::json;

type Message = (Header, Bytes);

#[derive(Default)]
struct Inner {
    next_id: u64,
    connected: Vec<u64>,
    groups: BTreeMap<String, Vec<u64>>,
    queues: HashMap<u64, VecDeque<Message>>,
}

#[derive(Default)]
struct State {
    inner: Mutex<Inner>,
    queued: Condvar,
}

pub struct MockBroker {
    dir: PathBuf,
    path: PathBuf,
}

impl MockBroker {
    pub fn start(tag: &str) -> Self {
        let dir = std::env::temp_dir().join(format!(
            "dime-broker-{tag}-{}-{}",
            std::process::id(),
            std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .expect("time should be after epoch")
                .as_nanos()
        ));
        std::fs::create_dir_all(&dir).expect("temp dir should be creatable");
        let path = dir.join("broker.sock");
        let listener = UnixDomainSocket::bind(&path).expect("broker should bind");
        let state = Arc::new(State::default());

        thread::spawn(move || loop {
            let Ok(stream) = listener.accept() else {
                return;
            };
            let state = Arc::clone(&state);
            thread::spawn(move || serve(stream, &state));
        });

        Self { dir, path }
    }

    pub fn address(&self) -> String {
        format!("ipc://{}", self.path.display())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for MockBroker {
    fn drop(&mut self) {
        let _ = std::fs::remove_dir_all(&self.dir);
    }
}

fn object(value: serde_json::Value) -> Header {
    match value {
        serde_json::Value::Object(map) => map,
        _ => unreachable!("reply literals are objects"),
    }
}

fn failure(message: String) -> Header {
    object(json!({"status": -1, "error": message}))
}

fn ok() -> Header {
    object(json!({"status": 0}))
}

fn names(header: &Header) -> Vec<String> {
    header
        .get("name")
        .and_then(serde_json::Value::as_array)
        .map(|names| {
            names
                .iter()
                .filter_map(|n| n.as_str().map(str::to_string))
                .collect()
        })
        .unwrap_or_default()
}

fn serve(stream: IpcStream, state: &State) {
    let mut reader = FrameReader::new(stream.try_clone().expect("stream should clone"));
    let mut writer = FrameWriter::new(stream);

    let id = {
        let mut inner = state.inner.lock().unwrap();
        inner.next_id += 1;
        let id = inner.next_id;
        inner.connected.push(id);
        inner.queues.insert(id, VecDeque::new());
        id
    };

    loop {
        let frame = match reader.read_frame() {
            Ok(frame) => frame,
            Err(FrameError::ConnectionClosed) | Err(FrameError::Io(_)) => break,
            Err(err) => panic!("broker read failed: {err}"),
        };
        let command = frame.get_str("command").unwrap_or_default().to_string();

        let replies: Vec<Message> = match command.as_str() {
            "handshake" => {
                let serialization = frame.get_str("serialization").unwrap_or_default();
                vec![(
                    object(json!({"status": 0, "serialization": serialization})),
                    Bytes::new(),
                )]
            }
            "join" => {
                let mut inner = state.inner.lock().unwrap();
                let mut reply = ok();
                for name in names(&frame.header) {
                    let members = inner.groups.entry(name.clone()).or_default();
                    if members.contains(&id) {
                        reply = failure(format!("Client is already in group: {name}"));
                        break;
                    }
                    members.push(id);
                }
                vec![(reply, Bytes::new())]
            }
            "leave" => {
                let mut inner = state.inner.lock().unwrap();
                let mut reply = ok();
                for name in names(&frame.header) {
                    let members = inner.groups.entry(name.clone()).or_default();
                    match members.iter().position(|&member| member == id) {
                        Some(at) => {
                            members.swap_remove(at);
                        }
                        None => {
                            reply = failure(format!("Client is not in group: {name}"));
                            break;
                        }
                    }
                }
                vec![(reply, Bytes::new())]
            }
            "devices" => {
                let inner = state.inner.lock().unwrap();
                let devices: Vec<&String> = inner
                    .groups
                    .iter()
                    .filter(|(_, members)| !members.is_empty())
                    .map(|(name, _)| name)
                    .collect();
                vec![(object(json!({"status": 0, "devices": devices})), Bytes::new())]
            }
            "send" => {
                let mut inner = state.inner.lock().unwrap();
                let name = frame.get_str("name").unwrap_or_default().to_string();
                let members = inner.groups.get(&name).cloned().unwrap_or_default();
                if members.is_empty() {
                    vec![(failure(format!("No such group exists: {name}")), Bytes::new())]
                } else {
                    for member in members {
                        if let Some(queue) = inner.queues.get_mut(&member) {
                            queue.push_back((frame.header.clone(), frame.payload.clone()));
                        }
                    }
                    state.queued.notify_all();
                    vec![(ok(), Bytes::new())]
                }
            }
            "broadcast" => {
                let mut inner = state.inner.lock().unwrap();
                let others: Vec<u64> = inner
                    .connected
                    .iter()
                    .copied()
                    .filter(|&other| other != id)
                    .collect();
                for other in others {
                    if let Some(queue) = inner.queues.get_mut(&other) {
                        queue.push_back((frame.header.clone(), frame.payload.clone()));
                    }
                }
                state.queued.notify_all();
                vec![(ok(), Bytes::new())]
            }
            "sync" => {
                let n = frame
                    .get("n")
                    .and_then(serde_json::Value::as_i64)
                    .unwrap_or(-1);
                let mut inner = state.inner.lock().unwrap();
                let queue = inner.queues.entry(id).or_default();
                let take = if n < 0 {
                    queue.len()
                } else {
                    queue.len().min(n as usize)
                };
                let mut replies: Vec<Message> = queue.drain(..take).collect();
                replies.push((ok(), Bytes::new()));
                replies
            }
            "wait" => {
                let inner = state.inner.lock().unwrap();
                let _inner = state
                    .queued
                    .wait_while(inner, |inner| {
                        inner.queues.get(&id).is_none_or(VecDeque::is_empty)
                    })
                    .unwrap();
                vec![(ok(), Bytes::new())]
            }
            other => vec![(failure(format!("Unknown command: {other}")), Bytes::new())],
        };

        for (header, payload) in replies {
            if writer.send(&header, &payload).is_err() {
                break;
            }
        }
    }

    let mut inner = state.inner.lock().unwrap();
    inner.connected.retain(|&other| other != id);
    inner.queues.remove(&id);
    for members in inner.groups.values_mut() {
        members.retain(|&member| member != id);
    }
}

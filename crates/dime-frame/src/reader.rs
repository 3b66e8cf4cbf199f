use std::io::{ErrorKind, Read};

use bytes::BytesMut;
use dime_transport::IpcStream;
use tracing::trace;

use crate::codec::{decode_frame, Frame, FrameConfig};
use crate::error::{FrameError, Result};

const INITIAL_BUFFER_CAPACITY: usize = 8 * 1024;
const READ_CHUNK_SIZE: usize = 16 * 1024;

/// Reads complete frames from any `Read` stream.
///
/// Owns the inbound byte queue. Chunk boundaries of the underlying stream
/// carry no meaning; bytes past the end of a frame stay queued for the next
/// call. `read_frame` takes `&mut self`, so at most one receive can be
/// pending per reader.
pub struct FrameReader<T> {
    inner: T,
    buf: BytesMut,
    config: FrameConfig,
}

impl<T: Read> FrameReader<T> {
    /// Create a new frame reader with default configuration.
    pub fn new(inner: T) -> Self {
        Self::with_config(inner, FrameConfig::default())
    }

    /// Create a new frame reader with explicit configuration.
    pub fn with_config(inner: T, config: FrameConfig) -> Self {
        Self {
            inner,
            buf: BytesMut::with_capacity(INITIAL_BUFFER_CAPACITY),
            config,
        }
    }

    /// Read the next complete frame (blocking).
    ///
    /// Returns `Err(FrameError::ConnectionClosed)` when EOF is reached.
    pub fn read_frame(&mut self) -> Result<Frame> {
        loop {
            if let Some(frame) = decode_frame(&mut self.buf, self.config.max_payload_size)? {
                trace!(
                    header_keys = frame.header.len(),
                    payload_len = frame.payload.len(),
                    buffered = self.buf.len(),
                    "frame received"
                );
                return Ok(frame);
            }

            let mut chunk = [0u8; READ_CHUNK_SIZE];
            let read = match self.inner.read(&mut chunk) {
                Ok(n) => n,
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) => return Err(FrameError::Io(err)),
            };

            if read == 0 {
                return Err(FrameError::ConnectionClosed);
            }

            self.buf.extend_from_slice(&chunk[..read]);
        }
    }

    /// Bytes received but not yet consumed by a frame.
    pub fn buffered(&self) -> usize {
        self.buf.len()
    }

    /// Borrow the underlying stream.
    pub fn get_ref(&self) -> &T {
        &self.inner
    }

    /// Mutably borrow the underlying stream.
    pub fn get_mut(&mut self) -> &mut T {
        &mut self.inner
    }

    /// Consume the reader and return the inner stream.
    pub fn into_inner(self) -> T {
        self.inner
    }

    /// Update maximum payload size for subsequent frame decoding.
    pub fn set_max_payload_size(&mut self, max_payload_size: usize) {
        self.config.max_payload_size = max_payload_size;
    }

    /// Current frame reader configuration.
    pub fn config(&self) -> &FrameConfig {
        &self.config
    }
}

impl FrameReader<IpcStream> {
    /// Create a frame reader for `IpcStream` and apply read timeout from config.
    pub fn with_config_ipc(inner: IpcStream, config: FrameConfig) -> Result<Self> {
        inner.set_read_timeout(config.read_timeout)?;
        Ok(Self::with_config(inner, config))
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;
    use std::sync::{Arc, Mutex};

    use bytes::BufMut;
    use serde_json::json;

    use super::*;
    use crate::codec::{encode_frame, Header, MAGIC};

    fn header(value: serde_json::Value) -> Header {
        match value {
            serde_json::Value::Object(map) => map,
            _ => panic!("not an object"),
        }
    }

    fn encoded(hdr: serde_json::Value, payload: &[u8]) -> Vec<u8> {
        let mut buf = BytesMut::new();
        encode_frame(&header(hdr), payload, &mut buf).unwrap();
        buf.to_vec()
    }

    #[test]
    fn read_single_frame() {
        let bytes = encoded(json!({"status": 0}), b"hello");

        let mut reader = FrameReader::new(Cursor::new(bytes));
        let frame = reader.read_frame().unwrap();

        assert_eq!(frame.get("status"), Some(&json!(0)));
        assert_eq!(frame.payload.as_ref(), b"hello");
    }

    #[test]
    fn read_multiple_frames() {
        let bytes = [
            encoded(json!({"varname": "one"}), b"1"),
            encoded(json!({"varname": "two"}), b"22"),
            encoded(json!({"status": 0}), b""),
        ]
        .concat();

        let mut reader = FrameReader::new(Cursor::new(bytes));

        let f1 = reader.read_frame().unwrap();
        let f2 = reader.read_frame().unwrap();
        let f3 = reader.read_frame().unwrap();

        assert_eq!((f1.get_str("varname"), f1.payload.as_ref()), (Some("one"), b"1".as_ref()));
        assert_eq!((f2.get_str("varname"), f2.payload.as_ref()), (Some("two"), b"22".as_ref()));
        assert_eq!(f3.get("status"), Some(&json!(0)));
        assert_eq!(reader.buffered(), 0);
    }

    #[test]
    fn read_frame_with_large_payload() {
        let payload = vec![0xAB; 2 * 1024 * 1024 + 17];
        let bytes = encoded(json!({"varname": "big"}), &payload);

        let mut reader = FrameReader::new(Cursor::new(bytes));
        let frame = reader.read_frame().unwrap();

        assert_eq!(frame.payload.as_ref(), payload.as_slice());
    }

    #[test]
    fn partial_read_handling() {
        let bytes = encoded(json!({"command": "slow"}), b"slow");

        let byte_reader = ChunkedReader::new(bytes, vec![1]);
        let mut reader = FrameReader::new(byte_reader);

        let frame = reader.read_frame().unwrap();
        assert_eq!(frame.get_str("command"), Some("slow"));
        assert_eq!(frame.payload.as_ref(), b"slow");
    }

    #[test]
    fn chunk_boundaries_do_not_matter() {
        let payload: Vec<u8> = (0..5000u32).map(|i| (i % 251) as u8).collect();
        let bytes = encoded(
            json!({"varname": "x", "serialization": "dimeb"}),
            &payload,
        );

        let mut whole = FrameReader::new(Cursor::new(bytes.clone()));
        let expected = whole.read_frame().unwrap();

        let rest = bytes.len() - (1 + 5 + 1000);
        let chunked = ChunkedReader::new(bytes, vec![1, 5, 1000, rest]);
        let mut reader = FrameReader::new(chunked);
        let frame = reader.read_frame().unwrap();

        assert_eq!(frame, expected);
        assert_eq!(reader.get_ref().reads, 4);
    }

    #[test]
    fn trailing_bytes_kept_for_next_frame() {
        let bytes = [
            encoded(json!({"varname": "a"}), b"A"),
            encoded(json!({"varname": "b"}), b"B"),
        ]
        .concat();
        let first_len = bytes.len() / 2;
        // One read delivers the first frame plus three bytes of the second.
        let chunked = ChunkedReader::new(bytes.clone(), vec![first_len + 3, 1]);
        let mut reader = FrameReader::new(chunked);

        let f1 = reader.read_frame().unwrap();
        assert_eq!(f1.get_str("varname"), Some("a"));
        assert_eq!(reader.buffered(), 3);

        let f2 = reader.read_frame().unwrap();
        assert_eq!(f2.get_str("varname"), Some("b"));
        assert_eq!(reader.buffered(), 0);
    }

    #[test]
    fn connection_closed_cleanly() {
        let mut reader = FrameReader::new(Cursor::new(Vec::<u8>::new()));
        let err = reader.read_frame().unwrap_err();
        assert!(matches!(err, FrameError::ConnectionClosed));
    }

    #[test]
    fn connection_closed_mid_frame() {
        let mut partial = BytesMut::new();
        partial.put_u32(MAGIC);
        partial.put_u32(2);
        partial.put_u32(16);
        partial.put_slice(b"{}only-part");

        let mut reader = FrameReader::new(Cursor::new(partial.to_vec()));
        let err = reader.read_frame().unwrap_err();
        assert!(matches!(err, FrameError::ConnectionClosed));
    }

    #[test]
    fn invalid_magic_in_stream() {
        let mut bytes = b"MiME".to_vec();
        bytes.extend_from_slice(&encoded(json!({"status": 0}), b"")[4..]);

        let mut reader = FrameReader::new(ChunkedReader::new(bytes, vec![1]));
        let err = reader.read_frame().unwrap_err();
        assert!(matches!(err, FrameError::InvalidMagic { .. }));
        // Rejected as soon as the prefix was complete.
        assert_eq!(reader.get_ref().reads, 12);
    }

    #[test]
    fn oversized_frame_in_stream() {
        let mut bytes = BytesMut::new();
        bytes.put_u32(MAGIC);
        bytes.put_u32(2);
        bytes.put_u32(1024);

        let cfg = FrameConfig {
            max_payload_size: 16,
            ..FrameConfig::default()
        };
        let mut reader = FrameReader::with_config(Cursor::new(bytes.to_vec()), cfg);
        let err = reader.read_frame().unwrap_err();
        assert!(matches!(err, FrameError::PayloadTooLarge { .. }));
    }

    /// Serves `bytes` in reads of the given sizes, repeating the last size.
    #[derive(Debug)]
    struct ChunkedReader {
        bytes: Vec<u8>,
        pos: usize,
        sizes: Vec<usize>,
        reads: usize,
    }

    impl ChunkedReader {
        fn new(bytes: Vec<u8>, sizes: Vec<usize>) -> Self {
            Self {
                bytes,
                pos: 0,
                sizes,
                reads: 0,
            }
        }
    }

    impl Read for ChunkedReader {
        fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
            if self.pos >= self.bytes.len() || buf.is_empty() {
                return Ok(0);
            }
            let size = self
                .sizes
                .get(self.reads)
                .or(self.sizes.last())
                .copied()
                .unwrap_or(buf.len());
            let n = size.min(buf.len()).min(self.bytes.len() - self.pos);
            buf[..n].copy_from_slice(&self.bytes[self.pos..self.pos + n]);
            self.pos += n;
            self.reads += 1;
            Ok(n)
        }
    }

    #[test]
    fn roundtrip_over_pipe() {
        let (left, right) = std::os::unix::net::UnixStream::pair().unwrap();
        let mut writer = crate::writer::FrameWriter::new(left);
        let mut reader = FrameReader::new(right);

        writer.send(&header(json!({"command": "wait"})), b"").unwrap();
        let frame = reader.read_frame().unwrap();

        assert_eq!(frame.get_str("command"), Some("wait"));
        assert!(frame.payload.is_empty());
    }

    #[test]
    fn concurrent_reader_writer_threads() {
        let (left, right) = std::os::unix::net::UnixStream::pair().unwrap();
        let mut writer = crate::writer::FrameWriter::new(left);
        let reader = FrameReader::new(right);
        let reader = Arc::new(Mutex::new(reader));

        let reader_thread = {
            let reader = Arc::clone(&reader);
            std::thread::spawn(move || {
                for expected in 0..64u32 {
                    let frame = reader.lock().unwrap().read_frame().unwrap();
                    assert_eq!(frame.get("seq"), Some(&json!(expected)));
                    assert_eq!(frame.payload.as_ref(), format!("msg-{expected}").as_bytes());
                }
            })
        };

        for i in 0..64u32 {
            let payload = format!("msg-{i}");
            writer
                .send(&header(json!({"seq": i})), payload.as_bytes())
                .unwrap();
        }

        reader_thread.join().unwrap();
    }

    #[test]
    fn accessors_and_into_inner() {
        let cursor = Cursor::new(Vec::<u8>::new());
        let mut reader = FrameReader::new(cursor);

        let _ = reader.get_ref();
        let _ = reader.get_mut();
        reader.set_max_payload_size(8);
        assert_eq!(reader.config().max_payload_size, 8);
        let _inner = reader.into_inner();
    }

    #[test]
    fn read_would_block_propagates_io_error() {
        let bytes = encoded(json!({"status": 0}), b"ok");

        let reader = FailOnceThenData::new(ErrorKind::WouldBlock, bytes);
        let mut framed = FrameReader::new(reader);
        let err = framed.read_frame().unwrap_err();
        assert!(matches!(err, FrameError::Io(e) if e.kind() == ErrorKind::WouldBlock));
    }

    #[test]
    fn interrupted_read_retries() {
        let bytes = encoded(json!({"status": 0}), b"ok");

        let reader = FailOnceThenData::new(ErrorKind::Interrupted, bytes);
        let mut framed = FrameReader::new(reader);
        let frame = framed.read_frame().unwrap();

        assert_eq!(frame.payload.as_ref(), b"ok");
    }

    struct FailOnceThenData {
        failure: Option<ErrorKind>,
        inner: Cursor<Vec<u8>>,
    }

    impl FailOnceThenData {
        fn new(kind: ErrorKind, bytes: Vec<u8>) -> Self {
            Self {
                failure: Some(kind),
                inner: Cursor::new(bytes),
            }
        }
    }

    impl Read for FailOnceThenData {
        fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
            if let Some(kind) = self.failure.take() {
                return Err(std::io::Error::from(kind));
            }
            self.inner.read(buf)
        }
    }

    #[test]
    #[cfg(unix)]
    fn read_timeout_surfaces_as_io_error() {
        let dir = std::env::temp_dir().join(format!(
            "dime-frame-timeout-reader-{}",
            std::process::id()
        ));
        std::fs::create_dir_all(&dir).unwrap();
        let sock_path = dir.join("test.sock");
        let listener = dime_transport::UnixDomainSocket::bind(&sock_path).unwrap();

        let path_clone = sock_path.clone();
        let connector =
            std::thread::spawn(move || dime_transport::UnixDomainSocket::connect(path_clone).unwrap());
        let stream = listener.accept().unwrap();
        let _client = connector.join().unwrap();

        let cfg = FrameConfig {
            read_timeout: Some(std::time::Duration::from_millis(10)),
            ..FrameConfig::default()
        };

        let mut reader = FrameReader::with_config_ipc(stream, cfg).unwrap();
        let err = reader.read_frame().unwrap_err();
        assert!(matches!(
            err,
            FrameError::Io(e) if matches!(e.kind(), ErrorKind::WouldBlock | ErrorKind::TimedOut)
        ));
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    #[cfg(unix)]
    fn roundtrip_over_ipc_stream_uds() {
        let dir = std::env::temp_dir().join(format!(
            "dime-frame-uds-roundtrip-{}",
            std::process::id()
        ));
        std::fs::create_dir_all(&dir).unwrap();
        let sock_path = dir.join("test.sock");
        let listener = dime_transport::UnixDomainSocket::bind(&sock_path).unwrap();

        let path_clone = sock_path.clone();
        let server = std::thread::spawn(move || {
            let stream = listener.accept().unwrap();
            let mut reader = FrameReader::new(stream);
            let frame = reader.read_frame().unwrap();
            assert_eq!(frame.get_str("command"), Some("handshake"));
            assert_eq!(frame.payload.as_ref(), b"uds");
        });

        let stream = dime_transport::UnixDomainSocket::connect(&path_clone).unwrap();
        let mut writer = crate::writer::FrameWriter::new(stream);
        writer
            .send(&header(json!({"command": "handshake"})), b"uds")
            .unwrap();

        server.join().unwrap();
        let _ = std::fs::remove_dir_all(&dir);
    }
}

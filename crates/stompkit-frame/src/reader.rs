use std::io::{ErrorKind, Read};
use std::time::Duration;

use bytes::BytesMut;
use stompkit_transport::StompStream;

use crate::codec::{DecodeState, WireFormat, AVERAGE_PAYLOAD_HINT};
use crate::error::{is_timeout_kind, FrameError, Result};
use crate::frame::Frame;

const READ_CHUNK_SIZE: usize = 8 * 1024;

/// Reads complete frames from any `Read` stream.
///
/// Handles partial reads internally; callers always get complete frames.
/// Bytes of a partially received frame survive a read timeout, so the next
/// call picks up where the last one stopped.
pub struct FrameReader<T> {
    inner: T,
    buf: BytesMut,
    state: DecodeState,
    config: WireFormat,
}

impl<T: Read> FrameReader<T> {
    /// Create a new frame reader with default configuration.
    pub fn new(inner: T) -> Self {
        Self::with_config(inner, WireFormat::default())
    }

    /// Create a new frame reader with explicit configuration.
    pub fn with_config(inner: T, config: WireFormat) -> Self {
        Self {
            inner,
            buf: BytesMut::with_capacity(AVERAGE_PAYLOAD_HINT),
            state: DecodeState::default(),
            config,
        }
    }

    /// Read the next complete frame (blocking).
    ///
    /// Returns `Err(FrameError::ConnectionClosed)` when EOF is reached
    /// between frames, and `Err(FrameError::Timeout)` when the stream's read
    /// timeout expires.
    pub fn read_frame(&mut self) -> Result<Frame> {
        loop {
            if let Some(frame) = self.state.decode(&mut self.buf, &self.config)? {
                return Ok(frame);
            }

            let mut chunk = [0u8; READ_CHUNK_SIZE];
            let read = match self.inner.read(&mut chunk) {
                Ok(n) => n,
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) if is_timeout_kind(err.kind()) => return Err(FrameError::Timeout),
                Err(err) => return Err(FrameError::Io(err)),
            };

            if read == 0 {
                return match self.state.decode_eof(&mut self.buf, &self.config)? {
                    Some(frame) => Ok(frame),
                    None => Err(FrameError::ConnectionClosed),
                };
            }

            self.buf.extend_from_slice(&chunk[..read]);
        }
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

    /// Number of buffered bytes not yet decoded into a frame.
    pub fn buffered(&self) -> usize {
        self.buf.len()
    }

    /// Current wire format configuration.
    pub fn config(&self) -> &WireFormat {
        &self.config
    }
}

impl FrameReader<StompStream> {
    /// Apply a read timeout to the underlying stream. `None` blocks forever.
    pub fn set_read_timeout(&self, timeout: Option<Duration>) -> Result<()> {
        self.inner
            .set_read_timeout(timeout)
            .map_err(transport_to_frame_error)
    }
}

fn transport_to_frame_error(err: stompkit_transport::TransportError) -> FrameError {
    match err {
        stompkit_transport::TransportError::Io(io) => FrameError::Io(io),
        stompkit_transport::TransportError::Resolve { source, .. }
        | stompkit_transport::TransportError::Connect { source, .. } => FrameError::Io(source),
        other => FrameError::Io(std::io::Error::other(other.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;
    use std::net::{TcpListener, TcpStream};

    use bytes::BytesMut;

    use super::*;
    use crate::codec::encode_frame;
    use crate::command::Command;
    use crate::frame::FrameBuilder;
    use crate::header::HeaderType;

    fn wire(frames: &mut [Frame]) -> Vec<u8> {
        let mut buf = BytesMut::new();
        for frame in frames.iter_mut() {
            encode_frame(frame, &mut buf, &WireFormat::default()).unwrap();
        }
        buf.to_vec()
    }

    fn message(body: &str) -> Frame {
        FrameBuilder::new(Command::Message)
            .header(HeaderType::Destination, "/queue/a")
            .header(HeaderType::MessageId, format!("m-{body}"))
            .payload(body)
            .build()
            .unwrap()
    }

    #[test]
    fn read_single_frame() {
        let bytes = wire(&mut [message("hello")]);

        let mut reader = FrameReader::new(Cursor::new(bytes));
        let frame = reader.read_frame().unwrap();

        assert_eq!(frame.command(), Command::Message);
        assert_eq!(frame.payload(), Some("hello"));
    }

    #[test]
    fn read_multiple_frames() {
        let bytes = wire(&mut [message("one"), message("two"), message("three")]);

        let mut reader = FrameReader::new(Cursor::new(bytes));

        let f1 = reader.read_frame().unwrap();
        let f2 = reader.read_frame().unwrap();
        let f3 = reader.read_frame().unwrap();

        assert_eq!(f1.payload(), Some("one"));
        assert_eq!(f2.payload(), Some("two"));
        assert_eq!(f3.payload(), Some("three"));
        assert!(matches!(
            reader.read_frame().unwrap_err(),
            FrameError::ConnectionClosed
        ));
    }

    #[test]
    fn read_frame_with_large_payload() {
        let body = "x".repeat(64 * 1024);
        let bytes = wire(&mut [message(&body)]);

        let mut reader = FrameReader::new(Cursor::new(bytes));
        let frame = reader.read_frame().unwrap();

        assert_eq!(frame.payload().map(str::len), Some(body.len()));
    }

    #[test]
    fn reads_terminator_delimited_payload_in_small_chunks() {
        let body_len = 4 * 1024 * 1024;
        let mut bytes = b"MESSAGE\ndestination:/queue/bulk\n\n".to_vec();
        bytes.resize(bytes.len() + body_len, b'a');
        bytes.push(0);
        bytes.extend_from_slice(b"RECEIPT\nreceipt-id:r1\n\n\0");

        let mut reader = FrameReader::new(ChunkedReader {
            bytes,
            pos: 0,
            chunk: 4096,
        });

        let frame = reader.read_frame().unwrap();
        assert_eq!(frame.header(HeaderType::ContentLength), None);
        assert_eq!(frame.payload().map(str::len), Some(body_len));
        assert_eq!(reader.state.scanned(), 0);

        let next = reader.read_frame().unwrap();
        assert_eq!(next.command(), Command::Receipt);
    }

    #[test]
    fn partial_read_handling() {
        let bytes = wire(&mut [message("slow")]);

        let mut reader = FrameReader::new(ByteByByteReader { bytes, pos: 0 });

        let frame = reader.read_frame().unwrap();
        assert_eq!(frame.payload(), Some("slow"));
    }

    #[test]
    fn connection_closed_cleanly() {
        let mut reader = FrameReader::new(Cursor::new(b"\n\n".to_vec()));
        let err = reader.read_frame().unwrap_err();
        assert!(matches!(err, FrameError::ConnectionClosed));
    }

    #[test]
    fn connection_closed_mid_frame() {
        let mut reader = FrameReader::new(Cursor::new(b"MESSAGE\ndestination:/q\n\npart".to_vec()));
        let err = reader.read_frame().unwrap_err();
        assert!(matches!(err, FrameError::UnexpectedEof));
    }

    #[test]
    fn invalid_command_in_stream() {
        let mut reader = FrameReader::new(Cursor::new(b"HELLO\n\n\0".to_vec()));
        let err = reader.read_frame().unwrap_err();
        assert!(matches!(err, FrameError::UnknownCommand(_)));
    }

    #[test]
    fn timeout_keeps_partial_frame() {
        let bytes = wire(&mut [message("later")]);
        let split = bytes.len() / 2;

        let reader = TimeoutBetween {
            first: bytes[..split].to_vec(),
            second: bytes[split..].to_vec(),
            state: 0,
        };
        let mut framed = FrameReader::new(reader);

        let err = framed.read_frame().unwrap_err();
        assert!(err.is_timeout());
        assert_eq!(framed.buffered(), split);

        let frame = framed.read_frame().unwrap();
        assert_eq!(frame.payload(), Some("later"));
    }

    #[test]
    fn interrupted_read_retries() {
        let bytes = wire(&mut [message("ok")]);

        let reader = InterruptedThenData {
            state: 0,
            bytes,
            pos: 0,
        };
        let mut framed = FrameReader::new(reader);
        let frame = framed.read_frame().unwrap();

        assert_eq!(frame.payload(), Some("ok"));
    }

    #[test]
    fn accessors_and_into_inner() {
        let cursor = Cursor::new(Vec::<u8>::new());
        let mut reader = FrameReader::new(cursor);

        let _ = reader.get_ref();
        let _ = reader.get_mut();
        assert_eq!(reader.config().max_headers, 1000);
        let _inner = reader.into_inner();
    }

    #[test]
    fn roundtrip_over_tcp() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        let client = TcpStream::connect(addr).unwrap();
        let (server, _) = listener.accept().unwrap();

        let mut writer = crate::writer::FrameWriter::new(client);
        let mut reader = FrameReader::new(server);

        let mut frame = message("ping");
        writer.write_frame(&mut frame).unwrap();
        let received = reader.read_frame().unwrap();

        assert_eq!(received, frame);
    }

    #[test]
    fn applies_read_timeout_for_stomp_stream() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        let stream =
            StompStream::connect("127.0.0.1", port, std::time::Duration::from_secs(2)).unwrap();
        let (_server, _) = listener.accept().unwrap();

        let mut reader = FrameReader::new(stream);
        reader
            .set_read_timeout(Some(std::time::Duration::from_millis(10)))
            .unwrap();
        let err = reader.read_frame().unwrap_err();
        assert!(matches!(err, FrameError::Timeout));
    }

    #[derive(Debug)]
    struct ChunkedReader {
        bytes: Vec<u8>,
        pos: usize,
        chunk: usize,
    }

    impl Read for ChunkedReader {
        fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
            let end = (self.pos + self.chunk.min(buf.len())).min(self.bytes.len());
            let n = end - self.pos;
            buf[..n].copy_from_slice(&self.bytes[self.pos..end]);
            self.pos = end;
            Ok(n)
        }
    }

    struct ByteByByteReader {
        bytes: Vec<u8>,
        pos: usize,
    }

    impl Read for ByteByByteReader {
        fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
            if self.pos >= self.bytes.len() || buf.is_empty() {
                return Ok(0);
            }

            buf[0] = self.bytes[self.pos];
            self.pos += 1;
            Ok(1)
        }
    }

    struct TimeoutBetween {
        first: Vec<u8>,
        second: Vec<u8>,
        state: u8,
    }

    impl Read for TimeoutBetween {
        fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
            self.state += 1;
            let part = match self.state {
                1 => &self.first,
                2 => return Err(std::io::Error::from(ErrorKind::WouldBlock)),
                3 => &self.second,
                _ => return Ok(0),
            };
            buf[..part.len()].copy_from_slice(part);
            Ok(part.len())
        }
    }

    struct InterruptedThenData {
        state: u8,
        bytes: Vec<u8>,
        pos: usize,
    }

    impl Read for InterruptedThenData {
        fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
            if self.state == 0 {
                self.state = 1;
                return Err(std::io::Error::from(ErrorKind::Interrupted));
            }
            if self.pos >= self.bytes.len() {
                return Ok(0);
            }
            let remaining = self.bytes.len() - self.pos;
            let n = remaining.min(buf.len());
            buf[..n].copy_from_slice(&self.bytes[self.pos..self.pos + n]);
            self.pos += n;
            Ok(n)
        }
    }
}

use std::io::{ErrorKind, Write};

use bytes::BytesMut;

use crate::codec::{encode_frame, WireFormat, AVERAGE_PAYLOAD_HINT};
use crate::error::{is_timeout_kind, FrameError, Result};
use crate::frame::Frame;

/// Writes complete frames to any `Write` stream.
pub struct FrameWriter<T> {
    inner: T,
    buf: BytesMut,
    config: WireFormat,
}

impl<T: Write> FrameWriter<T> {
    /// Create a new frame writer with default configuration.
    pub fn new(inner: T) -> Self {
        Self::with_config(inner, WireFormat::default())
    }

    /// Create a new frame writer with explicit configuration.
    pub fn with_config(inner: T, config: WireFormat) -> Self {
        Self {
            inner,
            buf: BytesMut::with_capacity(AVERAGE_PAYLOAD_HINT),
            config,
        }
    }

    /// Encode and write a complete frame (blocking). The frame is frozen.
    ///
    /// A write timeout on the underlying stream surfaces as
    /// [`FrameError::Timeout`]; the frame may then be partially written.
    pub fn write_frame(&mut self, frame: &mut Frame) -> Result<()> {
        self.buf.clear();
        encode_frame(frame, &mut self.buf, &self.config)?;

        let mut offset = 0usize;
        while offset < self.buf.len() {
            match self.inner.write(&self.buf[offset..]) {
                Ok(0) => return Err(FrameError::ConnectionClosed),
                Ok(n) => offset += n,
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) if is_timeout_kind(err.kind()) => return Err(FrameError::Timeout),
                Err(err) => return Err(FrameError::Io(err)),
            }
        }

        self.flush()
    }

    /// Flush the underlying stream.
    pub fn flush(&mut self) -> Result<()> {
        loop {
            match self.inner.flush() {
                Ok(()) => return Ok(()),
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) if is_timeout_kind(err.kind()) => return Err(FrameError::Timeout),
                Err(err) => return Err(FrameError::Io(err)),
            }
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

    /// Consume the writer and return the inner stream.
    pub fn into_inner(self) -> T {
        self.inner
    }

    /// Current wire format configuration.
    pub fn config(&self) -> &WireFormat {
        &self.config
    }
}

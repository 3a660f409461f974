//! Transport collaborator consumed by the connection state machine.

use std::time::Duration;

use stompkit_frame::{Frame, FrameError, FrameReader, FrameWriter, WireFormat};
use stompkit_transport::{StompStream, TransportError};
use tracing::{debug, warn};

use crate::error::{ConnectionError, Result};

/// Blocking whole-frame transport owned by one connection.
pub trait TransmissionHandler {
    /// Open the underlying transport. `timeout` bounds the connect attempt.
    fn initialize(&mut self, timeout: Duration) -> Result<()>;

    /// Release the transport. Closing an already closed handler is a no-op.
    fn close(&mut self) -> Result<()>;

    /// Bound the next receive calls. `Duration::ZERO` blocks indefinitely.
    fn set_reception_timeout(&mut self, timeout: Duration) -> Result<()>;

    /// Write one frame. The frame is frozen by the write.
    fn send_frame(&mut self, frame: &mut Frame) -> Result<()>;

    /// Block for the next frame. An expired reception timeout is reported as
    /// [`ConnectionError::Timeout`].
    fn receive_frame(&mut self) -> Result<Frame>;
}

impl<H: TransmissionHandler + ?Sized> TransmissionHandler for Box<H> {
    fn initialize(&mut self, timeout: Duration) -> Result<()> {
        (**self).initialize(timeout)
    }

    fn close(&mut self) -> Result<()> {
        (**self).close()
    }

    fn set_reception_timeout(&mut self, timeout: Duration) -> Result<()> {
        (**self).set_reception_timeout(timeout)
    }

    fn send_frame(&mut self, frame: &mut Frame) -> Result<()> {
        (**self).send_frame(frame)
    }

    fn receive_frame(&mut self) -> Result<Frame> {
        (**self).receive_frame()
    }
}

struct Channel {
    reader: FrameReader<StompStream>,
    writer: FrameWriter<StompStream>,
}

/// TCP transport: one stream, cloned into a reader half and a writer half.
#[derive(Debug)]
pub struct TcpTransmissionHandler {
    host: String,
    port: u16,
    wire_format: WireFormat,
    channel: Option<Channel>,
}

impl std::fmt::Debug for Channel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Channel")
            .field("stream", self.writer.get_ref())
            .field("buffered", &self.reader.buffered())
            .finish()
    }
}

impl TcpTransmissionHandler {
    pub fn new(host: impl Into<String>, port: u16, wire_format: WireFormat) -> Self {
        Self {
            host: host.into(),
            port,
            wire_format,
            channel: None,
        }
    }

    /// Adopt an already connected stream; `initialize` becomes a no-op.
    pub fn from_stream(stream: StompStream, wire_format: WireFormat) -> Result<Self> {
        let peer = stream.peer_addr();
        let mut handler = Self::new(
            peer.map(|addr| addr.ip().to_string()).unwrap_or_default(),
            peer.map(|addr| addr.port()).unwrap_or_default(),
            wire_format,
        );
        handler.channel = Some(handler.open_channel(stream)?);
        Ok(handler)
    }

    pub fn is_open(&self) -> bool {
        self.channel.is_some()
    }

    pub fn wire_format(&self) -> &WireFormat {
        &self.wire_format
    }

    fn open_channel(&self, stream: StompStream) -> Result<Channel> {
        let reader_stream = stream.try_clone()?;
        Ok(Channel {
            reader: FrameReader::with_config(reader_stream, self.wire_format.clone()),
            writer: FrameWriter::with_config(stream, self.wire_format.clone()),
        })
    }

    fn channel(&mut self) -> Result<&mut Channel> {
        self.channel
            .as_mut()
            .ok_or(ConnectionError::Frame(FrameError::ConnectionClosed))
    }
}

impl TransmissionHandler for TcpTransmissionHandler {
    fn initialize(&mut self, timeout: Duration) -> Result<()> {
        if self.channel.is_some() {
            return Ok(());
        }
        let stream = StompStream::connect(&self.host, self.port, timeout)?;
        self.channel = Some(self.open_channel(stream)?);
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        let Some(channel) = self.channel.take() else {
            return Ok(());
        };
        debug!(host = %self.host, port = self.port, "closing broker stream");
        match channel.writer.get_ref().shutdown() {
            Ok(()) | Err(TransportError::Shutdown) => Ok(()),
            Err(err) => Err(err.into()),
        }
    }

    fn set_reception_timeout(&mut self, timeout: Duration) -> Result<()> {
        let timeout = (!timeout.is_zero()).then_some(timeout);
        self.channel()?.reader.set_read_timeout(timeout)?;
        Ok(())
    }

    fn send_frame(&mut self, frame: &mut Frame) -> Result<()> {
        self.channel()?.writer.write_frame(frame)?;
        Ok(())
    }

    fn receive_frame(&mut self) -> Result<Frame> {
        match self.channel()?.reader.read_frame() {
            Ok(frame) => Ok(frame),
            Err(err) if err.is_timeout() => Err(ConnectionError::Timeout),
            Err(err) => Err(err.into()),
        }
    }
}

/// Closes the wrapped transport whenever an operation fails for any reason
/// other than a reception timeout, then reports the original error.
#[derive(Debug)]
pub struct FailsafeHandler<H> {
    inner: H,
}

impl<H: TransmissionHandler> FailsafeHandler<H> {
    pub fn new(inner: H) -> Self {
        Self { inner }
    }

    pub fn get_ref(&self) -> &H {
        &self.inner
    }

    pub fn get_mut(&mut self) -> &mut H {
        &mut self.inner
    }

    pub fn into_inner(self) -> H {
        self.inner
    }

    fn guard<T>(&mut self, operation: &'static str, result: Result<T>) -> Result<T> {
        match result {
            Err(err) if !err.is_timeout() => {
                warn!(operation, error = %err, "transport failure, closing");
                if let Err(close_err) = self.inner.close() {
                    debug!(error = %close_err, "close after failure also failed");
                }
                Err(err)
            }
            other => other,
        }
    }
}

impl<H: TransmissionHandler> TransmissionHandler for FailsafeHandler<H> {
    fn initialize(&mut self, timeout: Duration) -> Result<()> {
        let result = self.inner.initialize(timeout);
        self.guard("initialize", result)
    }

    fn close(&mut self) -> Result<()> {
        self.inner.close()
    }

    fn set_reception_timeout(&mut self, timeout: Duration) -> Result<()> {
        let result = self.inner.set_reception_timeout(timeout);
        self.guard("set_reception_timeout", result)
    }

    fn send_frame(&mut self, frame: &mut Frame) -> Result<()> {
        let result = self.inner.send_frame(frame);
        self.guard("send_frame", result)
    }

    fn receive_frame(&mut self) -> Result<Frame> {
        let result = self.inner.receive_frame();
        self.guard("receive_frame", result)
    }
}

use std::io::{ErrorKind, Read, Write};
use std::net::{Shutdown, SocketAddr, TcpStream, ToSocketAddrs};
use std::time::Duration;

use tracing::debug;

use crate::error::{Result, TransportError};

/// A connected broker stream implementing `Read` and `Write`.
///
/// This is the fundamental I/O type returned by transport operations. The
/// frame layer clones it once so that reading and writing can be owned by
/// separate halves.
pub struct StompStream {
    inner: TcpStream,
}

impl Read for StompStream {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        self.inner.read(buf)
    }
}

impl Write for StompStream {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.inner.write(buf)
    }

    fn flush(&mut self) -> std::io::Result<()> {
        self.inner.flush()
    }
}

impl StompStream {
    /// Connect to a broker (blocking), trying every resolved address in turn.
    ///
    /// Each attempt is bounded by `timeout`. The error of the last failed
    /// attempt is reported when no address accepts the connection.
    pub fn connect(host: &str, port: u16, timeout: Duration) -> Result<Self> {
        let addrs: Vec<SocketAddr> = (host, port)
            .to_socket_addrs()
            .map_err(|source| TransportError::Resolve {
                host: host.to_string(),
                port,
                source,
            })?
            .collect();

        let mut last_err =
            std::io::Error::new(ErrorKind::AddrNotAvailable, "host resolved to no addresses");
        for addr in addrs {
            match TcpStream::connect_timeout(&addr, timeout) {
                Ok(stream) => {
                    stream.set_nodelay(true)?;
                    debug!(%addr, "connected to broker");
                    return Ok(Self::from_tcp(stream));
                }
                Err(err) => {
                    debug!(%addr, error = %err, "connect attempt failed");
                    last_err = err;
                }
            }
        }

        Err(TransportError::Connect {
            host: host.to_string(),
            port,
            source: last_err,
        })
    }

    /// Wrap an already connected TCP stream.
    pub fn from_tcp(stream: TcpStream) -> Self {
        Self { inner: stream }
    }

    /// Set read timeout on the underlying stream.
    ///
    /// `None` blocks indefinitely. A zero duration is treated as `None`,
    /// since the standard library rejects it.
    pub fn set_read_timeout(&self, timeout: Option<Duration>) -> Result<()> {
        let timeout = timeout.filter(|t| !t.is_zero());
        self.inner.set_read_timeout(timeout).map_err(Into::into)
    }

    /// Set write timeout on the underlying stream.
    pub fn set_write_timeout(&self, timeout: Option<Duration>) -> Result<()> {
        let timeout = timeout.filter(|t| !t.is_zero());
        self.inner.set_write_timeout(timeout).map_err(Into::into)
    }

    /// Try to clone this stream (creates a new file descriptor).
    pub fn try_clone(&self) -> Result<Self> {
        let cloned = self.inner.try_clone()?;
        Ok(Self::from_tcp(cloned))
    }

    /// Shut down both directions of the stream.
    ///
    /// Any clone blocked in a read observes end-of-stream.
    pub fn shutdown(&self) -> Result<()> {
        match self.inner.shutdown(Shutdown::Both) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == ErrorKind::NotConnected => Err(TransportError::Shutdown),
            Err(err) => Err(err.into()),
        }
    }

    /// Address of the connected broker.
    pub fn peer_addr(&self) -> Option<SocketAddr> {
        self.inner.peer_addr().ok()
    }

    /// Transport name for diagnostics.
    pub fn transport_name(&self) -> &'static str {
        "tcp"
    }
}

impl std::fmt::Debug for StompStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StompStream")
            .field("type", &self.transport_name())
            .field("peer", &self.peer_addr())
            .finish()
    }
}

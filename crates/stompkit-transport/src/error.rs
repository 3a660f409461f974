/// Errors that can occur in transport operations.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// The broker host name could not be resolved.
    #[error("failed to resolve {host}:{port}: {source}")]
    Resolve {
        host: String,
        port: u16,
        source: std::io::Error,
    },

    /// Failed to connect to the broker.
    #[error("failed to connect to {host}:{port}: {source}")]
    Connect {
        host: String,
        port: u16,
        source: std::io::Error,
    },

    /// An I/O error occurred on the transport stream.
    #[error("transport I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The transport has been shut down.
    #[error("transport shut down")]
    Shutdown,
}

pub type Result<T> = std::result::Result<T, TransportError>;

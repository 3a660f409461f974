use stompkit_frame::{Command, FrameError};

use crate::connection::ConnectionState;

/// Errors that can occur in connection operations.
#[derive(Debug, thiserror::Error)]
pub enum ConnectionError {
    /// Transport-level error.
    #[error("transport error: {0}")]
    Transport(#[from] stompkit_transport::TransportError),

    /// Frame-level error (wire format, header validation, frame I/O).
    #[error("frame error: {0}")]
    Frame(#[from] FrameError),

    /// The broker answered with a frame the protocol does not allow here.
    #[error("protocol error: expected {expected}, received {received}")]
    Protocol { expected: Command, received: Command },

    /// The broker substituted a different text encoding in CONNECTED.
    #[error("encoding mismatch: requested {requested}, broker answered {received}")]
    EncodingMismatch { requested: String, received: String },

    /// Operation invoked from a state that does not permit it.
    #[error("cannot {operation} while {state}")]
    InvalidState {
        operation: &'static str,
        state: ConnectionState,
    },

    /// Operation invoked after an earlier failure broke the connection.
    #[error("cannot {operation}: connection is broken")]
    Broken { operation: &'static str },

    /// begin/commit/rollback invoked out of order.
    #[error("illegal transaction state: {0}")]
    TransactionState(&'static str),

    /// Subscription id already active on this connection.
    #[error("subscription '{0}' already exists")]
    DuplicateSubscription(String),

    /// Subscription id not active on this connection.
    #[error("unknown subscription '{0}'")]
    UnknownSubscription(String),

    /// Reception timeout expired with no frame. Retryable.
    #[error("timed out waiting for frame")]
    Timeout,
}

impl ConnectionError {
    /// True for the retryable "no frame yet" condition.
    pub fn is_timeout(&self) -> bool {
        match self {
            Self::Timeout => true,
            Self::Frame(err) => err.is_timeout(),
            _ => false,
        }
    }

    /// True when the error was raised before anything reached the wire
    /// because a caller-supplied header was rejected.
    pub fn is_header_validation(&self) -> bool {
        matches!(self, Self::Frame(err) if err.is_header_validation())
    }
}

pub type Result<T> = std::result::Result<T, ConnectionError>;

use std::fmt;
use std::io;

use stompkit_connection::ConnectionError;
use stompkit_frame::FrameError;
use stompkit_transport::TransportError;

// Exit code constants aligned with sysexits-style semantics.
pub const SUCCESS: i32 = 0;
pub const FAILURE: i32 = 1;
pub const TRANSPORT_ERROR: i32 = 3;
pub const PROTOCOL_ERROR: i32 = 4;
pub const PERMISSION_DENIED: i32 = 50;
pub const DATA_INVALID: i32 = 60;
pub const USAGE: i32 = 64;
pub const TIMEOUT: i32 = 124;
pub const INTERNAL: i32 = 125;

pub type CliResult<T> = Result<T, CliError>;

#[derive(Debug)]
pub struct CliError {
    pub code: i32,
    pub message: String,
}

impl CliError {
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for CliError {}

pub fn io_error(context: &str, err: io::Error) -> CliError {
    let code = match err.kind() {
        io::ErrorKind::PermissionDenied => PERMISSION_DENIED,
        io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock => TIMEOUT,
        io::ErrorKind::ConnectionRefused => FAILURE,
        _ => INTERNAL,
    };
    CliError::new(code, format!("{context}: {err}"))
}

pub fn transport_error(context: &str, err: TransportError) -> CliError {
    match err {
        TransportError::Connect { source, .. } | TransportError::Io(source) => {
            io_error(context, source)
        }
        other => CliError::new(TRANSPORT_ERROR, format!("{context}: {other}")),
    }
}

pub fn frame_error(context: &str, err: FrameError) -> CliError {
    if err.is_timeout() {
        return CliError::new(TIMEOUT, format!("{context}: {err}"));
    }
    if err.is_wire_format() || err.is_header_validation() {
        return CliError::new(DATA_INVALID, format!("{context}: {err}"));
    }
    match err {
        FrameError::Io(source) => io_error(context, source),
        FrameError::UnsupportedEncoding(_) => CliError::new(USAGE, format!("{context}: {err}")),
        FrameError::ConnectionClosed | FrameError::UnexpectedEof => {
            CliError::new(FAILURE, format!("{context}: {err}"))
        }
        other => CliError::new(INTERNAL, format!("{context}: {other}")),
    }
}

pub fn connection_error(context: &str, err: ConnectionError) -> CliError {
    match err {
        ConnectionError::Transport(err) => transport_error(context, err),
        ConnectionError::Frame(err) => frame_error(context, err),
        ConnectionError::Timeout => CliError::new(TIMEOUT, format!("{context}: {err}")),
        ConnectionError::Protocol { .. }
        | ConnectionError::EncodingMismatch { .. }
        | ConnectionError::UnknownSubscription(_) => {
            CliError::new(PROTOCOL_ERROR, format!("{context}: {err}"))
        }
        ConnectionError::DuplicateSubscription(_) => {
            CliError::new(USAGE, format!("{context}: {err}"))
        }
        ConnectionError::Broken { .. } => CliError::new(FAILURE, format!("{context}: {err}")),
        other => CliError::new(INTERNAL, format!("{context}: {other}")),
    }
}

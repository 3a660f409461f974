use crate::command::Command;

/// Errors that can occur while building, encoding or decoding frames.
///
/// Variants fall into three families, see [`FrameError::is_wire_format`],
/// [`FrameError::is_header_validation`] and [`FrameError::is_timeout`].
/// Everything else is an I/O failure.
#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    /// The command line does not name a known command.
    #[error("unknown command '{0}'")]
    UnknownCommand(String),

    /// The command line exceeds the configured maximum.
    #[error("command line too long ({len} bytes, max {max})")]
    CommandTooLong { len: usize, max: usize },

    /// A header line has no delimiter, or the delimiter is its first byte.
    #[error("malformed header line '{0}'")]
    MalformedHeader(String),

    /// A header line exceeds the configured maximum.
    #[error("header line too long ({len} bytes, max {max})")]
    HeaderLineTooLong { len: usize, max: usize },

    /// The frame carries more headers than allowed.
    #[error("too many headers (max {max})")]
    TooManyHeaders { max: usize },

    /// The payload exceeds the configured maximum size.
    #[error("payload too large ({size} bytes, max {max})")]
    PayloadTooLarge { size: usize, max: usize },

    /// The declared content-length runs past the end of the frame.
    #[error("content-length {declared} too big: frame ended before the payload")]
    ContentLengthTooBig { declared: usize },

    /// The byte after the declared payload is not the frame terminator.
    #[error("content-length {declared} too small: terminator not found after payload")]
    ContentLengthTooSmall { declared: usize },

    /// Bytes on the wire are not valid in the negotiated encoding.
    #[error("text is not valid {encoding}")]
    MalformedText { encoding: &'static str },

    /// Text cannot be represented in the negotiated encoding.
    #[error("text cannot be encoded as {encoding}")]
    UnmappableText { encoding: &'static str },

    /// The header is not legal for the frame's command.
    #[error("header '{header}' is not allowed on {command}")]
    HeaderNotAllowed { header: String, command: Command },

    /// The header was locked by a freeze and cannot be changed.
    #[error("header '{0}' is frozen")]
    FrozenHeader(String),

    /// The header is owned by the protocol layer and cannot be set by callers.
    #[error("header '{0}' is reserved and cannot be set manually")]
    ReservedHeader(String),

    /// Header names must be non-empty and free of ':' and line breaks.
    #[error("invalid header name '{0}'")]
    InvalidHeaderName(String),

    /// Header values must not contain line breaks.
    #[error("invalid value for header '{0}'")]
    InvalidHeaderValue(String),

    /// The ack header names no known acknowledgement mode.
    #[error("invalid ack mode '{0}'")]
    InvalidAckMode(String),

    /// The requested character encoding is unknown or unusable on the wire.
    #[error("unsupported encoding '{0}'")]
    UnsupportedEncoding(String),

    /// A read timed out before a complete frame arrived.
    #[error("timed out waiting for frame")]
    Timeout,

    /// The connection was closed cleanly between frames.
    #[error("connection closed")]
    ConnectionClosed,

    /// The connection was closed in the middle of a frame.
    #[error("unexpected end of stream (incomplete frame)")]
    UnexpectedEof,

    /// An I/O error occurred while reading or writing frames.
    #[error("frame I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl FrameError {
    /// Malformed bytes on the wire. Never retryable.
    pub fn is_wire_format(&self) -> bool {
        matches!(
            self,
            Self::UnknownCommand(_)
                | Self::CommandTooLong { .. }
                | Self::MalformedHeader(_)
                | Self::HeaderLineTooLong { .. }
                | Self::TooManyHeaders { .. }
                | Self::PayloadTooLarge { .. }
                | Self::ContentLengthTooBig { .. }
                | Self::ContentLengthTooSmall { .. }
                | Self::MalformedText { .. }
                | Self::UnmappableText { .. }
        )
    }

    /// A header was set that the frame must not carry.
    pub fn is_header_validation(&self) -> bool {
        matches!(
            self,
            Self::HeaderNotAllowed { .. }
                | Self::FrozenHeader(_)
                | Self::ReservedHeader(_)
                | Self::InvalidHeaderName(_)
                | Self::InvalidHeaderValue(_)
                | Self::InvalidAckMode(_)
        )
    }

    /// A read timed out. The only retryable failure.
    pub fn is_timeout(&self) -> bool {
        match self {
            Self::Timeout => true,
            Self::Io(err) => is_timeout_kind(err.kind()),
            _ => false,
        }
    }
}

pub(crate) fn is_timeout_kind(kind: std::io::ErrorKind) -> bool {
    matches!(
        kind,
        std::io::ErrorKind::WouldBlock | std::io::ErrorKind::TimedOut
    )
}

pub type Result<T> = std::result::Result<T, FrameError>;

//! STOMP frame model, header rules and wire-format codec.
//!
//! This is the core value-add layer of stompkit. A frame on the wire is:
//! - a command line (`SEND`, `MESSAGE`, ...) ended by `\n`
//! - zero or more `name:value` header lines, then an empty line
//! - the payload, `content-length` bytes long when declared
//! - a single NUL terminator
//!
//! Decoding enforces hard limits on command length, header line length,
//! header count and payload size, and reports every malformation as a
//! distinct [`FrameError`].

pub mod codec;
pub mod command;
pub mod encoding;
pub mod error;
pub mod frame;
pub mod header;
pub mod reader;
pub mod writer;

#[cfg(feature = "async")]
pub mod stomp_codec;

pub use codec::{
    decode_frame, decode_frame_eof, encode_frame, DecodeState, WireFormat, AVERAGE_PAYLOAD_HINT,
    DEFAULT_MAX_COMMAND_LEN, DEFAULT_MAX_HEADERS, DEFAULT_MAX_HEADER_LINE_LEN,
    DEFAULT_MAX_PAYLOAD, FRAME_TERMINATOR, HEADER_DELIMITER, LINE_TERMINATOR,
};
pub use command::{Command, Direction};
pub use encoding::TextEncoding;
pub use error::{FrameError, Result};
pub use frame::{Frame, FrameBuilder};
pub use header::{is_header_allowed, AckMode, Header, HeaderType};
pub use reader::FrameReader;
pub use writer::FrameWriter;

#[cfg(feature = "async")]
pub use stomp_codec::StompCodec;

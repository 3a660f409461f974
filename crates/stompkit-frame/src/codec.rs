use std::borrow::Cow;
use std::collections::BTreeMap;

use bytes::{Buf, BufMut, BytesMut};
use tracing::warn;

use crate::command::Command;
use crate::encoding::TextEncoding;
use crate::error::{FrameError, Result};
use crate::frame::Frame;
use crate::header::HeaderType;

/// Ends the command line and every header line.
pub const LINE_TERMINATOR: u8 = b'\n';

/// Ends every frame.
pub const FRAME_TERMINATOR: u8 = b'\0';

/// Separates a header name from its value.
pub const HEADER_DELIMITER: u8 = b':';

pub const DEFAULT_MAX_COMMAND_LEN: usize = 1024;
pub const DEFAULT_MAX_HEADER_LINE_LEN: usize = 10 * 1024;
pub const DEFAULT_MAX_HEADERS: usize = 1000;

/// Default maximum payload size: 512 MiB.
pub const DEFAULT_MAX_PAYLOAD: usize = 512 * 1024 * 1024;

/// Typical payload size, used to size read and write buffers.
pub const AVERAGE_PAYLOAD_HINT: usize = 16 * 1024;

/// Wire-level limits and the text encoding used to decode inbound frames.
#[derive(Debug, Clone)]
pub struct WireFormat {
    /// Maximum command line length in bytes, terminator excluded.
    pub max_command_len: usize,
    /// Maximum header line length in bytes, terminator excluded.
    pub max_header_line_len: usize,
    /// Maximum number of header lines per frame.
    pub max_headers: usize,
    /// Maximum payload size in bytes. Default: 512 MiB.
    pub max_payload_len: usize,
    /// Encoding of inbound command lines, headers and payloads.
    pub encoding: TextEncoding,
}

impl Default for WireFormat {
    fn default() -> Self {
        Self {
            max_command_len: DEFAULT_MAX_COMMAND_LEN,
            max_header_line_len: DEFAULT_MAX_HEADER_LINE_LEN,
            max_headers: DEFAULT_MAX_HEADERS,
            max_payload_len: DEFAULT_MAX_PAYLOAD,
            encoding: TextEncoding::UTF_8,
        }
    }
}

/// Encode a frame into the wire format, freezing it.
///
/// Wire format:
/// ```text
/// COMMAND\n
/// name:value\n      (zero or more, sorted by name)
/// \n
/// payload bytes     (content-length bytes if declared, else up to NUL)
/// \0
/// ```
pub fn encode_frame(frame: &mut Frame, dst: &mut BytesMut, config: &WireFormat) -> Result<()> {
    frame.freeze();

    if frame.header_count() > config.max_headers {
        return Err(FrameError::TooManyHeaders {
            max: config.max_headers,
        });
    }

    let encoding = frame.encoding();
    let payload: Cow<'_, [u8]> = match frame.payload() {
        Some(text) if !text.is_empty() => encoding.encode(text)?,
        _ => Cow::Borrowed(&[][..]),
    };
    if payload.len() > config.max_payload_len {
        return Err(FrameError::PayloadTooLarge {
            size: payload.len(),
            max: config.max_payload_len,
        });
    }

    dst.reserve(DEFAULT_MAX_COMMAND_LEN + payload.len());
    dst.put_slice(frame.command().as_str().as_bytes());
    dst.put_u8(LINE_TERMINATOR);
    for (name, value) in frame.headers() {
        dst.put_slice(&encoding.encode(name)?);
        dst.put_u8(HEADER_DELIMITER);
        dst.put_slice(&encoding.encode(value)?);
        dst.put_u8(LINE_TERMINATOR);
    }
    dst.put_u8(LINE_TERMINATOR);
    dst.put_slice(&payload);
    dst.put_u8(FRAME_TERMINATOR);
    Ok(())
}

/// Decode a frame from a buffer.
///
/// Returns `Ok(None)` if the buffer doesn't contain a complete frame yet.
/// Stray newlines and NULs between frames (keep-alives) are consumed. On
/// success, consumes the frame bytes from the buffer and returns it frozen.
///
/// Each call scans a terminator-delimited payload from its start; callers
/// that refill the same buffer should hold a [`DecodeState`] instead.
pub fn decode_frame(src: &mut BytesMut, config: &WireFormat) -> Result<Option<Frame>> {
    DecodeState::default().decode(src, config)
}

/// Decode a frame from a buffer that will receive no more bytes.
///
/// Returns `Ok(None)` only when nothing but keep-alive bytes remain. A
/// partial frame is an error: [`FrameError::ContentLengthTooBig`] when the
/// frame terminator shows up inside the declared payload, otherwise
/// [`FrameError::UnexpectedEof`].
pub fn decode_frame_eof(src: &mut BytesMut, config: &WireFormat) -> Result<Option<Frame>> {
    DecodeState::default().decode_eof(src, config)
}

/// Progress through a partially buffered frame, kept between refills.
///
/// Remembers how much of a terminator-delimited payload has already been
/// searched for the NUL byte, so each refill only scans the new bytes.
#[derive(Debug, Clone, Default)]
pub struct DecodeState {
    body_scanned: usize,
}

impl DecodeState {
    /// Same as [`decode_frame`], resuming the terminator search.
    pub fn decode(&mut self, src: &mut BytesMut, config: &WireFormat) -> Result<Option<Frame>> {
        self.run(src, config, false)
    }

    /// Same as [`decode_frame_eof`], resuming the terminator search.
    pub fn decode_eof(
        &mut self,
        src: &mut BytesMut,
        config: &WireFormat,
    ) -> Result<Option<Frame>> {
        self.run(src, config, true)
    }

    /// Payload bytes of the pending frame already searched for a terminator.
    pub fn scanned(&self) -> usize {
        self.body_scanned
    }

    fn run(&mut self, src: &mut BytesMut, config: &WireFormat, eof: bool) -> Result<Option<Frame>> {
        let result = parse(src, config, eof, &mut self.body_scanned);
        if !matches!(result, Ok(None)) {
            self.body_scanned = 0;
        }
        result
    }
}

struct Head {
    command: Command,
    headers: BTreeMap<String, String>,
    body_start: usize,
}

fn parse(
    src: &mut BytesMut,
    config: &WireFormat,
    eof: bool,
    body_scanned: &mut usize,
) -> Result<Option<Frame>> {
    let keep_alive = src
        .iter()
        .take_while(|b| **b == LINE_TERMINATOR || **b == FRAME_TERMINATOR)
        .count();
    src.advance(keep_alive);
    if src.is_empty() {
        return Ok(None);
    }

    let Some(head) = parse_head(src, config)? else {
        return incomplete(eof);
    };

    let declared = head
        .headers
        .get(HeaderType::ContentLength.name())
        .and_then(|value| match value.trim().parse::<usize>() {
            Ok(len) => Some(len),
            Err(_) => {
                warn!(%value, "ignoring malformed content-length header");
                None
            }
        });

    let body = &src[head.body_start..];
    let payload_len = match declared {
        Some(len) => {
            if len > config.max_payload_len {
                return Err(FrameError::PayloadTooLarge {
                    size: len,
                    max: config.max_payload_len,
                });
            }
            if body.len() <= len {
                if !eof {
                    return Ok(None);
                }
                return Err(if body.contains(&FRAME_TERMINATOR) {
                    FrameError::ContentLengthTooBig { declared: len }
                } else {
                    FrameError::UnexpectedEof
                });
            }
            if body[len] != FRAME_TERMINATOR {
                return Err(if body[..len].contains(&FRAME_TERMINATOR) {
                    FrameError::ContentLengthTooBig { declared: len }
                } else {
                    FrameError::ContentLengthTooSmall { declared: len }
                });
            }
            len
        }
        None => match find_terminator(body, body_scanned) {
            Some(len) if len > config.max_payload_len => {
                return Err(FrameError::PayloadTooLarge {
                    size: len,
                    max: config.max_payload_len,
                });
            }
            Some(len) => len,
            None if body.len() > config.max_payload_len => {
                return Err(FrameError::PayloadTooLarge {
                    size: body.len(),
                    max: config.max_payload_len,
                });
            }
            None => return incomplete(eof),
        },
    };

    let payload = if payload_len == 0 {
        None
    } else {
        Some(config.encoding.decode(&body[..payload_len])?.into_owned())
    };

    src.advance(head.body_start + payload_len + 1);
    Ok(Some(Frame::from_wire(
        head.command,
        head.headers,
        payload,
        config.encoding,
    )))
}

/// Search `body` for the frame terminator, skipping the prefix searched by
/// earlier calls and recording the new high-water mark on a miss.
fn find_terminator(body: &[u8], scanned: &mut usize) -> Option<usize> {
    let from = (*scanned).min(body.len());
    match body[from..].iter().position(|b| *b == FRAME_TERMINATOR) {
        Some(pos) => Some(from + pos),
        None => {
            *scanned = body.len();
            None
        }
    }
}

fn incomplete(eof: bool) -> Result<Option<Frame>> {
    if eof {
        Err(FrameError::UnexpectedEof)
    } else {
        Ok(None)
    }
}

fn parse_head(buf: &[u8], config: &WireFormat) -> Result<Option<Head>> {
    let Some(command_end) = find_line(buf, 0, config.max_command_len, |len, max| {
        FrameError::CommandTooLong { len, max }
    })?
    else {
        return Ok(None);
    };

    let name = config.encoding.decode(&buf[..command_end])?;
    let command =
        Command::from_name(&name).ok_or_else(|| FrameError::UnknownCommand(name.into_owned()))?;

    let mut headers = BTreeMap::new();
    let mut count = 0usize;
    let mut pos = command_end + 1;
    loop {
        let Some(end) = find_line(buf, pos, config.max_header_line_len, |len, max| {
            FrameError::HeaderLineTooLong { len, max }
        })?
        else {
            return Ok(None);
        };

        if end == pos {
            return Ok(Some(Head {
                command,
                headers,
                body_start: end + 1,
            }));
        }

        count += 1;
        if count > config.max_headers {
            return Err(FrameError::TooManyHeaders {
                max: config.max_headers,
            });
        }

        let line = config.encoding.decode(&buf[pos..end])?;
        let (name, value) = split_header(&line)?;
        // Repeated headers: the first occurrence wins.
        headers
            .entry(name.to_string())
            .or_insert_with(|| value.to_string());
        pos = end + 1;
    }
}

/// Index of the next line terminator at or after `start`, enforcing `max`
/// even when the line is not complete yet.
fn find_line(
    buf: &[u8],
    start: usize,
    max: usize,
    too_long: fn(usize, usize) -> FrameError,
) -> Result<Option<usize>> {
    let window = &buf[start..];
    match window.iter().position(|b| *b == LINE_TERMINATOR) {
        Some(len) if len > max => Err(too_long(len, max)),
        Some(len) => Ok(Some(start + len)),
        None if window.len() > max => Err(too_long(window.len(), max)),
        None => Ok(None),
    }
}

fn split_header(line: &str) -> Result<(&str, &str)> {
    match line.find(HEADER_DELIMITER as char) {
        Some(idx) if idx > 0 => Ok((&line[..idx], &line[idx + 1..])),
        _ => Err(FrameError::MalformedHeader(line.to_string())),
    }
}

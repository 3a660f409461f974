use std::collections::{BTreeMap, BTreeSet};

use crate::command::Command;
use crate::encoding::TextEncoding;
use crate::error::{FrameError, Result};
use crate::header::{validate_name, validate_value, AckMode, Header, HeaderType};

/// One STOMP message: command, uniquely named headers and an optional payload.
///
/// Headers are kept sorted by name, which is also their order on the wire.
///
/// A frame can be frozen: every header present at that moment is locked and
/// any later attempt to set it fails with [`FrameError::FrozenHeader`].
/// Headers added after the freeze stay mutable until the next one. The
/// connection layer freezes a frame before handing it to a decorator, and
/// the codec freezes it again when it is written.
#[derive(Debug, Clone)]
pub struct Frame {
    command: Command,
    headers: BTreeMap<String, String>,
    payload: Option<String>,
    frozen: BTreeSet<String>,
    encoding: TextEncoding,
}

impl Frame {
    /// Create an empty frame using UTF-8.
    pub fn new(command: Command) -> Self {
        Self::with_encoding(command, TextEncoding::UTF_8)
    }

    /// Create an empty frame whose content-length is measured in `encoding`.
    pub fn with_encoding(command: Command, encoding: TextEncoding) -> Self {
        Self {
            command,
            headers: BTreeMap::new(),
            payload: None,
            frozen: BTreeSet::new(),
            encoding,
        }
    }

    /// Assemble a decoded frame. Header legality is not checked for inbound
    /// frames; the result is frozen.
    pub(crate) fn from_wire(
        command: Command,
        headers: BTreeMap<String, String>,
        payload: Option<String>,
        encoding: TextEncoding,
    ) -> Self {
        let mut frame = Self {
            command,
            headers,
            payload,
            frozen: BTreeSet::new(),
            encoding,
        };
        frame.freeze();
        frame
    }

    pub fn command(&self) -> Command {
        self.command
    }

    pub fn encoding(&self) -> TextEncoding {
        self.encoding
    }

    /// Value of a well-known header.
    pub fn header(&self, header: HeaderType) -> Option<&str> {
        self.get(header.name())
    }

    /// Value of any header by name.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.headers.get(name).map(String::as_str)
    }

    /// Headers in wire order.
    pub fn headers(&self) -> impl Iterator<Item = (&str, &str)> {
        self.headers
            .iter()
            .map(|(name, value)| (name.as_str(), value.as_str()))
    }

    pub fn header_count(&self) -> usize {
        self.headers.len()
    }

    /// Set a well-known header.
    ///
    /// Fails if the header is not legal on this command (given the headers
    /// already present), if it was frozen, or if it is `content-length`,
    /// which only [`Frame::set_payload`] may set.
    pub fn set_header(&mut self, header: HeaderType, value: impl Into<String>) -> Result<&mut Self> {
        if header == HeaderType::ContentLength {
            return Err(FrameError::ReservedHeader(header.name().to_string()));
        }
        let mut value = value.into();
        if header == HeaderType::Ack {
            value = AckMode::parse(&value)?.as_str().to_string();
        }
        if !header.is_allowed(self) {
            return Err(FrameError::HeaderNotAllowed {
                header: header.name().to_string(),
                command: self.command,
            });
        }
        validate_value(header.name(), &value)?;
        self.put(header.name(), value)
    }

    /// Set an arbitrary header. Well-known names go through [`Frame::set_header`].
    pub fn set_custom_header(&mut self, name: &str, value: impl Into<String>) -> Result<&mut Self> {
        if let Some(header) = HeaderType::from_name(name) {
            return self.set_header(header, value);
        }
        let value = value.into();
        validate_name(name)?;
        validate_value(name, &value)?;
        self.put(name, value)
    }

    /// Apply a prepared [`Header`].
    pub fn apply(&mut self, header: Header) -> Result<&mut Self> {
        let (name, value) = header.into_parts();
        self.set_custom_header(&name, value)
    }

    fn put(&mut self, name: &str, value: String) -> Result<&mut Self> {
        if self.frozen.contains(name) {
            return Err(FrameError::FrozenHeader(name.to_string()));
        }
        self.headers.insert(name.to_string(), value);
        Ok(self)
    }

    pub fn payload(&self) -> Option<&str> {
        self.payload.as_deref()
    }

    /// Set the payload and derive `content-length` from its encoded size,
    /// for commands that carry one.
    pub fn set_payload(&mut self, payload: impl Into<String>) -> Result<&mut Self> {
        let payload = payload.into();
        if crate::header::is_header_allowed(self.command, HeaderType::ContentLength, self) {
            let len = self.encoding.encoded_len(&payload)?;
            self.put(HeaderType::ContentLength.name(), len.to_string())?;
        }
        self.payload = Some(payload);
        Ok(self)
    }

    /// Set the payload without a `content-length` header. The receiver then
    /// reads up to the frame terminator, so the payload must not contain NUL.
    pub fn set_payload_unmeasured(&mut self, payload: impl Into<String>) -> Result<&mut Self> {
        let name = HeaderType::ContentLength.name();
        if self.headers.contains_key(name) {
            if self.frozen.contains(name) {
                return Err(FrameError::FrozenHeader(name.to_string()));
            }
            self.headers.remove(name);
        }
        self.payload = Some(payload.into());
        Ok(self)
    }

    /// Declared payload length, if the frame carries a parseable one.
    pub fn content_length(&self) -> Option<usize> {
        self.header(HeaderType::ContentLength)
            .and_then(|value| value.trim().parse().ok())
    }

    /// Lock every header currently present.
    pub fn freeze(&mut self) {
        self.frozen.extend(self.headers.keys().cloned());
    }

    pub fn is_frozen(&self, name: &str) -> bool {
        self.frozen.contains(name)
    }

    /// A value copy of this frame with no frozen headers.
    pub fn copy(&self) -> Self {
        Self {
            command: self.command,
            headers: self.headers.clone(),
            payload: self.payload.clone(),
            frozen: BTreeSet::new(),
            encoding: self.encoding,
        }
    }
}

impl PartialEq for Frame {
    fn eq(&self, other: &Self) -> bool {
        self.command == other.command
            && self.headers == other.headers
            && self.payload().unwrap_or_default() == other.payload().unwrap_or_default()
    }
}

impl Eq for Frame {}

/// Fluent construction of outbound frames.
///
/// The first failing step is remembered and reported by [`FrameBuilder::build`].
#[derive(Debug)]
pub struct FrameBuilder {
    frame: Frame,
    error: Option<FrameError>,
}

impl FrameBuilder {
    pub fn new(command: Command) -> Self {
        Self::with_encoding(command, TextEncoding::UTF_8)
    }

    pub fn with_encoding(command: Command, encoding: TextEncoding) -> Self {
        Self {
            frame: Frame::with_encoding(command, encoding),
            error: None,
        }
    }

    pub fn header(self, header: HeaderType, value: impl Into<String>) -> Self {
        self.step(|frame| frame.set_header(header, value).map(|_| ()))
    }

    pub fn custom_header(self, name: &str, value: impl Into<String>) -> Self {
        self.step(|frame| frame.set_custom_header(name, value).map(|_| ()))
    }

    pub fn payload(self, payload: impl Into<String>) -> Self {
        self.step(|frame| frame.set_payload(payload).map(|_| ()))
    }

    pub fn build(self) -> Result<Frame> {
        match self.error {
            Some(err) => Err(err),
            None => Ok(self.frame),
        }
    }

    fn step(mut self, f: impl FnOnce(&mut Frame) -> Result<()>) -> Self {
        if self.error.is_none() {
            if let Err(err) = f(&mut self.frame) {
                self.error = Some(err);
            }
        }
        self
    }
}

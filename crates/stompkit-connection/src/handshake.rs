use std::fmt;
use std::time::Duration;

use stompkit_frame::{Command, Frame, HeaderType, TextEncoding};
use tracing::{debug, info, warn};

use crate::error::{ConnectionError, Result};
use crate::handler::TransmissionHandler;

/// Client side of the CONNECT/CONNECTED exchange.
#[derive(Clone, PartialEq, Eq)]
pub struct HandshakeRequest {
    pub login: Option<String>,
    /// Treated as opaque credential material and redacted in debug output.
    pub passcode: Option<String>,
    /// Encoding announced in the `encoding` header.
    pub encoding: TextEncoding,
}

/// Outcome of a successful handshake.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HandshakeResult {
    /// Broker-assigned session id, if the broker sent one.
    pub session: Option<String>,
    /// Encoding in effect for the rest of the connection.
    pub encoding: TextEncoding,
}

impl fmt::Debug for HandshakeRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut dbg = f.debug_struct("HandshakeRequest");
        dbg.field("login", &self.login);
        if let Some(passcode) = &self.passcode {
            dbg.field(
                "passcode",
                &format_args!("<redacted:{} bytes>", passcode.len()),
            );
        } else {
            dbg.field("passcode", &Option::<String>::None);
        }
        dbg.field("encoding", &self.encoding).finish()
    }
}

impl HandshakeRequest {
    /// Build the CONNECT frame for this request.
    pub fn connect_frame(&self) -> Result<Frame> {
        let mut frame = Frame::with_encoding(Command::Connect, self.encoding);
        frame.set_header(HeaderType::Encoding, self.encoding.name())?;
        if let Some(login) = &self.login {
            frame.set_header(HeaderType::Login, login.as_str())?;
        }
        if let Some(passcode) = &self.passcode {
            frame.set_header(HeaderType::Passcode, passcode.as_str())?;
        }
        Ok(frame)
    }
}

/// Send CONNECT and wait up to `timeout` for the reply.
///
/// The reception timeout is reset to "block indefinitely" once a reply
/// arrives. On failure the caller is responsible for closing the transport.
pub fn handshake<H: TransmissionHandler + ?Sized>(
    handler: &mut H,
    request: &HandshakeRequest,
    timeout: Duration,
) -> Result<HandshakeResult> {
    let mut connect = request.connect_frame()?;
    debug!(?request, "sending CONNECT");
    handler.send_frame(&mut connect)?;

    handler.set_reception_timeout(timeout)?;
    let reply = handler.receive_frame()?;
    handler.set_reception_timeout(Duration::ZERO)?;

    validate_connected(&reply, request.encoding)
}

/// Check a handshake reply against the requested encoding.
pub fn validate_connected(reply: &Frame, requested: TextEncoding) -> Result<HandshakeResult> {
    if reply.command() != Command::Connected {
        if let Some(message) = reply.header(HeaderType::Message) {
            warn!(%message, "broker refused connection");
        }
        return Err(ConnectionError::Protocol {
            expected: Command::Connected,
            received: reply.command(),
        });
    }

    if let Some(label) = reply.header(HeaderType::Encoding) {
        let matches = TextEncoding::for_label(label).is_ok_and(|enc| enc == requested);
        if !matches {
            return Err(ConnectionError::EncodingMismatch {
                requested: requested.name().to_string(),
                received: label.to_string(),
            });
        }
    }

    let session = reply.header(HeaderType::Session).map(str::to_string);
    match &session {
        Some(session) => info!(%session, encoding = %requested, "connected"),
        None => warn!("CONNECTED carried no session header"),
    }

    Ok(HandshakeResult {
        session,
        encoding: requested,
    })
}

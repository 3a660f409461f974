use std::fmt;
use std::time::Duration;

use stompkit_frame::{AckMode, Command, Frame, HeaderType, TextEncoding, WireFormat};
use tracing::{debug, info, warn};

use crate::config::ConnectionConfig;
use crate::decorator::{FrameDecorator, NoDecoration};
use crate::error::{ConnectionError, Result};
use crate::handler::{FailsafeHandler, TcpTransmissionHandler, TransmissionHandler};
use crate::handshake::{handshake, HandshakeRequest};
use crate::subscription::SubscriptionRegister;

/// Lifecycle of a [`Connection`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    New,
    Connecting,
    Connected,
    Closing,
    Closed,
    /// Absorbing failure state; every later operation fails.
    Broken,
}

impl ConnectionState {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::New => "NEW",
            Self::Connecting => "CONNECTING",
            Self::Connected => "CONNECTED",
            Self::Closing => "CLOSING",
            Self::Closed => "CLOSED",
            Self::Broken => "BROKEN",
        }
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Default transport: TCP behind the fail-safe wrapper.
pub type TcpHandler = FailsafeHandler<TcpTransmissionHandler>;

/// A single-threaded, blocking STOMP client connection.
///
/// `connect` is legal only from NEW, every other operation only from
/// CONNECTED. Any I/O, wire-format or protocol failure during an operation
/// moves the connection to BROKEN and closes the transport; a reception
/// timeout does not.
pub struct Connection<H: TransmissionHandler = TcpHandler> {
    handler: H,
    config: ConnectionConfig,
    encoding: TextEncoding,
    state: ConnectionState,
    session: Option<String>,
    subscriptions: SubscriptionRegister,
}

impl Connection<TcpHandler> {
    /// Connection over TCP to `config.host:config.port`. Nothing is opened
    /// until [`Connection::connect`].
    pub fn tcp(config: ConnectionConfig) -> Result<Self> {
        let encoding = config.text_encoding()?;
        let wire_format = WireFormat {
            encoding,
            ..config.wire_format.clone()
        };
        let handler = FailsafeHandler::new(TcpTransmissionHandler::new(
            config.host.clone(),
            config.port,
            wire_format,
        ));
        Self::with_handler(handler, config)
    }
}

impl<H: TransmissionHandler> Connection<H> {
    /// Connection over a caller-supplied transport.
    pub fn with_handler(handler: H, config: ConnectionConfig) -> Result<Self> {
        let encoding = config.text_encoding()?;
        Ok(Self {
            handler,
            config,
            encoding,
            state: ConnectionState::New,
            session: None,
            subscriptions: SubscriptionRegister::new(),
        })
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    /// Session id assigned by the broker during the handshake.
    pub fn session(&self) -> Option<&str> {
        self.session.as_deref()
    }

    pub fn encoding(&self) -> TextEncoding {
        self.encoding
    }

    pub fn config(&self) -> &ConnectionConfig {
        &self.config
    }

    pub fn subscriptions(&self) -> &SubscriptionRegister {
        &self.subscriptions
    }

    pub fn handler(&self) -> &H {
        &self.handler
    }

    #[cfg(test)]
    pub(crate) fn handler_mut_for_tests(&mut self) -> &mut H {
        &mut self.handler
    }

    /// Open the transport and perform the CONNECT/CONNECTED handshake.
    pub fn connect(&mut self) -> Result<()> {
        self.ensure_state("connect", ConnectionState::New)?;
        self.transition(ConnectionState::Connecting);

        let request = HandshakeRequest {
            login: self.config.login.clone(),
            passcode: self.config.passcode.clone(),
            encoding: self.encoding,
        };
        let timeout = self.config.connect_timeout;
        let outcome = self
            .handler
            .initialize(timeout)
            .and_then(|()| handshake(&mut self.handler, &request, timeout));

        match outcome {
            Ok(result) => {
                self.session = result.session;
                self.transition(ConnectionState::Connected);
                Ok(())
            }
            Err(err) => Err(self.poison(err)),
        }
    }

    /// Send DISCONNECT and release the transport.
    ///
    /// The state becomes CLOSED once DISCONNECT is written; no reply is
    /// awaited.
    pub fn close(&mut self) -> Result<()> {
        self.ensure_state("close", ConnectionState::Connected)?;
        self.transition(ConnectionState::Closing);

        let mut frame = self.new_frame(Command::Disconnect);
        if let Some(session) = &self.session {
            frame.set_header(HeaderType::Session, session.as_str())?;
        }
        if let Err(err) = self.handler.send_frame(&mut frame) {
            return Err(self.poison(err));
        }

        if let Err(err) = self.handler.close() {
            warn!(error = %err, "transport close failed after DISCONNECT");
        }
        self.subscriptions.clear();
        self.transition(ConnectionState::Closed);
        Ok(())
    }

    /// Send a SEND frame to `destination`, enriched by `decorator`.
    pub fn send(&mut self, destination: &str, decorator: &dyn FrameDecorator) -> Result<()> {
        self.ensure_state("send", ConnectionState::Connected)?;
        let mut frame = self.new_frame(Command::Send);
        frame.set_header(HeaderType::Destination, destination)?;
        self.dispatch(frame, decorator)
    }

    /// Acknowledge `message_id`.
    ///
    /// Brokers treat an acknowledgement as covering every earlier
    /// unacknowledged message of the same subscription when it uses
    /// `ack:client`.
    pub fn ack(&mut self, message_id: &str, decorator: &dyn FrameDecorator) -> Result<()> {
        self.ensure_state("ack", ConnectionState::Connected)?;
        let mut frame = self.new_frame(Command::Ack);
        frame.set_header(HeaderType::MessageId, message_id)?;
        self.dispatch(frame, decorator)
    }

    /// Subscribe to `destination` and return the subscription id.
    ///
    /// The id is taken from an `id` header set by the decorator, otherwise
    /// one is generated.
    pub fn subscribe(&mut self, destination: &str, decorator: &dyn FrameDecorator) -> Result<String> {
        self.ensure_state("subscribe", ConnectionState::Connected)?;
        let mut frame = self.new_frame(Command::Subscribe);
        frame.set_header(HeaderType::Destination, destination)?;
        if self.config.force_client_ack {
            frame.set_header(HeaderType::Ack, AckMode::Client.as_str())?;
        }
        frame.freeze();
        decorator.decorate(&mut frame)?;

        let id = match frame.header(HeaderType::SubscriptionId) {
            Some(id) => id.to_string(),
            None => {
                let id = self.subscriptions.generate_id();
                frame.set_header(HeaderType::SubscriptionId, id.as_str())?;
                id
            }
        };
        self.subscriptions.register(&id)?;

        if let Err(err) = self.handler.send_frame(&mut frame) {
            return Err(self.poison(err));
        }
        debug!(%id, %destination, "subscribed");
        Ok(id)
    }

    /// Cancel the subscription `id`.
    pub fn unsubscribe(&mut self, id: &str, decorator: &dyn FrameDecorator) -> Result<()> {
        self.ensure_state("unsubscribe", ConnectionState::Connected)?;
        if !self.subscriptions.contains(id) {
            return Err(ConnectionError::UnknownSubscription(id.to_string()));
        }
        let mut frame = self.new_frame(Command::Unsubscribe);
        frame.set_header(HeaderType::SubscriptionId, id)?;
        self.dispatch(frame, decorator)?;
        self.subscriptions.unregister(id)?;
        debug!(%id, "unsubscribed");
        Ok(())
    }

    /// Block until the next frame arrives.
    pub fn receive(&mut self) -> Result<Frame> {
        self.receive_timeout(Duration::ZERO)
    }

    /// Wait up to `timeout` for the next frame; `Duration::ZERO` blocks
    /// indefinitely. An expiring timeout yields [`ConnectionError::Timeout`]
    /// and leaves the connection usable.
    pub fn receive_timeout(&mut self, timeout: Duration) -> Result<Frame> {
        let frame = self.receive_inbound(timeout)?;
        if self.config.auto_ack {
            if let Some(message_id) = auto_ack_target(&frame) {
                self.ack(&message_id, &NoDecoration)?;
            }
        }
        Ok(frame)
    }

    pub(crate) fn receive_inbound(&mut self, timeout: Duration) -> Result<Frame> {
        self.ensure_state("receive", ConnectionState::Connected)?;

        let received = self
            .handler
            .set_reception_timeout(timeout)
            .and_then(|()| self.handler.receive_frame());
        let frame = match received {
            Ok(frame) => frame,
            Err(err) if err.is_timeout() => return Err(ConnectionError::Timeout),
            Err(err) => return Err(self.poison(err)),
        };

        if frame.command() == Command::Message {
            if let Some(id) = frame.header(HeaderType::Subscription) {
                if !self.subscriptions.contains(id) {
                    let err = ConnectionError::UnknownSubscription(id.to_string());
                    return Err(self.poison(err));
                }
            }
        }
        Ok(frame)
    }

    /// Fresh outbound frame in the connection's encoding.
    pub(crate) fn new_frame(&self, command: Command) -> Frame {
        Frame::with_encoding(command, self.encoding)
    }

    /// Send a protocol frame with no caller decoration.
    pub(crate) fn transmit(&mut self, operation: &'static str, mut frame: Frame) -> Result<()> {
        self.ensure_state(operation, ConnectionState::Connected)?;
        if let Err(err) = self.handler.send_frame(&mut frame) {
            return Err(self.poison(err));
        }
        Ok(())
    }

    /// Freeze, decorate and send. Decoration failures leave the connection
    /// intact since nothing reached the wire.
    fn dispatch(&mut self, mut frame: Frame, decorator: &dyn FrameDecorator) -> Result<()> {
        frame.freeze();
        decorator.decorate(&mut frame)?;
        if let Err(err) = self.handler.send_frame(&mut frame) {
            return Err(self.poison(err));
        }
        Ok(())
    }

    fn ensure_state(&self, operation: &'static str, expected: ConnectionState) -> Result<()> {
        match self.state {
            state if state == expected => Ok(()),
            ConnectionState::Broken => Err(ConnectionError::Broken { operation }),
            state => Err(ConnectionError::InvalidState { operation, state }),
        }
    }

    fn transition(&mut self, next: ConnectionState) {
        debug!(from = %self.state, to = %next, "connection state");
        self.state = next;
    }

    fn poison(&mut self, err: ConnectionError) -> ConnectionError {
        warn!(state = %self.state, error = %err, "connection broken");
        self.state = ConnectionState::Broken;
        self.subscriptions.clear();
        if let Err(close_err) = self.handler.close() {
            debug!(error = %close_err, "transport close after failure failed");
        }
        err
    }
}

impl<H: TransmissionHandler> Drop for Connection<H> {
    fn drop(&mut self) {
        if self.state == ConnectionState::Connected {
            info!("connection dropped while connected, disconnecting");
            if let Err(err) = self.close() {
                debug!(error = %err, "disconnect on drop failed");
            }
        }
    }
}

impl<H: TransmissionHandler> fmt::Debug for Connection<H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Connection")
            .field("host", &self.config.host)
            .field("port", &self.config.port)
            .field("state", &self.state)
            .field("session", &self.session)
            .field("encoding", &self.encoding)
            .field("subscriptions", &self.subscriptions.len())
            .finish()
    }
}

/// Message id to acknowledge for a received MESSAGE.
pub(crate) fn auto_ack_target(frame: &Frame) -> Option<String> {
    if frame.command() != Command::Message {
        return None;
    }
    frame.header(HeaderType::MessageId).map(str::to_string)
}

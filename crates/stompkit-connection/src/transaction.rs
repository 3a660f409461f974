use std::time::Duration;

use stompkit_frame::{Command, Frame, HeaderType};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::config::ConnectionConfig;
use crate::connection::{auto_ack_target, Connection, ConnectionState, TcpHandler};
use crate::decorator::{FrameDecorator, NoDecoration, TransactionDecorator};
use crate::error::{ConnectionError, Result};
use crate::handler::TransmissionHandler;

/// A [`Connection`] with broker-side transactions.
///
/// While a transaction is active every SEND and ACK carries its id. Callers
/// may not set the `transaction` header themselves; such frames are
/// rejected before anything is written.
#[derive(Debug)]
pub struct TransactionalConnection<H: TransmissionHandler = TcpHandler> {
    connection: Connection<H>,
    transaction: Option<String>,
    auto_begin: bool,
}

impl TransactionalConnection<TcpHandler> {
    pub fn tcp(config: ConnectionConfig) -> Result<Self> {
        Ok(Self::new(Connection::tcp(config)?))
    }
}

impl<H: TransmissionHandler> TransactionalConnection<H> {
    pub fn new(connection: Connection<H>) -> Self {
        Self {
            connection,
            transaction: None,
            auto_begin: false,
        }
    }

    /// Begin a transaction automatically before a send or ack when none is
    /// active.
    pub fn with_auto_begin(mut self, auto_begin: bool) -> Self {
        self.auto_begin = auto_begin;
        self
    }

    pub fn connection(&self) -> &Connection<H> {
        &self.connection
    }

    pub fn state(&self) -> ConnectionState {
        self.connection.state()
    }

    /// Id of the active transaction.
    pub fn transaction_id(&self) -> Option<&str> {
        self.transaction.as_deref()
    }

    pub fn in_transaction(&self) -> bool {
        self.transaction.is_some()
    }

    pub fn connect(&mut self) -> Result<()> {
        self.connection.connect()
    }

    /// Disconnect. An active transaction is abandoned; the broker aborts it.
    pub fn close(&mut self) -> Result<()> {
        if let Some(id) = self.transaction.take() {
            warn!(transaction = %id, "closing with an open transaction");
        }
        self.connection.close()
    }

    /// Begin a transaction with a generated id.
    pub fn begin(&mut self) -> Result<String> {
        self.begin_with(Uuid::new_v4().to_string())
    }

    /// Begin a transaction with a caller-chosen id.
    pub fn begin_with(&mut self, id: impl Into<String>) -> Result<String> {
        if self.transaction.is_some() {
            return Err(ConnectionError::TransactionState("transaction already active"));
        }
        let id = id.into();
        let mut frame = self.connection.new_frame(Command::Begin);
        frame.set_header(HeaderType::Transaction, id.as_str())?;
        self.connection.transmit("begin", frame)?;

        debug!(transaction = %id, "transaction started");
        self.transaction = Some(id.clone());
        Ok(id)
    }

    /// Commit the active transaction.
    pub fn commit(&mut self, decorator: &dyn FrameDecorator) -> Result<()> {
        self.finish(Command::Commit, "commit", decorator)
    }

    /// Abort the active transaction.
    pub fn rollback(&mut self, decorator: &dyn FrameDecorator) -> Result<()> {
        self.finish(Command::Abort, "rollback", decorator)
    }

    /// Once the frame is decorated the transaction is forgotten locally,
    /// whether or not COMMIT/ABORT reaches the broker.
    fn finish(
        &mut self,
        command: Command,
        operation: &'static str,
        decorator: &dyn FrameDecorator,
    ) -> Result<()> {
        let Some(id) = self.transaction.clone() else {
            return Err(ConnectionError::TransactionState("no active transaction"));
        };
        let mut frame = self.connection.new_frame(command);
        frame.set_header(HeaderType::Transaction, id.as_str())?;
        frame.freeze();
        decorator.decorate(&mut frame)?;
        self.transaction = None;
        self.connection.transmit(operation, frame)?;
        debug!(transaction = %id, %command, "transaction finished");
        Ok(())
    }

    /// Send to `destination`, inside the active transaction if any.
    pub fn send(&mut self, destination: &str, decorator: &dyn FrameDecorator) -> Result<()> {
        self.auto_begin()?;
        match self.transaction.as_deref() {
            Some(id) => self
                .connection
                .send(destination, &TransactionDecorator::new(id, decorator)),
            None => self.connection.send(destination, decorator),
        }
    }

    /// Acknowledge `message_id`, inside the active transaction if any.
    pub fn ack(&mut self, message_id: &str, decorator: &dyn FrameDecorator) -> Result<()> {
        self.auto_begin()?;
        match self.transaction.as_deref() {
            Some(id) => self
                .connection
                .ack(message_id, &TransactionDecorator::new(id, decorator)),
            None => self.connection.ack(message_id, decorator),
        }
    }

    pub fn subscribe(&mut self, destination: &str, decorator: &dyn FrameDecorator) -> Result<String> {
        self.connection.subscribe(destination, decorator)
    }

    pub fn unsubscribe(&mut self, id: &str, decorator: &dyn FrameDecorator) -> Result<()> {
        self.connection.unsubscribe(id, decorator)
    }

    pub fn receive(&mut self) -> Result<Frame> {
        self.receive_timeout(Duration::ZERO)
    }

    /// Like [`Connection::receive_timeout`]; with `auto_ack` the
    /// acknowledgement joins the active transaction.
    pub fn receive_timeout(&mut self, timeout: Duration) -> Result<Frame> {
        let frame = self.connection.receive_inbound(timeout)?;
        if self.connection.config().auto_ack {
            if let Some(message_id) = auto_ack_target(&frame) {
                self.ack(&message_id, &NoDecoration)?;
            }
        }
        Ok(frame)
    }

    fn auto_begin(&mut self) -> Result<()> {
        if self.auto_begin && self.transaction.is_none() {
            self.begin()?;
        }
        Ok(())
    }
}

//! STOMP connection management.
//!
//! This is the "just works" layer. Connect to a broker, send, subscribe,
//! receive and acknowledge, optionally inside broker-side transactions.
//! Headers the protocol owns are set before caller decoration runs and are
//! frozen, so callers can enrich frames but never override them.

pub mod config;
pub mod connection;
pub mod decorator;
pub mod error;
pub mod handler;
pub mod handshake;
pub mod subscription;
pub mod transaction;

#[cfg(test)]
mod testing;

pub use config::{ConnectionConfig, DEFAULT_PORT};
pub use connection::{Connection, ConnectionState, TcpHandler};
pub use decorator::{
    from_fn, with_payload, DecoratorChain, FrameDecorator, NoDecoration, TransactionDecorator,
};
pub use error::{ConnectionError, Result};
pub use handler::{FailsafeHandler, TcpTransmissionHandler, TransmissionHandler};
pub use handshake::{handshake, validate_connected, HandshakeRequest, HandshakeResult};
pub use subscription::SubscriptionRegister;
pub use transaction::TransactionalConnection;

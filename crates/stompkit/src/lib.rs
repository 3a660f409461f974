//! Client-side STOMP protocol engine.
//!
//! stompkit frames, serializes and parses STOMP messages, drives the
//! CONNECT/CONNECTED handshake and connection lifecycle, and layers
//! transactions and acknowledgements over plain send/receive.
//!
//! # Crate Structure
//!
//! - [`transport`]: TCP stream acquisition with connect/read/write timeouts
//! - [`frame`]: Frame model, header rules and the wire-format codec
//! - [`connection`]: Connection state machine, decorators and transactions
//!   (behind `connection` feature)
//!
//! # Example
//!
//! ```no_run
//! use stompkit::connection::{with_payload, Connection, ConnectionConfig, NoDecoration};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = ConnectionConfig::new("localhost", 61613).with_credentials("guest", "guest");
//! let mut conn = Connection::tcp(config)?;
//! conn.connect()?;
//! conn.subscribe("/queue/greetings", &NoDecoration)?;
//! conn.send("/queue/greetings", &with_payload("hello"))?;
//! let message = conn.receive()?;
//! println!("{:?}", message.payload());
//! conn.close()?;
//! # Ok(())
//! # }
//! ```

/// Re-export transport types.
pub mod transport {
    pub use stompkit_transport::*;
}

/// Re-export frame types.
pub mod frame {
    pub use stompkit_frame::*;
}

/// Re-export connection types (requires `connection` feature).
#[cfg(feature = "connection")]
pub mod connection {
    pub use stompkit_connection::*;
}

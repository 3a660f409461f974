//! Blocking TCP transport for STOMP clients.
//!
//! This is the lowest layer of stompkit. It resolves a broker address,
//! connects with a bounded timeout and hands out a [`StompStream`] that the
//! frame layer reads from and writes to. Nothing here knows about frames.

pub mod error;
pub mod stream;

pub use error::{Result, TransportError};
pub use stream::StompStream;

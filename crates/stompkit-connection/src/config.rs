use std::fmt;
use std::time::Duration;

use stompkit_frame::{TextEncoding, WireFormat};

use crate::error::Result;

/// Default STOMP broker port.
pub const DEFAULT_PORT: u16 = 61613;

/// Construction-time connection parameters.
#[derive(Clone)]
pub struct ConnectionConfig {
    /// Broker host name or address.
    pub host: String,
    /// Broker port.
    pub port: u16,
    /// Sent as the `login` header when set. With `None` the CONNECT frame
    /// carries no `login` header at all, for brokers that accept anonymous
    /// clients.
    pub login: Option<String>,
    /// Sent as the `passcode` header when set; omitted from CONNECT when
    /// `None`. Never logged.
    pub passcode: Option<String>,
    /// Requested text encoding label. The broker must confirm it or omit it.
    pub encoding: String,
    /// Bound for the TCP connect and for the CONNECTED reply.
    pub connect_timeout: Duration,
    /// Wire-level limits. Its `encoding` is replaced by the negotiated one.
    pub wire_format: WireFormat,
    /// Force `ack:client` on every SUBSCRIBE.
    pub force_client_ack: bool,
    /// Acknowledge every received MESSAGE before returning it.
    pub auto_ack: bool,
}

impl ConnectionConfig {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            ..Self::default()
        }
    }

    pub fn with_credentials(mut self, login: impl Into<String>, passcode: impl Into<String>) -> Self {
        self.login = Some(login.into());
        self.passcode = Some(passcode.into());
        self
    }

    pub fn with_encoding(mut self, encoding: impl Into<String>) -> Self {
        self.encoding = encoding.into();
        self
    }

    /// Resolve the requested encoding label.
    pub fn text_encoding(&self) -> Result<TextEncoding> {
        Ok(TextEncoding::for_label(&self.encoding)?)
    }
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: DEFAULT_PORT,
            login: None,
            passcode: None,
            encoding: "UTF-8".to_string(),
            connect_timeout: Duration::from_secs(5),
            wire_format: WireFormat::default(),
            force_client_ack: false,
            auto_ack: false,
        }
    }
}

impl fmt::Debug for ConnectionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut dbg = f.debug_struct("ConnectionConfig");
        dbg.field("host", &self.host)
            .field("port", &self.port)
            .field("login", &self.login);
        if let Some(passcode) = &self.passcode {
            dbg.field("passcode", &format_args!("<redacted:{} bytes>", passcode.len()));
        } else {
            dbg.field("passcode", &Option::<String>::None);
        }
        dbg.field("encoding", &self.encoding)
            .field("connect_timeout", &self.connect_timeout)
            .field("wire_format", &self.wire_format)
            .field("force_client_ack", &self.force_client_ack)
            .field("auto_ack", &self.auto_ack)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ConnectionError;

    #[test]
    fn defaults() {
        let config = ConnectionConfig::default();
        assert_eq!(config.host, "localhost");
        assert_eq!(config.port, 61613);
        assert_eq!(config.encoding, "UTF-8");
        assert_eq!(config.connect_timeout, Duration::from_secs(5));
        assert!(!config.force_client_ack);
        assert!(!config.auto_ack);
        assert_eq!(config.text_encoding().unwrap(), TextEncoding::UTF_8);
    }

    #[test]
    fn debug_redacts_passcode() {
        let config = ConnectionConfig::new("broker", 61614).with_credentials("admin", "s3cret");
        let rendered = format!("{config:?}");
        assert!(rendered.contains("admin"));
        assert!(!rendered.contains("s3cret"));
        assert!(rendered.contains("<redacted:6 bytes>"));
    }

    #[test]
    fn unknown_encoding_is_rejected() {
        let config = ConnectionConfig::default().with_encoding("EBCDIC-nope");
        assert!(matches!(
            config.text_encoding(),
            Err(ConnectionError::Frame(stompkit_frame::FrameError::UnsupportedEncoding(_)))
        ));
    }
}

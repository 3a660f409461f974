//! Headers and the per-command header legality rules.
//!
//! The rules are data: every [`HeaderType`] maps to the commands it may
//! appear on, and a rule may depend on what the frame already carries
//! (UNSUBSCRIBE takes either a destination or a subscription id, not both).

use std::fmt;

use crate::command::Command;
use crate::error::{FrameError, Result};
use crate::frame::Frame;

/// Well-known header names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum HeaderType {
    Encoding,
    Login,
    Passcode,
    Session,
    Destination,
    Ack,
    Transaction,
    Receipt,
    ReceiptId,
    Message,
    MessageId,
    ContentLength,
    SubscriptionId,
    Selector,
    Subscription,
}

/// Condition under which a header is legal on a command.
#[derive(Debug, Clone, Copy)]
enum Rule {
    Always,
    /// Legal only while the frame does not carry the other header.
    Unless(HeaderType),
}

const CLIENT_ANY: &[(Command, Rule)] = &[
    (Command::Connect, Rule::Always),
    (Command::Disconnect, Rule::Always),
    (Command::Subscribe, Rule::Always),
    (Command::Unsubscribe, Rule::Always),
    (Command::Begin, Rule::Always),
    (Command::Commit, Rule::Always),
    (Command::Abort, Rule::Always),
    (Command::Ack, Rule::Always),
    (Command::Send, Rule::Always),
];

impl HeaderType {
    pub const ALL: [HeaderType; 15] = [
        HeaderType::Encoding,
        HeaderType::Login,
        HeaderType::Passcode,
        HeaderType::Session,
        HeaderType::Destination,
        HeaderType::Ack,
        HeaderType::Transaction,
        HeaderType::Receipt,
        HeaderType::ReceiptId,
        HeaderType::Message,
        HeaderType::MessageId,
        HeaderType::ContentLength,
        HeaderType::SubscriptionId,
        HeaderType::Selector,
        HeaderType::Subscription,
    ];

    /// The wire name of this header.
    pub fn name(self) -> &'static str {
        match self {
            HeaderType::Encoding => "encoding",
            HeaderType::Login => "login",
            HeaderType::Passcode => "passcode",
            HeaderType::Session => "session",
            HeaderType::Destination => "destination",
            HeaderType::Ack => "ack",
            HeaderType::Transaction => "transaction",
            HeaderType::Receipt => "receipt",
            HeaderType::ReceiptId => "receipt-id",
            HeaderType::Message => "message",
            HeaderType::MessageId => "message-id",
            HeaderType::ContentLength => "content-length",
            HeaderType::SubscriptionId => "id",
            HeaderType::Selector => "selector",
            HeaderType::Subscription => "subscription",
        }
    }

    /// Look up a well-known header by exact name.
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|h| h.name() == name)
    }

    fn rules(self) -> &'static [(Command, Rule)] {
        match self {
            HeaderType::Encoding => &[
                (Command::Connect, Rule::Always),
                (Command::Connected, Rule::Always),
            ],
            HeaderType::Login | HeaderType::Passcode => &[(Command::Connect, Rule::Always)],
            HeaderType::Session => &[
                (Command::Connected, Rule::Always),
                (Command::Disconnect, Rule::Always),
            ],
            HeaderType::Destination => &[
                (Command::Send, Rule::Always),
                (Command::Subscribe, Rule::Always),
                (Command::Message, Rule::Always),
                (
                    Command::Unsubscribe,
                    Rule::Unless(HeaderType::SubscriptionId),
                ),
            ],
            HeaderType::Ack | HeaderType::Selector => &[(Command::Subscribe, Rule::Always)],
            HeaderType::Transaction => &[
                (Command::Begin, Rule::Always),
                (Command::Commit, Rule::Always),
                (Command::Abort, Rule::Always),
                (Command::Send, Rule::Always),
                (Command::Ack, Rule::Always),
            ],
            HeaderType::Receipt => CLIENT_ANY,
            HeaderType::ReceiptId => &[(Command::Receipt, Rule::Always)],
            HeaderType::Message => &[(Command::Error, Rule::Always)],
            HeaderType::MessageId => &[
                (Command::Message, Rule::Always),
                (Command::Ack, Rule::Always),
            ],
            HeaderType::ContentLength => &[
                (Command::Send, Rule::Always),
                (Command::Message, Rule::Always),
                (Command::Error, Rule::Always),
            ],
            HeaderType::SubscriptionId => &[
                (Command::Subscribe, Rule::Always),
                (Command::Unsubscribe, Rule::Unless(HeaderType::Destination)),
            ],
            HeaderType::Subscription => &[
                (Command::Message, Rule::Always),
                (Command::Ack, Rule::Always),
            ],
        }
    }

    /// Whether this header may be set on `frame` given what it already carries.
    pub fn is_allowed(self, frame: &Frame) -> bool {
        is_header_allowed(frame.command(), self, frame)
    }
}

impl fmt::Display for HeaderType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Whether `header` is legal on `command`, given the frame's current headers.
pub fn is_header_allowed(command: Command, header: HeaderType, frame: &Frame) -> bool {
    header
        .rules()
        .iter()
        .any(|(cmd, rule)| *cmd == command && rule_holds(*rule, frame))
}

fn rule_holds(rule: Rule, frame: &Frame) -> bool {
    match rule {
        Rule::Always => true,
        Rule::Unless(other) => frame.header(other).is_none(),
    }
}

/// Acknowledgement mode carried by the `ack` header of SUBSCRIBE.
///
/// With `client` acknowledgement, acknowledging a message also acknowledges
/// every earlier unacknowledged message on the same subscription. The
/// broker enforces this; the client only sends the ACK.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AckMode {
    Auto,
    Client,
    ClientIndividual,
}

impl AckMode {
    /// Parse an ack mode, ignoring ASCII case.
    pub fn parse(value: &str) -> Result<Self> {
        if value.eq_ignore_ascii_case("auto") {
            Ok(AckMode::Auto)
        } else if value.eq_ignore_ascii_case("client") {
            Ok(AckMode::Client)
        } else if value.eq_ignore_ascii_case("client-individual") {
            Ok(AckMode::ClientIndividual)
        } else {
            Err(FrameError::InvalidAckMode(value.to_string()))
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            AckMode::Auto => "auto",
            AckMode::Client => "client",
            AckMode::ClientIndividual => "client-individual",
        }
    }
}

impl fmt::Display for AckMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A validated header name/value pair.
///
/// Absence of a header is absence from the frame; a header value is never
/// missing.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Header {
    name: String,
    value: String,
}

impl Header {
    /// Create a header, validating both name and value.
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Result<Self> {
        let name = name.into();
        let value = value.into();
        validate_name(&name)?;
        validate_value(&name, &value)?;
        Ok(Self { name, value })
    }

    /// Create a well-known header.
    pub fn of(header: HeaderType, value: impl Into<String>) -> Result<Self> {
        Self::new(header.name(), value)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn value(&self) -> &str {
        &self.value
    }

    /// The well-known type of this header, if any.
    pub fn header_type(&self) -> Option<HeaderType> {
        HeaderType::from_name(&self.name)
    }

    pub fn into_parts(self) -> (String, String) {
        (self.name, self.value)
    }
}

impl fmt::Display for Header {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.name, self.value)
    }
}

pub(crate) fn validate_name(name: &str) -> Result<()> {
    if name.is_empty() || name.contains([':', '\n', '\0']) {
        return Err(FrameError::InvalidHeaderName(name.to_string()));
    }
    Ok(())
}

pub(crate) fn validate_value(name: &str, value: &str) -> Result<()> {
    if value.contains(['\n', '\0']) {
        return Err(FrameError::InvalidHeaderValue(name.to_string()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_round_trip() {
        for header in HeaderType::ALL {
            assert_eq!(HeaderType::from_name(header.name()), Some(header));
        }
        assert_eq!(HeaderType::SubscriptionId.name(), "id");
        assert_eq!(HeaderType::from_name("expires"), None);
    }

    #[test]
    fn login_is_connect_only() {
        let connect = Frame::new(Command::Connect);
        let send = Frame::new(Command::Send);
        assert!(HeaderType::Login.is_allowed(&connect));
        assert!(HeaderType::Passcode.is_allowed(&connect));
        assert!(!HeaderType::Login.is_allowed(&send));
        assert!(!HeaderType::Passcode.is_allowed(&send));
    }

    #[test]
    fn unsubscribe_destination_and_id_are_exclusive() {
        let mut by_destination = Frame::new(Command::Unsubscribe);
        assert!(HeaderType::Destination.is_allowed(&by_destination));
        assert!(HeaderType::SubscriptionId.is_allowed(&by_destination));

        by_destination
            .set_header(HeaderType::Destination, "/queue/a")
            .unwrap();
        assert!(!HeaderType::SubscriptionId.is_allowed(&by_destination));

        let mut by_id = Frame::new(Command::Unsubscribe);
        by_id.set_header(HeaderType::SubscriptionId, "sub-1").unwrap();
        assert!(!HeaderType::Destination.is_allowed(&by_id));
    }

    #[test]
    fn receipt_allowed_on_every_client_command() {
        for cmd in Command::ALL {
            let frame = Frame::new(cmd);
            assert_eq!(
                is_header_allowed(cmd, HeaderType::Receipt, &frame),
                cmd.is_client(),
                "{cmd}"
            );
        }
    }

    #[test]
    fn content_length_only_on_bodied_commands() {
        let allowed: Vec<Command> = Command::ALL
            .iter()
            .copied()
            .filter(|cmd| {
                is_header_allowed(*cmd, HeaderType::ContentLength, &Frame::new(*cmd))
            })
            .collect();
        assert_eq!(
            allowed,
            vec![Command::Send, Command::Message, Command::Error]
        );
    }

    #[test]
    fn ack_mode_is_case_insensitive() {
        assert_eq!(AckMode::parse("AUTO").unwrap(), AckMode::Auto);
        assert_eq!(AckMode::parse("Client").unwrap(), AckMode::Client);
        assert_eq!(
            AckMode::parse("client-INDIVIDUAL").unwrap(),
            AckMode::ClientIndividual
        );
        assert!(matches!(
            AckMode::parse("sometimes"),
            Err(FrameError::InvalidAckMode(_))
        ));
    }

    #[test]
    fn header_validation() {
        assert!(Header::new("x-custom", "a:b:c").is_ok());
        assert!(matches!(
            Header::new("", "v"),
            Err(FrameError::InvalidHeaderName(_))
        ));
        assert!(matches!(
            Header::new("a:b", "v"),
            Err(FrameError::InvalidHeaderName(_))
        ));
        assert!(matches!(
            Header::new("name", "line\nbreak"),
            Err(FrameError::InvalidHeaderValue(_))
        ));

        let header = Header::of(HeaderType::MessageId, "m-1").unwrap();
        assert_eq!(header.to_string(), "message-id:m-1");
        assert_eq!(header.header_type(), Some(HeaderType::MessageId));
    }
}

//! STOMP commands.
//!
//! Client commands travel from the application to the broker, server
//! commands travel the other way. Lookup is by exact, case-sensitive name.

use std::fmt;

/// Which side of the connection originates a command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    Client,
    Server,
}

/// A STOMP frame command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Command {
    Connect,
    Disconnect,
    Subscribe,
    Unsubscribe,
    Begin,
    Commit,
    Abort,
    Ack,
    Send,
    Connected,
    Message,
    Receipt,
    Error,
}

impl Command {
    /// Every command, client commands first.
    pub const ALL: [Command; 13] = [
        Command::Connect,
        Command::Disconnect,
        Command::Subscribe,
        Command::Unsubscribe,
        Command::Begin,
        Command::Commit,
        Command::Abort,
        Command::Ack,
        Command::Send,
        Command::Connected,
        Command::Message,
        Command::Receipt,
        Command::Error,
    ];

    /// Look up a command by its wire name.
    ///
    /// Unknown or blank names return `None`; the caller decides whether that
    /// is fatal.
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|cmd| cmd.as_str() == name)
    }

    /// The wire name of this command.
    pub fn as_str(self) -> &'static str {
        match self {
            Command::Connect => "CONNECT",
            Command::Disconnect => "DISCONNECT",
            Command::Subscribe => "SUBSCRIBE",
            Command::Unsubscribe => "UNSUBSCRIBE",
            Command::Begin => "BEGIN",
            Command::Commit => "COMMIT",
            Command::Abort => "ABORT",
            Command::Ack => "ACK",
            Command::Send => "SEND",
            Command::Connected => "CONNECTED",
            Command::Message => "MESSAGE",
            Command::Receipt => "RECEIPT",
            Command::Error => "ERROR",
        }
    }

    pub fn direction(self) -> Direction {
        match self {
            Command::Connected | Command::Message | Command::Receipt | Command::Error => {
                Direction::Server
            }
            _ => Direction::Client,
        }
    }

    /// Returns true for commands sent by clients.
    pub fn is_client(self) -> bool {
        self.direction() == Direction::Client
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_every_command_by_name() {
        for cmd in Command::ALL {
            assert_eq!(Command::from_name(cmd.as_str()), Some(cmd));
        }
    }

    #[test]
    fn lookup_is_exact_match() {
        assert_eq!(Command::from_name("send"), None);
        assert_eq!(Command::from_name(" SEND"), None);
        assert_eq!(Command::from_name("SEND\r"), None);
        assert_eq!(Command::from_name(""), None);
        assert_eq!(Command::from_name("NACK"), None);
    }

    #[test]
    fn direction_flags() {
        let server: Vec<_> = Command::ALL
            .iter()
            .filter(|cmd| !cmd.is_client())
            .map(|cmd| cmd.as_str())
            .collect();
        assert_eq!(server, vec!["CONNECTED", "MESSAGE", "RECEIPT", "ERROR"]);
        assert_eq!(Command::Send.direction(), Direction::Client);
    }
}

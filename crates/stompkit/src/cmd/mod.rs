use std::path::PathBuf;
use std::time::Duration;

use clap::{Args, Subcommand, ValueEnum};
use stompkit_connection::{ConnectionConfig, DEFAULT_PORT};
use stompkit_frame::AckMode;

use crate::exit::{CliError, CliResult, USAGE};
use crate::output::OutputFormat;

pub mod receive;
pub mod send;
pub mod version;

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Send a single message.
    Send(SendArgs),
    /// Subscribe to a destination and print received messages.
    Receive(ReceiveArgs),
    /// Show version information.
    Version(VersionArgs),
}

pub fn run(command: Command, format: OutputFormat) -> CliResult<i32> {
    match command {
        Command::Send(args) => send::run(args, format),
        Command::Receive(args) => receive::run(args, format),
        Command::Version(args) => version::run(args),
    }
}

/// Broker connection options shared by every networked subcommand.
#[derive(Args, Debug, Clone)]
pub struct ConnectionArgs {
    /// Broker host.
    #[arg(long, env = "STOMPKIT_HOST", default_value = "localhost")]
    pub host: String,
    /// Broker port.
    #[arg(long, env = "STOMPKIT_PORT", default_value_t = DEFAULT_PORT)]
    pub port: u16,
    /// Login sent in CONNECT.
    #[arg(long, env = "STOMPKIT_LOGIN")]
    pub login: Option<String>,
    /// Passcode sent in CONNECT.
    #[arg(long, env = "STOMPKIT_PASSCODE", hide_env_values = true)]
    pub passcode: Option<String>,
    /// Requested text encoding.
    #[arg(long, default_value = "UTF-8")]
    pub encoding: String,
    /// Bound for the TCP connect and the handshake (e.g. 5s, 500ms).
    #[arg(long, default_value = "5s")]
    pub connect_timeout: String,
}

impl ConnectionArgs {
    pub fn to_config(&self) -> CliResult<ConnectionConfig> {
        let config = ConnectionConfig {
            host: self.host.clone(),
            port: self.port,
            login: self.login.clone(),
            passcode: self.passcode.clone(),
            encoding: self.encoding.clone(),
            connect_timeout: parse_duration(&self.connect_timeout)?,
            ..ConnectionConfig::default()
        };
        config
            .text_encoding()
            .map_err(|err| CliError::new(USAGE, format!("--encoding: {err}")))?;
        Ok(config)
    }
}

#[derive(Args, Debug)]
pub struct SendArgs {
    #[command(flatten)]
    pub connection: ConnectionArgs,
    /// Destination to send to (e.g. /queue/orders).
    pub destination: String,
    /// Message body.
    #[arg(long, conflicts_with = "file")]
    pub data: Option<String>,
    /// Read message body from file.
    #[arg(long, conflicts_with = "data")]
    pub file: Option<PathBuf>,
    /// Extra header as name:value (repeatable).
    #[arg(long = "header", short = 'H', value_name = "NAME:VALUE", value_parser = parse_header)]
    pub headers: Vec<(String, String)>,
    /// Wrap the send in BEGIN/COMMIT.
    #[arg(long)]
    pub transactional: bool,
}

#[derive(Args, Debug)]
pub struct ReceiveArgs {
    #[command(flatten)]
    pub connection: ConnectionArgs,
    /// Destination to subscribe to.
    pub destination: String,
    /// Exit after receiving N messages.
    #[arg(long)]
    pub count: Option<usize>,
    /// Give up after this long without a message (e.g. 10s, 500ms).
    #[arg(long)]
    pub timeout: Option<String>,
    /// Acknowledgement mode of the subscription.
    #[arg(long, value_enum, default_value = "auto")]
    pub ack: AckArg,
    /// Broker-side message selector.
    #[arg(long)]
    pub selector: Option<String>,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum AckArg {
    Auto,
    Client,
    ClientIndividual,
}

impl From<AckArg> for AckMode {
    fn from(arg: AckArg) -> Self {
        match arg {
            AckArg::Auto => AckMode::Auto,
            AckArg::Client => AckMode::Client,
            AckArg::ClientIndividual => AckMode::ClientIndividual,
        }
    }
}

#[derive(Args, Debug)]
pub struct VersionArgs {
    /// Show extended build provenance.
    #[arg(long)]
    pub extended: bool,
}

pub fn parse_duration(input: &str) -> CliResult<Duration> {
    let input = input.trim();
    if input.is_empty() {
        return Err(CliError::new(USAGE, "duration must not be empty"));
    }

    let (number, unit) = if let Some(num) = input.strip_suffix("ms") {
        (num, "ms")
    } else if let Some(num) = input.strip_suffix('s') {
        (num, "s")
    } else {
        (input, "s")
    };

    let value: u64 = number
        .parse()
        .map_err(|_| CliError::new(USAGE, format!("invalid duration value: {input}")))?;

    if value == 0 {
        return Err(CliError::new(USAGE, "duration must be greater than zero"));
    }

    match unit {
        "ms" => Ok(Duration::from_millis(value)),
        _ => Ok(Duration::from_secs(value)),
    }
}

fn parse_header(input: &str) -> Result<(String, String), String> {
    match input.split_once(':') {
        Some((name, value)) if !name.is_empty() => Ok((name.to_string(), value.to_string())),
        _ => Err(format!("expected NAME:VALUE, got '{input}'")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_duration_seconds_and_millis() {
        assert_eq!(parse_duration("2s").unwrap(), Duration::from_secs(2));
        assert_eq!(parse_duration("150ms").unwrap(), Duration::from_millis(150));
        assert_eq!(parse_duration("3").unwrap(), Duration::from_secs(3));
    }

    #[test]
    fn parse_duration_rejects_invalid_values() {
        assert!(parse_duration("0s").is_err());
        assert!(parse_duration("bad").is_err());
        assert!(parse_duration("").is_err());
    }

    #[test]
    fn parse_header_splits_on_first_colon() {
        assert_eq!(
            parse_header("x-trace:a:b").unwrap(),
            ("x-trace".to_string(), "a:b".to_string())
        );
        assert!(parse_header(":value").is_err());
        assert!(parse_header("novalue").is_err());
    }

    #[test]
    fn connection_args_reject_unknown_encoding() {
        let args = ConnectionArgs {
            host: "localhost".into(),
            port: DEFAULT_PORT,
            login: None,
            passcode: None,
            encoding: "no-such-encoding".into(),
            connect_timeout: "1s".into(),
        };
        let err = args.to_config().unwrap_err();
        assert_eq!(err.code, USAGE);
    }
}

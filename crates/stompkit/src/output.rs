use std::collections::BTreeMap;
use std::io::{IsTerminal, Write};
use std::time::{SystemTime, UNIX_EPOCH};

use clap::ValueEnum;
use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use serde::Serialize;
use stompkit_frame::Frame;

#[derive(Clone, Debug, Copy, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Pretty,
    Raw,
}

impl OutputFormat {
    pub fn default_for_stdout() -> Self {
        if std::io::stdout().is_terminal() {
            Self::Table
        } else {
            Self::Json
        }
    }
}

#[derive(Serialize)]
struct FrameOutput<'a> {
    command: &'a str,
    headers: BTreeMap<&'a str, &'a str>,
    payload_size: usize,
    payload: &'a str,
    timestamp: String,
}

impl<'a> FrameOutput<'a> {
    fn from_frame(frame: &'a Frame) -> Self {
        let payload = frame.payload().unwrap_or_default();
        Self {
            command: frame.command().as_str(),
            headers: frame.headers().collect(),
            payload_size: payload.len(),
            payload,
            timestamp: now_unix_seconds(),
        }
    }
}

#[derive(Serialize)]
struct SendOutput<'a> {
    destination: &'a str,
    payload_size: usize,
    transaction: Option<&'a str>,
    session: Option<&'a str>,
    timestamp: String,
}

pub fn print_frame(frame: &Frame, format: OutputFormat) {
    match format {
        OutputFormat::Json => {
            let out = FrameOutput::from_frame(frame);
            println!(
                "{}",
                serde_json::to_string(&out).unwrap_or_else(|_| "{}".to_string())
            );
        }
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec!["COMMAND", "DESTINATION", "MESSAGE-ID", "SIZE", "PAYLOAD"])
                .add_row(vec![
                    frame.command().to_string(),
                    frame.get("destination").unwrap_or("-").to_string(),
                    frame.get("message-id").unwrap_or("-").to_string(),
                    frame.payload().map_or(0, str::len).to_string(),
                    frame.payload().unwrap_or_default().to_string(),
                ]);
            println!("{table}");
        }
        OutputFormat::Pretty => {
            println!("{}", frame.command());
            for (name, value) in frame.headers() {
                println!("  {name}: {value}");
            }
            if let Some(payload) = frame.payload() {
                println!();
                println!("{payload}");
            }
        }
        OutputFormat::Raw => {
            print_raw(frame.payload().unwrap_or_default().as_bytes());
        }
    }
}

pub fn print_send_result(
    destination: &str,
    payload_size: usize,
    transaction: Option<&str>,
    session: Option<&str>,
    format: OutputFormat,
) {
    match format {
        OutputFormat::Json => {
            let out = SendOutput {
                destination,
                payload_size,
                transaction,
                session,
                timestamp: now_unix_seconds(),
            };
            println!(
                "{}",
                serde_json::to_string(&out).unwrap_or_else(|_| "{}".to_string())
            );
        }
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec!["DESTINATION", "SIZE", "TRANSACTION", "SESSION"])
                .add_row(vec![
                    destination.to_string(),
                    payload_size.to_string(),
                    transaction.unwrap_or("-").to_string(),
                    session.unwrap_or("-").to_string(),
                ]);
            println!("{table}");
        }
        OutputFormat::Pretty => {
            println!(
                "sent {payload_size} bytes to {destination} (transaction={}, session={})",
                transaction.unwrap_or("-"),
                session.unwrap_or("-")
            );
        }
        OutputFormat::Raw => {}
    }
}

pub fn print_raw(data: &[u8]) {
    let mut out = std::io::stdout();
    let _ = out.write_all(data);
    let _ = out.flush();
}

fn now_unix_seconds() -> String {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs().to_string())
        .unwrap_or_else(|_| "0".to_string())
}

#[cfg(test)]
mod tests {
    use stompkit_frame::{Command, FrameBuilder, HeaderType};

    use super::*;

    #[test]
    fn json_output_carries_headers_and_payload() {
        let frame = FrameBuilder::new(Command::Message)
            .header(HeaderType::Destination, "/queue/a")
            .header(HeaderType::MessageId, "m-1")
            .payload("hello")
            .build()
            .expect("frame should build");

        let value = serde_json::to_value(FrameOutput::from_frame(&frame)).expect("serialize");
        assert_eq!(value["command"], "MESSAGE");
        assert_eq!(value["headers"]["destination"], "/queue/a");
        assert_eq!(value["headers"]["content-length"], "5");
        assert_eq!(value["payload"], "hello");
        assert_eq!(value["payload_size"], 5);
    }
}

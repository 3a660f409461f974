//! Send-and-receive example: subscribe, publish one message, read it back.
//!
//! A minimal in-process broker stands in for a real one so the example runs
//! anywhere.
//!
//! Run with:
//!   cargo run --example send-and-receive

use std::net::{TcpListener, TcpStream};
use std::thread;

use stompkit::connection::{with_payload, Connection, ConnectionConfig, NoDecoration};
use stompkit::frame::{Command, FrameBuilder, FrameReader, FrameWriter, HeaderType};

type BoxError = Box<dyn std::error::Error + Send + Sync>;

fn main() -> Result<(), BoxError> {
    let listener = TcpListener::bind("127.0.0.1:0")?;
    let port = listener.local_addr()?.port();
    let broker = thread::spawn(move || -> Result<(), BoxError> {
        let (socket, _) = listener.accept()?;
        run_broker(socket)
    });

    let config = ConnectionConfig::new("127.0.0.1", port).with_credentials("guest", "guest");
    let mut conn = Connection::tcp(config)?;
    conn.connect()?;
    eprintln!("[client] connected, session={:?}", conn.session());

    let id = conn.subscribe("/queue/greetings", &NoDecoration)?;
    eprintln!("[client] subscribed as {id}");

    conn.send("/queue/greetings", &with_payload("hello, broker"))?;
    let message = conn.receive()?;
    eprintln!(
        "[client] {} from {}: {}",
        message.command(),
        message.header(HeaderType::Destination).unwrap_or("-"),
        message.payload().unwrap_or_default()
    );

    conn.close()?;
    broker
        .join()
        .map_err(|_| "broker thread panicked")??;
    Ok(())
}

/// Echo every SEND back to the single subscriber as a MESSAGE.
fn run_broker(socket: TcpStream) -> Result<(), BoxError> {
    let mut reader = FrameReader::new(socket.try_clone()?);
    let mut writer = FrameWriter::new(socket);
    let mut subscription = String::new();
    let mut sequence = 0u32;

    loop {
        let frame = reader.read_frame()?;
        match frame.command() {
            Command::Connect => {
                let mut reply = FrameBuilder::new(Command::Connected)
                    .header(HeaderType::Session, "example-session")
                    .build()?;
                writer.write_frame(&mut reply)?;
            }
            Command::Subscribe => {
                subscription = frame
                    .header(HeaderType::SubscriptionId)
                    .unwrap_or_default()
                    .to_string();
            }
            Command::Send => {
                sequence += 1;
                let mut message = FrameBuilder::new(Command::Message)
                    .header(
                        HeaderType::Destination,
                        frame.header(HeaderType::Destination).unwrap_or_default(),
                    )
                    .header(HeaderType::MessageId, format!("m-{sequence}"))
                    .header(HeaderType::Subscription, subscription.as_str())
                    .payload(frame.payload().unwrap_or_default())
                    .build()?;
                writer.write_frame(&mut message)?;
            }
            Command::Disconnect => return Ok(()),
            other => eprintln!("[broker] ignoring {other}"),
        }
    }
}

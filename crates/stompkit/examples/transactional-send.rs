//! Transactional send example: two sends grouped under BEGIN/COMMIT.
//!
//! Run with:
//!   cargo run --example transactional-send

use std::net::TcpListener;
use std::thread;

use stompkit::connection::{with_payload, ConnectionConfig, NoDecoration, TransactionalConnection};
use stompkit::frame::{Command, FrameBuilder, FrameError, FrameReader, FrameWriter, HeaderType};

type BoxError = Box<dyn std::error::Error + Send + Sync>;

fn main() -> Result<(), BoxError> {
    let listener = TcpListener::bind("127.0.0.1:0")?;
    let port = listener.local_addr()?.port();

    // Print every frame the client sends, with its transaction header.
    let broker = thread::spawn(move || -> Result<(), BoxError> {
        let (socket, _) = listener.accept()?;
        let mut reader = FrameReader::new(socket.try_clone()?);
        let mut writer = FrameWriter::new(socket);
        loop {
            let frame = match reader.read_frame() {
                Ok(frame) => frame,
                Err(FrameError::ConnectionClosed) => return Ok(()),
                Err(err) => return Err(err.into()),
            };
            eprintln!(
                "[broker] {} transaction={}",
                frame.command(),
                frame.header(HeaderType::Transaction).unwrap_or("-")
            );
            if frame.command() == Command::Connect {
                let mut reply = FrameBuilder::new(Command::Connected)
                    .header(HeaderType::Session, "example-session")
                    .build()?;
                writer.write_frame(&mut reply)?;
            }
        }
    });

    let config = ConnectionConfig::new("127.0.0.1", port);
    let mut conn = TransactionalConnection::tcp(config)?.with_auto_begin(true);
    conn.connect()?;

    // auto_begin opens the transaction on the first send.
    conn.send("/queue/ledger", &with_payload("debit 10"))?;
    conn.send("/queue/ledger", &with_payload("credit 10"))?;
    eprintln!("[client] in transaction {:?}", conn.transaction_id());
    conn.commit(&NoDecoration)?;

    conn.close()?;
    broker
        .join()
        .map_err(|_| "broker thread panicked")??;
    Ok(())
}

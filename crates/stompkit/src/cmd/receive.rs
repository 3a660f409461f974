use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use stompkit_connection::{from_fn, Connection, NoDecoration};
use stompkit_frame::{AckMode, Command, HeaderType};
use tracing::{debug, info};

use crate::cmd::{parse_duration, ReceiveArgs};
use crate::exit::{connection_error, CliError, CliResult, PROTOCOL_ERROR, SUCCESS, TIMEOUT};
use crate::output::{print_frame, OutputFormat};

const POLL_INTERVAL: Duration = Duration::from_millis(250);

pub fn run(args: ReceiveArgs, format: OutputFormat) -> CliResult<i32> {
    let config = args.connection.to_config()?;
    let idle_limit = args.timeout.as_deref().map(parse_duration).transpose()?;
    let poll = idle_limit.map_or(POLL_INTERVAL, |limit| limit.min(POLL_INTERVAL));
    let ack_mode = AckMode::from(args.ack);

    let running = Arc::new(AtomicBool::new(true));
    install_ctrlc_handler(running.clone())?;

    let mut conn = Connection::tcp(config).map_err(|err| connection_error("invalid config", err))?;
    conn.connect()
        .map_err(|err| connection_error("connect failed", err))?;

    let selector = args.selector.clone();
    let subscription = from_fn(move |frame| {
        frame.set_header(HeaderType::Ack, ack_mode.as_str())?;
        if let Some(selector) = &selector {
            frame.set_header(HeaderType::Selector, selector.as_str())?;
        }
        Ok(())
    });
    let id = conn
        .subscribe(&args.destination, &subscription)
        .map_err(|err| connection_error("subscribe failed", err))?;
    info!(%id, destination = %args.destination, "subscribed");

    let mut printed = 0usize;
    let mut idle = Duration::ZERO;

    while running.load(Ordering::SeqCst) {
        let frame = match conn.receive_timeout(poll) {
            Ok(frame) => frame,
            Err(err) if err.is_timeout() => {
                idle += poll;
                if idle_limit.is_some_and(|limit| idle >= limit) {
                    return Err(CliError::new(
                        TIMEOUT,
                        format!("no message on {} within {:?}", args.destination, idle),
                    ));
                }
                continue;
            }
            Err(err) => return Err(connection_error("receive failed", err)),
        };
        idle = Duration::ZERO;

        print_frame(&frame, format);
        if frame.command() == Command::Error {
            let message = frame.header(HeaderType::Message).unwrap_or("no message");
            return Err(CliError::new(
                PROTOCOL_ERROR,
                format!("broker reported error: {message}"),
            ));
        }

        if ack_mode != AckMode::Auto {
            if let Some(message_id) = frame.header(HeaderType::MessageId) {
                conn.ack(message_id, &NoDecoration)
                    .map_err(|err| connection_error("ack failed", err))?;
            }
        }

        printed = printed.saturating_add(1);
        if args.count.is_some_and(|count| printed >= count) {
            break;
        }
    }

    debug!(printed, "receive finished");
    conn.unsubscribe(&id, &NoDecoration)
        .map_err(|err| connection_error("unsubscribe failed", err))?;
    conn.close()
        .map_err(|err| connection_error("disconnect failed", err))?;
    Ok(SUCCESS)
}

fn install_ctrlc_handler(running: Arc<AtomicBool>) -> CliResult<()> {
    ctrlc::set_handler(move || {
        running.store(false, Ordering::SeqCst);
    })
    .map_err(|err| {
        CliError::new(
            crate::exit::INTERNAL,
            format!("signal handler setup failed: {err}"),
        )
    })
}

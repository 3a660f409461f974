use std::fs;

use stompkit_connection::{
    from_fn, Connection, ConnectionConfig, FrameDecorator, NoDecoration, TransactionalConnection,
};
use tracing::{debug, warn};

use crate::cmd::SendArgs;
use crate::exit::{connection_error, io_error, CliResult, SUCCESS};
use crate::output::{print_send_result, OutputFormat};

pub fn run(args: SendArgs, format: OutputFormat) -> CliResult<i32> {
    let config = args.connection.to_config()?;
    let payload = resolve_payload(&args)?;
    let payload_size = payload.len();
    let headers = args.headers.clone();

    let decorator = from_fn(move |frame| {
        for (name, value) in &headers {
            frame.set_custom_header(name, value.as_str())?;
        }
        frame.set_payload(payload.as_str())?;
        Ok(())
    });

    let (transaction, session) = if args.transactional {
        send_in_transaction(config, &args.destination, &decorator)?
    } else {
        (None, send_plain(config, &args.destination, &decorator)?)
    };

    print_send_result(
        &args.destination,
        payload_size,
        transaction.as_deref(),
        session.as_deref(),
        format,
    );
    Ok(SUCCESS)
}

fn send_plain(
    config: ConnectionConfig,
    destination: &str,
    decorator: &dyn FrameDecorator,
) -> CliResult<Option<String>> {
    let mut conn = Connection::tcp(config).map_err(|err| connection_error("invalid config", err))?;
    conn.connect()
        .map_err(|err| connection_error("connect failed", err))?;
    let session = conn.session().map(str::to_string);

    conn.send(destination, decorator)
        .map_err(|err| connection_error("send failed", err))?;
    conn.close()
        .map_err(|err| connection_error("disconnect failed", err))?;
    Ok(session)
}

fn send_in_transaction(
    config: ConnectionConfig,
    destination: &str,
    decorator: &dyn FrameDecorator,
) -> CliResult<(Option<String>, Option<String>)> {
    let mut conn = TransactionalConnection::tcp(config)
        .map_err(|err| connection_error("invalid config", err))?;
    conn.connect()
        .map_err(|err| connection_error("connect failed", err))?;
    let session = conn.connection().session().map(str::to_string);

    let transaction = conn
        .begin()
        .map_err(|err| connection_error("begin failed", err))?;
    debug!(%transaction, "transaction started");

    if let Err(err) = conn.send(destination, decorator) {
        if conn.in_transaction() {
            if let Err(rollback_err) = conn.rollback(&NoDecoration) {
                warn!(%transaction, error = %rollback_err, "rollback after failed send also failed");
            }
        }
        return Err(connection_error("send failed", err));
    }
    conn.commit(&NoDecoration)
        .map_err(|err| connection_error("commit failed", err))?;
    conn.close()
        .map_err(|err| connection_error("disconnect failed", err))?;
    Ok((Some(transaction), session))
}

fn resolve_payload(args: &SendArgs) -> CliResult<String> {
    if let Some(data) = &args.data {
        return Ok(data.clone());
    }
    if let Some(path) = &args.file {
        return fs::read_to_string(path)
            .map_err(|err| io_error(&format!("failed reading {}", path.display()), err));
    }
    Ok(String::new())
}

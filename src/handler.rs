//! Connection handler
//!
//! Handles one client connection: line framing, the receive loop, and
//! the writer task that drains the session's outbound queue. On any exit
//! path the session's identity is released and its departure announced.

use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::timeout;
use tokio_util::codec::{FramedRead, FramedWrite};
use tracing::{debug, error, info, warn};

use crate::client::Client;
use crate::codec::{LineCodec, Request};
use crate::config::{Framing, ServerConfig, MAX_LINE_LENGTH};
use crate::dispatcher::{Dispatcher, Response};
use crate::error::AppError;
use crate::message::Outbound;
use crate::server::ServerHandle;
use crate::types::{ClientId, SessionState};

/// Welcome banner sent on accept
pub const BANNER: &str = "Welcome to the Interactive Bulletin Board! Use '!register [username]' to join.\nUse !help for additional help.";

/// Why the receive loop stopped
#[derive(Debug, PartialEq, Eq)]
enum Exit {
    /// Client sent a quit command
    Quit,
    /// Read side reached end of stream
    Closed,
    /// Writer task finished first (write failure or timeout)
    WriterGone,
}

/// Handle a new TCP connection
///
/// Runs until the client quits, closes the connection, or the connection
/// fails. Protocol errors never end the session.
pub async fn handle_connection(
    stream: TcpStream,
    server: ServerHandle,
    config: ServerConfig,
) -> Result<(), AppError> {
    let peer_addr = stream
        .peer_addr()
        .map(|a| a.to_string())
        .unwrap_or_else(|_| "unknown".to_string());

    let (reader, writer) = stream.into_split();
    let mut lines = FramedRead::new(reader, LineCodec::new(MAX_LINE_LENGTH));
    let sink = FramedWrite::new(writer, LineCodec::new(MAX_LINE_LENGTH));

    let client_id = ClientId::new();
    info!("Client {} connected from {}", client_id, peer_addr);

    // Server -> client queue, shared with the state actor for notifications
    let (msg_tx, msg_rx) = mpsc::channel::<Outbound>(config.outbound_buffer.max(1));
    let client = Client::new(client_id, msg_tx);

    let mut write_task = tokio::spawn(write_loop(
        sink,
        msg_rx,
        config.framing,
        config.write_timeout,
        client_id,
    ));

    let dispatcher = Dispatcher::new(server.clone(), client.clone(), config.framing);
    let mut state = SessionState::Unregistered;

    let result = receive_loop(
        &mut lines,
        &mut write_task,
        &dispatcher,
        &client,
        &mut state,
        config.framing,
    )
    .await;

    match &result {
        Ok(exit) => debug!("Client {} session ended: {:?}", client_id, exit),
        Err(e) => warn!("Client {} session error: {}", client_id, e),
    }

    // Release the identity before closing so the departure notice goes
    // out after this session is gone from the registry and every room
    if let SessionState::Registered(name) = &state {
        if let Err(e) = server.deregister(name).await {
            error!("Failed to release '{}' for {}: {}", name, client_id, e);
        }
    }

    // Dropping the last local senders lets the writer drain and finish
    drop(dispatcher);
    drop(client);
    if !matches!(result, Ok(Exit::WriterGone)) {
        let _ = write_task.await;
    }

    info!("Client {} disconnected", client_id);

    result.map(|_| ())
}

/// Read request lines and dispatch them until the session ends
async fn receive_loop(
    lines: &mut FramedRead<OwnedReadHalf, LineCodec>,
    write_task: &mut JoinHandle<()>,
    dispatcher: &Dispatcher,
    client: &Client,
    state: &mut SessionState,
    framing: Framing,
) -> Result<Exit, AppError> {
    if client.send(Outbound::Event(BANNER.to_string())).await.is_err() {
        return Ok(Exit::WriterGone);
    }

    loop {
        tokio::select! {
            next = lines.next() => {
                let line = match next {
                    Some(Ok(Request::Line(line))) => line,
                    Some(Ok(Request::TooLong)) => {
                        debug!("Client {} sent an oversized line", client.id);
                        let reply = AppError::LineTooLong(MAX_LINE_LENGTH).to_string();
                        if client.send(Outbound::Error(reply)).await.is_err() {
                            return Ok(Exit::WriterGone);
                        }
                        continue;
                    }
                    Some(Err(e)) => return Err(e.into()),
                    None => return Ok(Exit::Closed),
                };

                let reply = match dispatcher.dispatch(state, &line).await? {
                    Response::Reply(reply) => reply,
                    Response::Registered { name, reply } => {
                        *state = SessionState::Registered(name);
                        reply
                    }
                    Response::Quit => {
                        if let Some(farewell) = framing.farewell() {
                            let _ = client.send(Outbound::Ok(farewell.to_string())).await;
                        }
                        return Ok(Exit::Quit);
                    }
                };

                if client.send(reply).await.is_err() {
                    return Ok(Exit::WriterGone);
                }
            }
            _ = &mut *write_task => return Ok(Exit::WriterGone),
        }
    }
}

/// Drain the outbound queue onto the socket
///
/// Each write is bounded by `write_timeout`; a failed or timed out write
/// ends the task, which in turn ends the session.
async fn write_loop(
    mut sink: FramedWrite<OwnedWriteHalf, LineCodec>,
    mut msg_rx: mpsc::Receiver<Outbound>,
    framing: Framing,
    write_timeout: Duration,
    client_id: ClientId,
) {
    while let Some(msg) = msg_rx.recv().await {
        let line = match framing.encode(&msg) {
            Ok(line) => line,
            Err(e) => {
                error!("Failed to serialize message for {}: {}", client_id, e);
                continue;
            }
        };
        match timeout(write_timeout, sink.send(line)).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                debug!("Write failed for {}: {}", client_id, e);
                break;
            }
            Err(_) => {
                warn!("Write to {} timed out after {:?}", client_id, write_timeout);
                break;
            }
        }
    }
    debug!("Write task ended for {}", client_id);

    // A stalled peer must not hold the task open on the final flush
    let _ = timeout(write_timeout, SinkExt::<String>::close(&mut sink)).await;
}

//! Lifecycle of one upgraded connection: handshake, frame loop, teardown.

use crate::channel::{Connection, DispatchOutcome, MessageDispatcher};
use crate::error::server::ServerError;
use crate::http::wire::{RequestHead, write_switching_protocols};
use crate::server::{ConnectionEvent, Shared};

use common::ErrorLocation;

use std::net::SocketAddr;
use std::panic::Location;
use std::sync::Arc;
use std::time::Duration;

use futures_util::stream::SplitSink;
use futures_util::{SinkExt, StreamExt};
use log::{debug, error, info, warn};
use tokio::net::TcpStream;
use tokio::sync::mpsc::{UnboundedReceiver, unbounded_channel};
use tokio::task::spawn_blocking;
use tokio::time::timeout;
use tokio_tungstenite::WebSocketStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::tungstenite::handshake::derive_accept_key;
use tokio_tungstenite::tungstenite::protocol::Role;

/// How long teardown waits for the close frame to be flushed.
const CLOSE_GRACE: Duration = Duration::from_secs(1);

type FrameSink = SplitSink<WebSocketStream<TcpStream>, Message>;

/// Complete the upgrade on `stream` and serve frames until the connection closes.
///
/// `leftover` holds any bytes the client sent after the upgrade request head.
pub(crate) async fn run(
    shared: Arc<Shared>,
    mut stream: TcpStream,
    leftover: Vec<u8>,
    head: RequestHead,
    remote_addr: SocketAddr,
) {
    let accept_key = match accept_key(&head) {
        Ok(key) => key,
        Err(e) => {
            warn!("Rejected upgrade from {}: {}", remote_addr, e);
            return;
        }
    };

    if let Err(e) = write_switching_protocols(&mut stream, &accept_key).await {
        let e = ServerError::from(e);
        warn!("Upgrade response to {} failed: {}", remote_addr, e);
        return;
    }

    let socket = WebSocketStream::from_partially_read(stream, leftover, Role::Server, None).await;
    let (sink, mut source) = socket.split();

    let (connection, outbound) = Connection::new(remote_addr, head.headers);
    connection.mark_open();
    shared.registry.add(connection.clone());
    shared.emit(ConnectionEvent::Opened {
        id: connection.id(),
        remote_addr,
    });
    info!("Connection {} opened from {}", connection.id(), remote_addr);

    let writer = tokio::spawn(write_frames(connection.clone(), sink, outbound));
    let abort_writer = writer.abort_handle();

    // Frames are dispatched off the read loop so pongs and closes are still
    // seen while a handler runs.
    let (inbound, pending) = unbounded_channel();
    let dispatch = tokio::spawn(dispatch_frames(
        Arc::clone(&shared.dispatcher),
        connection.clone(),
        pending,
    ));

    loop {
        tokio::select! {
            biased;
            _ = connection.closing() => break,
            frame = source.next() => match frame {
                Some(Ok(Message::Text(text))) => {
                    if inbound.send(text.to_string()).is_err() {
                        break;
                    }
                }
                Some(Ok(Message::Binary(data))) => {
                    warn!(
                        "Binary frame of {} bytes from {} dropped",
                        data.len(),
                        connection.id()
                    );
                }
                Some(Ok(Message::Pong(_))) => connection.record_pong(),
                // Pings are answered by the protocol layer.
                Some(Ok(Message::Ping(_))) | Some(Ok(Message::Frame(_))) => {}
                Some(Ok(Message::Close(frame))) => {
                    debug!("Connection {} closed by peer: {:?}", connection.id(), frame);
                    break;
                }
                Some(Err(e)) => {
                    let e = ServerError::Read {
                        message: e.to_string(),
                        location: ErrorLocation::from(Location::caller()),
                    };
                    debug!("Connection {} read failed: {}", connection.id(), e);
                    break;
                }
                None => break,
            }
        }
    }

    drop(inbound);
    connection.close();
    shared.registry.remove(connection.id());

    if timeout(CLOSE_GRACE, writer).await.is_err() {
        abort_writer.abort();
    }

    // A handler still running on the blocking pool finishes on its own; its
    // sends fail once the connection has left `Open`.
    dispatch.abort();

    connection.mark_closed();
    shared.emit(ConnectionEvent::Closed {
        id: connection.id(),
        remote_addr,
    });
    info!("Connection {} from {} closed", connection.id(), remote_addr);
}

#[track_caller]
fn accept_key(head: &RequestHead) -> Result<String, ServerError> {
    let key = head
        .headers
        .get("sec-websocket-key")
        .ok_or_else(|| ServerError::Handshake {
            message: "missing Sec-WebSocket-Key".to_string(),
            location: ErrorLocation::from(Location::caller()),
        })?;
    Ok(derive_accept_key(key.as_bytes()))
}

/// Dispatch queued text frames one at a time, in arrival order, while the
/// connection stays open.
pub(crate) async fn dispatch_frames(
    dispatcher: Arc<MessageDispatcher>,
    connection: Connection,
    mut pending: UnboundedReceiver<String>,
) {
    while let Some(text) = pending.recv().await {
        if !connection.is_open() {
            debug!(
                "Frame for {} dropped: connection no longer open",
                connection.id()
            );
            break;
        }
        let dispatcher = Arc::clone(&dispatcher);
        let target = connection.clone();
        match spawn_blocking(move || dispatcher.dispatch(&target, &text)).await {
            Ok(DispatchOutcome::Consumed { .. }) | Ok(DispatchOutcome::Unclaimed) => {}
            Ok(DispatchOutcome::Malformed) => {
                debug!("Malformed frame from {} ignored", connection.id());
            }
            Err(e) => error!("Dispatch for {} aborted: {}", connection.id(), e),
        }
    }
}

/// Drain the outbound queue into the socket until a close frame goes out.
async fn write_frames(
    connection: Connection,
    mut sink: FrameSink,
    mut outbound: UnboundedReceiver<Message>,
) {
    while let Some(message) = outbound.recv().await {
        let closing = matches!(message, Message::Close(_));
        if let Err(e) = sink.send(message).await {
            let e = ServerError::Send {
                message: e.to_string(),
                location: ErrorLocation::from(Location::caller()),
            };
            debug!("Connection {} write failed: {}", connection.id(), e);
            connection.close();
            return;
        }
        if closing {
            break;
        }
    }
    let _ = sink.close().await;
}

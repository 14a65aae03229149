mod connection;
mod dispatcher;
mod keepalive;
mod mime;
mod request;

use crate::channel::Connection;
use crate::http::Headers;

use std::net::SocketAddr;

use tokio::sync::mpsc::UnboundedReceiver;
use tokio_tungstenite::tungstenite::Message;

/// Test helper: a connection already in `Open`, with its outbound queue.
pub(crate) fn open_connection(port: u16) -> (Connection, UnboundedReceiver<Message>) {
    let remote_addr: SocketAddr = format!("127.0.0.1:{port}")
        .parse()
        .expect("valid socket address");
    let (connection, outbound) = Connection::new(remote_addr, Headers::new());
    assert!(connection.mark_open());
    (connection, outbound)
}

/// Test helper: text of the next queued frame, panicking on anything else.
pub(crate) fn next_text(outbound: &mut UnboundedReceiver<Message>) -> String {
    match outbound.try_recv().expect("a queued frame") {
        Message::Text(text) => text.to_string(),
        other => panic!("expected a text frame, got {other:?}"),
    }
}

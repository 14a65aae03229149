//! Test helpers for webserver integration tests.
//!
//! - Starting a server on an ephemeral loopback port
//! - Connecting channel clients
//! - Sending and receiving envelopes
//! - Polling for asynchronous state changes

use webserver_core::channel::Envelope;
use webserver_core::config::ServerConfig;
use webserver_core::{WebServer, WebServerHandle};

use std::future::Future;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use serde_json::Value;
use tokio::net::TcpStream;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async, tungstenite::Message};

pub type Client = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Default wait for anything asynchronous to happen.
pub const SETTLE: Duration = Duration::from_secs(3);

/// Test helper: loopback config on an ephemeral port.
pub fn test_config() -> ServerConfig {
    let mut config = ServerConfig::default();
    config.network.host = "127.0.0.1".to_string();
    config.network.port = 0;
    config
}

/// Test helper: start `server` and return its handle.
pub async fn start(server: &WebServer) -> WebServerHandle {
    server.start().await.expect("Failed to start server")
}

pub fn http_url(handle: &WebServerHandle, path: &str) -> String {
    format!("http://{}{}", handle.local_addr(), path)
}

/// Test helper: open a channel connection to the server.
pub async fn connect(handle: &WebServerHandle) -> Client {
    let url = format!("ws://{}/channel", handle.local_addr());
    let (client, _) = connect_async(&url)
        .await
        .expect("Failed to connect channel client");
    client
}

pub async fn send_envelope(client: &mut Client, address: &str, payload: Value) {
    client
        .send(Message::Text(Envelope::new(address, payload).to_text().into()))
        .await
        .expect("Failed to send envelope");
}

/// Test helper: next text frame, skipping control frames.
pub async fn receive_text(client: &mut Client) -> String {
    tokio::time::timeout(SETTLE, async {
        loop {
            match client.next().await {
                Some(Ok(Message::Text(text))) => return text.to_string(),
                Some(Ok(Message::Ping(_))) | Some(Ok(Message::Pong(_))) => continue,
                other => panic!("Expected a text frame, got {other:?}"),
            }
        }
    })
    .await
    .expect("No text frame received in time")
}

pub async fn receive_envelope(client: &mut Client) -> Envelope {
    Envelope::parse(&receive_text(client).await).expect("Frame was not an envelope")
}

/// Test helper: poll `condition` until it holds or `SETTLE` elapses.
pub async fn wait_until<F>(mut condition: F) -> bool
where
    F: FnMut() -> bool,
{
    let deadline = tokio::time::Instant::now() + SETTLE;
    while tokio::time::Instant::now() < deadline {
        if condition() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    condition()
}

/// Test helper: await `future`, failing the test after `SETTLE`.
pub async fn within<T>(future: impl Future<Output = T>) -> T {
    tokio::time::timeout(SETTLE, future)
        .await
        .expect("Timed out waiting")
}

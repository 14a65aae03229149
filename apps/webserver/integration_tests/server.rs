use webserver::app::{ECHO_ADDRESS, build_server, spawn_connection_logger, start};

use webserver_core::channel::Envelope;
use webserver_core::config::ServerConfig;

use std::fs;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use serde_json::json;
use tokio_tungstenite::{connect_async, tungstenite::Message};

// ============================================================================
// Integration tests for the assembled binary server
// ============================================================================

fn loopback_config() -> ServerConfig {
    let mut config = ServerConfig::default();
    config.network.host = "127.0.0.1".to_string();
    config.network.port = 0;
    config
}

/// **VALUE**: Verifies the assembled server answers the built-in echo address.
///
/// **WHY THIS MATTERS**: The echo handler is how a browser page checks that the
/// channel works end to end.
///
/// **BUG THIS CATCHES**: Would catch `build_server` forgetting to install the handler.
#[tokio::test]
async fn given_built_server_when_echo_sent_then_echo_received() {
    // GIVEN: The binary's server, started on an ephemeral port
    let server = build_server(loopback_config());
    let logger = spawn_connection_logger(&server);
    let handle = start(&server).await.expect("server starts");

    // WHEN: A client sends an echo envelope
    let url = format!("ws://{}/", handle.local_addr());
    let (mut client, _) = connect_async(&url).await.expect("connect");
    client
        .send(Message::Text(
            Envelope::new(ECHO_ADDRESS, json!({"n": 7})).to_text().into(),
        ))
        .await
        .expect("send");

    // THEN: The same envelope comes back
    let frame = tokio::time::timeout(Duration::from_secs(3), client.next())
        .await
        .expect("reply in time")
        .expect("stream open")
        .expect("frame");
    let reply = Envelope::parse(frame.to_text().expect("text frame")).expect("envelope");
    assert_eq!(reply, Envelope::new(ECHO_ADDRESS, json!({"n": 7})));

    logger.abort();
    handle.shutdown().await;
}

/// **VALUE**: Verifies configured roots are served by the assembled server.
#[tokio::test]
async fn given_root_in_config_when_file_requested_then_served() {
    let site = tempfile::tempdir().expect("temp dir");
    fs::write(site.path().join("index.html"), "<p>ok</p>").expect("write");
    let mut config = loopback_config();
    config.content.document_roots.push(site.path().to_path_buf());

    let server = build_server(config);
    let handle = start(&server).await.expect("server starts");

    let response = reqwest::get(format!("http://{}/index.html", handle.local_addr()))
        .await
        .expect("request");
    assert_eq!(response.status().as_u16(), 200);
    assert_eq!(response.headers()["content-type"], "text/html");
    assert_eq!(response.text().await.expect("body"), "<p>ok</p>");

    handle.shutdown().await;
}

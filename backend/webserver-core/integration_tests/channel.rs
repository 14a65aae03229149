use crate::helpers::{
    SETTLE, connect, http_url, receive_envelope, receive_text, send_envelope, start, test_config,
    wait_until, within,
};

use webserver_core::channel::{Connection, Envelope, MessageHandler};
use webserver_core::error::HandlerError;
use webserver_core::{ConnectionEvent, WebServer};

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use serde_json::{Value, json};
use tokio_tungstenite::tungstenite::Message;

fn echo_server() -> WebServer {
    let server = WebServer::new(test_config());
    server.add_message_fn(|connection: &Connection, address: &str, payload: &Value| {
        if address != "echo" {
            return Ok(false);
        }
        connection.send_envelope("echo", payload.clone())?;
        Ok(true)
    });
    server
}

// ============================================================================
// Message dispatch
// ============================================================================

/// **VALUE**: Verifies an envelope round-trips through a message handler.
///
/// **WHY THIS MATTERS**: This is the whole request/reply path for browser clients:
/// upgrade, decode, dispatch, reply.
///
/// **BUG THIS CATCHES**: Would catch:
/// - Upgrades on the HTTP port not being recognised
/// - The envelope shape changing on the wire
/// - Replies queued but never written
#[tokio::test]
async fn given_echo_handler_when_client_sends_envelope_then_receives_reply() {
    // GIVEN: A server with an echo handler and a connected client
    let server = echo_server();
    let handle = start(&server).await;
    let mut client = connect(&handle).await;

    // WHEN: The client sends an envelope
    send_envelope(&mut client, "echo", json!({"text": "hello"})).await;

    // THEN: The same payload comes back under the same address
    let reply = receive_envelope(&mut client).await;
    assert_eq!(reply, Envelope::new("echo", json!({"text": "hello"})));

    handle.shutdown().await;
}

/// Replies to `count` envelopes with how many it has seen.
struct CountingHandler {
    seen: AtomicUsize,
}

impl MessageHandler for CountingHandler {
    fn handle(
        &self,
        connection: &Connection,
        address: &str,
        _payload: &Value,
    ) -> Result<bool, HandlerError> {
        if address != "count" {
            return Ok(false);
        }
        let seen = self.seen.fetch_add(1, Ordering::SeqCst) + 1;
        connection.send_envelope("count", json!(seen))?;
        Ok(true)
    }
}

/// **VALUE**: Verifies a registered handler type answers until it is removed.
///
/// **BUG THIS CATCHES**: Would catch `remove_message_handler` reporting success while
/// the handler keeps receiving envelopes.
#[tokio::test]
async fn given_removed_message_handler_when_envelope_sent_then_no_longer_answers() {
    // GIVEN: An echo server plus a counting handler
    let server = echo_server();
    let id = server.add_message_handler(Arc::new(CountingHandler {
        seen: AtomicUsize::new(0),
    }));
    let handle = start(&server).await;
    let mut client = connect(&handle).await;

    send_envelope(&mut client, "count", Value::Null).await;
    assert_eq!(
        receive_envelope(&mut client).await,
        Envelope::new("count", json!(1))
    );

    // WHEN: The counting handler is removed
    assert!(server.remove_message_handler(id));
    assert!(!server.remove_message_handler(id));
    send_envelope(&mut client, "count", Value::Null).await;
    send_envelope(&mut client, "echo", json!("marker")).await;

    // THEN: The next reply is the echo; the count envelope went unanswered
    assert_eq!(
        receive_envelope(&mut client).await,
        Envelope::new("echo", json!("marker"))
    );

    handle.shutdown().await;
}

/// **VALUE**: Verifies plain HTTP keeps working on the port channel clients use.
#[tokio::test]
async fn given_open_channel_when_http_request_sent_then_both_served() {
    let server = echo_server();
    let handle = start(&server).await;
    let mut client = connect(&handle).await;

    let response = reqwest::get(http_url(&handle, "/nothing"))
        .await
        .expect("request");
    assert_eq!(response.status().as_u16(), 404);

    send_envelope(&mut client, "echo", json!(1)).await;
    assert_eq!(receive_envelope(&mut client).await.payload, json!(1));

    handle.shutdown().await;
}

/// **VALUE**: Verifies failing and panicking handlers don't affect the connection.
///
/// **WHY THIS MATTERS**: A handler bug triggered by one message must not disconnect
/// the client or stop later messages being handled.
#[tokio::test]
async fn given_faulty_handlers_when_messages_sent_then_connection_stays_usable() {
    let server = WebServer::new(test_config());
    server.add_message_fn(|_: &Connection, address: &str, _: &Value| {
        match address {
            "panic" => panic!("handler bug"),
            "fail" => Err(HandlerError::failed("bad input")),
            _ => Ok(false),
        }
    });
    server.add_message_fn(|connection: &Connection, address: &str, _: &Value| {
        connection.send(format!("handled:{address}"))?;
        Ok(true)
    });
    let handle = start(&server).await;
    let mut client = connect(&handle).await;

    send_envelope(&mut client, "panic", Value::Null).await;
    assert_eq!(receive_text(&mut client).await, "handled:panic");

    send_envelope(&mut client, "fail", Value::Null).await;
    assert_eq!(receive_text(&mut client).await, "handled:fail");

    assert_eq!(server.connection_count(), 1);
    handle.shutdown().await;
}

/// **VALUE**: Verifies malformed frames are dropped without closing the connection.
#[tokio::test]
async fn given_malformed_frames_when_sent_then_ignored_and_connection_survives() {
    let server = echo_server();
    let handle = start(&server).await;
    let mut client = connect(&handle).await;

    for frame in ["not json", r#"{"address":"echo"}"#] {
        client
            .send(Message::Text(frame.to_string().into()))
            .await
            .expect("send");
    }
    client
        .send(Message::Binary(vec![1, 2, 3].into()))
        .await
        .expect("send");
    send_envelope(&mut client, "echo", json!("still here")).await;

    assert_eq!(
        receive_envelope(&mut client).await.payload,
        json!("still here")
    );

    handle.shutdown().await;
}

// ============================================================================
// Broadcast and registry
// ============================================================================

/// **VALUE**: Verifies broadcast reaches every open client after one disconnects.
///
/// **BUG THIS CATCHES**: Would catch closed connections lingering in the registry
/// or a failed send aborting the broadcast.
#[tokio::test]
async fn given_three_clients_one_closed_when_send_to_all_then_remaining_receive() {
    // GIVEN: Three connected clients
    let server = WebServer::new(test_config());
    let handle = start(&server).await;
    let mut first = connect(&handle).await;
    let mut leaving = connect(&handle).await;
    let mut third = connect(&handle).await;
    assert!(wait_until(|| server.connection_count() == 3).await);

    // WHEN: One closes and the server broadcasts
    leaving.close(None).await.expect("close");
    assert!(wait_until(|| server.connection_count() == 2).await);
    let report = server.send_to_all("reload");

    // THEN: The remaining two receive the frame
    assert_eq!(report.delivered, 2);
    assert_eq!(report.failed, 0);
    assert_eq!(receive_text(&mut first).await, "reload");
    assert_eq!(receive_text(&mut third).await, "reload");

    handle.shutdown().await;
}

/// **VALUE**: Verifies lifecycle events and the connection description.
#[tokio::test]
async fn given_subscriber_when_client_connects_and_leaves_then_events_published() {
    let server = WebServer::new(test_config());
    let mut events = server.subscribe();
    let handle = start(&server).await;
    assert_eq!(server.describe_connections(), "No connected clients");

    let mut client = connect(&handle).await;
    let opened = within(events.recv()).await.expect("event");
    assert!(wait_until(|| server.connection_count() == 1).await);
    assert_eq!(
        server.describe_connections(),
        "1 connection from: 127.0.0.1"
    );
    assert!(server.connection(opened.id()).is_some());

    let ConnectionEvent::Opened { id, remote_addr } = opened else {
        panic!("expected an Opened event, got {opened:?}");
    };

    client.close(None).await.expect("close");
    let closed = within(events.recv()).await.expect("event");
    assert_eq!(closed, ConnectionEvent::Closed { id, remote_addr });
    assert_eq!(server.connection_count(), 0);

    handle.shutdown().await;
}

// ============================================================================
// Keepalive and shutdown
// ============================================================================

fn fast_keepalive_server() -> WebServer {
    let mut config = test_config();
    config.keepalive.interval_ms = 100;
    config.keepalive.max_missed_probes = 2;
    WebServer::new(config)
}

/// **VALUE**: Verifies a client that never answers probes is evicted.
///
/// **WHY THIS MATTERS**: Half-open connections (sleeping laptops, dropped Wi-Fi)
/// never send a close frame; only keepalive notices them.
#[tokio::test]
async fn given_client_that_never_reads_when_pings_unanswered_then_evicted() {
    let server = fast_keepalive_server();
    let handle = start(&server).await;

    // A client that is never polled never answers pings.
    let _silent = connect(&handle).await;
    assert!(wait_until(|| server.connection_count() == 1).await);

    assert!(
        wait_until(|| server.connection_count() == 0).await,
        "silent client should be evicted"
    );

    handle.shutdown().await;
}

/// **VALUE**: Verifies a client that keeps reading (and so answers pings) stays connected.
#[tokio::test]
async fn given_client_answering_pings_when_rounds_pass_then_stays_connected() {
    let server = fast_keepalive_server();
    let handle = start(&server).await;
    let mut client = connect(&handle).await;
    let reader = tokio::spawn(async move { while client.next().await.is_some() {} });
    assert!(wait_until(|| server.connection_count() == 1).await);

    tokio::time::sleep(Duration::from_millis(800)).await;

    assert_eq!(server.connection_count(), 1);
    reader.abort();
    handle.shutdown().await;
}

/// **VALUE**: Verifies a slow message handler does not get its own client evicted.
///
/// **WHY THIS MATTERS**: Pongs arrive on the same socket as envelopes; they must be
/// read while a handler for an earlier envelope is still running.
///
/// **BUG THIS CATCHES**: Would catch dispatch blocking the read loop, so probes go
/// unanswered for the handler's whole run and a live client is closed.
#[tokio::test]
async fn given_slow_handler_when_pings_sent_meanwhile_then_client_stays_connected() {
    // GIVEN: Fast probing and a handler that outlasts several probe rounds
    let server = fast_keepalive_server();
    server.add_message_fn(|connection: &Connection, address: &str, _: &Value| {
        if address != "slow" {
            return Ok(false);
        }
        std::thread::sleep(Duration::from_millis(1000));
        connection.send_envelope("slow", json!("done"))?;
        Ok(true)
    });
    let handle = start(&server).await;
    let mut client = connect(&handle).await;
    assert!(wait_until(|| server.connection_count() == 1).await);

    // WHEN: The client triggers the slow handler and keeps reading
    send_envelope(&mut client, "slow", Value::Null).await;
    let reply = receive_envelope(&mut client).await;

    // THEN: The reply arrives and the connection survived the probe rounds
    assert_eq!(reply, Envelope::new("slow", json!("done")));
    assert_eq!(server.connection_count(), 1);

    handle.shutdown().await;
}

/// **VALUE**: Verifies shutdown closes open channels with a close frame.
#[tokio::test]
async fn given_connected_client_when_shutdown_then_client_sees_close() {
    let server = WebServer::new(test_config());
    let handle = start(&server).await;
    let mut client = connect(&handle).await;
    assert!(wait_until(|| server.connection_count() == 1).await);
    assert!(handle.is_running());

    handle.shutdown().await;

    let frame = tokio::time::timeout(SETTLE, client.next())
        .await
        .expect("frame in time");
    assert!(matches!(frame, Some(Ok(Message::Close(_))) | None));
}

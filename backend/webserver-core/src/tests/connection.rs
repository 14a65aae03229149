use crate::channel::{ConnectionState, ProbeOutcome};
use crate::error::ConnectionError;
use crate::tests::{next_text, open_connection};

use serde_json::json;
use tokio_tungstenite::tungstenite::Message;

/// **VALUE**: Verifies sends are queued in order while open.
#[test]
fn given_open_connection_when_send_then_frames_queued_in_order() {
    let (connection, mut outbound) = open_connection(40001);

    connection.send("one").expect("send");
    connection
        .send_envelope("chat", json!({"text": "two"}))
        .expect("send");

    assert_eq!(next_text(&mut outbound), "one");
    assert_eq!(
        next_text(&mut outbound),
        r#"{"address":"chat","payload":{"text":"two"}}"#
    );
}

/// **VALUE**: Verifies nothing can be sent once closing has started.
///
/// **WHY THIS MATTERS**: Frames sent after a close frame are a protocol violation.
///
/// **BUG THIS CATCHES**: Would catch `send` checking only whether the queue is alive.
#[test]
fn given_closed_connection_when_send_then_not_open_error() {
    let (connection, mut outbound) = open_connection(40002);

    assert!(connection.close());
    assert!(!connection.close(), "second close is a no-op");

    let error = connection.send("late").expect_err("must fail");
    assert!(matches!(
        error,
        ConnectionError::NotOpen {
            state: ConnectionState::Closing,
            ..
        }
    ));
    assert!(matches!(outbound.try_recv(), Ok(Message::Close(None))));
    assert!(outbound.try_recv().is_err());
}

/// **VALUE**: Verifies the probe counter and the unresponsive threshold.
///
/// **BUG THIS CATCHES**: Would catch an off-by-one that evicts after the first
/// unanswered probe, or a pong that doesn't reset the count.
#[test]
fn given_unanswered_probes_when_probe_then_unresponsive_after_threshold() {
    let (connection, mut outbound) = open_connection(40003);

    assert_eq!(connection.probe(2), ProbeOutcome::Sent);
    assert_eq!(connection.probe(2), ProbeOutcome::Sent);
    assert_eq!(connection.probe(2), ProbeOutcome::Unresponsive { missed: 2 });
    assert!(matches!(outbound.try_recv(), Ok(Message::Ping(payload)) if payload[..] == [0u8]));

    connection.record_pong();
    assert_eq!(connection.missed_probes(), 0);
    assert_eq!(connection.probe(2), ProbeOutcome::Sent);
}

/// **VALUE**: Verifies closing connections are not probed.
#[test]
fn given_closing_connection_when_probe_then_skipped() {
    let (connection, _outbound) = open_connection(40004);
    connection.close();
    assert_eq!(connection.probe(2), ProbeOutcome::Skipped);
}

/// **VALUE**: Verifies a dropped writer surfaces as a send error, not a panic.
#[test]
fn given_writer_gone_when_send_then_send_error() {
    let (connection, outbound) = open_connection(40005);
    drop(outbound);

    assert!(matches!(
        connection.send("x"),
        Err(ConnectionError::Send { .. })
    ));
    assert_eq!(connection.probe(2), ProbeOutcome::Failed);
}

/// **VALUE**: Verifies `closing()` resolves once close is requested.
#[tokio::test]
async fn given_waiting_task_when_close_then_closing_resolves() {
    let (connection, _outbound) = open_connection(40006);
    let waiter = connection.clone();
    let task = tokio::spawn(async move { waiter.closing().await });

    connection.close();

    tokio::time::timeout(std::time::Duration::from_secs(1), task)
        .await
        .expect("closing() resolved")
        .expect("task completed");
    connection.mark_closed();
    assert_eq!(connection.state(), ConnectionState::Closed);
}

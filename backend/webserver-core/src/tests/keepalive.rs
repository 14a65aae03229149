use crate::channel::{ConnectionRegistry, KeepaliveLoop, KeepaliveReport};
use crate::tests::open_connection;

use std::time::Duration;

use tokio_tungstenite::tungstenite::Message;

/// **VALUE**: Verifies an unresponsive connection is closed after the allowed misses.
///
/// **WHY THIS MATTERS**: Browsers that sleep or lose the network never send a close
/// frame; without eviction their connections accumulate and every broadcast pays for them.
///
/// **BUG THIS CATCHES**: Would catch eviction on the first miss or never evicting.
#[test]
fn given_silent_connection_when_rounds_run_then_evicted_on_third_round() {
    let registry = ConnectionRegistry::new();
    let (connection, mut outbound) = open_connection(43001);
    registry.add(connection.clone());
    let keepalive = KeepaliveLoop::new(registry.clone(), Duration::from_millis(10), 2);

    assert_eq!(
        keepalive.run_round(),
        KeepaliveReport {
            probed: 1,
            evicted: 0
        }
    );
    assert_eq!(keepalive.run_round().probed, 1);
    assert_eq!(
        keepalive.run_round(),
        KeepaliveReport {
            probed: 0,
            evicted: 1
        }
    );

    assert!(!connection.is_open());
    assert!(matches!(outbound.try_recv(), Ok(Message::Ping(_))));
    assert!(matches!(outbound.try_recv(), Ok(Message::Ping(_))));
    assert!(matches!(outbound.try_recv(), Ok(Message::Close(None))));
}

/// **VALUE**: Verifies answering probes keeps a connection alive indefinitely.
#[test]
fn given_connection_answering_probes_when_rounds_run_then_never_evicted() {
    let registry = ConnectionRegistry::new();
    let (connection, _outbound) = open_connection(43002);
    registry.add(connection.clone());
    let keepalive = KeepaliveLoop::new(registry, Duration::from_millis(10), 2);

    for _ in 0..10 {
        assert_eq!(keepalive.run_round().evicted, 0);
        connection.record_pong();
    }
    assert!(connection.is_open());
}

/// **VALUE**: Verifies a connection whose writer is gone is closed immediately.
#[test]
fn given_dead_writer_when_round_runs_then_evicted() {
    let registry = ConnectionRegistry::new();
    let (connection, outbound) = open_connection(43003);
    registry.add(connection.clone());
    drop(outbound);

    let report = KeepaliveLoop::new(registry, Duration::from_millis(10), 2).run_round();

    assert_eq!(report.evicted, 1);
    assert!(!connection.is_open());
}

/// **VALUE**: Verifies the spawned loop probes on its own schedule.
#[tokio::test]
async fn given_spawned_loop_when_interval_elapses_then_probe_sent() {
    let registry = ConnectionRegistry::new();
    let (connection, mut outbound) = open_connection(43004);
    registry.add(connection);

    let task = KeepaliveLoop::new(registry, Duration::from_millis(20), 2).spawn();
    let frame = tokio::time::timeout(Duration::from_secs(2), outbound.recv())
        .await
        .expect("probe within timeout")
        .expect("queue open");
    task.abort();

    assert!(matches!(frame, Message::Ping(_)));
}

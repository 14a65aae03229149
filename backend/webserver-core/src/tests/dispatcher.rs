use crate::channel::{Connection, DispatchOutcome, Envelope, MessageDispatcher};
use crate::error::HandlerError;
use crate::tests::{next_text, open_connection};

use std::sync::{Arc, Mutex};

use serde_json::{Value, json};

type Calls = Arc<Mutex<Vec<&'static str>>>;

fn recording(
    calls: &Calls,
    name: &'static str,
    result: Result<bool, &'static str>,
) -> impl Fn(&Connection, &str, &Value) -> Result<bool, HandlerError> + Send + Sync + 'static {
    let calls = Arc::clone(calls);
    move |_: &Connection, _: &str, _: &Value| {
        calls.lock().expect("lock").push(name);
        result.map_err(HandlerError::failed)
    }
}

/// **VALUE**: Verifies the chain stops at the first handler that consumes the message.
///
/// **WHY THIS MATTERS**: Handlers are layered like middleware; a consumed message must
/// not also trigger a later catch-all.
///
/// **BUG THIS CATCHES**: Would catch dispatch continuing after `Ok(true)`.
#[test]
fn given_consuming_handler_when_dispatch_then_later_handlers_skipped() {
    let (connection, _outbound) = open_connection(41001);
    let calls: Calls = Arc::default();
    let dispatcher = MessageDispatcher::new();
    dispatcher.add_fn(recording(&calls, "a", Ok(false)));
    dispatcher.add_fn(recording(&calls, "b", Ok(true)));
    dispatcher.add_fn(recording(&calls, "c", Ok(true)));

    let outcome = dispatcher.dispatch(&connection, r#"{"address":"x","payload":1}"#);

    assert_eq!(outcome, DispatchOutcome::Consumed { index: 1 });
    assert_eq!(*calls.lock().expect("lock"), vec!["a", "b"]);
}

/// **VALUE**: Verifies a failing handler counts as "not consumed".
///
/// **WHY THIS MATTERS**: One buggy handler must not stop messages reaching the others
/// or take the connection down.
///
/// **BUG THIS CATCHES**: Would catch an `Err` aborting the chain.
#[test]
fn given_failing_handler_when_dispatch_then_next_handler_runs() {
    let (connection, _outbound) = open_connection(41002);
    let calls: Calls = Arc::default();
    let dispatcher = MessageDispatcher::new();
    dispatcher.add_fn(recording(&calls, "broken", Err("boom")));
    dispatcher.add_fn(recording(&calls, "fallback", Ok(true)));

    let outcome = dispatcher.dispatch(&connection, r#"{"address":"x","payload":null}"#);

    assert_eq!(outcome, DispatchOutcome::Consumed { index: 1 });
    assert_eq!(*calls.lock().expect("lock"), vec!["broken", "fallback"]);
}

/// **VALUE**: Verifies a panicking handler is contained like a failing one.
///
/// **BUG THIS CATCHES**: Would catch a panic unwinding into the connection task.
#[test]
fn given_panicking_handler_when_dispatch_then_next_handler_runs() {
    let (connection, _outbound) = open_connection(41003);
    let dispatcher = MessageDispatcher::new();
    dispatcher.add_fn(|_: &Connection, _: &str, _: &Value| -> Result<bool, HandlerError> {
        panic!("handler bug")
    });
    dispatcher.add_fn(|_: &Connection, _: &str, _: &Value| Ok(true));

    let outcome = dispatcher.dispatch(&connection, r#"{"address":"x","payload":{}}"#);

    assert_eq!(outcome, DispatchOutcome::Consumed { index: 1 });
}

/// **VALUE**: Verifies unclaimed messages are reported, not treated as errors.
#[test]
fn given_no_consuming_handler_when_dispatch_then_unclaimed() {
    let (connection, _outbound) = open_connection(41004);
    let dispatcher = MessageDispatcher::default();
    assert!(dispatcher.is_empty());
    assert_eq!(
        dispatcher.dispatch(&connection, r#"{"address":"x","payload":[]}"#),
        DispatchOutcome::Unclaimed
    );

    dispatcher.add_fn(|_: &Connection, _: &str, _: &Value| Ok(false));
    assert_eq!(
        dispatcher.dispatch(&connection, r#"{"address":"x","payload":[]}"#),
        DispatchOutcome::Unclaimed
    );
}

/// **VALUE**: Verifies frames that aren't envelopes never reach handlers.
///
/// **BUG THIS CATCHES**: Would catch a missing payload being defaulted to null, or
/// plain text being wrapped into an envelope.
#[test]
fn given_malformed_frames_when_dispatch_then_malformed_and_handlers_untouched() {
    let (connection, _outbound) = open_connection(41005);
    let calls: Calls = Arc::default();
    let dispatcher = MessageDispatcher::new();
    dispatcher.add_fn(recording(&calls, "any", Ok(true)));

    for frame in ["hello", "{}", r#"{"address":"x"}"#, r#"{"payload":1}"#, "[1,2]"] {
        assert_eq!(
            dispatcher.dispatch(&connection, frame),
            DispatchOutcome::Malformed,
            "frame {frame:?}"
        );
    }
    assert!(calls.lock().expect("lock").is_empty());
}

/// **VALUE**: Verifies handlers see address and payload and can reply on the connection.
#[test]
fn given_echo_handler_when_dispatch_then_reply_queued() {
    let (connection, mut outbound) = open_connection(41006);
    let dispatcher = MessageDispatcher::new();
    dispatcher.add_fn(|connection: &Connection, address: &str, payload: &Value| {
        if address != "echo" {
            return Ok(false);
        }
        connection.send_envelope("echo.reply", payload.clone())?;
        Ok(true)
    });

    let outcome = dispatcher.dispatch_envelope(&connection, &Envelope::new("echo", json!("hi")));

    assert_eq!(outcome, DispatchOutcome::Consumed { index: 0 });
    let reply = Envelope::parse(&next_text(&mut outbound)).expect("reply is an envelope");
    assert_eq!(reply, Envelope::new("echo.reply", json!("hi")));
}

/// **VALUE**: Verifies a removed handler is no longer consulted.
#[test]
fn given_removed_handler_when_dispatch_then_skipped() {
    let (connection, _outbound) = open_connection(41007);
    let dispatcher = MessageDispatcher::new();
    let id = dispatcher.add_fn(|_: &Connection, _: &str, _: &Value| Ok(true));

    assert!(dispatcher.remove(id));
    assert_eq!(dispatcher.len(), 0);
    assert_eq!(
        dispatcher.dispatch(&connection, r#"{"address":"x","payload":0}"#),
        DispatchOutcome::Unclaimed
    );
}

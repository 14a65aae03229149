//! One upgraded, long-lived connection.
//!
//! A [`Connection`] is a cheap cloneable handle. The registry, the keepalive
//! loop and message handlers all hold clones; the socket itself is owned by the
//! connection task, which drains the outbound queue and watches the lifecycle
//! state for a close request.

use crate::channel::envelope::Envelope;
use crate::error::connection::ConnectionError;
use crate::http::Headers;

use common::ErrorLocation;

use std::fmt::{Display, Formatter, Result as FormatResult};
use std::net::SocketAddr;
use std::panic::Location;
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};

use log::debug;
use serde_json::Value;
use tokio::sync::{mpsc, watch};
use tokio_tungstenite::tungstenite::Message;
use uuid::Uuid;

/// Liveness probe payload.
const PROBE_PAYLOAD: [u8; 1] = [0];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConnectionId(Uuid);

impl ConnectionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ConnectionId {
    fn default() -> Self {
        Self::new()
    }
}

impl Display for ConnectionId {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> FormatResult {
        write!(formatter, "{}", self.0)
    }
}

/// Lifecycle of a persistent connection. Ordering follows the transitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ConnectionState {
    Connecting,
    Open,
    Closing,
    Closed,
}

/// Result of one keepalive probe.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProbeOutcome {
    /// Probe queued.
    Sent,
    /// Too many probes went unanswered; the caller should close.
    Unresponsive { missed: u32 },
    /// The probe could not be queued.
    Failed,
    /// Connection is not open; nothing was sent.
    Skipped,
}

struct ConnectionInner {
    id: ConnectionId,
    remote_addr: SocketAddr,
    handshake_headers: Headers,
    state: watch::Sender<ConnectionState>,
    outbound: mpsc::UnboundedSender<Message>,
    missed_probes: AtomicU32,
}

#[derive(Clone)]
pub struct Connection {
    inner: Arc<ConnectionInner>,
}

impl Connection {
    /// New connection in `Connecting`, plus the receiving end of its outbound queue.
    pub fn new(
        remote_addr: SocketAddr,
        handshake_headers: Headers,
    ) -> (Self, mpsc::UnboundedReceiver<Message>) {
        let (outbound, outbound_rx) = mpsc::unbounded_channel();
        let (state, _) = watch::channel(ConnectionState::Connecting);
        let connection = Self {
            inner: Arc::new(ConnectionInner {
                id: ConnectionId::new(),
                remote_addr,
                handshake_headers,
                state,
                outbound,
                missed_probes: AtomicU32::new(0),
            }),
        };
        (connection, outbound_rx)
    }

    pub fn id(&self) -> ConnectionId {
        self.inner.id
    }

    pub fn remote_addr(&self) -> SocketAddr {
        self.inner.remote_addr
    }

    /// Headers of the upgrade request that opened this connection.
    pub fn handshake_headers(&self) -> &Headers {
        &self.inner.handshake_headers
    }

    pub fn state(&self) -> ConnectionState {
        *self.inner.state.borrow()
    }

    pub fn is_open(&self) -> bool {
        self.state() == ConnectionState::Open
    }

    /// Queue a text frame.
    ///
    /// # Errors
    ///
    /// - [`ConnectionError::NotOpen`] outside `Open`; nothing is queued
    /// - [`ConnectionError::Send`] if the connection task is gone
    #[track_caller]
    pub fn send(&self, text: impl Into<String>) -> Result<(), ConnectionError> {
        let text: String = text.into();
        self.enqueue(Message::Text(text.into()))
    }

    /// Queue an `{address, payload}` envelope as a text frame.
    #[track_caller]
    pub fn send_envelope(&self, address: &str, payload: Value) -> Result<(), ConnectionError> {
        let text = Envelope::new(address, payload).to_text();
        self.send(text)
    }

    #[track_caller]
    fn enqueue(&self, message: Message) -> Result<(), ConnectionError> {
        let state = self.state();
        if state != ConnectionState::Open {
            return Err(ConnectionError::NotOpen {
                id: self.id(),
                state,
                location: ErrorLocation::from(Location::caller()),
            });
        }

        self.inner
            .outbound
            .send(message)
            .map_err(|e| ConnectionError::Send {
                id: self.id(),
                message: format!("outbound queue closed: {e}"),
                location: ErrorLocation::from(Location::caller()),
            })
    }

    /// Start closing: move to `Closing` and queue a close frame.
    ///
    /// Returns `false` if the connection was already closing or closed.
    pub fn close(&self) -> bool {
        let transitioned = self.inner.state.send_if_modified(|state| {
            if *state < ConnectionState::Closing {
                *state = ConnectionState::Closing;
                true
            } else {
                false
            }
        });

        if transitioned {
            debug!("Closing connection {} ({})", self.id(), self.remote_addr());
            // The writer may already be gone; closing still succeeds.
            let _ = self.inner.outbound.send(Message::Close(None));
        }
        transitioned
    }

    /// Resolves once the connection is `Closing` or `Closed`.
    pub async fn closing(&self) {
        let mut receiver = self.inner.state.subscribe();
        // The sender lives inside `self`, so the channel cannot close under us.
        let _ = receiver
            .wait_for(|state| *state >= ConnectionState::Closing)
            .await;
    }

    /// Send one liveness probe unless `max_missed` probes are already unanswered.
    pub fn probe(&self, max_missed: u32) -> ProbeOutcome {
        if !self.is_open() {
            return ProbeOutcome::Skipped;
        }

        let missed = self.inner.missed_probes.load(Ordering::SeqCst);
        if missed >= max_missed {
            return ProbeOutcome::Unresponsive { missed };
        }

        self.inner.missed_probes.fetch_add(1, Ordering::SeqCst);
        match self
            .inner
            .outbound
            .send(Message::Ping(PROBE_PAYLOAD.to_vec().into()))
        {
            Ok(()) => ProbeOutcome::Sent,
            Err(_) => ProbeOutcome::Failed,
        }
    }

    /// Probes sent since the last pong.
    pub fn missed_probes(&self) -> u32 {
        self.inner.missed_probes.load(Ordering::SeqCst)
    }

    pub(crate) fn record_pong(&self) {
        self.inner.missed_probes.store(0, Ordering::SeqCst);
    }

    pub(crate) fn mark_open(&self) -> bool {
        self.inner.state.send_if_modified(|state| {
            if *state == ConnectionState::Connecting {
                *state = ConnectionState::Open;
                true
            } else {
                false
            }
        })
    }

    pub(crate) fn mark_closed(&self) {
        self.inner.state.send_replace(ConnectionState::Closed);
    }
}

impl std::fmt::Debug for Connection {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> FormatResult {
        formatter
            .debug_struct("Connection")
            .field("id", &self.id())
            .field("remote_addr", &self.remote_addr())
            .field("state", &self.state())
            .finish()
    }
}

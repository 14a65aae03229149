use crate::channel::ConnectionId;

use std::net::SocketAddr;

/// Lifecycle notifications for persistent connections.
///
/// Published on a broadcast channel; see [`WebServer::subscribe`](crate::WebServer::subscribe).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionEvent {
    /// Upgrade completed and the connection is registered.
    Opened {
        id: ConnectionId,
        remote_addr: SocketAddr,
    },
    /// Connection unregistered; no further frames will be sent or received.
    Closed {
        id: ConnectionId,
        remote_addr: SocketAddr,
    },
}

impl ConnectionEvent {
    pub fn id(&self) -> ConnectionId {
        match self {
            ConnectionEvent::Opened { id, .. } | ConnectionEvent::Closed { id, .. } => *id,
        }
    }
}

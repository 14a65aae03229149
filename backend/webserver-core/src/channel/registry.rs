//! Set of currently open persistent connections.
//!
//! Mutated by connection tasks (add on open, remove on close) and read by
//! broadcasts and the keepalive loop, possibly all at once. Every operation
//! takes the lock only long enough to copy or update the map; sends happen on
//! a snapshot outside the lock.

use crate::channel::connection::{Connection, ConnectionId};

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use log::debug;

/// Outcome of one broadcast.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BroadcastReport {
    pub delivered: usize,
    pub failed: usize,
}

/// Cloneable handle; all clones share one map.
#[derive(Clone, Default)]
pub struct ConnectionRegistry {
    connections: Arc<RwLock<HashMap<ConnectionId, Connection>>>,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `connection`. Returns `false` if its id is already present.
    pub fn add(&self, connection: Connection) -> bool {
        let mut connections = self
            .connections
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        if connections.contains_key(&connection.id()) {
            return false;
        }
        connections.insert(connection.id(), connection);
        true
    }

    /// Unregister by id. A second removal of the same id returns `None`.
    pub fn remove(&self, id: ConnectionId) -> Option<Connection> {
        self.connections
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&id)
    }

    pub fn get(&self, id: ConnectionId) -> Option<Connection> {
        self.connections
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&id)
            .cloned()
    }

    pub fn len(&self) -> usize {
        self.connections
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Copy of the current membership, in no particular order.
    pub fn snapshot(&self) -> Vec<Connection> {
        self.connections
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .cloned()
            .collect()
    }

    /// Visit every registered connection.
    pub fn for_each<F>(&self, mut visit: F)
    where
        F: FnMut(&Connection),
    {
        for connection in self.snapshot() {
            visit(&connection);
        }
    }

    /// Send `text` to every registered connection.
    ///
    /// A connection that refuses the frame is counted and skipped; it never
    /// stops delivery to the others.
    pub fn broadcast(&self, text: &str) -> BroadcastReport {
        let mut report = BroadcastReport::default();
        self.for_each(|connection| match connection.send(text) {
            Ok(()) => report.delivered += 1,
            Err(e) => {
                debug!("Broadcast skipped {}: {}", connection.id(), e);
                report.failed += 1;
            }
        });
        report
    }

    /// One-line summary of who is connected.
    pub fn describe(&self) -> String {
        let connections = self.snapshot();
        if connections.is_empty() {
            return "No connected clients".to_string();
        }

        let mut addresses: Vec<String> = connections
            .iter()
            .map(|connection| connection.remote_addr().ip().to_string())
            .collect();
        addresses.sort();

        format!(
            "{} connection{} from: {}",
            connections.len(),
            if connections.len() == 1 { "" } else { "s" },
            addresses.join(" ")
        )
    }
}

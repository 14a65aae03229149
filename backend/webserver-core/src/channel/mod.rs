//! Persistent message channels: upgraded connections, the registry that
//! tracks them, the envelope dispatcher and the keepalive loop.

pub mod connection;
pub mod dispatcher;
pub mod envelope;
pub mod keepalive;
pub mod registry;

pub use connection::{Connection, ConnectionId, ConnectionState, ProbeOutcome};
pub use dispatcher::{DispatchOutcome, MessageDispatcher, MessageHandler};
pub use envelope::Envelope;
pub use keepalive::{KeepaliveLoop, KeepaliveReport};
pub use registry::{BroadcastReport, ConnectionRegistry};

use crate::channel::ConnectionId;
use crate::channel::ConnectionState;

use common::ErrorLocation;

use thiserror::Error as ThisError;

/// Failures of an outbound operation on a single persistent connection.
///
/// None of these are fatal: broadcast and keepalive log them and move on.
#[derive(Debug, ThisError)]
pub enum ConnectionError {
    #[error("Connection Not Open Error: {id} is {state:?} {location}")]
    NotOpen {
        id: ConnectionId,
        state: ConnectionState,
        location: ErrorLocation,
    },

    #[error("Connection Send Error: {id}: {message} {location}")]
    Send {
        id: ConnectionId,
        message: String,
        location: ErrorLocation,
    },
}

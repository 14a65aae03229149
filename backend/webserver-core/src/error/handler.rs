use common::ErrorLocation;

use std::panic::Location;

use thiserror::Error as ThisError;

/// Failure reported by an application-supplied message handler.
///
/// The dispatcher logs it with the triggering payload and treats the handler
/// as having produced no answer.
#[derive(Debug, ThisError)]
pub enum HandlerError {
    #[error("Handler Failed Error: {message} {location}")]
    Failed {
        message: String,
        location: ErrorLocation,
    },

    #[error("Handler Payload Error: {message} {location}")]
    Payload {
        message: String,
        location: ErrorLocation,
    },
}

impl HandlerError {
    #[track_caller]
    pub fn failed(message: impl Into<String>) -> Self {
        HandlerError::Failed {
            message: message.into(),
            location: ErrorLocation::from(Location::caller()),
        }
    }
}

impl From<serde_json::Error> for HandlerError {
    #[track_caller]
    fn from(error: serde_json::Error) -> Self {
        HandlerError::Payload {
            message: error.to_string(),
            location: ErrorLocation::from(Location::caller()),
        }
    }
}

impl From<crate::error::ConnectionError> for HandlerError {
    #[track_caller]
    fn from(error: crate::error::ConnectionError) -> Self {
        HandlerError::Failed {
            message: error.to_string(),
            location: ErrorLocation::from(Location::caller()),
        }
    }
}

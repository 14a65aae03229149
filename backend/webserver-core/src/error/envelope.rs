use common::ErrorLocation;

use std::panic::Location;

use thiserror::Error as ThisError;

#[derive(Debug, ThisError)]
pub enum EnvelopeError {
    #[error("Envelope Malformed Error: {message} {location}")]
    Malformed {
        message: String,
        location: ErrorLocation,
    },
}

impl From<serde_json::Error> for EnvelopeError {
    #[track_caller]
    fn from(error: serde_json::Error) -> Self {
        EnvelopeError::Malformed {
            message: error.to_string(),
            location: ErrorLocation::from(Location::caller()),
        }
    }
}

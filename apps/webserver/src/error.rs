use webserver_core::error::CoreError;

use common::ErrorLocation;

use std::panic::Location;

use thiserror::Error;

/// Errors raised while assembling and running the server binary.
#[derive(Debug, Error)]
pub enum WebserverError {
    /// Error from this app (logging setup, directories)
    #[error("Webserver Error: {message} {location}")]
    Webserver {
        message: String,
        location: ErrorLocation,
    },

    /// Configuration could not be loaded or is invalid
    #[error("Config Error: {message} {location}")]
    Config {
        message: String,
        location: ErrorLocation,
    },

    /// The server failed to start
    #[error("Start Error: {message} {location}")]
    StartFailed {
        message: String,
        location: ErrorLocation,
    },
}

impl From<CoreError> for WebserverError {
    #[track_caller]
    fn from(error: CoreError) -> Self {
        let location = ErrorLocation::from(Location::caller());
        let message = error.to_string();
        match error {
            CoreError::Config(_) => WebserverError::Config { message, location },
            CoreError::Server(_) => WebserverError::StartFailed { message, location },
            _ => WebserverError::Webserver { message, location },
        }
    }
}

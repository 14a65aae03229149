use common::{ErrorLocation, HttpStatusCode};

use std::io::Error as IoError;
use std::panic::Location;

use thiserror::Error as ThisError;

/// Failures while reading or decoding a plain HTTP request, before routing.
///
/// Each variant maps onto the status code of the error response sent back for
/// the failing request; the connection and the server keep running.
#[derive(Debug, ThisError)]
pub enum HttpError {
    #[error("Malformed Request Error: {message} {location}")]
    Malformed {
        message: String,
        location: ErrorLocation,
    },

    #[error("Header Too Large Error: limit {limit} bytes {location}")]
    HeaderTooLarge {
        limit: usize,
        location: ErrorLocation,
    },

    #[error("Payload Too Large Error: {length} bytes exceeds {limit} {location}")]
    PayloadTooLarge {
        length: u64,
        limit: u64,
        location: ErrorLocation,
    },

    #[error("Multipart Error: {message} {location}")]
    Multipart {
        message: String,
        location: ErrorLocation,
    },

    #[error("Request Timeout Error: {message} {location}")]
    Timeout {
        message: String,
        location: ErrorLocation,
    },

    #[error("IO Error: {message} {location}")]
    Io {
        message: String,
        location: ErrorLocation,
    },
}

impl HttpError {
    #[track_caller]
    pub fn malformed(message: impl Into<String>) -> Self {
        HttpError::Malformed {
            message: message.into(),
            location: ErrorLocation::from(Location::caller()),
        }
    }

    #[track_caller]
    pub fn multipart(message: impl Into<String>) -> Self {
        HttpError::Multipart {
            message: message.into(),
            location: ErrorLocation::from(Location::caller()),
        }
    }

    /// Status code of the response answering this failure.
    pub fn status(&self) -> HttpStatusCode {
        match self {
            HttpError::Malformed { .. } | HttpError::Multipart { .. } => {
                HttpStatusCode::BAD_REQUEST
            }
            HttpError::HeaderTooLarge { .. } => HttpStatusCode::HEADER_FIELDS_TOO_LARGE,
            HttpError::PayloadTooLarge { .. } => HttpStatusCode::PAYLOAD_TOO_LARGE,
            HttpError::Timeout { .. } => HttpStatusCode::REQUEST_TIMEOUT,
            HttpError::Io { .. } => HttpStatusCode::INTERNAL_ERROR,
        }
    }

    /// Plain-text body of the response answering this failure.
    pub fn response_text(&self) -> String {
        match self {
            HttpError::Malformed { message, .. } | HttpError::Multipart { message, .. } => {
                format!("BAD REQUEST: {message}")
            }
            HttpError::HeaderTooLarge { limit, .. } => {
                format!("REQUEST HEADER FIELDS TOO LARGE: request header exceeds {limit} bytes")
            }
            HttpError::PayloadTooLarge { length, limit, .. } => {
                format!("PAYLOAD TOO LARGE: {length} bytes exceeds the {limit} byte limit")
            }
            HttpError::Timeout { message, .. } => format!("REQUEST TIMEOUT: {message}"),
            HttpError::Io { message, .. } => format!("SERVER INTERNAL ERROR: {message}"),
        }
    }

    /// Transport failures are internal errors; everything else is the client's fault.
    pub fn is_protocol_error(&self) -> bool {
        !matches!(self, HttpError::Io { .. })
    }
}

impl From<IoError> for HttpError {
    #[track_caller]
    fn from(error: IoError) -> Self {
        HttpError::Io {
            message: format!("IOException: {error}"),
            location: ErrorLocation::from(Location::caller()),
        }
    }
}

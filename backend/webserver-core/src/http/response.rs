//! Responses produced by request handlers.

use crate::http::mime::mime_type_for_path;

use common::HttpStatusCode;

use std::fs::File;
use std::io;
use std::path::Path;

pub const MIME_PLAINTEXT: &str = "text/plain";

const NOT_FOUND_TEXT: &str = "Couldn't understand request";

/// Response body with a length known before the first byte is written.
#[derive(Debug)]
pub enum Body {
    Bytes(Vec<u8>),
    /// Streamed through a buffered reader; `length` is the file size at open time.
    File { file: File, length: u64 },
}

impl Body {
    pub fn len(&self) -> u64 {
        match self {
            Body::Bytes(bytes) => bytes.len() as u64,
            Body::File { length, .. } => *length,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[derive(Debug)]
pub struct Response {
    pub status: HttpStatusCode,
    /// Sent as `Content-Type` only when present.
    pub mime_type: Option<String>,
    pub body: Body,
}

impl Response {
    /// In-memory response with a fixed length.
    pub fn fixed_length(
        status: HttpStatusCode,
        mime_type: Option<&str>,
        body: impl Into<Vec<u8>>,
    ) -> Self {
        Self {
            status,
            mime_type: mime_type.map(str::to_string),
            body: Body::Bytes(body.into()),
        }
    }

    pub fn text(status: HttpStatusCode, text: impl Into<String>) -> Self {
        Self::fixed_length(status, Some(MIME_PLAINTEXT), text.into())
    }

    /// The response sent when no handler answered a request.
    pub fn not_found() -> Self {
        Self::fixed_length(HttpStatusCode::NOT_FOUND, None, NOT_FOUND_TEXT)
    }

    /// Fixed answer for browser favicon probes.
    pub fn favicon_not_found() -> Self {
        Self::fixed_length(HttpStatusCode::NOT_FOUND, None, Vec::new())
    }

    /// `200` streaming the file at `path`, typed by its extension.
    pub fn file(path: &Path) -> io::Result<Self> {
        let file = File::open(path)?;
        let length = file.metadata()?.len();
        Ok(Self {
            status: HttpStatusCode::OK,
            mime_type: Some(mime_type_for_path(path).to_string()),
            body: Body::File { file, length },
        })
    }

    pub fn content_length(&self) -> u64 {
        self.body.len()
    }

    /// Body bytes of an in-memory response, `None` for streamed files.
    pub fn bytes(&self) -> Option<&[u8]> {
        match &self.body {
            Body::Bytes(bytes) => Some(bytes),
            Body::File { .. } => None,
        }
    }
}

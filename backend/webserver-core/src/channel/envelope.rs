//! The `{address, payload}` wire unit of a persistent channel.

use crate::error::envelope::EnvelopeError;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One inbound or outbound text frame, decoded.
///
/// Both fields are required on the wire; `"payload": null` is a valid payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    pub address: String,
    pub payload: Value,
}

impl Envelope {
    pub fn new(address: impl Into<String>, payload: Value) -> Self {
        Self {
            address: address.into(),
            payload,
        }
    }

    /// Decode a text frame.
    pub fn parse(text: &str) -> Result<Self, EnvelopeError> {
        Ok(serde_json::from_str(text)?)
    }

    pub fn to_text(&self) -> String {
        // Serializing a String and a Value cannot fail.
        serde_json::to_string(self).unwrap_or_default()
    }
}

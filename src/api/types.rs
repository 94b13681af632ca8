//! API request and response types

use serde::{Deserialize, Serialize};

/// Form body Twilio posts for an inbound WhatsApp message.
///
/// Twilio sends many more fields; only these two are read.
#[derive(Debug, Default, Deserialize)]
pub struct InboundMessageForm {
    #[serde(rename = "From", default)]
    pub from: String,
    #[serde(rename = "Body", default)]
    pub body: String,
}

/// Error response
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

impl ErrorResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            error: message.into(),
        }
    }
}

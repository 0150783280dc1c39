//! Shared Data Transfer Objects (DTOs) for API handlers.
//!
//! Every endpoint answers with the same envelope: `status` is "sukses"
//! or "error", `message` and `data` are optional. Error envelopes are
//! produced by `AppError`; handlers build the success side here.

use serde::Serialize;

/// Success envelope wrapper.
#[derive(Debug, Clone, Serialize)]
pub struct ApiResponse<T> {
    /// Always "sukses" on this type; error envelopes come from AppError
    pub status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

impl<T: Serialize> ApiResponse<T> {
    /// Envelope with data and no message
    pub fn ok(data: T) -> Self {
        Self {
            status: "sukses",
            message: None,
            data: Some(data),
        }
    }

    /// Envelope with a message and data
    pub fn with_message(message: impl Into<String>, data: T) -> Self {
        Self {
            status: "sukses",
            message: Some(message.into()),
            data: Some(data),
        }
    }
}

impl ApiResponse<()> {
    /// Envelope with only a message, for deletes
    pub fn message_only(message: impl Into<String>) -> Self {
        Self {
            status: "sukses",
            message: Some(message.into()),
            data: None,
        }
    }
}
